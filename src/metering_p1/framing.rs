use log::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
enum FramerState {
    /// Discarding bytes until the next `/`
    WaitingForStart,
    Reading,
    /// Seen `!`, collecting checksum until the line end
    ReadingTrailer,
}

/// Cuts complete telegrams out of a byte stream that may start anywhere
/// and may deliver a telegram in arbitrary pieces
pub struct TelegramFramer {
    buffer: Vec<u8>,
    max_len: usize,
    state: FramerState,
    dropped: u64,
}

impl TelegramFramer {
    pub fn new(max_len: usize) -> Self {
        return TelegramFramer {
            buffer: Vec::new(),
            max_len,
            state: FramerState::WaitingForStart,
            dropped: 0,
        };
    }

    /// Feeds received bytes, returning every telegram they completed
    pub fn push(&mut self, data: &[u8]) -> Vec<Vec<u8>> {
        let mut complete = Vec::new();

        for &byte in data {
            /* A '/' never occurs inside a telegram, so it always starts a new one */
            if byte == b'/' {
                if self.state != FramerState::WaitingForStart {
                    warn!("Telegram restarted after {} bytes, discarding the incomplete one", self.buffer.len());
                }
                self.buffer.clear();
                self.buffer.push(byte);
                self.state = FramerState::Reading;
                continue;
            }

            match self.state {
                FramerState::WaitingForStart => continue,
                FramerState::Reading => {
                    self.buffer.push(byte);
                    if byte == b'!' {
                        self.state = FramerState::ReadingTrailer;
                    }
                }
                FramerState::ReadingTrailer => {
                    self.buffer.push(byte);
                    if byte == b'\n' {
                        debug!("Framed telegram with {} bytes", self.buffer.len());
                        complete.push(std::mem::take(&mut self.buffer));
                        self.state = FramerState::WaitingForStart;
                        continue;
                    }
                }
            }

            if self.buffer.len() > self.max_len {
                warn!("Telegram exceeds {} bytes, dropping it", self.max_len);
                self.dropped += 1;
                self.reset();
            }
        }

        complete
    }

    /// Bytes of the telegram currently being assembled
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Number of telegrams discarded for exceeding the size limit
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = FramerState::WaitingForStart;
    }
}
