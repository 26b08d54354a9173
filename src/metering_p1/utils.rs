use super::{structs::DecoderOptions, DecodeError};
use crc16::{State, ARC};
use log::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceIdentification {
    pub manufacturer: String,
    /// Baud rate character of IEC 62056-21, '5' on P1 ports
    pub baud_rate_char: char,
    pub identification: String,
}

/// One framed telegram: everything from `/` up to and including `!`
#[derive(Debug, PartialEq)]
pub struct Frame<'a> {
    pub body: &'a [u8],
    pub checksum: Option<u16>,
}

pub fn parse_identification_line(line: &str) -> Option<DeviceIdentification> {
    // Example formats:
    // /KFM5KAIFA-METER
    // /ISk5\2MT382-1000
    // /XMX5LGBBFFB231215493
    let content = line.strip_prefix('/')?;

    let mut chars = content.chars();
    let manufacturer: String = chars.by_ref().take(3).collect();
    let baud_rate_char = chars.next()?;
    if manufacturer.len() != 3 {
        return None;
    }

    let identification = chars.as_str().to_string();
    debug!("Parsed identification - Manufacturer: {}, ID: {}", manufacturer, identification);

    Some(DeviceIdentification {
        manufacturer,
        baud_rate_char,
        identification,
    })
}

/// CRC16 as transmitted after the `!` of DSMR 4 and later telegrams
pub fn calculate_checksum(body: &[u8]) -> u16 {
    State::<ARC>::calculate(body)
}

pub fn verify_checksum(frame: &Frame) -> Result<(), DecodeError> {
    let expected = match frame.checksum {
        Some(c) => c,
        None => return Ok(()),
    };

    let calculated = calculate_checksum(frame.body);
    debug!("P1 checksum validation: expected=0x{:04X}, calculated=0x{:04X}", expected, calculated);
    if expected != calculated {
        return Err(DecodeError::ChecksumMismatch { expected, calculated });
    }
    Ok(())
}

/// Checks the structural markers of a telegram and cuts out its body and checksum
pub fn locate_telegram<'a>(data: &'a [u8], options: &DecoderOptions) -> Result<Frame<'a>, DecodeError> {
    if data.len() > options.max_telegram_length {
        return Err(DecodeError::MalformedTelegram("Telegram too long"));
    }

    let start = data.iter()
        .position(|b| !b.is_ascii_whitespace())
        .ok_or(DecodeError::MalformedTelegram("Empty telegram"))?;
    if data[start] != b'/' {
        return Err(DecodeError::MalformedTelegram("Data should start with /"));
    }

    let end = data[start..].iter()
        .position(|b| *b == b'!')
        .map(|pos| start + pos)
        .ok_or(DecodeError::MalformedTelegram("Missing end of telegram"))?;

    /* After the '!' only the checksum and the line end may follow */
    let trailer = &data[end + 1..];
    let token_len = trailer.iter()
        .position(|b| b.is_ascii_whitespace())
        .unwrap_or(trailer.len());
    let (token, rest) = trailer.split_at(token_len);
    if !rest.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(DecodeError::MalformedTelegram("Extra data after checksum"));
    }

    let checksum = match token {
        [] => None,
        [a, b, c, d] if token.iter().all(|b| b.is_ascii_hexdigit()) => {
            let nibble = |b: &u8| (*b as char).to_digit(16).unwrap_or(0) as u16;
            Some(nibble(a) << 12 | nibble(b) << 8 | nibble(c) << 4 | nibble(d))
        }
        _ => return Err(DecodeError::MalformedTelegram("Incomplete or malformed checksum")),
    };

    if checksum.is_none() && options.require_checksum {
        return Err(DecodeError::MalformedTelegram("No checksum found"));
    }

    Ok(Frame {
        body: &data[start..=end],
        checksum,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> DecoderOptions {
        DecoderOptions::default()
    }

    #[test]
    fn test_parse_identification_line() {
        let device = parse_identification_line("/KFM5KAIFA-METER").unwrap();
        assert_eq!(device.manufacturer, "KFM");
        assert_eq!(device.baud_rate_char, '5');
        assert_eq!(device.identification, "KAIFA-METER");

        let device = parse_identification_line("/ISk5\\2MT382-1000").unwrap();
        assert_eq!(device.manufacturer, "ISk");
        assert_eq!(device.identification, "\\2MT382-1000");

        assert!(parse_identification_line("KFM5KAIFA-METER").is_none());
        assert!(parse_identification_line("/KF").is_none());
    }

    #[test]
    fn test_calculate_checksum() {
        /* CRC-16/ARC check value */
        assert_eq!(calculate_checksum(b"123456789"), 0xBB3D);
        assert_eq!(calculate_checksum(b""), 0);
    }

    #[test]
    fn test_locate_telegram() {
        let data = b"\r\n/ABC5 meter\r\n\r\n1-0:1.7.0(00.424*kW)\r\n!1A2b\r\n";
        let frame = locate_telegram(data, &options()).unwrap();
        assert!(frame.body.starts_with(b"/ABC5"));
        assert!(frame.body.ends_with(b"\r\n!"));
        assert_eq!(frame.checksum, Some(0x1A2B));

        let frame = locate_telegram(b"/ABC5 meter\r\n!\r\n", &options()).unwrap();
        assert_eq!(frame.checksum, None);

        let frame = locate_telegram(b"/ABC5 meter\r\n!", &options()).unwrap();
        assert_eq!(frame.body, b"/ABC5 meter\r\n!");
    }

    #[test]
    fn test_locate_telegram_errors() {
        let malformed = |data: &[u8]| match locate_telegram(data, &options()) {
            Err(DecodeError::MalformedTelegram(reason)) => reason,
            other => panic!("unexpected result {:?}", other),
        };

        assert_eq!(malformed(b""), "Empty telegram");
        assert_eq!(malformed(b"1-0:1.7.0(00.424*kW)\r\n!\r\n"), "Data should start with /");
        assert_eq!(malformed(b"/ABC5 meter\r\n1-0:1.7.0(00.424*kW)\r\n"), "Missing end of telegram");
        assert_eq!(malformed(b"/ABC5 meter\r\n!1A2\r\n"), "Incomplete or malformed checksum");
        assert_eq!(malformed(b"/ABC5 meter\r\n!1A2G\r\n"), "Incomplete or malformed checksum");
        assert_eq!(malformed(b"/ABC5 meter\r\n!1A2B\r\ngarbage"), "Extra data after checksum");

        let strict = DecoderOptions { require_checksum: true, ..options() };
        assert_eq!(locate_telegram(b"/ABC5 meter\r\n!\r\n", &strict), Err(DecodeError::MalformedTelegram("No checksum found")));

        let short = DecoderOptions { max_telegram_length: 8, ..options() };
        assert_eq!(locate_telegram(b"/ABC5 meter\r\n!\r\n", &short), Err(DecodeError::MalformedTelegram("Telegram too long")));
    }

    #[test]
    fn test_verify_checksum() {
        let frame = Frame { body: b"123456789", checksum: Some(0xBB3D) };
        assert!(verify_checksum(&frame).is_ok());

        let frame = Frame { body: b"123456789", checksum: Some(0x0000) };
        assert_eq!(verify_checksum(&frame), Err(DecodeError::ChecksumMismatch { expected: 0, calculated: 0xBB3D }));

        let frame = Frame { body: b"123456789", checksum: None };
        assert!(verify_checksum(&frame).is_ok());
    }
}
