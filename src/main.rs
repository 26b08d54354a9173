use p1decoder::{Config, TelegramFramer};
use log::{error, info, warn};
use std::io::{self, Read, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    // Initialize logging
    let default_filter = std::env::var("P1_LOG_LEVEL").unwrap_or("info".to_string());
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(default_filter));

    /* An explicit path wins over the default locations */
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(&path),
        None => Config::load(),
    };
    let config = match config {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let decoder = match config.build_decoder() {
        Ok(d) => d,
        Err(e) => {
            error!("Invalid field selection: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Decoding P1 telegrams from stdin, {} fields selected", decoder.manifest().len());
    match run(&decoder, &config) {
        Ok(decoded) => {
            info!("Input closed after {} telegrams", decoded);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Reading input failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

/* Forwards every decoded record as one JSON line on stdout */
fn run(decoder: &p1decoder::Decoder, config: &Config) -> io::Result<u64> {
    let mut framer = TelegramFramer::new(config.decoder.max_telegram_length);
    let mut input = io::stdin().lock();
    let mut output = io::stdout().lock();
    let mut buf = [0u8; 1024];
    let mut decoded = 0;

    loop {
        let n = input.read(&mut buf)?;
        if n == 0 {
            break;
        }

        for telegram in framer.push(&buf[..n]) {
            match decoder.decode(&telegram) {
                Ok(record) => {
                    match serde_json::to_string(&record) {
                        Ok(line) => writeln!(output, "{}", line)?,
                        Err(e) => error!("Unable to serialize record: {}", e),
                    }
                    output.flush()?;
                    decoded += 1;
                }
                Err(e) => warn!("Dropping telegram: {}", e),
            }
        }
    }

    if framer.dropped() > 0 {
        warn!("{} oversized telegrams were dropped", framer.dropped());
    }
    Ok(decoded)
}
