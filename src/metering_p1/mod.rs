use log::{debug, warn};
use thiserror::Error;

pub mod structs;
pub mod utils;
pub mod manifest;
pub mod framing;
pub mod value_parser;
pub mod field_definitions;

use field_definitions::IDENTIFICATION;
use manifest::Manifest;
use structs::{DecoderOptions, FieldValue, Record};

#[derive(Error, Debug, PartialEq)]
pub enum DecodeError {
    #[error("Malformed telegram: {0}")]
    MalformedTelegram(&'static str),
    #[error("Checksum mismatch: telegram says {expected:04X}, calculated {calculated:04X}")]
    ChecksumMismatch { expected: u16, calculated: u16 },
    #[error("Mandatory field {0} missing")]
    MissingField(String),
}

/// Decodes telegrams into the fields of one manifest
#[derive(Debug, Clone)]
pub struct Decoder {
    manifest: Manifest,
    options: DecoderOptions,
}

impl Decoder {
    pub fn new(manifest: Manifest, options: DecoderOptions) -> Self {
        return Decoder { manifest, options };
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }

    pub fn decode(&self, telegram: &[u8]) -> Result<Record, DecodeError> {
        decode_with(&self.manifest, &self.options, telegram)
    }
}

/// Decodes one framed telegram with the default options
pub fn decode(manifest: &Manifest, telegram: &[u8]) -> Result<Record, DecodeError> {
    decode_with(manifest, &DecoderOptions::default(), telegram)
}

fn decode_with(manifest: &Manifest, options: &DecoderOptions, telegram: &[u8]) -> Result<Record, DecodeError> {
    let frame = utils::locate_telegram(telegram, options)?;
    utils::verify_checksum(&frame)?;

    let text = std::str::from_utf8(frame.body)
        .map_err(|_| DecodeError::MalformedTelegram("Telegram is not valid text"))?;
    /* Strip the leading '/' and the closing '!' */
    let text = &text[1..text.len() - 1];

    let mut lines = text.split('\n').map(|line| line.trim_end_matches('\r'));
    let header = lines.next().unwrap_or("");

    let mut record = Record::new();

    let header_line = format!("/{}", header);
    match utils::parse_identification_line(&header_line) {
        Some(device) => debug!("Telegram from manufacturer {} ({})", device.manufacturer, device.identification),
        None => debug!("Unusual identification line '{}'", header),
    }
    if let Some(entry) = manifest.get(IDENTIFICATION) {
        match value_parser::parse_value(entry.definition, &[header]) {
            Ok(value) => { record.insert(entry.definition.name, value); }
            Err(e) => warn!("Field {} omitted: {}", IDENTIFICATION, e),
        }
    }

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        store_data_line(manifest, line, &mut record);
    }

    for entry in manifest.iter().filter(|entry| entry.spec.mandatory) {
        if !record.contains(entry.definition.name) {
            return Err(DecodeError::MissingField(entry.spec.name.clone()));
        }
    }

    debug!("Decoded {} of {} selected fields", record.len(), manifest.len());
    Ok(record)
}

/* Lines that cannot be parsed only cost the field they carry */
fn store_data_line(manifest: &Manifest, line: &str, record: &mut Record) {
    let (identifier, groups) = match value_parser::split_data_line(line) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Skipping data line '{}': {}", line, e);
            return;
        }
    };

    let definition = match field_definitions::find_field(&identifier) {
        Some(definition) => definition,
        None => {
            debug!("Ignoring unknown identifier {}", identifier);
            return;
        }
    };

    if !manifest.contains(definition.name) {
        return;
    }

    match value_parser::parse_value(definition, &groups) {
        Ok(value) => store(record, definition.name, value),
        Err(e) => warn!("Field {} ({}) omitted: {}", definition.name, identifier, e),
    }
}

fn store(record: &mut Record, name: &'static str, value: FieldValue) {
    if record.insert(name, value).is_some() {
        debug!("Field {} sent more than once, keeping the last value", name);
    }
}
