//! Decoder for DSMR P1 smart meter telegrams
//!
//! A manifest selects the fields of interest once at startup; every telegram
//! is then decoded into a record holding just those fields.

pub mod config;
pub mod metering_p1;
pub mod obis_utils;

// Re-export common types for easier access
pub use config::{Config, ConfigError};
pub use metering_p1::{decode, Decoder, DecodeError};
pub use metering_p1::framing::TelegramFramer;
pub use metering_p1::manifest::Manifest;
pub use metering_p1::structs::{DecoderOptions, FieldSpec, FieldValue, FixedValue, Record, Timestamp, TimestampedFixedValue, ValueShape};
