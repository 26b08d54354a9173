use crate::metering_p1::field_definitions;
use crate::metering_p1::manifest::Manifest;
use crate::metering_p1::structs::{DecoderOptions, FieldSpec, ValueShape};
use crate::metering_p1::Decoder;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_yml;
use std::fs;
use std::path::Path;
use thiserror::Error;

/* Looked up in this order when no path is given */
const CONFIG_PATHS: [&str; 2] = ["config/p1.yaml", "p1.yaml"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Manifest selects no fields")]
    EmptyManifest,
    #[error("No parser registered for field {0}")]
    UnknownField(String),
    #[error("Field {name} is declared as {declared:?} but parsed as {expected:?}")]
    ShapeMismatch { name: String, declared: ValueShape, expected: ValueShape },
    #[error("Field {0} selected twice")]
    DuplicateField(String),
    #[error("Unable to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unable to parse config: {0}")]
    Parse(#[from] serde_yml::Error),
}

fn decoder_default() -> DecoderOptions { return DecoderOptions::default() }
fn fields_default() -> Vec<FieldSpec> { return field_definitions::standard_fields() }

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Config {
    #[serde(default="decoder_default")]
    pub decoder: DecoderOptions,
    #[serde(default="fields_default")]
    pub fields: Vec<FieldSpec>,
}

impl Default for Config {
    fn default() -> Self {
        return Config {
            decoder: decoder_default(),
            fields: fields_default(),
        };
    }
}

impl Config {
    /// Loads `config/p1.yaml` or `p1.yaml`, falling back to the standard
    /// field selection when neither exists
    pub fn load() -> Result<Self, ConfigError> {
        for path in CONFIG_PATHS {
            if Path::new(path).exists() {
                return Config::from_file(path);
            }
        }

        info!("No config found on {}, using the standard fields", CONFIG_PATHS.join(" or "));
        Ok(Config::default())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        debug!("Read config from {}", path.as_ref().display());
        Config::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let c: Config = serde_yml::from_str(contents)?;
        Ok(c)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yml::to_string(self)?)
    }

    pub fn manifest(&self) -> Result<Manifest, ConfigError> {
        Manifest::new(self.fields.clone())
    }

    /// Validates the manifest once, ready for decoding
    pub fn build_decoder(&self) -> Result<Decoder, ConfigError> {
        Ok(Decoder::new(self.manifest()?, self.decoder.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config, Config::default());
        assert!(!config.decoder.require_checksum);
        assert_eq!(config.decoder.max_telegram_length, 8192);
        assert_eq!(config.fields.len(), 5);
    }

    #[test]
    fn test_parse_config() {
        let yaml = r"
decoder:
  require_checksum: true
fields:
  - name: power_delivered
    shape: FixedValue
    mandatory: true
  - name: gas_delivered
    shape: TimestampedFixedValue
";
        let config = Config::from_yaml(yaml).unwrap();
        assert!(config.decoder.require_checksum);
        assert_eq!(config.decoder.max_telegram_length, 8192);
        assert_eq!(config.fields.len(), 2);
        assert!(config.fields[0].mandatory);
        assert!(!config.fields[1].mandatory);

        let decoder = config.build_decoder().unwrap();
        assert_eq!(decoder.manifest().len(), 2);
        assert!(decoder.options().require_checksum);
    }

    #[test]
    fn test_invalid_manifest_rejected_at_build() {
        let yaml = r"
fields:
  - name: power_delivered
    shape: String
";
        let config = Config::from_yaml(yaml).unwrap();
        assert!(matches!(config.build_decoder(), Err(ConfigError::ShapeMismatch { .. })));

        let config = Config::from_yaml("fields: []").unwrap();
        assert!(matches!(config.build_decoder(), Err(ConfigError::EmptyManifest)));
    }

    #[test]
    fn test_unknown_shape_is_parse_error() {
        let yaml = r"
fields:
  - name: power_delivered
    shape: Float
";
        assert!(matches!(Config::from_yaml(yaml), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "fields:").unwrap();
        writeln!(file, "  - name: electricity_tariff").unwrap();
        writeln!(file, "    shape: String").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.fields, vec![FieldSpec::new("electricity_tariff", ValueShape::String)]);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::from_file(dir.path().join("p1.yaml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = Config::default();
        let yaml = config.to_yaml().unwrap();
        assert_eq!(Config::from_yaml(&yaml).unwrap(), config);
    }
}
