use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// The structure a field's raw token is parsed into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueShape {
    FixedValue,
    String,
    TimestampedFixedValue,
    Integer,
    Timestamp,
    Raw,
}

/// One manifest entry: a field selected by name and the shape it is expected in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub shape: ValueShape,
    #[serde(default)]
    pub mandatory: bool,
}

impl FieldSpec {
    pub fn new(name: &str, shape: ValueShape) -> Self {
        return FieldSpec {
            name: name.to_string(),
            shape,
            mandatory: false,
        };
    }

    /// Marks the field so that a telegram without it fails to decode
    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }
}

/// Registry entry describing how a field is identified and parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    pub name: &'static str,
    /// Empty for the identification header, which has no OBIS code
    pub obis: &'static str,
    pub shape: ValueShape,
    pub unit: Option<&'static str>,
    /// Unit one thousandth of `unit`, accepted for whole numbers only (Wh for kWh)
    pub int_unit: Option<&'static str>,
    pub min_len: usize,
    pub max_len: usize,
    pub description: &'static str,
}

fn require_checksum_default() -> bool { return false }
fn max_telegram_length_default() -> usize { return 8192 }

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DecoderOptions {
    /// Reject telegrams without the trailing CRC (DSMR 2.x and 3.0 meters send none)
    #[serde(default="require_checksum_default")]
    pub require_checksum: bool,
    #[serde(default="max_telegram_length_default")]
    pub max_telegram_length: usize,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        return DecoderOptions {
            require_checksum: require_checksum_default(),
            max_telegram_length: max_telegram_length_default(),
        };
    }
}

/// Decimal number kept as integer thousandths of its unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedValue {
    pub milli: i64,
    pub unit: &'static str,
}

impl FixedValue {
    pub fn value(&self) -> f64 {
        self.milli as f64 / 1000.0
    }
}

impl Serialize for FixedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("FixedValue", 2)?;
        s.serialize_field("value", &self.value())?;
        s.serialize_field("unit", self.unit)?;
        s.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IntegerValue {
    pub value: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<&'static str>,
}

/// Meter clock reading: local time plus the summer/winter flag the meter sends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Timestamp {
    #[serde(rename = "timestamp")]
    pub local: NaiveDateTime,
    pub dst: bool,
}

impl Timestamp {
    /// P1 meters run on CET, CEST while `dst` is set
    pub fn utc_offset_hours(&self) -> i64 {
        if self.dst { 2 } else { 1 }
    }

    pub fn to_utc(&self) -> DateTime<Utc> {
        (self.local - TimeDelta::hours(self.utc_offset_hours())).and_utc()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampedFixedValue {
    pub timestamp: Timestamp,
    pub value: FixedValue,
}

impl Serialize for TimestampedFixedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("TimestampedFixedValue", 4)?;
        s.serialize_field("timestamp", &self.timestamp.local)?;
        s.serialize_field("dst", &self.timestamp.dst)?;
        s.serialize_field("value", &self.value.value())?;
        s.serialize_field("unit", self.value.unit)?;
        s.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Fixed(FixedValue),
    Integer(IntegerValue),
    Text(String),
    Timestamp(Timestamp),
    TimestampedFixed(TimestampedFixedValue),
    Raw(String),
}

impl FieldValue {
    pub fn shape(&self) -> ValueShape {
        match self {
            FieldValue::Fixed(_) => ValueShape::FixedValue,
            FieldValue::Integer(_) => ValueShape::Integer,
            FieldValue::Text(_) => ValueShape::String,
            FieldValue::Timestamp(_) => ValueShape::Timestamp,
            FieldValue::TimestampedFixed(_) => ValueShape::TimestampedFixedValue,
            FieldValue::Raw(_) => ValueShape::Raw,
        }
    }
}

/// Decoded fields of one telegram, keyed by field name
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Record {
    values: BTreeMap<&'static str, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value this one replaced, if the field was seen before
    pub(crate) fn insert(&mut self, name: &'static str, value: FieldValue) -> Option<FieldValue> {
        self.values.insert(name, value)
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        self.values.iter().map(|(name, value)| (*name, value))
    }

    pub fn fixed(&self, name: &str) -> Option<&FixedValue> {
        match self.get(name) {
            Some(FieldValue::Fixed(v)) => Some(v),
            _ => None,
        }
    }

    pub fn integer(&self, name: &str) -> Option<&IntegerValue> {
        match self.get(name) {
            Some(FieldValue::Integer(v)) => Some(v),
            _ => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(FieldValue::Text(v)) | Some(FieldValue::Raw(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn timestamp(&self, name: &str) -> Option<&Timestamp> {
        match self.get(name) {
            Some(FieldValue::Timestamp(v)) => Some(v),
            Some(FieldValue::TimestampedFixed(v)) => Some(&v.timestamp),
            _ => None,
        }
    }

    pub fn timestamped(&self, name: &str) -> Option<&TimestampedFixedValue> {
        match self.get(name) {
            Some(FieldValue::TimestampedFixed(v)) => Some(v),
            _ => None,
        }
    }
}
