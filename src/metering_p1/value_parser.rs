use super::structs::{FieldDefinition, FieldValue, FixedValue, IntegerValue, Timestamp, TimestampedFixedValue, ValueShape};
use crate::obis_utils;
use chrono::NaiveDate;
use log::debug;
use thiserror::Error;

/// Why a single field was left out of the record
#[derive(Error, Debug, PartialEq)]
pub enum FieldParseError {
    #[error("Missing (")]
    MissingOpenParenthesis,
    #[error("Missing )")]
    MissingCloseParenthesis,
    #[error("Unexpected data between value groups")]
    UnexpectedData,
    #[error("Expected {expected} value group(s), found {found}")]
    GroupCount { expected: usize, found: usize },
    #[error("Invalid number")]
    InvalidNumber,
    #[error("Too many decimals")]
    TooManyDecimals,
    #[error("Number out of range")]
    Overflow,
    #[error("Missing unit")]
    MissingUnit,
    #[error("Invalid unit {0}")]
    InvalidUnit(String),
    #[error("Invalid string length {0}")]
    InvalidLength(usize),
    #[error("Invalid timestamp")]
    InvalidTimestamp,
}

/// Number of fractional digits a fixed value is stored with
const SCALE_DIGITS: usize = 3;
const SCALE: i64 = 1000;

/// Splits `1-0:1.8.1(000123.456*kWh)` into its identifier and the
/// contents of every parenthesized group
pub fn split_data_line(line: &str) -> Result<(String, Vec<&str>), FieldParseError> {
    let line = line.trim();

    let paren_start = line.find('(')
        .ok_or(FieldParseError::MissingOpenParenthesis)?;
    let identifier = obis_utils::normalize_obis_code(&line[..paren_start]);

    let mut groups = Vec::new();
    let mut rest = &line[paren_start..];
    while !rest.is_empty() {
        if !rest.starts_with('(') {
            return Err(FieldParseError::UnexpectedData);
        }
        let paren_end = rest.find(')')
            .ok_or(FieldParseError::MissingCloseParenthesis)?;
        groups.push(&rest[1..paren_end]);
        rest = rest[paren_end + 1..].trim_start();
    }

    debug!("Parsed data line - Identifier: {}, Groups: {:?}", identifier, groups);
    Ok((identifier, groups))
}

/// Parses the value groups of one data line into the shape the field is registered with
pub fn parse_value(definition: &FieldDefinition, groups: &[&str]) -> Result<FieldValue, FieldParseError> {
    match definition.shape {
        ValueShape::FixedValue => {
            let token = single_group(groups)?;
            Ok(FieldValue::Fixed(parse_fixed(definition, token)?))
        }
        ValueShape::Integer => {
            let token = single_group(groups)?;
            Ok(FieldValue::Integer(parse_integer(definition, token)?))
        }
        ValueShape::String => {
            let token = single_group(groups)?;
            Ok(FieldValue::Text(parse_string(definition, token)?))
        }
        ValueShape::Timestamp => {
            let token = single_group(groups)?;
            Ok(FieldValue::Timestamp(parse_timestamp(token)?))
        }
        ValueShape::TimestampedFixedValue => {
            if groups.len() != 2 {
                return Err(FieldParseError::GroupCount { expected: 2, found: groups.len() });
            }
            let timestamp = parse_timestamp(groups[0])?;
            let value = parse_fixed(definition, groups[1])?;
            Ok(FieldValue::TimestampedFixed(TimestampedFixedValue { timestamp, value }))
        }
        ValueShape::Raw => {
            Ok(FieldValue::Raw(groups.iter().map(|g| format!("({})", g)).collect()))
        }
    }
}

fn single_group<'a>(groups: &[&'a str]) -> Result<&'a str, FieldParseError> {
    match groups {
        [token] => Ok(*token),
        _ => Err(FieldParseError::GroupCount { expected: 1, found: groups.len() }),
    }
}

/* Splits "00.424*kW" into number and unit */
fn split_unit(token: &str) -> (&str, Option<&str>) {
    match token.split_once('*') {
        Some((number, unit)) => (number, Some(unit)),
        None => (token, None),
    }
}

/// Parses a decimal literal into thousandths, accepting at most three decimals
fn parse_decimal(literal: &str) -> Result<i64, FieldParseError> {
    let (negative, digits) = match literal.as_bytes().first() {
        Some(b'-') => (true, &literal[1..]),
        Some(b'+') => (false, &literal[1..]),
        _ => (false, literal),
    };

    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, f),
        None => (digits, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(FieldParseError::InvalidNumber);
    }
    if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(FieldParseError::InvalidNumber);
    }
    if frac_part.len() > SCALE_DIGITS {
        return Err(FieldParseError::TooManyDecimals);
    }

    let mut value: i64 = 0;
    for b in int_part.bytes() {
        value = value.checked_mul(10)
            .and_then(|v| v.checked_add((b - b'0') as i64))
            .ok_or(FieldParseError::Overflow)?;
    }
    value = value.checked_mul(SCALE).ok_or(FieldParseError::Overflow)?;

    let mut weight = SCALE / 10;
    for b in frac_part.bytes() {
        value = value.checked_add((b - b'0') as i64 * weight)
            .ok_or(FieldParseError::Overflow)?;
        weight /= 10;
    }

    Ok(if negative { -value } else { value })
}

fn parse_whole(literal: &str) -> Result<i64, FieldParseError> {
    let digits = literal.strip_prefix(['-', '+']).unwrap_or(literal);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FieldParseError::InvalidNumber);
    }
    literal.parse::<i64>().map_err(|_| FieldParseError::Overflow)
}

/// Parses `00.424*kW` for a field in kW. The same field given in its integer
/// unit (`424*W`) yields the same value.
pub fn parse_fixed(definition: &FieldDefinition, token: &str) -> Result<FixedValue, FieldParseError> {
    let (number, unit) = split_unit(token);
    let unit = unit.ok_or(FieldParseError::MissingUnit)?;
    let expected = definition.unit.unwrap_or("");

    if unit.eq_ignore_ascii_case(expected) {
        return Ok(FixedValue { milli: parse_decimal(number)?, unit: expected });
    }

    match definition.int_unit {
        Some(int_unit) if unit.eq_ignore_ascii_case(int_unit) => {
            Ok(FixedValue { milli: parse_whole(number)?, unit: expected })
        }
        _ => Err(FieldParseError::InvalidUnit(unit.to_string())),
    }
}

pub fn parse_integer(definition: &FieldDefinition, token: &str) -> Result<IntegerValue, FieldParseError> {
    let (number, unit) = split_unit(token);
    match (definition.unit, unit) {
        (Some(expected), Some(unit)) if unit.eq_ignore_ascii_case(expected) => {}
        (Some(_), None) => return Err(FieldParseError::MissingUnit),
        (None, None) => {}
        (_, Some(unit)) => return Err(FieldParseError::InvalidUnit(unit.to_string())),
    }

    Ok(IntegerValue { value: parse_whole(number)?, unit: definition.unit })
}

pub fn parse_string(definition: &FieldDefinition, token: &str) -> Result<String, FieldParseError> {
    let len = token.chars().count();
    if len < definition.min_len || len > definition.max_len {
        return Err(FieldParseError::InvalidLength(len));
    }
    Ok(token.to_string())
}

/// Parses `YYMMDDhhmmssX`, X being S during summer time and W otherwise
pub fn parse_timestamp(token: &str) -> Result<Timestamp, FieldParseError> {
    let bytes = token.as_bytes();
    if bytes.len() != 13 || !bytes[..12].iter().all(|b| b.is_ascii_digit()) {
        return Err(FieldParseError::InvalidTimestamp);
    }

    let dst = match bytes[12] {
        b'S' => true,
        b'W' => false,
        _ => return Err(FieldParseError::InvalidTimestamp),
    };

    let pair = |i: usize| ((bytes[i] - b'0') as u32) * 10 + (bytes[i + 1] - b'0') as u32;
    let local = NaiveDate::from_ymd_opt(2000 + pair(0) as i32, pair(2), pair(4))
        .and_then(|date| date.and_hms_opt(pair(6), pair(8), pair(10)))
        .ok_or(FieldParseError::InvalidTimestamp)?;

    Ok(Timestamp { local, dst })
}
