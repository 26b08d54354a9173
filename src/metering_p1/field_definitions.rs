use super::structs::{FieldDefinition, FieldSpec, ValueShape};
use crate::obis_utils::{self, ObisCode};
use lazy_static::lazy_static;
use std::collections::HashMap;

const fn fixed(name: &'static str, obis: &'static str, unit: &'static str, int_unit: &'static str, description: &'static str) -> FieldDefinition {
    FieldDefinition { name, obis, shape: ValueShape::FixedValue, unit: Some(unit), int_unit: Some(int_unit), min_len: 0, max_len: 0, description }
}

const fn integer(name: &'static str, obis: &'static str, unit: Option<&'static str>, description: &'static str) -> FieldDefinition {
    FieldDefinition { name, obis, shape: ValueShape::Integer, unit, int_unit: None, min_len: 0, max_len: 0, description }
}

const fn string(name: &'static str, obis: &'static str, min_len: usize, max_len: usize, description: &'static str) -> FieldDefinition {
    FieldDefinition { name, obis, shape: ValueShape::String, unit: None, int_unit: None, min_len, max_len, description }
}

const fn timestamp(name: &'static str, obis: &'static str, description: &'static str) -> FieldDefinition {
    FieldDefinition { name, obis, shape: ValueShape::Timestamp, unit: None, int_unit: None, min_len: 0, max_len: 0, description }
}

const fn timestamped(name: &'static str, obis: &'static str, unit: &'static str, int_unit: &'static str, description: &'static str) -> FieldDefinition {
    FieldDefinition { name, obis, shape: ValueShape::TimestampedFixedValue, unit: Some(unit), int_unit: Some(int_unit), min_len: 0, max_len: 0, description }
}

const fn raw(name: &'static str, obis: &'static str, description: &'static str) -> FieldDefinition {
    FieldDefinition { name, obis, shape: ValueShape::Raw, unit: None, int_unit: None, min_len: 0, max_len: 0, description }
}

/// Name of the field carried by the header line instead of a data line
pub const IDENTIFICATION: &str = "identification";

/// Every field the decoder has a parser for.
/// Sub-meters on the M-Bus use channel 1 for gas, 2 thermal, 3 water and 4 for a slave meter.
pub static FIELDS: &[FieldDefinition] = &[
    string(IDENTIFICATION, "", 0, 96, "Meter identification header"),
    string("p1_version", "1-3:0.2.8", 2, 2, "P1 protocol version"),
    string("p1_version_be", "0-0:96.1.4", 2, 96, "P1 protocol version (Belgium)"),
    timestamp("timestamp", "0-0:1.0.0", "Date and time"),
    string("equipment_id", "0-0:96.1.1", 0, 96, "Equipment identifier"),

    // Energy values
    fixed("energy_delivered_lux", "1-0:1.8.0", "kWh", "Wh", "Active energy + (total)"),
    fixed("energy_delivered_tariff1", "1-0:1.8.1", "kWh", "Wh", "Active energy + (tariff 1)"),
    fixed("energy_delivered_tariff2", "1-0:1.8.2", "kWh", "Wh", "Active energy + (tariff 2)"),
    fixed("energy_returned_lux", "1-0:2.8.0", "kWh", "Wh", "Active energy - (total)"),
    fixed("energy_returned_tariff1", "1-0:2.8.1", "kWh", "Wh", "Active energy - (tariff 1)"),
    fixed("energy_returned_tariff2", "1-0:2.8.2", "kWh", "Wh", "Active energy - (tariff 2)"),
    fixed("total_imported_energy", "1-0:3.8.0", "kvarh", "varh", "Reactive energy + (total)"),
    fixed("total_exported_energy", "1-0:4.8.0", "kvarh", "varh", "Reactive energy - (total)"),
    string("electricity_tariff", "0-0:96.14.0", 4, 4, "Tariff indicator"),

    // Power values
    fixed("power_delivered", "1-0:1.7.0", "kW", "W", "Active power + (total)"),
    fixed("power_returned", "1-0:2.7.0", "kW", "W", "Active power - (total)"),
    fixed("reactive_power_delivered", "1-0:3.7.0", "kvar", "var", "Reactive power + (total)"),
    fixed("reactive_power_returned", "1-0:4.7.0", "kvar", "var", "Reactive power - (total)"),
    fixed("electricity_threshold", "0-0:17.0.0", "kW", "W", "Actual threshold"),
    integer("electricity_switch_position", "0-0:96.3.10", None, "Breaker state"),

    // Power quality
    integer("electricity_failures", "0-0:96.7.21", None, "Number of power failures"),
    integer("electricity_long_failures", "0-0:96.7.9", None, "Number of long power failures"),
    raw("electricity_failure_log", "1-0:99.97.0", "Power failure event log"),
    integer("electricity_sags_l1", "1-0:32.32.0", None, "Number of voltage sags (L1)"),
    integer("electricity_sags_l2", "1-0:52.32.0", None, "Number of voltage sags (L2)"),
    integer("electricity_sags_l3", "1-0:72.32.0", None, "Number of voltage sags (L3)"),
    integer("electricity_swells_l1", "1-0:32.36.0", None, "Number of voltage swells (L1)"),
    integer("electricity_swells_l2", "1-0:52.36.0", None, "Number of voltage swells (L2)"),
    integer("electricity_swells_l3", "1-0:72.36.0", None, "Number of voltage swells (L3)"),

    // Text messages
    string("message_short", "0-0:96.13.1", 0, 16, "Text message code"),
    string("message_long", "0-0:96.13.0", 0, 2048, "Text message"),

    // Per phase values
    fixed("voltage_l1", "1-0:32.7.0", "V", "mV", "Voltage (L1)"),
    fixed("voltage_l2", "1-0:52.7.0", "V", "mV", "Voltage (L2)"),
    fixed("voltage_l3", "1-0:72.7.0", "V", "mV", "Voltage (L3)"),
    integer("current_l1", "1-0:31.7.0", Some("A"), "Current (L1)"),
    integer("current_l2", "1-0:51.7.0", Some("A"), "Current (L2)"),
    integer("current_l3", "1-0:71.7.0", Some("A"), "Current (L3)"),
    fixed("power_delivered_l1", "1-0:21.7.0", "kW", "W", "Active power + (L1)"),
    fixed("power_delivered_l2", "1-0:41.7.0", "kW", "W", "Active power + (L2)"),
    fixed("power_delivered_l3", "1-0:61.7.0", "kW", "W", "Active power + (L3)"),
    fixed("power_returned_l1", "1-0:22.7.0", "kW", "W", "Active power - (L1)"),
    fixed("power_returned_l2", "1-0:42.7.0", "kW", "W", "Active power - (L2)"),
    fixed("power_returned_l3", "1-0:62.7.0", "kW", "W", "Active power - (L3)"),

    // M-Bus channel 1
    integer("gas_device_type", "0-1:24.1.0", None, "Gas meter device type"),
    string("gas_equipment_id", "0-1:96.1.0", 0, 96, "Gas meter equipment identifier"),
    string("gas_equipment_id_be", "0-1:96.1.1", 0, 96, "Gas meter equipment identifier (Belgium)"),
    integer("gas_valve_position", "0-1:24.4.0", None, "Gas valve position"),
    timestamped("gas_delivered", "0-1:24.2.1", "m3", "dm3", "Gas delivered"),
    timestamped("gas_delivered_be", "0-1:24.2.3", "m3", "dm3", "Gas delivered (Belgium)"),

    // M-Bus channel 2
    integer("thermal_device_type", "0-2:24.1.0", None, "Thermal meter device type"),
    string("thermal_equipment_id", "0-2:96.1.0", 0, 96, "Thermal meter equipment identifier"),
    integer("thermal_valve_position", "0-2:24.4.0", None, "Thermal valve position"),
    timestamped("thermal_delivered", "0-2:24.2.1", "GJ", "MJ", "Thermal energy delivered"),

    // M-Bus channel 3
    integer("water_device_type", "0-3:24.1.0", None, "Water meter device type"),
    string("water_equipment_id", "0-3:96.1.0", 0, 96, "Water meter equipment identifier"),
    integer("water_valve_position", "0-3:24.4.0", None, "Water valve position"),
    timestamped("water_delivered", "0-3:24.2.1", "m3", "dm3", "Water delivered"),

    // M-Bus channel 4
    integer("slave_device_type", "0-4:24.1.0", None, "Slave meter device type"),
    string("slave_equipment_id", "0-4:96.1.0", 0, 96, "Slave meter equipment identifier"),
    integer("slave_valve_position", "0-4:24.4.0", None, "Slave valve position"),
    timestamped("slave_delivered", "0-4:24.2.1", "m3", "dm3", "Slave meter delivered"),
];

lazy_static! {
    /* Both the OBIS code and the field name identify a field on a data line.
       Fields without a code only come from the header line. */
    static ref IDENTIFIERS: HashMap<&'static str, &'static FieldDefinition> = {
        let mut map = HashMap::new();
        for definition in FIELDS.iter().filter(|definition| !definition.obis.is_empty()) {
            map.insert(definition.name, definition);
            map.insert(definition.obis, definition);
        }
        map
    };
}

pub fn find_by_name(name: &str) -> Option<&'static FieldDefinition> {
    FIELDS.iter().find(|definition| definition.name == name)
}

pub fn find_by_obis(code: &str) -> Option<&'static FieldDefinition> {
    if code.is_empty() {
        return None;
    }
    FIELDS.iter().find(|definition| definition.obis == code)
}

/// Resolves the identifier of a data line. A storage group (`*255`) some
/// meters append is ignored.
pub fn find_field(identifier: &str) -> Option<&'static FieldDefinition> {
    let identifier = obis_utils::normalize_obis_code(identifier);
    if let Some(definition) = IDENTIFIERS.get(identifier.as_str()) {
        return Some(*definition);
    }

    match identifier.parse::<ObisCode>() {
        Ok(code) if code.f.is_some() => {
            let code = ObisCode { f: None, ..code };
            IDENTIFIERS.get(code.to_string().as_str()).copied()
        }
        _ => None,
    }
}

/// The default selection shipped with the decoder
pub fn standard_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new("energy_delivered_tariff1", ValueShape::FixedValue),
        FieldSpec::new("energy_delivered_tariff2", ValueShape::FixedValue),
        FieldSpec::new("electricity_tariff", ValueShape::String),
        FieldSpec::new("power_delivered", ValueShape::FixedValue),
        FieldSpec::new("gas_delivered", ValueShape::TimestampedFixedValue),
    ]
}

/// Every registered field with its registered shape
pub fn all_fields() -> Vec<FieldSpec> {
    FIELDS.iter()
        .map(|definition| FieldSpec::new(definition.name, definition.shape))
        .collect()
}

pub fn create_example_telegrams() -> HashMap<String, String> {
    let mut examples = HashMap::new();

    // DSMR 4.2 Kaifa meter with gas meter on channel 1, checksum included
    let dsmr42 = [
        "/KFM5KAIFA-METER",
        "",
        "1-3:0.2.8(42)",
        "0-0:1.0.0(161113205757W)",
        "0-0:96.1.1(3960221976967177082151037881335713)",
        "1-0:1.8.1(001581.123*kWh)",
        "1-0:1.8.2(001435.706*kWh)",
        "1-0:2.8.1(000000.000*kWh)",
        "1-0:2.8.2(000000.000*kWh)",
        "0-0:96.14.0(0002)",
        "1-0:1.7.0(02.027*kW)",
        "1-0:2.7.0(00.000*kW)",
        "0-0:96.7.21(00015)",
        "0-0:96.7.9(00007)",
        "1-0:99.97.0(3)(0-0:96.7.19)(000104180320W)(0000237126*s)(000101000001W)(2147583646*s)(000102000003W)(2317482647*s)",
        "1-0:32.32.0(00000)",
        "1-0:52.32.0(00000)",
        "1-0:72.32.0(00000)",
        "1-0:32.36.0(00000)",
        "1-0:52.36.0(00000)",
        "1-0:72.36.0(00000)",
        "0-0:96.13.1()",
        "0-0:96.13.0()",
        "1-0:31.7.0(000*A)",
        "1-0:51.7.0(006*A)",
        "1-0:71.7.0(002*A)",
        "1-0:21.7.0(00.170*kW)",
        "1-0:22.7.0(00.000*kW)",
        "1-0:41.7.0(01.247*kW)",
        "1-0:42.7.0(00.000*kW)",
        "1-0:61.7.0(00.209*kW)",
        "1-0:62.7.0(00.000*kW)",
        "0-1:24.1.0(003)",
        "0-1:96.1.0(4819243993373755377509728609491464)",
        "0-1:24.2.1(161129200000W)(00981.443*m3)",
        "!6796",
        "",
    ].join("\r\n");
    examples.insert("KAIFA_DSMR42".to_string(), dsmr42);

    // DSMR 2.2 meter, no checksum line
    let dsmr22 = [
        "/ISk5\\2ME382-1003",
        "",
        "0-0:96.1.1(4B413650303035303331303033373133)",
        "1-0:1.8.1(00245.123*kWh)",
        "1-0:1.8.2(00188.456*kWh)",
        "1-0:2.8.1(00000.000*kWh)",
        "1-0:2.8.2(00000.000*kWh)",
        "0-0:96.14.0(0001)",
        "1-0:1.7.0(0000.55*kW)",
        "1-0:2.7.0(0000.00*kW)",
        "0-0:17.0.0(0999.00*kW)",
        "0-0:96.3.10(1)",
        "0-0:96.13.1()",
        "0-0:96.13.0()",
        "!",
        "",
    ].join("\r\n");
    examples.insert("ISKRA_DSMR22".to_string(), dsmr22);

    examples
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_registry_obis_codes_are_valid() {
        for definition in FIELDS {
            if definition.name == IDENTIFICATION {
                assert!(definition.obis.is_empty());
                continue;
            }
            assert!(obis_utils::validate_obis_code(definition.obis), "{} has invalid code {}", definition.name, definition.obis);
        }
    }

    #[test]
    fn test_registry_has_unique_identifiers() {
        let mut names = HashSet::new();
        let mut codes = HashSet::new();
        for definition in FIELDS {
            assert!(names.insert(definition.name), "duplicate name {}", definition.name);
            if !definition.obis.is_empty() {
                assert!(codes.insert(definition.obis), "duplicate code {}", definition.obis);
            }
        }
    }

    #[test]
    fn test_registry_units_match_shape() {
        for definition in FIELDS {
            match definition.shape {
                ValueShape::FixedValue | ValueShape::TimestampedFixedValue => {
                    assert!(definition.unit.is_some() && definition.int_unit.is_some(), "{}", definition.name);
                }
                ValueShape::String => assert!(definition.min_len <= definition.max_len, "{}", definition.name),
                _ => assert!(definition.int_unit.is_none(), "{}", definition.name),
            }
        }
    }

    #[test]
    fn test_find_field() {
        let definition = find_field("1-0:1.7.0").unwrap();
        assert_eq!(definition.name, "power_delivered");
        assert_eq!(definition.unit, Some("kW"));

        assert_eq!(find_field("power_delivered").unwrap().obis, "1-0:1.7.0");
        assert_eq!(find_field(" 0-1:24.2.1 ").unwrap().name, "gas_delivered");
        assert_eq!(find_field("1-0:1.8.1*255").unwrap().name, "energy_delivered_tariff1");
        assert!(find_field("1-0:99.99.99").is_none());
        assert!(find_field("").is_none());
    }

    #[test]
    fn test_header_field_not_found_on_data_lines() {
        assert!(find_by_name(IDENTIFICATION).is_some());
        assert!(find_field(IDENTIFICATION).is_none());
    }

    #[test]
    fn test_find_by_name_and_obis() {
        assert_eq!(find_by_name("electricity_tariff").unwrap().shape, ValueShape::String);
        assert!(find_by_name("0-0:96.14.0").is_none());
        assert_eq!(find_by_obis("0-0:96.14.0").unwrap().name, "electricity_tariff");
        assert!(find_by_obis("").is_none());
    }

    #[test]
    fn test_standard_fields_are_registered() {
        let fields = standard_fields();
        assert_eq!(fields.len(), 5);
        for spec in fields {
            let definition = find_by_name(&spec.name).unwrap();
            assert_eq!(definition.shape, spec.shape);
        }
    }

    #[test]
    fn test_example_telegrams() {
        let examples = create_example_telegrams();
        assert!(examples.contains_key("KAIFA_DSMR42"));
        assert!(examples.contains_key("ISKRA_DSMR22"));

        let kaifa = examples.get("KAIFA_DSMR42").unwrap();
        assert!(kaifa.starts_with("/KFM5KAIFA-METER\r\n"));
        assert!(kaifa.ends_with("!6796\r\n"));
    }
}
