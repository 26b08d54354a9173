use super::field_definitions;
use super::structs::{FieldDefinition, FieldSpec};
use crate::config::ConfigError;
use log::debug;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct ManifestEntry {
    pub spec: FieldSpec,
    pub definition: &'static FieldDefinition,
}

/// Validated field selection, fixed before the first telegram is decoded
#[derive(Debug, Clone)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
    index: HashMap<&'static str, usize>,
}

impl Manifest {
    pub fn new(specs: Vec<FieldSpec>) -> Result<Self, ConfigError> {
        if specs.is_empty() {
            return Err(ConfigError::EmptyManifest);
        }

        let mut entries = Vec::with_capacity(specs.len());
        let mut index = HashMap::new();
        for spec in specs {
            let definition = field_definitions::find_by_name(&spec.name)
                .ok_or_else(|| ConfigError::UnknownField(spec.name.clone()))?;

            if definition.shape != spec.shape {
                return Err(ConfigError::ShapeMismatch {
                    name: spec.name,
                    declared: spec.shape,
                    expected: definition.shape,
                });
            }

            if index.insert(definition.name, entries.len()).is_some() {
                return Err(ConfigError::DuplicateField(spec.name));
            }

            debug!("Selected field {} ({:?}) {}: {}", definition.name, definition.shape, definition.obis, definition.description);
            entries.push(ManifestEntry { spec, definition });
        }

        Ok(Manifest { entries, index })
    }

    /// The five fields the decoder extracts when nothing else is configured
    pub fn standard() -> Self {
        /* standard_fields() is a fixed table, kept in step with the registry by test_standard_matches_validated */
        let entries: Vec<ManifestEntry> = field_definitions::standard_fields()
            .into_iter()
            .filter_map(|spec| {
                field_definitions::find_by_name(&spec.name)
                    .map(|definition| ManifestEntry { spec, definition })
            })
            .collect();
        let index = entries.iter()
            .enumerate()
            .map(|(i, entry)| (entry.definition.name, i))
            .collect();
        Manifest { entries, index }
    }

    pub fn get(&self, name: &str) -> Option<&ManifestEntry> {
        self.index.get(name).map(|i| &self.entries[*i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metering_p1::structs::ValueShape;

    #[test]
    fn test_standard_manifest() {
        let manifest = Manifest::standard();
        assert_eq!(manifest.len(), 5);
        assert!(manifest.contains("gas_delivered"));
        assert!(!manifest.contains("power_returned"));
        assert_eq!(manifest.get("electricity_tariff").unwrap().definition.obis, "0-0:96.14.0");

        let names: Vec<&str> = manifest.iter().map(|e| e.definition.name).collect();
        assert_eq!(names[0], "energy_delivered_tariff1");
        assert_eq!(names[4], "gas_delivered");
    }

    #[test]
    fn test_standard_matches_validated() {
        let validated = Manifest::new(field_definitions::standard_fields()).unwrap();
        let standard = Manifest::standard();
        assert_eq!(validated.len(), field_definitions::standard_fields().len());
        assert_eq!(validated.len(), standard.len());
        for (a, b) in validated.iter().zip(standard.iter()) {
            assert_eq!(a.spec, b.spec);
            assert_eq!(a.definition, b.definition);
        }
    }

    #[test]
    fn test_all_fields_validate() {
        let manifest = Manifest::new(field_definitions::all_fields()).unwrap();
        assert_eq!(manifest.len(), field_definitions::FIELDS.len());
    }

    #[test]
    fn test_every_field_is_described() {
        for entry in Manifest::new(field_definitions::all_fields()).unwrap().iter() {
            assert!(!entry.definition.description.is_empty(), "{}", entry.definition.name);
        }
    }

    #[test]
    fn test_empty_manifest() {
        assert!(matches!(Manifest::new(vec![]), Err(ConfigError::EmptyManifest)));
    }

    #[test]
    fn test_unknown_field() {
        let result = Manifest::new(vec![FieldSpec::new("power_delivered_l9", ValueShape::FixedValue)]);
        assert!(matches!(result, Err(ConfigError::UnknownField(name)) if name == "power_delivered_l9"));
    }

    #[test]
    fn test_shape_mismatch() {
        let result = Manifest::new(vec![FieldSpec::new("electricity_tariff", ValueShape::FixedValue)]);
        match result {
            Err(ConfigError::ShapeMismatch { name, declared, expected }) => {
                assert_eq!(name, "electricity_tariff");
                assert_eq!(declared, ValueShape::FixedValue);
                assert_eq!(expected, ValueShape::String);
            }
            _ => panic!("expected a shape mismatch"),
        }
    }

    #[test]
    fn test_duplicate_field() {
        let result = Manifest::new(vec![
            FieldSpec::new("power_delivered", ValueShape::FixedValue),
            FieldSpec::new("power_delivered", ValueShape::FixedValue).mandatory(),
        ]);
        assert!(matches!(result, Err(ConfigError::DuplicateField(name)) if name == "power_delivered"));
    }
}
