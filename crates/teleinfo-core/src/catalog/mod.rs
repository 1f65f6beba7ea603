//! Known field catalog and value conversion.
//!
//! The catalog is declarative: each entry names a field and its kind, and a
//! single conversion function dispatches on the kind. Lookups ignore ASCII
//! case so `base` and `BASE` resolve to the same entry. Names missing from
//! the catalog are not errors; callers simply have nothing to convert them
//! to.

pub mod convert;
pub mod error;
pub mod fields;

pub use convert::{SensorValue, convert};
pub use error::ConversionError;
pub use fields::{DeviceClass, FIELD_CATALOG, SensorField, SensorKind, StateClass, Unit};

/// Find a known field by name, ignoring ASCII case.
pub fn lookup(name: &str) -> Option<&'static SensorField> {
    FIELD_CATALOG
        .iter()
        .find(|field| field.name.eq_ignore_ascii_case(name))
}

/// Position of a known field in catalog order.
pub fn position(name: &str) -> Option<usize> {
    FIELD_CATALOG
        .iter()
        .position(|field| field.name.eq_ignore_ascii_case(name))
}

impl SensorField {
    pub fn convert(&self, raw: &str) -> Result<SensorValue, ConversionError> {
        convert(self.kind, raw)
    }
}

#[cfg(test)]
mod tests {
    use super::{FIELD_CATALOG, SensorKind, Unit, lookup, position};

    #[test]
    fn lookup_is_case_insensitive() {
        let upper = lookup("BASE").unwrap();
        let lower = lookup("base").unwrap();
        assert_eq!(upper, lower);
        assert_eq!(upper.kind, SensorKind::IntegerScaledBy1000);
        assert_eq!(upper.unit, Some(Unit::KilowattHour));
    }

    #[test]
    fn unknown_names_are_absent() {
        assert!(lookup("MOTDETAT").is_none());
        assert!(position("").is_none());
    }

    #[test]
    fn catalog_kinds_match_field_families() {
        for name in ["ADCO", "OPTARIF", "PTEC", "HHPHC"] {
            assert_eq!(lookup(name).unwrap().kind, SensorKind::FreeText);
        }
        for name in ["ISOUSC", "IINST", "IMAX", "ADPS", "PAPP"] {
            assert_eq!(lookup(name).unwrap().kind, SensorKind::IntegerCount);
        }
        assert_eq!(lookup("PAPP").unwrap().unit, Some(Unit::VoltAmpere));
        assert_eq!(lookup("iinst").unwrap().unit, Some(Unit::Ampere));
    }

    #[test]
    fn names_are_unique() {
        for (i, field) in FIELD_CATALOG.iter().enumerate() {
            assert_eq!(position(field.name), Some(i));
        }
    }

    #[test]
    fn catalog_serializes_without_empty_metadata() {
        let value = serde_json::to_value(lookup("ADCO").unwrap()).unwrap();
        assert_eq!(value["kind"], "text");
        assert!(value.get("unit").is_none());
        let value = serde_json::to_value(lookup("HCHP").unwrap()).unwrap();
        assert_eq!(value["unit"], "kWh");
        assert_eq!(value["device_class"], "energy");
        assert_eq!(value["state_class"], "total_increasing");
    }
}
