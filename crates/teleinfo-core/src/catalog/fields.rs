use std::fmt;

use serde::{Deserialize, Serialize};

/// How a field's raw payload is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorKind {
    #[serde(rename = "text")]
    FreeText,
    #[serde(rename = "count")]
    IntegerCount,
    #[serde(rename = "scaled_1000")]
    IntegerScaledBy1000,
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SensorKind::FreeText => "text",
            SensorKind::IntegerCount => "count",
            SensorKind::IntegerScaledBy1000 => "scaled_1000",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "kWh")]
    KilowattHour,
    #[serde(rename = "A")]
    Ampere,
    #[serde(rename = "VA")]
    VoltAmpere,
}

impl Unit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::KilowattHour => "kWh",
            Unit::Ampere => "A",
            Unit::VoltAmpere => "VA",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Energy,
    Current,
    ApparentPower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    TotalIncreasing,
    Measurement,
}

/// Static description of a known Teleinfo field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SensorField {
    pub name: &'static str,
    pub kind: SensorKind,
    pub label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<DeviceClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_class: Option<StateClass>,
}

const fn info(name: &'static str, label: &'static str) -> SensorField {
    SensorField {
        name,
        kind: SensorKind::FreeText,
        label,
        unit: None,
        device_class: None,
        state_class: None,
    }
}

const fn index(name: &'static str, label: &'static str) -> SensorField {
    SensorField {
        name,
        kind: SensorKind::IntegerScaledBy1000,
        label,
        unit: Some(Unit::KilowattHour),
        device_class: Some(DeviceClass::Energy),
        state_class: Some(StateClass::TotalIncreasing),
    }
}

const fn current(name: &'static str, label: &'static str) -> SensorField {
    SensorField {
        name,
        kind: SensorKind::IntegerCount,
        label,
        unit: Some(Unit::Ampere),
        device_class: Some(DeviceClass::Current),
        state_class: Some(StateClass::Measurement),
    }
}

const fn power(name: &'static str, label: &'static str) -> SensorField {
    SensorField {
        name,
        kind: SensorKind::IntegerCount,
        label,
        unit: Some(Unit::VoltAmpere),
        device_class: Some(DeviceClass::ApparentPower),
        state_class: Some(StateClass::Measurement),
    }
}

/// Known fields, in presentation order.
pub static FIELD_CATALOG: [SensorField; 12] = [
    info("ADCO", "Adresse d'identification"),
    info("OPTARIF", "Option tarifaire"),
    info("PTEC", "Période tarifaire en cours"),
    info("HHPHC", "Horaire HP/HC"),
    index("BASE", "Index option Base"),
    index("HCHC", "Index option Heure Creuse"),
    index("HCHP", "Index option Heure Pleine"),
    current("ISOUSC", "Intensité souscrite"),
    current("IINST", "Intensité instantanée"),
    current("IMAX", "Intensité maximale"),
    current("ADPS", "Avertissement de dépassement"),
    power("PAPP", "Puissance apparente"),
];
