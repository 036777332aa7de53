use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The vitals the risk model consumes. Declaration order is the feature slot order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VitalName {
    BloodSugar,
    BloodPressure,
    PulseRate,
    Cholesterol,
    EcgScore,
}

impl VitalName {
    pub const ALL: [VitalName; 5] = [
        VitalName::BloodSugar,
        VitalName::BloodPressure,
        VitalName::PulseRate,
        VitalName::Cholesterol,
        VitalName::EcgScore,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VitalName::BloodSugar => "bloodSugar",
            VitalName::BloodPressure => "bloodPressure",
            VitalName::PulseRate => "pulseRate",
            VitalName::Cholesterol => "cholesterol",
            VitalName::EcgScore => "ecgScore",
        }
    }

    /// Attribute name used by the model schema.
    pub fn attribute_name(self) -> &'static str {
        match self {
            VitalName::BloodSugar => "blood_sugar",
            VitalName::BloodPressure => "blood_pressure",
            VitalName::PulseRate => "pulse_rate",
            VitalName::Cholesterol => "cholesterol",
            VitalName::EcgScore => "ecg_score",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            VitalName::BloodSugar => "mg/dL",
            VitalName::BloodPressure => "mmHg",
            VitalName::PulseRate => "bpm",
            VitalName::Cholesterol => "mg/dL",
            VitalName::EcgScore => "score",
        }
    }
}

/// Outcome of extracting one vital from report text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum VitalValue {
    Measured(f64),
    /// An extraction rule exists but the text did not match it.
    NotFound,
    /// No extraction rule is defined for this vital; only a declared default can fill it.
    NoRule,
}

impl VitalValue {
    pub fn measured(self) -> Option<f64> {
        match self {
            VitalValue::Measured(v) => Some(v),
            VitalValue::NotFound | VitalValue::NoRule => None,
        }
    }

    pub fn is_missing(self) -> bool {
        self.measured().is_none()
    }
}

/// Complete vital map for one report. Every vital always has an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VitalMap(BTreeMap<VitalName, VitalValue>);

impl VitalMap {
    /// Map with every vital marked `NotFound`.
    pub fn not_found() -> Self {
        Self(VitalName::ALL.iter().map(|v| (*v, VitalValue::NotFound)).collect())
    }

    pub fn set(&mut self, name: VitalName, value: VitalValue) {
        self.0.insert(name, value);
    }

    pub fn get(&self, name: VitalName) -> VitalValue {
        self.0.get(&name).copied().unwrap_or(VitalValue::NotFound)
    }

    pub fn value(&self, name: VitalName) -> Option<f64> {
        self.get(name).measured()
    }

    /// Vitals without a measured value, in slot order.
    pub fn missing(&self) -> Vec<VitalName> {
        VitalName::ALL
            .iter()
            .copied()
            .filter(|v| self.get(*v).is_missing())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (VitalName, VitalValue)> + '_ {
        VitalName::ALL.iter().map(|v| (*v, self.get(*v)))
    }
}

impl Default for VitalMap {
    fn default() -> Self {
        Self::not_found()
    }
}
