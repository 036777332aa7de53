//! Vital map to classifier feature vector.

use thiserror::Error;

use super::classifier::RiskClassifier;
use crate::models::{VitalMap, VitalName};

/// One feature slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Feature {
    Value(f64),
    Missing,
}

/// Ordered feature slots, in classifier attribute order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<Feature>);

impl FeatureVector {
    pub fn new(slots: Vec<Feature>) -> Self {
        Self(slots)
    }

    pub fn slots(&self) -> &[Feature] {
        &self.0
    }

    /// Slot `i`. Slots past the end read as missing.
    pub fn get(&self, i: usize) -> Feature {
        self.0.get(i).copied().unwrap_or(Feature::Missing)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Classifier expects features {expected:?}, builder produces {actual:?}")]
pub struct InvalidFeatureOrderError {
    pub expected: Vec<String>,
    pub actual: Vec<String>,
}

/// Values substituted for vitals that were not extracted, when the model
/// cannot take missing inputs.
///
/// These are population placeholders, not measurements. Every substitution is
/// recorded on the analysis so the model owner can see how often a verdict
/// rests on them.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredDefaults {
    pub blood_sugar: f64,
    pub blood_pressure: f64,
    pub pulse_rate: f64,
    pub cholesterol: f64,
    pub ecg_score: f64,
}

impl DeclaredDefaults {
    pub fn placeholder() -> Self {
        Self {
            blood_sugar: 99.0,
            blood_pressure: 120.0,
            pulse_rate: 80.0,
            cholesterol: 190.0,
            ecg_score: 1.5,
        }
    }

    pub fn get(&self, vital: VitalName) -> f64 {
        match vital {
            VitalName::BloodSugar => self.blood_sugar,
            VitalName::BloodPressure => self.blood_pressure,
            VitalName::PulseRate => self.pulse_rate,
            VitalName::Cholesterol => self.cholesterol,
            VitalName::EcgScore => self.ecg_score,
        }
    }
}

impl Default for DeclaredDefaults {
    fn default() -> Self {
        Self::placeholder()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImputationPolicy {
    /// Missing vitals reach the model as explicit missing markers.
    PassMissing,
    /// Missing vitals are replaced and reported as imputed.
    DeclaredDefaults(DeclaredDefaults),
}

/// Builder output.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltFeatures {
    pub vector: FeatureVector,
    /// Vitals filled from declared defaults.
    pub imputed: Vec<VitalName>,
    /// Vitals passed to the model as missing.
    pub missing: Vec<VitalName>,
}

#[derive(Debug, Clone)]
pub struct FeatureVectorBuilder {
    order: Vec<VitalName>,
    policy: ImputationPolicy,
}

impl FeatureVectorBuilder {
    /// Compiled slot order: the vital order, named by attribute.
    pub const ORDER: [VitalName; 5] = VitalName::ALL;

    /// Check `expected_order` (attribute names) against the compiled order.
    pub fn new(
        expected_order: &[String],
        policy: ImputationPolicy,
    ) -> Result<Self, InvalidFeatureOrderError> {
        let actual: Vec<String> = Self::ORDER
            .iter()
            .map(|v| v.attribute_name().to_string())
            .collect();
        if expected_order != actual.as_slice() {
            return Err(InvalidFeatureOrderError {
                expected: expected_order.to_vec(),
                actual,
            });
        }
        Ok(Self {
            order: Self::ORDER.to_vec(),
            policy,
        })
    }

    /// Builder matched to a loaded classifier. Missing values are passed
    /// through when the model routes them, otherwise `defaults` fill them.
    pub fn for_classifier(
        classifier: &RiskClassifier,
        defaults: DeclaredDefaults,
    ) -> Result<Self, InvalidFeatureOrderError> {
        let policy = if classifier.handles_missing() {
            ImputationPolicy::PassMissing
        } else {
            ImputationPolicy::DeclaredDefaults(defaults)
        };
        Self::new(classifier.feature_names(), policy)
    }

    pub fn policy(&self) -> &ImputationPolicy {
        &self.policy
    }

    pub fn build(&self, vitals: &VitalMap) -> BuiltFeatures {
        let mut slots = Vec::with_capacity(self.order.len());
        let mut imputed = Vec::new();
        let mut missing = Vec::new();

        for &vital in &self.order {
            let slot = match (vitals.value(vital), &self.policy) {
                (Some(v), _) => Feature::Value(v),
                (None, ImputationPolicy::PassMissing) => {
                    missing.push(vital);
                    Feature::Missing
                }
                (None, ImputationPolicy::DeclaredDefaults(defaults)) => {
                    imputed.push(vital);
                    Feature::Value(defaults.get(vital))
                }
            };
            slots.push(slot);
        }

        if !imputed.is_empty() {
            let names: Vec<&str> = imputed.iter().map(|v| v.as_str()).collect();
            tracing::warn!(
                imputed = ?names,
                "Vitals not extracted, using declared defaults"
            );
        }

        BuiltFeatures {
            vector: FeatureVector::new(slots),
            imputed,
            missing,
        }
    }
}
