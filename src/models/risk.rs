use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ordered risk classification. Variant order is the clinical severity order,
/// so the derived `Ord` gives NORMAL < MODERATE < HIGH < CRITICAL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Normal,
    Moderate,
    High,
    Critical,
}

/// A stored or model-produced label that does not name a known risk level.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unrecognized risk label: {0}")]
pub struct UnrecognizedRiskLabel(pub String);

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Normal,
        RiskLevel::Moderate,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Normal => "NORMAL",
            RiskLevel::Moderate => "MODERATE",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }

    /// Whether this level is at or above `threshold`.
    pub fn reaches(self, threshold: RiskLevel) -> bool {
        self >= threshold
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = UnrecognizedRiskLabel;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NORMAL" => Ok(RiskLevel::Normal),
            "MODERATE" => Ok(RiskLevel::Moderate),
            "HIGH" => Ok(RiskLevel::High),
            "CRITICAL" => Ok(RiskLevel::Critical),
            _ => Err(UnrecognizedRiskLabel(s.to_string())),
        }
    }
}
