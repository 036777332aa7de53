use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::risk::{RiskLevel, UnrecognizedRiskLabel};
use super::vitals::{VitalMap, VitalName};

/// One uploaded health document and everything derived from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRecord {
    pub id: Uuid,
    pub patient_id: String,
    pub file_name: String,
    pub file_type: Option<String>,
    pub uploaded_at: NaiveDateTime,
    /// Plain text of the source document. Empty when no text could be taken from it.
    pub raw_text: String,
    pub vitals: VitalMap,
    /// Present once the report has been classified. The risk label and the
    /// analysis timestamp live together, so one is never set without the other.
    pub analysis: Option<Analysis>,
    pub annotation: Option<ClinicianAnnotation>,
}

/// Result of the most recent classification run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// Stored label. Written from a `RiskLevel`, but rows written by older model
    /// versions may carry labels that no longer parse.
    pub risk_label: String,
    pub analyzed_at: NaiveDateTime,
    /// Vitals that were filled from declared defaults instead of the report text.
    pub imputed: Vec<VitalName>,
}

impl Analysis {
    pub fn new(level: RiskLevel, analyzed_at: NaiveDateTime, imputed: Vec<VitalName>) -> Self {
        Self {
            risk_label: level.as_str().to_string(),
            analyzed_at,
            imputed,
        }
    }

    pub fn risk_level(&self) -> Result<RiskLevel, UnrecognizedRiskLabel> {
        self.risk_label.parse()
    }
}

/// Reviewer remarks attached to a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicianAnnotation {
    pub remarks: Option<String>,
    pub advice: Option<String>,
    pub author: String,
    pub responded_at: NaiveDateTime,
}

impl ReportRecord {
    /// A freshly uploaded, not yet analyzed report.
    pub fn new_upload(
        patient_id: &str,
        file_name: &str,
        file_type: Option<&str>,
        raw_text: String,
        uploaded_at: NaiveDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id: patient_id.to_string(),
            file_name: file_name.to_string(),
            file_type: file_type.map(str::to_string),
            uploaded_at,
            raw_text,
            vitals: VitalMap::not_found(),
            analysis: None,
            annotation: None,
        }
    }

    pub fn is_analyzed(&self) -> bool {
        self.analysis.is_some()
    }

    pub fn analyzed_at(&self) -> Option<NaiveDateTime> {
        self.analysis.as_ref().map(|a| a.analyzed_at)
    }

    pub fn risk_label(&self) -> Option<&str> {
        self.analysis.as_ref().map(|a| a.risk_label.as_str())
    }

    pub fn is_owned_by(&self, patient_id: &str) -> bool {
        self.patient_id == patient_id
    }

    /// Replace the vital map and analysis in one step.
    #[cfg(test)]
    pub fn record_analysis(&mut self, vitals: VitalMap, analysis: Analysis) {
        self.vitals = vitals;
        self.analysis = Some(analysis);
    }
}
