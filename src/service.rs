//! Report analysis service.
//!
//! `analyze` runs the full pipeline for one stored report:
//! extract vitals, build features, classify, persist, then alert. Persisting
//! comes before alerting and the two are not transactional: a crash in between
//! loses the alert but never the classification.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::alerts::{AlertDispatcher, DispatchOutcome};
use crate::db::{ContactDirectory, DatabaseError, ReportStore};
use crate::insights::{self, RiskSummary, TrendAnalyzer, TrendReport};
use crate::models::{Analysis, ClinicianAnnotation, PatientContact, ReportRecord, RiskLevel};
use crate::pipeline::classifier::RiskClassifier;
use crate::pipeline::features::FeatureVectorBuilder;
use crate::pipeline::vitals::VitalExtractor;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Report not found: {0}")]
    NotFound(Uuid),

    #[error("Storage error: {0}")]
    Store(#[from] DatabaseError),
}

/// Result of one `analyze` run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub level: RiskLevel,
    /// Class probabilities behind `level`.
    pub probabilities: BTreeMap<RiskLevel, f64>,
    pub report: ReportRecord,
    pub alerts: DispatchOutcome,
}

pub struct ReportAnalyzer {
    store: Arc<dyn ReportStore>,
    contacts: Arc<dyn ContactDirectory>,
    extractor: VitalExtractor,
    features: FeatureVectorBuilder,
    classifier: Arc<RiskClassifier>,
    dispatcher: AlertDispatcher,
}

impl ReportAnalyzer {
    pub fn new(
        store: Arc<dyn ReportStore>,
        contacts: Arc<dyn ContactDirectory>,
        extractor: VitalExtractor,
        features: FeatureVectorBuilder,
        classifier: Arc<RiskClassifier>,
        dispatcher: AlertDispatcher,
    ) -> Self {
        Self {
            store,
            contacts,
            extractor,
            features,
            classifier,
            dispatcher,
        }
    }

    /// Store a new, unanalyzed report.
    pub fn ingest(
        &self,
        patient_id: &str,
        file_name: &str,
        file_type: Option<&str>,
        raw_text: String,
    ) -> Result<ReportRecord, DatabaseError> {
        let report = ReportRecord::new_upload(patient_id, file_name, file_type, raw_text, now());
        let saved = self.store.save(&report)?;
        tracing::info!(report_id = %saved.id, patient_id = %saved.patient_id, "Report ingested");
        Ok(saved)
    }

    /// Classify a stored report, persist the result, then alert.
    ///
    /// Re-analysis replaces the previous vitals and analysis and alerts again
    /// if the level still warrants it. Notification failures never surface
    /// here; a persistence failure does, and then no alert is sent.
    pub fn analyze(&self, report_id: &Uuid) -> Result<AnalysisOutcome, AnalysisError> {
        let report = self
            .store
            .find_by_id(report_id)?
            .ok_or(AnalysisError::NotFound(*report_id))?;

        let vitals = self.extractor.extract(&report.raw_text);
        let built = self.features.build(&vitals);
        let prediction = self.classifier.predict(&built.vector);
        let level = prediction.level;

        let analysis = Analysis::new(level, now(), built.imputed);
        let report = self
            .store
            .record_analysis(report_id, &vitals, &analysis)
            .map_err(|e| match e {
                DatabaseError::NotFound { .. } => AnalysisError::NotFound(*report_id),
                e => AnalysisError::Store(e),
            })?;
        tracing::info!(
            report_id = %report.id,
            patient_id = %report.patient_id,
            level = %level,
            missing = built.missing.len(),
            "Report analyzed"
        );

        let alerts = if self.dispatcher.should_alert(level) {
            let contact = match self.contacts.contact_for(&report.patient_id) {
                Ok(contact) => contact,
                Err(e) => {
                    tracing::warn!(patient_id = %report.patient_id, error = %e, "Contact lookup failed");
                    None
                }
            };
            self.dispatcher.dispatch(&report, level, contact.as_ref())
        } else {
            DispatchOutcome::not_attempted()
        };

        Ok(AnalysisOutcome {
            level,
            probabilities: prediction.distribution.into_iter().collect(),
            report,
            alerts,
        })
    }

    pub fn trend(&self, patient_id: &str) -> Result<TrendReport, DatabaseError> {
        let records = self.store.find_by_patient(patient_id)?;
        Ok(TrendAnalyzer::analyze(&records))
    }

    pub fn summary(&self, patient_id: &str) -> Result<RiskSummary, DatabaseError> {
        let records = self.store.find_by_patient(patient_id)?;
        Ok(insights::summarize(&records))
    }

    /// A patient's reports, newest upload first.
    pub fn reports_for(&self, patient_id: &str) -> Result<Vec<ReportRecord>, DatabaseError> {
        let mut records = self.store.find_by_patient(patient_id)?;
        records.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(records)
    }

    /// A report, only if it belongs to `patient_id`. A report owned by someone
    /// else reads the same as a missing one.
    pub fn report_for(
        &self,
        patient_id: &str,
        report_id: &Uuid,
    ) -> Result<Option<ReportRecord>, DatabaseError> {
        let report = self.store.find_by_id(report_id)?;
        Ok(report.filter(|r| r.is_owned_by(patient_id)))
    }

    /// Delete a report owned by `patient_id`. Returns `false` when there is
    /// no such report for that patient.
    pub fn delete(&self, patient_id: &str, report_id: &Uuid) -> Result<bool, DatabaseError> {
        if self.report_for(patient_id, report_id)?.is_none() {
            return Ok(false);
        }
        match self.store.delete(report_id) {
            Ok(()) => {
                tracing::info!(report_id = %report_id, patient_id = %patient_id, "Report deleted");
                Ok(true)
            }
            Err(DatabaseError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub fn annotate(
        &self,
        report_id: &Uuid,
        remarks: Option<String>,
        advice: Option<String>,
        author: &str,
    ) -> Result<ClinicianAnnotation, DatabaseError> {
        let annotation = ClinicianAnnotation {
            remarks,
            advice,
            author: author.to_string(),
            responded_at: now(),
        };
        self.store.annotate(report_id, &annotation)?;
        tracing::info!(report_id = %report_id, author = %author, "Report annotated");
        Ok(annotation)
    }

    pub fn set_contact(&self, contact: &PatientContact) -> Result<(), DatabaseError> {
        self.contacts.set_contact(contact)
    }

    pub fn contact(&self, patient_id: &str) -> Result<Option<PatientContact>, DatabaseError> {
        self.contacts.contact_for(patient_id)
    }

    pub fn alert_threshold(&self) -> RiskLevel {
        self.dispatcher.threshold()
    }
}

fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}
