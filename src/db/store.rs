//! Persistence seams consumed by the analysis service.
//!
//! `ReportStore` and `ContactDirectory` are the only way the service touches
//! storage. `SqliteStore` implements both over one serialized connection.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use uuid::Uuid;

use super::repository;
use super::sqlite::{open_database, open_memory_database};
use super::DatabaseError;
use crate::models::{Analysis, ClinicianAnnotation, PatientContact, ReportRecord, VitalMap};

/// Report persistence.
pub trait ReportStore: Send + Sync {
    /// Insert or update a report and return the stored state.
    fn save(&self, report: &ReportRecord) -> Result<ReportRecord, DatabaseError>;

    fn find_by_id(&self, id: &Uuid) -> Result<Option<ReportRecord>, DatabaseError>;

    /// Replace the vitals and analysis of a stored report and return its
    /// current state. Source fields and the annotation are not written.
    fn record_analysis(
        &self,
        id: &Uuid,
        vitals: &VitalMap,
        analysis: &Analysis,
    ) -> Result<ReportRecord, DatabaseError>;

    /// All reports of a patient. No ordering guarantee; callers sort.
    fn find_by_patient(&self, patient_id: &str) -> Result<Vec<ReportRecord>, DatabaseError>;

    fn delete(&self, id: &Uuid) -> Result<(), DatabaseError>;

    fn annotate(&self, id: &Uuid, annotation: &ClinicianAnnotation) -> Result<(), DatabaseError>;
}

/// Alert address lookup.
pub trait ContactDirectory: Send + Sync {
    fn contact_for(&self, patient_id: &str) -> Result<Option<PatientContact>, DatabaseError>;

    fn set_contact(&self, contact: &PatientContact) -> Result<(), DatabaseError>;
}

/// SQLite-backed store. `rusqlite::Connection` is not `Sync`, so access is
/// serialized behind a mutex.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(open_database(path)?))
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(open_memory_database()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }
}

impl ReportStore for SqliteStore {
    fn save(&self, report: &ReportRecord) -> Result<ReportRecord, DatabaseError> {
        let conn = self.conn()?;
        repository::upsert_report(&conn, report)?;
        repository::get_report(&conn, &report.id)?.ok_or_else(|| DatabaseError::NotFound {
            entity_type: "report".into(),
            id: report.id.to_string(),
        })
    }

    fn find_by_id(&self, id: &Uuid) -> Result<Option<ReportRecord>, DatabaseError> {
        let conn = self.conn()?;
        repository::get_report(&conn, id)
    }

    fn record_analysis(
        &self,
        id: &Uuid,
        vitals: &VitalMap,
        analysis: &Analysis,
    ) -> Result<ReportRecord, DatabaseError> {
        let conn = self.conn()?;
        repository::set_report_analysis(&conn, id, vitals, analysis)?;
        repository::get_report(&conn, id)?.ok_or_else(|| DatabaseError::NotFound {
            entity_type: "report".into(),
            id: id.to_string(),
        })
    }

    fn find_by_patient(&self, patient_id: &str) -> Result<Vec<ReportRecord>, DatabaseError> {
        let conn = self.conn()?;
        repository::get_reports_by_patient(&conn, patient_id)
    }

    fn delete(&self, id: &Uuid) -> Result<(), DatabaseError> {
        let conn = self.conn()?;
        repository::delete_report(&conn, id)
    }

    fn annotate(&self, id: &Uuid, annotation: &ClinicianAnnotation) -> Result<(), DatabaseError> {
        let conn = self.conn()?;
        repository::set_report_annotation(&conn, id, annotation)
    }
}

impl ContactDirectory for SqliteStore {
    fn contact_for(&self, patient_id: &str) -> Result<Option<PatientContact>, DatabaseError> {
        let conn = self.conn()?;
        repository::get_patient_contact(&conn, patient_id)
    }

    fn set_contact(&self, contact: &PatientContact) -> Result<(), DatabaseError> {
        let conn = self.conn()?;
        repository::upsert_patient_contact(&conn, contact)
    }
}
