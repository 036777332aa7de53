use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::*;

/// Timestamp format for report columns. Keeps sub-second precision so
/// analyses run within the same second still order correctly.
const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S%.f";

const REPORT_COLUMNS: &str = "id, patient_id, file_name, file_type, uploaded_at, raw_text, vitals_json,
     risk_label, analyzed_at, imputed_json,
     annotation_remarks, annotation_advice, annotation_author, annotation_responded_at";

/// Insert a report, or update the analysis fields of an existing one.
///
/// Identity and source fields (`patient_id`, `file_name`, `file_type`,
/// `uploaded_at`, `raw_text`) are written on insert only. The annotation is
/// also insert-only here; afterwards it changes only through
/// `set_report_annotation`.
pub fn upsert_report(conn: &Connection, report: &ReportRecord) -> Result<(), DatabaseError> {
    let vitals_json = serde_json::to_string(&report.vitals)?;
    let (risk_label, analyzed_at, imputed_json) = match &report.analysis {
        Some(a) => (
            Some(a.risk_label.clone()),
            Some(format_ts(&a.analyzed_at)),
            Some(serde_json::to_string(&a.imputed)?),
        ),
        None => (None, None, None),
    };
    let annotation = report.annotation.as_ref();

    conn.execute(
        "INSERT INTO reports (id, patient_id, file_name, file_type, uploaded_at, raw_text, vitals_json,
         risk_label, analyzed_at, imputed_json,
         annotation_remarks, annotation_advice, annotation_author, annotation_responded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
         ON CONFLICT(id) DO UPDATE SET
            vitals_json = excluded.vitals_json,
            risk_label = excluded.risk_label,
            analyzed_at = excluded.analyzed_at,
            imputed_json = excluded.imputed_json",
        params![
            report.id.to_string(),
            report.patient_id,
            report.file_name,
            report.file_type,
            format_ts(&report.uploaded_at),
            report.raw_text,
            vitals_json,
            risk_label,
            analyzed_at,
            imputed_json,
            annotation.and_then(|a| a.remarks.clone()),
            annotation.and_then(|a| a.advice.clone()),
            annotation.map(|a| a.author.clone()),
            annotation.map(|a| format_ts(&a.responded_at)),
        ],
    )?;
    Ok(())
}

/// Get a report by ID.
pub fn get_report(conn: &Connection, id: &Uuid) -> Result<Option<ReportRecord>, DatabaseError> {
    let sql = format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id.to_string()], read_row)
        .optional()?;
    row.map(row_to_report).transpose()
}

/// All reports owned by a patient, newest upload first.
pub fn get_reports_by_patient(
    conn: &Connection,
    patient_id: &str,
) -> Result<Vec<ReportRecord>, DatabaseError> {
    let sql = format!(
        "SELECT {REPORT_COLUMNS} FROM reports WHERE patient_id = ?1 ORDER BY uploaded_at DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![patient_id], read_row)?;

    let mut reports = Vec::new();
    for row in rows {
        reports.push(row_to_report(row?)?);
    }
    Ok(reports)
}

/// Write the vitals and analysis of an existing report, leaving every other
/// column untouched.
pub fn set_report_analysis(
    conn: &Connection,
    id: &Uuid,
    vitals: &VitalMap,
    analysis: &Analysis,
) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "UPDATE reports SET vitals_json = ?2, risk_label = ?3, analyzed_at = ?4, imputed_json = ?5
         WHERE id = ?1",
        params![
            id.to_string(),
            serde_json::to_string(vitals)?,
            analysis.risk_label,
            format_ts(&analysis.analyzed_at),
            serde_json::to_string(&analysis.imputed)?,
        ],
    )?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "report".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Write the clinician annotation of a report.
pub fn set_report_annotation(
    conn: &Connection,
    id: &Uuid,
    annotation: &ClinicianAnnotation,
) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "UPDATE reports SET annotation_remarks = ?2, annotation_advice = ?3,
         annotation_author = ?4, annotation_responded_at = ?5
         WHERE id = ?1",
        params![
            id.to_string(),
            annotation.remarks,
            annotation.advice,
            annotation.author,
            format_ts(&annotation.responded_at),
        ],
    )?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "report".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Delete a report by ID.
pub fn delete_report(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let affected = conn.execute("DELETE FROM reports WHERE id = ?1", params![id.to_string()])?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "report".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

fn format_ts(ts: &NaiveDateTime) -> String {
    ts.format(DATETIME_FMT).to_string()
}

fn parse_ts(s: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(s, DATETIME_FMT)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad timestamp {s:?}: {e}")))
}

struct ReportRow {
    id: String,
    patient_id: String,
    file_name: String,
    file_type: Option<String>,
    uploaded_at: String,
    raw_text: String,
    vitals_json: String,
    risk_label: Option<String>,
    analyzed_at: Option<String>,
    imputed_json: Option<String>,
    annotation_remarks: Option<String>,
    annotation_advice: Option<String>,
    annotation_author: Option<String>,
    annotation_responded_at: Option<String>,
}

fn read_row(row: &rusqlite::Row) -> Result<ReportRow, rusqlite::Error> {
    Ok(ReportRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        file_name: row.get(2)?,
        file_type: row.get(3)?,
        uploaded_at: row.get(4)?,
        raw_text: row.get(5)?,
        vitals_json: row.get(6)?,
        risk_label: row.get(7)?,
        analyzed_at: row.get(8)?,
        imputed_json: row.get(9)?,
        annotation_remarks: row.get(10)?,
        annotation_advice: row.get(11)?,
        annotation_author: row.get(12)?,
        annotation_responded_at: row.get(13)?,
    })
}

fn row_to_report(row: ReportRow) -> Result<ReportRecord, DatabaseError> {
    let analysis = match (row.risk_label, row.analyzed_at) {
        (Some(risk_label), Some(analyzed_at)) => Some(Analysis {
            risk_label,
            analyzed_at: parse_ts(&analyzed_at)?,
            imputed: match row.imputed_json {
                Some(json) => serde_json::from_str(&json)?,
                None => Vec::new(),
            },
        }),
        _ => None,
    };

    let annotation = match (row.annotation_author, row.annotation_responded_at) {
        (Some(author), Some(responded_at)) => Some(ClinicianAnnotation {
            remarks: row.annotation_remarks,
            advice: row.annotation_advice,
            author,
            responded_at: parse_ts(&responded_at)?,
        }),
        _ => None,
    };

    Ok(ReportRecord {
        id: Uuid::parse_str(&row.id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        patient_id: row.patient_id,
        file_name: row.file_name,
        file_type: row.file_type,
        uploaded_at: parse_ts(&row.uploaded_at)?,
        raw_text: row.raw_text,
        vitals: serde_json::from_str(&row.vitals_json)?,
        analysis,
        annotation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use chrono::Duration;

    fn test_db() -> Connection {
        open_memory_database().unwrap()
    }

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn make_report(patient: &str, uploaded: &str) -> ReportRecord {
        ReportRecord::new_upload(
            patient,
            "bloodwork.pdf",
            Some("application/pdf"),
            "Fasting glucose 142 mg/dL, BP 150/95".into(),
            ts(uploaded),
        )
    }

    #[test]
    fn insert_and_retrieve_unanalyzed_report() {
        let conn = test_db();
        let report = make_report("ana@example.com", "2026-03-01 09:00:00");
        upsert_report(&conn, &report).unwrap();

        let loaded = get_report(&conn, &report.id).unwrap().unwrap();
        assert_eq!(loaded.patient_id, "ana@example.com");
        assert_eq!(loaded.file_type.as_deref(), Some("application/pdf"));
        assert_eq!(loaded.raw_text, report.raw_text);
        assert_eq!(loaded.vitals, VitalMap::not_found());
        assert!(loaded.analysis.is_none());
        assert!(loaded.annotation.is_none());
    }

    #[test]
    fn missing_report_is_none() {
        let conn = test_db();
        assert!(get_report(&conn, &Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn analysis_round_trips_with_subsecond_timestamp() {
        let conn = test_db();
        let mut report = make_report("ana@example.com", "2026-03-01 09:00:00");
        upsert_report(&conn, &report).unwrap();

        let mut vitals = VitalMap::not_found();
        vitals.set(VitalName::BloodSugar, VitalValue::Measured(142.0));
        vitals.set(VitalName::PulseRate, VitalValue::NoRule);
        let analyzed_at = ts("2026-03-01 09:05:00") + Duration::milliseconds(250);
        report.record_analysis(
            vitals.clone(),
            Analysis::new(RiskLevel::High, analyzed_at, vec![VitalName::PulseRate]),
        );
        upsert_report(&conn, &report).unwrap();

        let loaded = get_report(&conn, &report.id).unwrap().unwrap();
        let analysis = loaded.analysis.unwrap();
        assert_eq!(analysis.risk_label, "HIGH");
        assert_eq!(analysis.analyzed_at, analyzed_at);
        assert_eq!(analysis.imputed, vec![VitalName::PulseRate]);
        assert_eq!(loaded.vitals, vitals);
    }

    #[test]
    fn upsert_does_not_rewrite_source_fields() {
        let conn = test_db();
        let report = make_report("ana@example.com", "2026-03-01 09:00:00");
        upsert_report(&conn, &report).unwrap();

        let mut tampered = report.clone();
        tampered.patient_id = "mallory@example.com".into();
        tampered.raw_text = "rewritten".into();
        upsert_report(&conn, &tampered).unwrap();

        let loaded = get_report(&conn, &report.id).unwrap().unwrap();
        assert_eq!(loaded.patient_id, "ana@example.com");
        assert_eq!(loaded.raw_text, report.raw_text);
    }

    #[test]
    fn reports_by_patient_newest_first_and_scoped() {
        let conn = test_db();
        let older = make_report("ana@example.com", "2026-03-01 09:00:00");
        let newer = make_report("ana@example.com", "2026-03-08 09:00:00");
        let other = make_report("bob@example.com", "2026-03-05 09:00:00");
        for r in [&older, &newer, &other] {
            upsert_report(&conn, r).unwrap();
        }

        let reports = get_reports_by_patient(&conn, "ana@example.com").unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].id, newer.id);
        assert_eq!(reports[1].id, older.id);
    }

    #[test]
    fn annotation_is_independent_of_analysis() {
        let conn = test_db();
        let report = make_report("ana@example.com", "2026-03-01 09:00:00");
        upsert_report(&conn, &report).unwrap();

        let annotation = ClinicianAnnotation {
            remarks: Some("Sugar elevated".into()),
            advice: Some("Repeat fasting test".into()),
            author: "dr.lee@example.com".into(),
            responded_at: ts("2026-03-02 14:00:00"),
        };
        set_report_annotation(&conn, &report.id, &annotation).unwrap();

        let loaded = get_report(&conn, &report.id).unwrap().unwrap();
        assert_eq!(loaded.annotation, Some(annotation));
        assert!(loaded.analysis.is_none());
    }

    #[test]
    fn analysis_write_keeps_annotation() {
        let conn = test_db();
        let report = make_report("ana@example.com", "2026-03-01 09:00:00");
        upsert_report(&conn, &report).unwrap();
        let annotation = ClinicianAnnotation {
            remarks: Some("Seen".into()),
            advice: None,
            author: "dr.lee@example.com".into(),
            responded_at: ts("2026-03-02 14:00:00"),
        };
        set_report_annotation(&conn, &report.id, &annotation).unwrap();

        let mut vitals = VitalMap::not_found();
        vitals.set(VitalName::BloodSugar, VitalValue::Measured(250.0));
        let analysis = Analysis::new(RiskLevel::Critical, ts("2026-03-03 08:00:00"), vec![]);
        set_report_analysis(&conn, &report.id, &vitals, &analysis).unwrap();

        let loaded = get_report(&conn, &report.id).unwrap().unwrap();
        assert_eq!(loaded.annotation, Some(annotation));
        assert_eq!(loaded.analysis, Some(analysis));
        assert_eq!(loaded.vitals, vitals);
    }

    #[test]
    fn stale_upsert_keeps_annotation() {
        let conn = test_db();
        let report = make_report("ana@example.com", "2026-03-01 09:00:00");
        upsert_report(&conn, &report).unwrap();
        let annotation = ClinicianAnnotation {
            remarks: None,
            advice: Some("Retest".into()),
            author: "dr.lee@example.com".into(),
            responded_at: ts("2026-03-02 14:00:00"),
        };
        set_report_annotation(&conn, &report.id, &annotation).unwrap();

        // `report` still has no annotation in memory
        upsert_report(&conn, &report).unwrap();
        let loaded = get_report(&conn, &report.id).unwrap().unwrap();
        assert_eq!(loaded.annotation, Some(annotation));
    }

    #[test]
    fn analysis_write_on_missing_report_is_not_found() {
        let conn = test_db();
        let analysis = Analysis::new(RiskLevel::Normal, ts("2026-03-03 08:00:00"), vec![]);
        let err = set_report_analysis(&conn, &Uuid::new_v4(), &VitalMap::not_found(), &analysis)
            .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn annotate_missing_report_is_not_found() {
        let conn = test_db();
        let annotation = ClinicianAnnotation {
            remarks: None,
            advice: None,
            author: "dr.lee@example.com".into(),
            responded_at: ts("2026-03-02 14:00:00"),
        };
        let err = set_report_annotation(&conn, &Uuid::new_v4(), &annotation).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn delete_removes_whole_record() {
        let conn = test_db();
        let report = make_report("ana@example.com", "2026-03-01 09:00:00");
        upsert_report(&conn, &report).unwrap();
        delete_report(&conn, &report.id).unwrap();
        assert!(get_report(&conn, &report.id).unwrap().is_none());
        assert!(matches!(
            delete_report(&conn, &report.id),
            Err(DatabaseError::NotFound { .. })
        ));
    }
}
