use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::PatientContact;

/// Insert or replace the alert contact of a patient.
pub fn upsert_patient_contact(
    conn: &Connection,
    contact: &PatientContact,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patient_contacts (patient_id, email, phone, updated_at)
         VALUES (?1, ?2, ?3, datetime('now'))
         ON CONFLICT(patient_id) DO UPDATE SET
            email = excluded.email,
            phone = excluded.phone,
            updated_at = excluded.updated_at",
        params![contact.patient_id, contact.email, contact.phone],
    )?;
    Ok(())
}

/// Get the alert contact of a patient, if one was recorded.
pub fn get_patient_contact(
    conn: &Connection,
    patient_id: &str,
) -> Result<Option<PatientContact>, DatabaseError> {
    let contact = conn
        .query_row(
            "SELECT patient_id, email, phone FROM patient_contacts WHERE patient_id = ?1",
            params![patient_id],
            |row| {
                Ok(PatientContact {
                    patient_id: row.get(0)?,
                    email: row.get(1)?,
                    phone: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(contact)
}
