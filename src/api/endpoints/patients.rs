//! Per-patient endpoints: report list, insights, alert contact.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::insights::{RiskSummary, TrendReport};
use crate::models::{PatientContact, ReportRecord};

#[derive(Deserialize)]
pub struct ContactRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// `GET /api/patients/:id/reports`, newest first.
pub async fn reports(
    State(ctx): State<ApiContext>,
    Path(patient_id): Path<String>,
) -> Result<Json<Vec<ReportRecord>>, ApiError> {
    let reports = ctx
        .blocking(move |analyzer| Ok(analyzer.reports_for(&patient_id)?))
        .await?;
    Ok(Json(reports))
}

/// `GET /api/patients/:id/trend`
pub async fn trend(
    State(ctx): State<ApiContext>,
    Path(patient_id): Path<String>,
) -> Result<Json<TrendReport>, ApiError> {
    let trend = ctx
        .blocking(move |analyzer| Ok(analyzer.trend(&patient_id)?))
        .await?;
    Ok(Json(trend))
}

/// `GET /api/patients/:id/summary`
pub async fn summary(
    State(ctx): State<ApiContext>,
    Path(patient_id): Path<String>,
) -> Result<Json<RiskSummary>, ApiError> {
    let summary = ctx
        .blocking(move |analyzer| Ok(analyzer.summary(&patient_id)?))
        .await?;
    Ok(Json(summary))
}

/// `GET /api/patients/:id/contact`
pub async fn get_contact(
    State(ctx): State<ApiContext>,
    Path(patient_id): Path<String>,
) -> Result<Json<PatientContact>, ApiError> {
    let missing = format!("contact for {patient_id}");
    let contact = ctx
        .blocking(move |analyzer| Ok(analyzer.contact(&patient_id)?))
        .await?
        .ok_or(ApiError::NotFound(missing))?;
    Ok(Json(contact))
}

/// `PUT /api/patients/:id/contact`
pub async fn put_contact(
    State(ctx): State<ApiContext>,
    Path(patient_id): Path<String>,
    Json(req): Json<ContactRequest>,
) -> Result<Json<PatientContact>, ApiError> {
    let contact = PatientContact {
        patient_id,
        email: req.email,
        phone: req.phone,
    };
    if contact.email().is_none() && contact.phone().is_none() {
        return Err(ApiError::BadRequest("email or phone is required".into()));
    }
    let stored = contact.clone();
    ctx.blocking(move |analyzer| Ok(analyzer.set_contact(&stored)?))
        .await?;
    Ok(Json(contact))
}
