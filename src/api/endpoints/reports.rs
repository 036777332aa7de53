//! Report endpoints.
//!
//! - `POST /api/reports`: ingest a report
//! - `GET /api/reports/:id?patient_id=`: report detail, owner only
//! - `DELETE /api/reports/:id?patient_id=`: delete, owner only
//! - `POST /api/reports/:id/analysis`: classify and alert
//! - `POST /api/reports/:id/annotation`: clinician remarks

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::{ClinicianAnnotation, ReportRecord};
use crate::service::AnalysisOutcome;

#[derive(Deserialize)]
pub struct IngestRequest {
    pub patient_id: String,
    pub file_name: String,
    pub file_type: Option<String>,
    #[serde(default)]
    pub raw_text: String,
}

#[derive(Deserialize)]
pub struct OwnerQuery {
    pub patient_id: String,
}

#[derive(Deserialize)]
pub struct AnnotationRequest {
    pub remarks: Option<String>,
    pub advice: Option<String>,
    pub author: String,
}

fn require(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("{field} is required")));
    }
    Ok(())
}

/// `POST /api/reports`
pub async fn ingest(
    State(ctx): State<ApiContext>,
    Json(req): Json<IngestRequest>,
) -> Result<(StatusCode, Json<ReportRecord>), ApiError> {
    require("patient_id", &req.patient_id)?;
    require("file_name", &req.file_name)?;

    let report = ctx
        .blocking(move |analyzer| {
            Ok(analyzer.ingest(
                req.patient_id.trim(),
                &req.file_name,
                req.file_type.as_deref(),
                req.raw_text,
            )?)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// `GET /api/reports/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Query(owner): Query<OwnerQuery>,
) -> Result<Json<ReportRecord>, ApiError> {
    let report = ctx
        .blocking(move |analyzer| Ok(analyzer.report_for(&owner.patient_id, &id)?))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("report {id}")))?;
    Ok(Json(report))
}

/// `DELETE /api/reports/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Query(owner): Query<OwnerQuery>,
) -> Result<StatusCode, ApiError> {
    let deleted = ctx
        .blocking(move |analyzer| Ok(analyzer.delete(&owner.patient_id, &id)?))
        .await?;
    if !deleted {
        return Err(ApiError::NotFound(format!("report {id}")));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/reports/:id/analysis`
pub async fn analyze(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<AnalysisOutcome>, ApiError> {
    let outcome = ctx
        .blocking(move |analyzer| Ok(analyzer.analyze(&id)?))
        .await?;
    Ok(Json(outcome))
}

/// `POST /api/reports/:id/annotation`
pub async fn annotate(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<AnnotationRequest>,
) -> Result<Json<ClinicianAnnotation>, ApiError> {
    require("author", &req.author)?;
    let annotation = ctx
        .blocking(move |analyzer| {
            Ok(analyzer.annotate(&id, req.remarks, req.advice, req.author.trim())?)
        })
        .await?;
    Ok(Json(annotation))
}
