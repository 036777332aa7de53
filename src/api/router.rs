//! API router.
//!
//! Returns a composable `Router` with every endpoint under `/api/`.
//! Layers: request tracing, then permissive CORS. Authorization is left to
//! whatever fronts this service.
//!
//! NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;
use crate::service::ReportAnalyzer;

pub fn api_router(analyzer: Arc<ReportAnalyzer>) -> Router {
    build_router(ApiContext::new(analyzer))
}

fn build_router(ctx: ApiContext) -> Router {
    let api = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/reports", post(endpoints::reports::ingest))
        .route(
            "/reports/:id",
            get(endpoints::reports::detail).delete(endpoints::reports::delete),
        )
        .route("/reports/:id/analysis", post(endpoints::reports::analyze))
        .route("/reports/:id/annotation", post(endpoints::reports::annotate))
        .route("/patients/:id/reports", get(endpoints::patients::reports))
        .route("/patients/:id/trend", get(endpoints::patients::trend))
        .route("/patients/:id/summary", get(endpoints::patients::summary))
        .route(
            "/patients/:id/contact",
            get(endpoints::patients::get_contact).put(endpoints::patients::put_contact),
        )
        .with_state(ctx);

    Router::new()
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::service::tests::{harness, Harness};

    fn router(h: Harness) -> (Router, Harness) {
        (api_router(h.analyzer.clone()), h)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<serde_json::Value>) -> (StatusCode, serde_json::Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                req = req.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn ingest(app: &Router, patient: &str, text: &str) -> String {
        let (status, json) = send(
            app,
            "POST",
            "/api/reports",
            Some(serde_json::json!({
                "patient_id": patient,
                "file_name": "labs.txt",
                "file_type": "text/plain",
                "raw_text": text,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        json["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let (app, _) = router(harness());
        let (status, json) = send(&app, "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["alert_threshold"], "HIGH");
    }

    #[tokio::test]
    async fn ingest_then_analyze_critical() {
        let (app, h) = router(harness());
        let (status, _) = send(
            &app,
            "PUT",
            "/api/patients/p1/contact",
            Some(serde_json::json!({ "email": "p1@example.com", "phone": "+15550001111" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let id = ingest(&app, "p1", "Glucose 250 mg/dL, BP 170/105").await;
        let (status, json) = send(&app, "POST", &format!("/api/reports/{id}/analysis"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["level"], "CRITICAL");
        assert!(json["probabilities"]["CRITICAL"].as_f64().unwrap() > 0.5);
        assert_eq!(json["report"]["analysis"]["risk_label"], "CRITICAL");
        assert_eq!(json["alerts"]["email"]["status"], "delivered");
        assert_eq!(json["alerts"]["sms"]["status"], "delivered");
        assert_eq!(h.email.sent_count(), 1);
        assert_eq!(h.sms.sent_count(), 1);
    }

    #[tokio::test]
    async fn ingest_requires_patient_id() {
        let (app, _) = router(harness());
        let (status, json) = send(
            &app,
            "POST",
            "/api/reports",
            Some(serde_json::json!({ "patient_id": " ", "file_name": "a.txt" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn analyze_unknown_report_is_404() {
        let (app, _) = router(harness());
        let uri = format!("/api/reports/{}/analysis", uuid::Uuid::new_v4());
        let (status, json) = send(&app, "POST", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn detail_checks_ownership() {
        let (app, _) = router(harness());
        let id = ingest(&app, "p1", "").await;

        let (status, json) = send(&app, "GET", &format!("/api/reports/{id}?patient_id=p1"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["patient_id"], "p1");

        let (status, _) = send(&app, "GET", &format!("/api/reports/{id}?patient_id=p2"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_checks_ownership() {
        let (app, _) = router(harness());
        let id = ingest(&app, "p1", "").await;

        let (status, _) = send(&app, "DELETE", &format!("/api/reports/{id}?patient_id=p2"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, "GET", &format!("/api/reports/{id}?patient_id=p1"), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = send(&app, "DELETE", &format!("/api/reports/{id}?patient_id=p1"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(json, serde_json::Value::Null);
        let (status, _) = send(&app, "GET", &format!("/api/reports/{id}?patient_id=p1"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn trend_and_summary() {
        let (app, _) = router(harness());
        let (status, json) = send(&app, "GET", "/api/patients/p1/trend", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["trend"], "INSUFFICIENT_DATA");

        let first = ingest(&app, "p1", "Glucose 95 mg/dL, BP 118/76").await;
        let second = ingest(&app, "p1", "Glucose 250 mg/dL, BP 170/105").await;
        send(&app, "POST", &format!("/api/reports/{first}/analysis"), None).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        send(&app, "POST", &format!("/api/reports/{second}/analysis"), None).await;

        let (_, json) = send(&app, "GET", "/api/patients/p1/trend", None).await;
        assert_eq!(json["trend"], "WORSENING");
        assert_eq!(json["analyzed_count"], 2);

        let (_, json) = send(&app, "GET", "/api/patients/p1/summary", None).await;
        assert_eq!(json["overall"], "URGENT_ATTENTION");
        assert_eq!(json["counts"]["CRITICAL"], 1);

        let (_, json) = send(&app, "GET", "/api/patients/p1/reports", None).await;
        assert_eq!(json.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn annotation_roundtrip() {
        let (app, _) = router(harness());
        let id = ingest(&app, "p1", "").await;
        let (status, json) = send(
            &app,
            "POST",
            &format!("/api/reports/{id}/annotation"),
            Some(serde_json::json!({ "remarks": "Recheck fasting glucose", "author": "dr.lee" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["author"], "dr.lee");

        let (_, json) = send(&app, "GET", &format!("/api/reports/{id}?patient_id=p1"), None).await;
        assert_eq!(json["annotation"]["remarks"], "Recheck fasting glucose");
    }

    #[tokio::test]
    async fn contact_requires_an_address() {
        let (app, _) = router(harness());
        let (status, _) = send(&app, "PUT", "/api/patients/p1/contact", Some(serde_json::json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, "GET", "/api/patients/p1/contact", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
