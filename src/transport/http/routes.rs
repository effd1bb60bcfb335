//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::Serialize;
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::emotions::EMOTION_LABELS;
use crate::prediction::{PredictionError, augment_success};
use crate::service::PredictionService;

const AVAILABLE_ENDPOINTS: [&str; 3] = ["GET /health", "POST /predict", "GET /emotions"];

#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct EmotionsResponse {
    pub emotions: [&'static str; 8],
    pub count: usize,
}

async fn health() -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "OK",
        message: "Emotion Detection API is running",
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

async fn predict(
    State(service): State<Arc<PredictionService>>,
    body: Option<Json<Value>>,
) -> (StatusCode, Json<Value>) {
    let body = body.map(|Json(v)| v);

    match service.predict(body.as_ref()).await {
        Ok(result) => (StatusCode::OK, Json(augment_success(result))),
        Err(err) => error_response(&err),
    }
}

/// Map every terminal failure onto its one HTTP response.
fn error_response(err: &PredictionError) -> (StatusCode, Json<Value>) {
    match err {
        PredictionError::InvalidInput => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": err.to_string() })),
        ),
        PredictionError::SpawnFailure(source) => {
            tracing::error!(error = %source, "failed to start worker subprocess");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Prediction failed (subprocess error)",
                    "details": source.to_string(),
                })),
            )
        }
        PredictionError::WorkerExitedNonZero { code, stderr } => {
            tracing::error!(code, stderr = %stderr, "worker exited non-zero");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Prediction failed",
                    "details": stderr,
                    "code": code,
                })),
            )
        }
        PredictionError::ParseFailure { error, raw } => {
            tracing::error!(error = %error, "failed to parse worker output");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Failed to parse prediction result",
                    "details": error,
                    "raw_output": raw,
                })),
            )
        }
        PredictionError::ResultError(message) => {
            tracing::error!(message = %message, "worker reported an error result");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": message })),
            )
        }
        PredictionError::Timeout => (
            StatusCode::REQUEST_TIMEOUT,
            Json(json!({ "error": err.to_string() })),
        ),
    }
}

async fn emotions() -> Json<EmotionsResponse> {
    Json(EmotionsResponse {
        emotions: EMOTION_LABELS,
        count: EMOTION_LABELS.len(),
    })
}

async fn not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Endpoint not found",
            "available_endpoints": AVAILABLE_ENDPOINTS,
        })),
    )
}

pub fn routes(service: Arc<PredictionService>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/emotions", get(emotions))
        .fallback(not_found)
        .with_state(service)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
