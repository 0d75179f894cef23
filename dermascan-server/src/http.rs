//! Dermascan HTTP API
//!
//! Axum-based HTTP server exposing prediction and history over HTTP.
//!
//! Architecture: each endpoint has a thin axum handler that delegates to a pure
//! inner function. The inner functions are directly testable without axum dispatch
//! machinery.
//!
//! Endpoints:
//! - POST /predict           — classify an uploaded image and store the result
//! - GET  /predict/histories — list every stored prediction
//!
//! Every response body is an envelope: `{status: "success", ...}` or
//! `{status: "fail", message}`.

use std::sync::Arc;

use anyhow::Result;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use dermascan_core::{
    Classifier, DermascanConfig, HistoryItem, PredictionRecord, RecordStore,
    StoreError,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::upload::{read_image_upload, ScopedUpload, UploadError, UploadLimits, DEFAULT_UPLOAD_ERROR};

pub const PREDICT_SUCCESS: &str = "Model is predicted successfully";
pub const HISTORY_READ_FAILED: &str = "Terjadi kesalahan dalam mengambil riwayat prediksi";

/// Headroom above the image limit for multipart boundaries and part headers.
pub const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    pub store: Arc<dyn RecordStore>,
    pub classifier: Arc<dyn Classifier>,
    pub config: DermascanConfig,
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    let body_limit = state.config.upload.max_bytes + MULTIPART_OVERHEAD_BYTES;
    Router::new()
        .route(
            "/predict",
            post(predict_handler).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/predict/histories", get(histories_handler))
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    state: HttpState,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", state.config.http.host, state.config.http.port);
    let app = build_router(Arc::new(state));
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Dermascan HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Errors
// ============================================================================

/// Failures surfaced to HTTP clients as `{status: "fail", message}`.
///
/// Upload validation failures are 400; store and classifier failures are 500.
#[derive(Debug)]
pub enum ApiError {
    PayloadTooLarge { limit: usize },
    InvalidUpload(String),
    PredictionFailed(String),
    StoreWrite(StoreError),
    StoreRead(StoreError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::PayloadTooLarge { .. } | ApiError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
            ApiError::PredictionFailed(_) | ApiError::StoreWrite(_) | ApiError::StoreRead(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Client-facing message. Internal causes are logged, never echoed.
    pub fn message(&self) -> String {
        match self {
            ApiError::PayloadTooLarge { limit } => {
                UploadError::PayloadTooLarge { limit: *limit }.to_string()
            }
            ApiError::InvalidUpload(msg) => msg.clone(),
            ApiError::PredictionFailed(_) | ApiError::StoreWrite(_) => {
                DEFAULT_UPLOAD_ERROR.to_string()
            }
            ApiError::StoreRead(_) => HISTORY_READ_FAILED.to_string(),
        }
    }

    pub fn into_parts(self) -> (StatusCode, serde_json::Value) {
        (self.status_code(), fail_body(self.message()))
    }
}

impl From<UploadError> for ApiError {
    fn from(e: UploadError) -> Self {
        match e {
            UploadError::PayloadTooLarge { limit } => ApiError::PayloadTooLarge { limit },
            UploadError::InvalidUpload(msg) => ApiError::InvalidUpload(msg),
            UploadError::Io(e) => ApiError::PredictionFailed(format!("upload storage: {}", e)),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.into_parts();
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Response bodies
// ============================================================================

pub fn fail_body(message: impl Into<String>) -> serde_json::Value {
    serde_json::json!({
        "status": "fail",
        "message": message.into(),
    })
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner predict — classifies an accepted upload and stores the record.
/// The upload's scratch file is released when this returns.
pub async fn predict_inner(
    store: &dyn RecordStore,
    classifier: &dyn Classifier,
    upload: ScopedUpload,
) -> (StatusCode, serde_json::Value) {
    match predict_record(store, classifier, &upload).await {
        Ok(record) => (
            StatusCode::OK,
            serde_json::json!({
                "status": "success",
                "message": PREDICT_SUCCESS,
                "data": record,
            }),
        ),
        Err(e) => {
            match &e {
                ApiError::StoreWrite(cause) => {
                    tracing::error!("Failed to store prediction: {}", cause)
                }
                ApiError::PredictionFailed(cause) => tracing::error!("Prediction failed: {}", cause),
                _ => {}
            }
            e.into_parts()
        }
    }
}

async fn predict_record(
    store: &dyn RecordStore,
    classifier: &dyn Classifier,
    upload: &ScopedUpload,
) -> std::result::Result<PredictionRecord, ApiError> {
    let image = upload
        .read()
        .await
        .map_err(|e| ApiError::PredictionFailed(format!("reading upload: {}", e)))?;

    let verdict = classifier
        .classify(&image)
        .await
        .map_err(|e| ApiError::PredictionFailed(format!("{} classifier: {}", classifier.name(), e)))?;

    let record = PredictionRecord::new(verdict);
    store.put(&record).await.map_err(ApiError::StoreWrite)?;

    tracing::info!(
        "Stored prediction {} ({}) for '{}' via {} store",
        record.id,
        record.result,
        upload.file_name(),
        store.name()
    );
    Ok(record)
}

/// Inner histories — reads every record and projects it into history items.
pub async fn histories_inner(store: &dyn RecordStore) -> (StatusCode, serde_json::Value) {
    match store.get_all().await {
        Ok(records) => {
            let data: Vec<HistoryItem> = records.into_iter().map(HistoryItem::from).collect();
            (
                StatusCode::OK,
                serde_json::json!({
                    "status": "success",
                    "data": data,
                }),
            )
        }
        Err(e) => {
            tracing::error!("Failed to read prediction history: {}", e);
            ApiError::StoreRead(e).into_parts()
        }
    }
}

// ============================================================================
// Axum handler wrappers (thin — delegate to inner functions)
// ============================================================================

pub async fn predict_handler(
    State(state): State<Arc<HttpState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Response {
    let limits = UploadLimits::from(&state.config.upload);

    let received = match multipart {
        Ok(mut multipart) => read_image_upload(&mut multipart, &limits)
            .await
            .map_err(ApiError::from),
        Err(rejection) => Err(ApiError::from(UploadError::invalid(rejection.body_text()))),
    };

    let upload = match received {
        Ok(upload) => upload,
        Err(e) => {
            tracing::warn!("Rejected upload: {}", e.message());
            return e.into_response();
        }
    };

    let (status, body) = predict_inner(state.store.as_ref(), state.classifier.as_ref(), upload).await;
    (status, Json(body)).into_response()
}

pub async fn histories_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = histories_inner(state.store.as_ref()).await;
    (status, Json(body))
}

// ============================================================================
// Unit Tests — call inner functions directly
// ============================================================================
