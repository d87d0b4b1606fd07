//! HTTP routes and handlers

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use removetube_core::{ClassificationRequest, ClassificationResponse, ErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::HttpSettings;
use crate::state::{AppState, OracleStatus};
use crate::telemetry;

pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server);
    let body_limit = state.config.server.body_limit_bytes;

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/embed-topics", post(embed_topics))
        .route("/classify", post(classify))
        .route("/classify-simple", post(classify))
        .fallback(fallback)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(settings: &HttpSettings) -> CorsLayer {
    let origin = if settings.allow_any_origin {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(settings.allowed_origins.iter().filter_map(|origin| {
            match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                    None
                }
            }
        }))
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn root(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "message": "RemoveTube AI Classifier Server",
        "version": env!("CARGO_PKG_VERSION"),
        "backend": state.config.scorer.backend.as_str(),
        "model": state.config.scorer.model_name(),
        "status": "running",
    }))
}

/// Readiness probe body
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub ready: bool,
    pub backend: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let scorer_config = &state.config.scorer;

    let (status, ready, model, detail) = match state.status() {
        OracleStatus::Ready(loaded) => {
            let scorer = loaded.oracle.scorer();
            let readiness = scorer.readiness();
            let status = if readiness.is_ready() { "healthy" } else { "unavailable" };
            (
                status,
                readiness.is_ready(),
                scorer.name().to_string(),
                readiness.detail().map(String::from),
            )
        }
        OracleStatus::Initializing => (
            "initializing",
            false,
            scorer_config.model_name().to_string(),
            Some("loading model".to_string()),
        ),
        OracleStatus::Failed(reason) => (
            "unavailable",
            false,
            scorer_config.model_name().to_string(),
            Some(reason.to_string()),
        ),
    };

    let code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            ready,
            backend: scorer_config.backend.as_str().to_string(),
            model,
            detail,
        }),
    )
}

async fn metrics(State(state): State<AppState>) -> String {
    state.metrics_handle.render()
}

/// Topics to embed ahead of classification
#[derive(Debug, Serialize, Deserialize)]
pub struct EmbedTopicsRequest {
    pub topics: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmbedTopicsResponse {
    pub embeddings: Vec<Vec<f32>>,
    pub success: bool,
    pub message: String,
}

async fn embed_topics(
    State(state): State<AppState>,
    payload: Result<Json<EmbedTopicsRequest>, JsonRejection>,
) -> Result<Json<EmbedTopicsResponse>, AppError> {
    telemetry::record_request("embed-topics");
    let Json(request) = payload?;

    let loaded = state.loaded()?;
    info!(topics = ?request.topics, "Embedding topics");

    let embeddings = loaded.oracle.embed_topics(&request.topics).await?;

    Ok(Json(EmbedTopicsResponse {
        message: format!("Successfully embedded {} topics", embeddings.len()),
        embeddings,
        success: true,
    }))
}

async fn classify(
    State(state): State<AppState>,
    payload: Result<Json<ClassificationRequest>, JsonRejection>,
) -> Result<Json<ClassificationResponse>, AppError> {
    telemetry::record_request("classify");
    let Json(request) = payload?;

    let request_id = Uuid::new_v4();
    let span = info_span!("classify", %request_id, strict_mode = request.strict_mode);

    async move {
        debug!(title = %request.title, topics = request.topics.len(), "Classifying");

        let loaded = state.loaded()?;
        let response = loaded.pipeline.classify(&request).await?;

        telemetry::record_decision(&response);
        Ok(Json(response))
    }
    .instrument(span)
    .await
}

async fn fallback() -> AppError {
    AppError::NotFound
}

/// Error handling
#[derive(Debug)]
pub enum AppError {
    InvalidRequest(String),
    PayloadTooLarge(String),
    Unavailable(String),
    NotFound,
    InternalError(String),
}

impl AppError {
    fn kind_label(&self) -> &'static str {
        match self {
            AppError::InvalidRequest(_) => ErrorKind::InvalidInput.as_str(),
            AppError::PayloadTooLarge(_) => "payload_too_large",
            AppError::Unavailable(_) => ErrorKind::ScorerUnavailable.as_str(),
            AppError::NotFound => "not_found",
            AppError::InternalError(_) => ErrorKind::Internal.as_str(),
        }
    }
}

impl From<removetube_core::Error> for AppError {
    fn from(err: removetube_core::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidInput => AppError::InvalidRequest(err.to_string()),
            ErrorKind::ScorerUnavailable => AppError::Unavailable(err.to_string()),
            ErrorKind::Internal => AppError::InternalError(err.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(rejection.body_text())
        } else {
            AppError::InvalidRequest(rejection.body_text())
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind_label();
        let (status, message) = match self {
            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            AppError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        if status != StatusCode::NOT_FOUND {
            telemetry::record_error(kind);
            warn!(%status, kind, "Request failed: {}", message);
        }

        let body = json!({
            "error": {
                "message": message,
                "type": kind,
            }
        });

        (status, Json(body)).into_response()
    }
}
