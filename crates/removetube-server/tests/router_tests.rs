//! Router tests
//!
//! Drive the axum router in-process with stub oracles installed on the state.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use metrics_exporter_prometheus::PrometheusBuilder;
use removetube_classifiers::{Backend, Oracle, Readiness, SemanticScorer, TextEmbedder, TopicSet};
use removetube_core::{Error, Method, Result, TopicScore};
use removetube_policy::DegradedMode;
use removetube_server::{create_router, AppState, ServerConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

/// Bag-of-words embedder over three fixed axes
struct AxisEmbedder;

#[async_trait]
impl TextEmbedder for AxisEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let axes: [&[&str]; 3] = [
            &["space", "rocket", "orbit"],
            &["music", "guitar", "song"],
            &["cooking", "recipe", "bake"],
        ];
        Ok(texts
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                axes.iter()
                    .map(|words| words.iter().filter(|w| lower.contains(**w)).count() as f32)
                    .collect()
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        "axis-embedder"
    }
}

/// Remote-style scorer that is always down
struct OfflineScorer;

#[async_trait]
impl SemanticScorer for OfflineScorer {
    async fn score(&self, _content: &str, _topics: &TopicSet<'_>) -> Result<Vec<TopicScore>> {
        Err(Error::unavailable("upstream returned 503"))
    }

    fn method(&self) -> Method {
        Method::Api
    }

    fn name(&self) -> &str {
        "offline"
    }

    fn readiness(&self) -> Readiness {
        Readiness::NotReady("no API key".to_string())
    }
}

fn state_with(config: ServerConfig) -> AppState {
    let handle = PrometheusBuilder::new().build_recorder().handle();
    AppState::new(config, handle)
}

fn embedding_app() -> Router {
    let state = state_with(ServerConfig::default());
    state
        .install_oracle(Oracle::embedding(Arc::new(AxisEmbedder)))
        .unwrap();
    create_router(state)
}

fn offline_app(degraded: DegradedMode) -> Router {
    let mut config = ServerConfig::default();
    config.scorer.backend = Backend::Api;
    config.policy.degraded = degraded;
    let state = state_with(config);
    state
        .install_oracle(Oracle::scorer_only(Backend::Api, Arc::new(OfflineScorer)))
        .unwrap();
    create_router(state)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_root_banner() {
    let (status, body) = send(embedding_app(), get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "RemoveTube AI Classifier Server");
    assert_eq!(body["status"], "running");
    assert_eq!(body["backend"], "embedding");
}

#[tokio::test]
async fn test_health_ready() {
    let (status, body) = send(embedding_app(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["ready"], true);
    assert_eq!(body["model"], "axis-embedder");
}

#[tokio::test]
async fn test_requests_rejected_while_initializing() {
    let app = create_router(state_with(ServerConfig::default()));

    let (status, body) = send(app.clone(), get("/health")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "initializing");
    assert_eq!(body["ready"], false);

    let request = json!({"title": "Rocket launch", "topics": ["space"]});
    let (status, body) = send(app, post_json("/classify", &request)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["type"], "scorer_unavailable");
}

#[tokio::test]
async fn test_embed_topics_then_classify() {
    let app = embedding_app();

    let (status, body) = send(
        app.clone(),
        post_json("/embed-topics", &json!({"topics": ["space", "music"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Successfully embedded 2 topics");
    let embeddings = body["embeddings"].clone();
    assert_eq!(embeddings.as_array().unwrap().len(), 2);

    let request = json!({
        "title": "Watching a guitar song live",
        "description": "",
        "topics": ["space", "music"],
        "topic_embeddings": embeddings,
        "strict_mode": false,
    });
    let (status, body) = send(app, post_json("/classify", &request)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allowed"], true);
    assert_eq!(body["topic"], "music");
    assert_eq!(body["method"], "embedding");
    assert!(body["processing_time_ms"].as_f64().unwrap() >= 0.0);
}

#[tokio::test]
async fn test_keyword_match_via_simple_endpoint() {
    let request = json!({
        "title": "Cooking pasta at home",
        "topics": ["space", "cooking"],
    });
    let (status, body) = send(embedding_app(), post_json("/classify-simple", &request)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allowed"], true);
    assert_eq!(body["topic"], "cooking");
    assert_eq!(body["method"], "keyword");
}

#[tokio::test]
async fn test_unrelated_video_blocked() {
    let request = json!({
        "title": "Stock market update",
        "topics": ["space"],
        "strict_mode": true,
    });
    let (status, body) = send(embedding_app(), post_json("/classify", &request)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allowed"], false);
    assert_eq!(body["method"], "embedding");
}

#[tokio::test]
async fn test_empty_topics_rejected() {
    let app = embedding_app();

    let (status, body) = send(
        app.clone(),
        post_json("/classify", &json!({"title": "Anything", "topics": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "invalid_input");

    let (status, _) = send(app, post_json("/embed-topics", &json!({"topics": []}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_json_rejected() {
    let request = Request::builder()
        .method("POST")
        .uri("/classify")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"title\": "))
        .unwrap();
    let (status, body) = send(embedding_app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "invalid_input");
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let mut config = ServerConfig::default();
    config.server.body_limit_bytes = 64;
    let state = state_with(config);
    state
        .install_oracle(Oracle::embedding(Arc::new(AxisEmbedder)))
        .unwrap();

    let request = json!({"title": "x".repeat(256), "topics": ["space"]});
    let (status, _) = send(create_router(state), post_json("/classify", &request)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_unavailable_scorer_is_service_error() {
    let request = json!({"title": "Unrelated clip", "topics": ["space"]});
    let (status, body) = send(offline_app(DegradedMode::Error), post_json("/classify", &request)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["type"], "scorer_unavailable");
}

#[tokio::test]
async fn test_degraded_block_verdict() {
    let request = json!({"title": "Unrelated clip", "topics": ["space"]});
    let (status, body) = send(offline_app(DegradedMode::Block), post_json("/classify", &request)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allowed"], false);
    assert_eq!(body["degraded"], true);
    assert_eq!(body["confidence"], 0.0);
}

#[tokio::test]
async fn test_keyword_still_works_when_scorer_down() {
    let request = json!({"title": "Space rocket news", "topics": ["space"]});
    let (status, body) = send(offline_app(DegradedMode::Error), post_json("/classify", &request)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["method"], "keyword");
    assert_eq!(body["allowed"], true);
}

#[tokio::test]
async fn test_embed_topics_requires_embedding_backend() {
    let (status, body) = send(
        offline_app(DegradedMode::Error),
        post_json("/embed-topics", &json!({"topics": ["space"]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "invalid_input");
}

#[tokio::test]
async fn test_health_reports_scorer_not_ready() {
    let (status, body) = send(offline_app(DegradedMode::Error), get("/health")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unavailable");
    assert_eq!(body["backend"], "api");
    assert_eq!(body["detail"], "no API key");
}

#[tokio::test]
async fn test_unknown_route() {
    let (status, body) = send(embedding_app(), get("/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["type"], "not_found");
}

#[tokio::test]
async fn test_metrics_endpoint_renders() {
    let response = embedding_app().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

fn restricted_origin_app(origins: &[&str]) -> Router {
    let mut config = ServerConfig::default();
    config.server.allow_any_origin = false;
    config.server.allowed_origins = origins.iter().map(|o| o.to_string()).collect();
    let state = state_with(config);
    state
        .install_oracle(Oracle::embedding(Arc::new(AxisEmbedder)))
        .unwrap();
    create_router(state)
}

fn get_from(uri: &str, origin: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::ORIGIN, origin)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_restricted_cors_origins() {
    let app = restricted_origin_app(&["chrome-extension://abc", "bad\norigin"]);

    let response = app
        .clone()
        .oneshot(get_from("/", "chrome-extension://abc"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "chrome-extension://abc"
    );

    let response = app
        .oneshot(get_from("/", "https://evil.example"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn test_any_origin_by_default() {
    let response = embedding_app()
        .oneshot(get_from("/", "chrome-extension://whatever"))
        .await
        .unwrap();
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}
