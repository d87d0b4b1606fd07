//! Metrics and logging setup

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use removetube_core::ClassificationResponse;
use tracing::info;

pub const REQUESTS_TOTAL: &str = "removetube_requests_total";
pub const DECISIONS_TOTAL: &str = "removetube_decisions_total";
pub const ERRORS_TOTAL: &str = "removetube_errors_total";
pub const CLASSIFY_LATENCY_MS: &str = "removetube_classification_latency_ms";

/// Initialize tracing/logging
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("removetube=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("removetube=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Install the Prometheus recorder and return the handle for rendering
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(REQUESTS_TOTAL, "Total number of requests by endpoint");
    metrics::describe_counter!(
        DECISIONS_TOTAL,
        "Total number of classification verdicts by method and outcome"
    );
    metrics::describe_counter!(ERRORS_TOTAL, "Total number of failed requests by error kind");
    metrics::describe_histogram!(
        CLASSIFY_LATENCY_MS,
        metrics::Unit::Milliseconds,
        "Classification latency in milliseconds by method"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}

pub fn record_request(endpoint: &'static str) {
    metrics::counter!(REQUESTS_TOTAL, "endpoint" => endpoint).increment(1);
}

/// Count a verdict and its latency
pub fn record_decision(response: &ClassificationResponse) {
    let verdict = match (response.degraded, response.allowed) {
        (true, true) => "degraded_allowed",
        (true, false) => "degraded_blocked",
        (false, true) => "allowed",
        (false, false) => "blocked",
    };
    let method = response.method.as_str();

    metrics::counter!(DECISIONS_TOTAL, "method" => method, "verdict" => verdict).increment(1);
    metrics::histogram!(CLASSIFY_LATENCY_MS, "method" => method).record(response.processing_time_ms);
}

pub fn record_error(kind: &'static str) {
    metrics::counter!(ERRORS_TOTAL, "kind" => kind).increment(1);
}
