//! Shared application state

use metrics_exporter_prometheus::PrometheusHandle;
use removetube_classifiers::{ClassificationPipeline, Oracle};
use removetube_core::{Error, Result};
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::ServerConfig;

/// Oracle plus the pipeline built around it
pub struct LoadedOracle {
    pub oracle: Oracle,
    pub pipeline: ClassificationPipeline,
}

/// Where oracle initialization stands
pub enum OracleStatus<'a> {
    Initializing,
    Ready(&'a LoadedOracle),
    Failed(&'a str),
}

/// Application state shared across handlers.
///
/// The oracle is built once in the background; handlers read it without locking.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub metrics_handle: PrometheusHandle,
    oracle: Arc<OnceLock<LoadedOracle>>,
    init_error: Arc<OnceLock<String>>,
    started: Instant,
}

impl AppState {
    pub fn new(config: ServerConfig, metrics_handle: PrometheusHandle) -> Self {
        Self {
            config: Arc::new(config),
            metrics_handle,
            oracle: Arc::new(OnceLock::new()),
            init_error: Arc::new(OnceLock::new()),
            started: Instant::now(),
        }
    }

    /// Build the pipeline around `oracle` and make it available to handlers
    pub fn install_oracle(&self, oracle: Oracle) -> Result<()> {
        let policy = self.config.policy.clone().build()?;
        let pipeline = ClassificationPipeline::new(oracle.scorer())
            .with_policy(policy)
            .with_scorer_timeout(self.config.pipeline.scorer_timeout());

        self.oracle
            .set(LoadedOracle { oracle, pipeline })
            .map_err(|_| Error::internal("oracle already initialized"))
    }

    /// Load the configured backend on the blocking pool
    pub fn spawn_oracle_init(&self, api_key: Option<String>) -> JoinHandle<()> {
        let state = self.clone();

        tokio::spawn(async move {
            let config = state.config.scorer.clone();
            info!(backend = %config.backend, model = config.model_name(), "Initializing scoring oracle");

            let built = tokio::task::spawn_blocking(move || Oracle::from_config(&config, api_key))
                .await
                .map_err(|e| Error::internal(format!("oracle initialization panicked: {}", e)))
                .and_then(|r| r)
                .and_then(|oracle| state.install_oracle(oracle));

            match built {
                Ok(()) => info!(
                    "Classifier ready after {:.1}s",
                    state.started.elapsed().as_secs_f64()
                ),
                Err(e) => {
                    error!(error = %e, "Failed to initialize scoring oracle");
                    let _ = state.init_error.set(e.to_string());
                }
            }
        })
    }

    pub fn status(&self) -> OracleStatus<'_> {
        if let Some(loaded) = self.oracle.get() {
            OracleStatus::Ready(loaded)
        } else if let Some(reason) = self.init_error.get() {
            OracleStatus::Failed(reason)
        } else {
            OracleStatus::Initializing
        }
    }

    /// The loaded oracle, or scorer-unavailable while it is not ready
    pub fn loaded(&self) -> Result<&LoadedOracle> {
        match self.status() {
            OracleStatus::Ready(loaded) => Ok(loaded),
            OracleStatus::Initializing => Err(Error::unavailable("classifier is still initializing")),
            OracleStatus::Failed(reason) => Err(Error::unavailable(format!(
                "classifier failed to initialize: {}",
                reason
            ))),
        }
    }
}
