//! Server configuration

use removetube_classifiers::ScorerConfig;
use removetube_policy::PolicyConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::cli::Cli;

/// Environment variable holding the remote inference credential
pub const API_KEY_VAR: &str = "REMOVETUBE_API_KEY";
/// Fallback credential variable
pub const HF_API_KEY_VAR: &str = "HF_API_KEY";
/// Environment variable overriding the remote inference endpoint
pub const API_URL_VAR: &str = "REMOVETUBE_API_URL";

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Semantic backend selection and model settings
    #[serde(default)]
    pub scorer: ScorerConfig,

    /// Thresholds and degraded mode
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Orchestrator settings
    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// HTTP settings
    #[serde(default)]
    pub server: HttpSettings,
}

impl ServerConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &str, cli: &Cli) -> anyhow::Result<Self> {
        // Try to load from file, or use defaults
        let mut config = if Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config = Self::from_yaml(&content)?;
            info!("Loaded configuration from {}", config_path);
            config
        } else {
            info!("No configuration file at {}, using defaults", config_path);
            Self::default()
        };

        // Apply CLI overrides
        if let Some(listen) = &cli.listen {
            config.listen = listen.clone();
        }

        if let Some(port) = cli.port {
            config.port = port;
        }

        if let Some(backend) = cli.backend {
            config.scorer.backend = backend;
        }

        if let Some(url) = std::env::var(API_URL_VAR).ok().filter(|v| !v.trim().is_empty()) {
            config.scorer.api.endpoint = url;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML document
    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        self.policy
            .thresholds
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid policy: {}", e))?;

        if self.pipeline.scorer_timeout_ms == Some(0) {
            anyhow::bail!("pipeline.scorer_timeout_ms must be positive");
        }
        if self.scorer.api.timeout_secs == 0 {
            anyhow::bail!("scorer.api.timeout_secs must be positive");
        }
        if self.server.body_limit_bytes == 0 {
            anyhow::bail!("server.body_limit_bytes must be positive");
        }

        Ok(())
    }

    /// Socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.listen, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            scorer: ScorerConfig::default(),
            policy: PolicyConfig::default(),
            pipeline: PipelineSettings::default(),
            server: HttpSettings::default(),
        }
    }
}

/// Orchestrator settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Upper bound on one semantic scoring call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scorer_timeout_ms: Option<u64>,
}

impl PipelineSettings {
    pub fn scorer_timeout(&self) -> Option<Duration> {
        self.scorer_timeout_ms.map(Duration::from_millis)
    }
}

/// HTTP settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSettings {
    /// Accept requests from any origin (the browser extension has no fixed origin)
    #[serde(default = "default_true")]
    pub allow_any_origin: bool,

    /// Origins allowed when `allow_any_origin` is off
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Maximum request body size
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            allow_any_origin: true,
            allowed_origins: Vec::new(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

/// Remote inference credential from the environment
pub fn api_key_from_env() -> Option<String> {
    [API_KEY_VAR, HF_API_KEY_VAR]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|v| !v.trim().is_empty())
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8001
}

fn default_true() -> bool {
    true
}

fn default_body_limit() -> usize {
    1024 * 1024
}

#[cfg(test)]
mod tests {
    use super::*;
    use removetube_classifiers::Backend;
    use removetube_policy::DegradedMode;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.addr(), "0.0.0.0:8001");
        assert_eq!(config.scorer.backend, Backend::Embedding);
        assert_eq!(config.policy.degraded, DegradedMode::Error);
        assert!(config.pipeline.scorer_timeout().is_none());
        assert!(config.server.allow_any_origin);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
port: 9000
scorer:
  backend: api
  api:
    model: "facebook/bart-large-mnli"
    timeout_secs: 5
policy:
  degraded: allow
  thresholds:
    embedding:
      lenient: 0.2
      strict: 0.35
pipeline:
  scorer_timeout_ms: 1500
server:
  allow_any_origin: false
  allowed_origins: ["chrome-extension://abc"]
"#;
        let config = ServerConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.listen, "0.0.0.0");
        assert_eq!(config.scorer.backend, Backend::Api);
        assert_eq!(config.scorer.api.timeout_secs, 5);
        assert_eq!(config.policy.degraded, DegradedMode::Allow);
        assert_eq!(config.policy.thresholds.embedding.strict, 0.35);
        assert_eq!(config.policy.thresholds.api.lenient, 0.3);
        assert_eq!(
            config.pipeline.scorer_timeout(),
            Some(Duration::from_millis(1500))
        );
        assert_eq!(config.server.allowed_origins, vec!["chrome-extension://abc"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let yaml = r#"
policy:
  thresholds:
    zero_shot:
      lenient: 0.6
      strict: 0.4
"#;
        let config = ServerConfig::from_yaml(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli {
            config: "/nonexistent/removetube.yaml".to_string(),
            listen: Some("127.0.0.1".to_string()),
            port: Some(8123),
            backend: Some(Backend::ZeroShot),
            verbose: false,
        };
        let config = ServerConfig::load(&cli.config, &cli).unwrap();
        assert_eq!(config.addr(), "127.0.0.1:8123");
        assert_eq!(config.scorer.backend, Backend::ZeroShot);
    }
}
