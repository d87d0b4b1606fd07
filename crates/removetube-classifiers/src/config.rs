//! Scorer backend configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::scorer::DEFAULT_HYPOTHESIS_TEMPLATE;

/// Semantic backend selected at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// Sentence embeddings + cosine similarity
    #[default]
    Embedding,
    /// Local NLI model
    ZeroShot,
    /// Remote inference API
    Api,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Embedding => "embedding",
            Self::ZeroShot => "zero-shot",
            Self::Api => "api",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "embedding" => Ok(Self::Embedding),
            "zero-shot" | "zero_shot" => Ok(Self::ZeroShot),
            "api" => Ok(Self::Api),
            other => Err(format!(
                "unknown backend '{}', expected embedding, zero-shot or api",
                other
            )),
        }
    }
}

/// Device type for inference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    /// CPU inference (always available)
    #[default]
    Cpu,
    /// CUDA GPU inference
    Cuda(usize),
    /// Metal (Apple Silicon)
    Metal(usize),
}

/// Where a local model comes from and how it runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalModelConfig {
    /// Hugging Face repository id
    pub repo_id: String,

    /// Repository revision
    #[serde(default = "default_revision")]
    pub revision: String,

    /// Load from this directory instead of the Hub
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_dir: Option<PathBuf>,

    /// Device to run inference on
    #[serde(default)]
    pub device: DeviceType,

    /// Token limit per sequence
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

impl LocalModelConfig {
    pub fn from_hf(repo_id: impl Into<String>) -> Self {
        Self {
            repo_id: repo_id.into(),
            revision: default_revision(),
            local_dir: None,
            device: DeviceType::Cpu,
            max_length: default_max_length(),
        }
    }

    pub fn with_local_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.local_dir = Some(dir.into());
        self
    }

    pub fn with_device(mut self, device: DeviceType) -> Self {
        self.device = device;
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }
}

fn default_revision() -> String {
    "main".to_string()
}

fn default_max_length() -> usize {
    512
}

/// Partial local-model section; unset fields keep the backend's defaults
#[derive(Debug, Default, Deserialize)]
struct LocalModelOverrides {
    repo_id: Option<String>,
    revision: Option<String>,
    local_dir: Option<PathBuf>,
    device: Option<DeviceType>,
    max_length: Option<usize>,
}

impl LocalModelOverrides {
    fn apply(self, mut base: LocalModelConfig) -> LocalModelConfig {
        if let Some(repo_id) = self.repo_id {
            base.repo_id = repo_id;
        }
        if let Some(revision) = self.revision {
            base.revision = revision;
        }
        if self.local_dir.is_some() {
            base.local_dir = self.local_dir;
        }
        if let Some(device) = self.device {
            base.device = device;
        }
        if let Some(max_length) = self.max_length {
            base.max_length = max_length;
        }
        base
    }
}

/// Sentence-embedding backend settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "EmbeddingSection")]
pub struct EmbeddingBackendConfig {
    #[serde(flatten)]
    pub model: LocalModelConfig,
}

impl Default for EmbeddingBackendConfig {
    fn default() -> Self {
        Self {
            model: LocalModelConfig::from_hf("sentence-transformers/all-MiniLM-L6-v2")
                .with_max_length(256),
        }
    }
}

#[derive(Deserialize)]
struct EmbeddingSection {
    #[serde(flatten)]
    model: LocalModelOverrides,
}

impl From<EmbeddingSection> for EmbeddingBackendConfig {
    fn from(section: EmbeddingSection) -> Self {
        let defaults = Self::default();
        Self {
            model: section.model.apply(defaults.model),
        }
    }
}

/// Entailment column of `textattack/bert-base-uncased-MNLI`, whose config
/// carries only generic `LABEL_n` names
const DEFAULT_ZERO_SHOT_ENTAILMENT_INDEX: usize = 1;

/// Local NLI backend settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ZeroShotSection")]
pub struct ZeroShotBackendConfig {
    #[serde(flatten)]
    pub model: LocalModelConfig,

    /// Hypothesis with `{}` standing for the topic
    pub hypothesis_template: String,

    /// Entailment column, used when the model's label map names no entailment label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entailment_index: Option<usize>,
}

impl Default for ZeroShotBackendConfig {
    fn default() -> Self {
        Self {
            model: LocalModelConfig::from_hf("textattack/bert-base-uncased-MNLI"),
            hypothesis_template: default_hypothesis_template(),
            entailment_index: Some(DEFAULT_ZERO_SHOT_ENTAILMENT_INDEX),
        }
    }
}

#[derive(Deserialize)]
struct ZeroShotSection {
    #[serde(flatten)]
    model: LocalModelOverrides,
    hypothesis_template: Option<String>,
    entailment_index: Option<usize>,
}

impl From<ZeroShotSection> for ZeroShotBackendConfig {
    fn from(section: ZeroShotSection) -> Self {
        let defaults = Self::default();
        Self {
            model: section.model.apply(defaults.model),
            hypothesis_template: section
                .hypothesis_template
                .unwrap_or(defaults.hypothesis_template),
            entailment_index: section.entailment_index.or(defaults.entailment_index),
        }
    }
}

/// Remote inference API settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiBackendConfig {
    /// Base URL; `/models/{model}` is appended
    pub endpoint: String,

    /// Hosted zero-shot model
    pub model: String,

    /// Per-request timeout
    pub timeout_secs: u64,

    /// Hypothesis with `{}` standing for the topic
    pub hypothesis_template: String,
}

impl Default for ApiBackendConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api-inference.huggingface.co".to_string(),
            model: "facebook/bart-large-mnli".to_string(),
            timeout_secs: 10,
            hypothesis_template: default_hypothesis_template(),
        }
    }
}

fn default_hypothesis_template() -> String {
    DEFAULT_HYPOTHESIS_TEMPLATE.to_string()
}

/// Scorer section of the service configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    /// Which backend to build
    pub backend: Backend,

    pub embedding: EmbeddingBackendConfig,

    pub zero_shot: ZeroShotBackendConfig,

    pub api: ApiBackendConfig,
}

impl ScorerConfig {
    /// Identifier of the configured model, as reported by the readiness probe
    pub fn model_name(&self) -> &str {
        match self.backend {
            Backend::Embedding => &self.embedding.model.repo_id,
            Backend::ZeroShot => &self.zero_shot.model.repo_id,
            Backend::Api => &self.api.model,
        }
    }
}
