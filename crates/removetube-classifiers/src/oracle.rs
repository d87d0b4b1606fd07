//! Scoring oracle construction
//!
//! The oracle is the single semantic dependency of the pipeline, built once
//! at startup from [`ScorerConfig`] and shared behind an `Arc`.

use removetube_core::{Error, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::config::{Backend, ScorerConfig};
use crate::embedding::{EmbeddingScorer, TextEmbedder};
use crate::remote::RemoteZeroShotScorer;
use crate::scorer::SemanticScorer;

/// Configured semantic backend
#[derive(Clone)]
pub struct Oracle {
    backend: Backend,
    scorer: Arc<dyn SemanticScorer>,
    embedder: Option<Arc<dyn TextEmbedder>>,
}

impl Oracle {
    /// Embedding backend around an existing embedder
    pub fn embedding(embedder: Arc<dyn TextEmbedder>) -> Self {
        Self {
            backend: Backend::Embedding,
            scorer: Arc::new(EmbeddingScorer::new(Arc::clone(&embedder))),
            embedder: Some(embedder),
        }
    }

    /// Any other scorer; topic embedding is not available
    pub fn scorer_only(backend: Backend, scorer: Arc<dyn SemanticScorer>) -> Self {
        Self {
            backend,
            scorer,
            embedder: None,
        }
    }

    /// Build the backend selected in `config`.
    ///
    /// Loading a local model blocks (weights may be downloaded); call from
    /// a blocking context.
    pub fn from_config(config: &ScorerConfig, api_key: Option<String>) -> Result<Self> {
        let start = Instant::now();

        let oracle = match config.backend {
            Backend::Embedding => Self::embedding(load_embedder(config)?),
            Backend::ZeroShot => Self::scorer_only(Backend::ZeroShot, load_zero_shot(config)?),
            Backend::Api => Self::scorer_only(
                Backend::Api,
                Arc::new(RemoteZeroShotScorer::new(&config.api, api_key)?),
            ),
        };

        info!(
            backend = %oracle.backend,
            model = oracle.scorer.name(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Scoring oracle ready"
        );

        Ok(oracle)
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn scorer(&self) -> Arc<dyn SemanticScorer> {
        Arc::clone(&self.scorer)
    }

    /// Embedder for the embed-topics operation, present only on the embedding backend
    pub fn embedder(&self) -> Option<&Arc<dyn TextEmbedder>> {
        self.embedder.as_ref()
    }

    /// Embed topic labels for later classify calls
    pub async fn embed_topics(&self, topics: &[String]) -> Result<Vec<Vec<f32>>> {
        let embedder = self.embedder.as_ref().ok_or_else(|| {
            Error::invalid_input(format!(
                "topic embedding requires the embedding backend, current backend is {}",
                self.backend
            ))
        })?;

        if topics.is_empty() {
            return Err(Error::invalid_input("no topics provided"));
        }
        if topics.iter().any(|t| t.trim().is_empty()) {
            return Err(Error::invalid_input("topics must not be blank"));
        }

        embedder.embed(topics).await
    }
}

#[cfg(feature = "ml-models")]
fn load_embedder(config: &ScorerConfig) -> Result<Arc<dyn TextEmbedder>> {
    let embedder = crate::sentence_embedder::BertSentenceEmbedder::load(&config.embedding.model)?;
    Ok(Arc::new(embedder))
}

#[cfg(not(feature = "ml-models"))]
fn load_embedder(_config: &ScorerConfig) -> Result<Arc<dyn TextEmbedder>> {
    Err(Error::config(
        "embedding backend requires the 'ml-models' feature",
    ))
}

#[cfg(feature = "ml-models")]
fn load_zero_shot(config: &ScorerConfig) -> Result<Arc<dyn SemanticScorer>> {
    let scorer = crate::zero_shot::ZeroShotScorer::load(&config.zero_shot)?;
    Ok(Arc::new(scorer))
}

#[cfg(not(feature = "ml-models"))]
fn load_zero_shot(_config: &ScorerConfig) -> Result<Arc<dyn SemanticScorer>> {
    Err(Error::config(
        "zero-shot backend requires the 'ml-models' feature",
    ))
}
