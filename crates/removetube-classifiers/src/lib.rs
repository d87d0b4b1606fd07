//! RemoveTube Classifiers
//!
//! Hybrid topic classification for video metadata.
//!
//! Classification runs in two stages:
//! - Keyword fast path (<1ms): whole-word matching of topic variations
//! - Semantic fallback: one of three interchangeable scorers
//!   - embedding: sentence embeddings + cosine similarity
//!   - zero-shot: local NLI model scoring one hypothesis per topic
//!   - api: remote zero-shot inference endpoint
//!
//! Local models run with Candle behind the `ml-models` feature.

pub mod config;
pub mod embedding;
pub mod keyword;
#[cfg(feature = "ml-models")]
pub mod model_loader;
pub mod oracle;
pub mod pipeline;
pub mod remote;
pub mod scorer;
#[cfg(feature = "ml-models")]
pub mod sentence_embedder;
pub mod variations;
#[cfg(feature = "ml-models")]
pub mod zero_shot;

pub use config::{
    ApiBackendConfig, Backend, DeviceType, EmbeddingBackendConfig, LocalModelConfig,
    ScorerConfig, ZeroShotBackendConfig,
};
pub use embedding::{cosine_similarity, EmbeddingScorer, TextEmbedder};
pub use keyword::KeywordMatcher;
pub use oracle::Oracle;
pub use pipeline::ClassificationPipeline;
pub use remote::RemoteZeroShotScorer;
pub use scorer::{
    stable_argmax, validate_scores, Readiness, SemanticScorer, TopicSet,
    DEFAULT_HYPOTHESIS_TEMPLATE,
};
#[cfg(feature = "ml-models")]
pub use sentence_embedder::BertSentenceEmbedder;
pub use variations::variations;
#[cfg(feature = "ml-models")]
pub use zero_shot::ZeroShotScorer;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::{Backend, ScorerConfig};
    pub use crate::embedding::{EmbeddingScorer, TextEmbedder};
    pub use crate::keyword::KeywordMatcher;
    pub use crate::oracle::Oracle;
    pub use crate::pipeline::ClassificationPipeline;
    pub use crate::remote::RemoteZeroShotScorer;
    pub use crate::scorer::{Readiness, SemanticScorer, TopicSet};
}
