//! Embedding strategy: cosine similarity against topic embeddings

use async_trait::async_trait;
use removetube_core::{Error, Method, Result, TopicScore};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::debug;

use crate::scorer::{Readiness, SemanticScorer, TopicSet};

/// Turns text into fixed-size vectors
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// One vector per input text, in input order
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Model identifier
    fn model_name(&self) -> &str;
}

/// Cosine similarity in [-1, 1]; zero-length or mismatched vectors score 0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (dot, norm_a_sq, norm_b_sq) = a
        .iter()
        .zip(b.iter())
        .fold((0.0f32, 0.0f32, 0.0f32), |(dot, na, nb), (&av, &bv)| {
            (dot + av * bv, na + av * av, nb + bv * bv)
        });

    let norm_a = norm_a_sq.sqrt();
    let norm_b = norm_b_sq.sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
    }
}

/// Scores topics by cosine similarity between the content embedding and each
/// topic embedding.
///
/// Topic embeddings normally arrive precomputed with the request; without
/// them the topic labels are embedded on the fly.
pub struct EmbeddingScorer {
    embedder: Arc<dyn TextEmbedder>,
}

impl EmbeddingScorer {
    pub fn new(embedder: Arc<dyn TextEmbedder>) -> Self {
        Self { embedder }
    }

    /// Embedder backing this scorer, also used by the embed-topics operation
    pub fn embedder(&self) -> &Arc<dyn TextEmbedder> {
        &self.embedder
    }
}

#[async_trait]
impl SemanticScorer for EmbeddingScorer {
    async fn score(&self, content: &str, topics: &TopicSet<'_>) -> Result<Vec<TopicScore>> {
        let names = topics.names();

        let topic_vectors: Cow<'_, [Vec<f32>]> = match topics.embeddings() {
            Some(precomputed) => {
                if precomputed.len() != names.len() {
                    return Err(Error::invalid_input(format!(
                        "got {} topic embeddings for {} topics",
                        precomputed.len(),
                        names.len()
                    )));
                }
                Cow::Borrowed(precomputed)
            }
            None => {
                debug!("No precomputed embeddings, embedding {} topics", names.len());
                Cow::Owned(self.embedder.embed(names).await?)
            }
        };

        let content_vector = self
            .embedder
            .embed(&[content.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::model("embedder returned no vector for content"))?;

        names
            .iter()
            .zip(topic_vectors.iter())
            .map(|(name, vector)| {
                if vector.len() != content_vector.len() {
                    return Err(Error::invalid_input(format!(
                        "embedding for topic '{}' has {} dimensions, model produces {}",
                        name,
                        vector.len(),
                        content_vector.len()
                    )));
                }
                Ok(TopicScore::new(name.clone(), cosine_similarity(&content_vector, vector)))
            })
            .collect()
    }

    fn method(&self) -> Method {
        Method::Embedding
    }

    fn name(&self) -> &str {
        self.embedder.model_name()
    }

    fn readiness(&self) -> Readiness {
        Readiness::Ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Projects words onto two axes: space vocabulary and music vocabulary
    struct AxisEmbedder;

    #[async_trait]
    impl TextEmbedder for AxisEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let t = t.to_lowercase();
                    let space = ["space", "rocket", "orbit"]
                        .iter()
                        .filter(|w| t.contains(**w))
                        .count() as f32;
                    let music = ["music", "guitar", "song"]
                        .iter()
                        .filter(|w| t.contains(**w))
                        .count() as f32;
                    vec![space, music]
                })
                .collect())
        }

        fn model_name(&self) -> &str {
            "axis"
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_scores_with_precomputed_embeddings() {
        let scorer = EmbeddingScorer::new(Arc::new(AxisEmbedder));
        let topics = names(&["space", "music"]);
        let embeddings = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let set = TopicSet::new(&topics).with_embeddings(&embeddings);

        let scores = scorer.score("Rocket reaches orbit", &set).await.unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].topic, "space");
        assert!((scores[0].score - 1.0).abs() < 1e-6);
        assert!(scores[1].score.abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_embeds_topics_when_not_supplied() {
        let scorer = EmbeddingScorer::new(Arc::new(AxisEmbedder));
        let topics = names(&["music", "space"]);

        let scores = scorer
            .score("New guitar song", &TopicSet::new(&topics))
            .await
            .unwrap();
        assert!(scores[0].score > scores[1].score);
    }

    #[tokio::test]
    async fn test_count_mismatch_is_invalid_input() {
        let scorer = EmbeddingScorer::new(Arc::new(AxisEmbedder));
        let topics = names(&["space", "music"]);
        let embeddings = vec![vec![1.0, 0.0]];
        let set = TopicSet::new(&topics).with_embeddings(&embeddings);

        let err = scorer.score("Rocket", &set).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_invalid_input() {
        let scorer = EmbeddingScorer::new(Arc::new(AxisEmbedder));
        let topics = names(&["space"]);
        let embeddings = vec![vec![1.0, 0.0, 0.0]];
        let set = TopicSet::new(&topics).with_embeddings(&embeddings);

        let err = scorer.score("Rocket", &set).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
