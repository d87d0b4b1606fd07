//! Semantic scorer trait and common helpers

use async_trait::async_trait;
use removetube_core::{ClassificationRequest, Error, Method, Result, TopicScore};

/// Hypothesis used by every entailment backend; `{}` is replaced by the topic
pub const DEFAULT_HYPOTHESIS_TEMPLATE: &str =
    "This video is about {} and contains content related to this topic.";

/// Render a hypothesis for one topic
pub fn hypothesis(template: &str, topic: &str) -> String {
    template.replace("{}", topic)
}

/// Topic labels handed to a scorer, with optional precomputed embeddings
#[derive(Debug, Clone, Copy)]
pub struct TopicSet<'a> {
    names: &'a [String],
    embeddings: Option<&'a [Vec<f32>]>,
}

impl<'a> TopicSet<'a> {
    pub fn new(names: &'a [String]) -> Self {
        Self {
            names,
            embeddings: None,
        }
    }

    pub fn with_embeddings(mut self, embeddings: &'a [Vec<f32>]) -> Self {
        self.embeddings = Some(embeddings);
        self
    }

    pub fn from_request(request: &'a ClassificationRequest) -> Self {
        Self {
            names: &request.topics,
            embeddings: request.topic_embeddings.as_deref(),
        }
    }

    pub fn names(&self) -> &'a [String] {
        self.names
    }

    pub fn embeddings(&self) -> Option<&'a [Vec<f32>]> {
        self.embeddings
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Whether a scorer can serve requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    NotReady(String),
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Ready => None,
            Self::NotReady(reason) => Some(reason),
        }
    }
}

/// Scoring oracle consulted when the keyword stage does not qualify.
///
/// Implementations return one score per input topic, in input order.
#[async_trait]
pub trait SemanticScorer: Send + Sync {
    /// Score `content` against every topic
    async fn score(&self, content: &str, topics: &TopicSet<'_>) -> Result<Vec<TopicScore>>;

    /// Method tag attached to verdicts from this scorer
    fn method(&self) -> Method;

    /// Model or endpoint identifier
    fn name(&self) -> &str;

    /// Readiness reported by the health probe
    fn readiness(&self) -> Readiness {
        Readiness::Ready
    }
}

/// Check that a scorer answered every topic exactly once, in order, with finite scores.
///
/// A violation means the oracle returned something unusable, not that the
/// content is off-topic.
pub fn validate_scores(scores: &[TopicScore], topics: &[String]) -> Result<()> {
    if scores.len() != topics.len() {
        return Err(Error::unavailable(format!(
            "scorer returned {} scores for {} topics",
            scores.len(),
            topics.len()
        )));
    }

    for (score, topic) in scores.iter().zip(topics) {
        if &score.topic != topic {
            return Err(Error::unavailable(format!(
                "scorer returned topic '{}' where '{}' was expected",
                score.topic, topic
            )));
        }
        if !score.score.is_finite() {
            return Err(Error::unavailable(format!(
                "scorer returned non-finite score for '{}'",
                topic
            )));
        }
    }

    Ok(())
}

/// Highest score, ties resolved in favor of the earliest topic
pub fn stable_argmax(scores: &[TopicScore]) -> Option<&TopicScore> {
    let mut best: Option<&TopicScore> = None;
    for candidate in scores {
        match best {
            Some(current) if candidate.score <= current.score => {}
            _ => best = Some(candidate),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_stable_argmax_prefers_first_on_tie() {
        let scores = vec![
            TopicScore::new("space", 0.4),
            TopicScore::new("music", 0.7),
            TopicScore::new("cooking", 0.7),
        ];
        assert_eq!(stable_argmax(&scores).unwrap().topic, "music");
        assert!(stable_argmax(&[]).is_none());
    }

    #[test]
    fn test_stable_argmax_negative_scores() {
        let scores = vec![TopicScore::new("space", -0.4), TopicScore::new("music", -0.1)];
        assert_eq!(stable_argmax(&scores).unwrap().topic, "music");
    }

    #[test]
    fn test_validate_scores() {
        let topics = names(&["space", "music"]);

        let ok = vec![TopicScore::new("space", 0.1), TopicScore::new("music", 0.9)];
        assert!(validate_scores(&ok, &topics).is_ok());

        let short = vec![TopicScore::new("space", 0.1)];
        assert!(matches!(
            validate_scores(&short, &topics),
            Err(Error::ScorerUnavailable(_))
        ));

        let reordered = vec![TopicScore::new("music", 0.9), TopicScore::new("space", 0.1)];
        assert!(validate_scores(&reordered, &topics).is_err());

        let nan = vec![TopicScore::new("space", f32::NAN), TopicScore::new("music", 0.9)];
        assert!(validate_scores(&nan, &topics).is_err());
    }

    #[test]
    fn test_hypothesis_template() {
        assert_eq!(
            hypothesis(DEFAULT_HYPOTHESIS_TEMPLATE, "space"),
            "This video is about space and contains content related to this topic."
        );
    }

    #[test]
    fn test_topic_set_from_request() {
        let request = ClassificationRequest::new("t", ["a", "b"])
            .with_topic_embeddings(vec![vec![1.0], vec![0.0]]);
        let set = TopicSet::from_request(&request);
        assert_eq!(set.len(), 2);
        assert_eq!(set.embeddings().map(|e| e.len()), Some(2));
    }
}
