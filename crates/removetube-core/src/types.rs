//! Core types for RemoveTube

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};

/// Maximum number of characters of content handed to either matching stage
pub const MAX_CONTENT_CHARS: usize = 512;

/// Stage that produced a classification result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    /// Word-boundary keyword match on topic variations
    #[serde(rename = "keyword")]
    Keyword,
    /// Cosine similarity between sentence embeddings
    #[serde(rename = "embedding")]
    Embedding,
    /// Local natural-language-inference model
    #[serde(rename = "zero-shot")]
    ZeroShot,
    /// Remote inference API
    #[serde(rename = "api")]
    Api,
}

impl Method {
    /// Wire tag for this method
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Embedding => "embedding",
            Self::ZeroShot => "zero-shot",
            Self::Api => "api",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to classify one video against the user's allowed topics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationRequest {
    /// Video title
    pub title: String,

    /// Video description
    #[serde(default)]
    pub description: String,

    /// Allowed topics, in priority order
    #[serde(alias = "topic_names")]
    pub topics: Vec<String>,

    /// Precomputed topic embeddings, one per topic (embedding backend only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_embeddings: Option<Vec<Vec<f32>>>,

    /// Use the higher threshold of every policy row
    #[serde(default)]
    pub strict_mode: bool,
}

impl ClassificationRequest {
    /// Create a lenient request without description
    pub fn new<I, S>(title: impl Into<String>, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            title: title.into(),
            description: String::new(),
            topics: topics.into_iter().map(Into::into).collect(),
            topic_embeddings: None,
            strict_mode: false,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set strict mode
    pub fn with_strict_mode(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    /// Attach precomputed topic embeddings
    pub fn with_topic_embeddings(mut self, embeddings: Vec<Vec<f32>>) -> Self {
        self.topic_embeddings = Some(embeddings);
        self
    }

    /// Reject requests that cannot lead to a meaningful decision.
    ///
    /// Title emptiness is not checked here: a blank title is only an error
    /// once the keyword stage has failed and semantic scoring is required.
    pub fn validate(&self) -> Result<()> {
        if self.topics.is_empty() {
            return Err(Error::invalid_input("at least one topic is required"));
        }

        if let Some(idx) = self.topics.iter().position(|t| t.trim().is_empty()) {
            return Err(Error::invalid_input(format!("topic at index {} is blank", idx)));
        }

        for (idx, topic) in self.topics.iter().enumerate() {
            if self.topics[..idx].contains(topic) {
                return Err(Error::invalid_input(format!("duplicate topic '{}'", topic)));
            }
        }

        if let Some(embeddings) = &self.topic_embeddings {
            if embeddings.len() != self.topics.len() {
                return Err(Error::invalid_input(format!(
                    "got {} topic embeddings for {} topics",
                    embeddings.len(),
                    self.topics.len()
                )));
            }
        }

        Ok(())
    }

    /// Build the normalized content shared by both matching stages
    pub fn content(&self) -> NormalizedContent {
        NormalizedContent::new(&self.title, &self.description)
    }
}

/// Title and description joined and truncated to [`MAX_CONTENT_CHARS`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedContent {
    text: String,
    truncated: bool,
}

impl NormalizedContent {
    /// Join title and description (`"title. description"`) and truncate
    pub fn new(title: &str, description: &str) -> Self {
        let mut text = String::with_capacity(title.len() + description.len() + 2);
        text.push_str(title);
        if !description.is_empty() {
            text.push_str(". ");
            text.push_str(description);
        }
        Self::from_text(text)
    }

    /// Truncate arbitrary text to [`MAX_CONTENT_CHARS`] characters
    pub fn from_text(mut text: String) -> Self {
        let truncated = match text.char_indices().nth(MAX_CONTENT_CHARS) {
            Some((byte_idx, _)) => {
                text.truncate(byte_idx);
                true
            }
            None => false,
        };
        Self { text, truncated }
    }

    /// Content as handed to the semantic scorer
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Lower-cased view used by the keyword matcher
    pub fn to_lowercase(&self) -> String {
        self.text.to_lowercase()
    }

    /// Whether characters were dropped
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

/// Outcome of a single matching stage
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    /// Whether the stage produced a qualifying match
    pub matched: bool,

    /// Matched topic, empty when nothing matched
    pub topic: String,

    /// Confidence in [0, 1]
    pub confidence: f32,

    /// Stage that produced this result
    pub method: Method,
}

impl MatchResult {
    /// A qualifying match
    pub fn hit(topic: impl Into<String>, confidence: f32, method: Method) -> Self {
        Self {
            matched: true,
            topic: topic.into(),
            confidence: clamp_confidence(confidence),
            method,
        }
    }

    /// No qualifying match
    pub fn miss(method: Method) -> Self {
        Self {
            matched: false,
            topic: String::new(),
            confidence: 0.0,
            method,
        }
    }
}

/// Relevance of one topic as reported by a semantic scorer
#[derive(Debug, Clone, PartialEq)]
pub struct TopicScore {
    pub topic: String,
    pub score: f32,
}

impl TopicScore {
    pub fn new(topic: impl Into<String>, score: f32) -> Self {
        Self {
            topic: topic.into(),
            score,
        }
    }
}

/// Final verdict returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResponse {
    /// Whether the content matches an allowed topic
    pub allowed: bool,

    /// Best-matching topic
    pub topic: String,

    /// Calibrated confidence in [0, 1]
    pub confidence: f32,

    /// Stage that produced the verdict
    pub method: Method,

    /// Total wall time spent in the pipeline
    pub processing_time_ms: f64,

    /// Verdict comes from a configured fail-open/fail-closed default
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
}

impl ClassificationResponse {
    /// Build a verdict, clamping the confidence into [0, 1]
    pub fn new(allowed: bool, topic: impl Into<String>, confidence: f32, method: Method) -> Self {
        Self {
            allowed,
            topic: topic.into(),
            confidence: clamp_confidence(confidence),
            method,
            processing_time_ms: 0.0,
            degraded: false,
        }
    }

    /// Attach elapsed processing time
    pub fn with_processing_time(mut self, elapsed: Duration) -> Self {
        self.processing_time_ms = elapsed.as_secs_f64() * 1000.0;
        self
    }

    /// Mark as produced by a degraded-mode default
    pub fn degraded(mut self) -> Self {
        self.degraded = true;
        self
    }
}

/// Clamp a raw score (cosine similarity may be negative) into [0, 1]
pub fn clamp_confidence(score: f32) -> f32 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}
