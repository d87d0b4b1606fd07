//! Remote zero-shot scorer (Hugging Face style inference API)

use async_trait::async_trait;
use removetube_core::{Error, Method, Result, TopicScore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::ApiBackendConfig;
use crate::scorer::{Readiness, SemanticScorer, TopicSet};

#[derive(Debug, Serialize)]
struct ZeroShotRequest<'a> {
    inputs: &'a str,
    parameters: ZeroShotParameters<'a>,
}

#[derive(Debug, Serialize)]
struct ZeroShotParameters<'a> {
    candidate_labels: &'a [String],
    hypothesis_template: &'a str,
    multi_label: bool,
}

/// Accepted response shapes: parallel arrays or a list of label/score pairs
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ZeroShotResponse {
    Ranked { labels: Vec<String>, scores: Vec<f32> },
    Pairs(Vec<LabelScore>),
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f32,
}

impl ZeroShotResponse {
    fn into_pairs(self) -> Result<Vec<(String, f32)>> {
        match self {
            Self::Ranked { labels, scores } => {
                if labels.len() != scores.len() {
                    return Err(Error::unavailable(format!(
                        "malformed response: {} labels but {} scores",
                        labels.len(),
                        scores.len()
                    )));
                }
                Ok(labels.into_iter().zip(scores).collect())
            }
            Self::Pairs(pairs) => Ok(pairs.into_iter().map(|p| (p.label, p.score)).collect()),
        }
    }
}

/// Upstream error bodies forwarded to clients are cut to this many characters
const ERROR_EXCERPT_CHARS: usize = 120;

/// Leading part of an upstream error body; the full body is only logged
fn error_excerpt(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(ERROR_EXCERPT_CHARS) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

/// Put the oracle's (label, score) pairs back into topic order.
///
/// Every topic must appear exactly once and nothing else may appear.
pub fn align_scores(topics: &[String], pairs: Vec<(String, f32)>) -> Result<Vec<TopicScore>> {
    if pairs.len() != topics.len() {
        return Err(Error::unavailable(format!(
            "malformed response: {} scores for {} topics",
            pairs.len(),
            topics.len()
        )));
    }

    let mut by_label: HashMap<String, f32> = HashMap::with_capacity(pairs.len());
    for (label, score) in pairs {
        if !topics.contains(&label) {
            return Err(Error::unavailable(format!(
                "malformed response: unknown label '{}'",
                label
            )));
        }
        if by_label.insert(label.clone(), score).is_some() {
            return Err(Error::unavailable(format!(
                "malformed response: duplicate label '{}'",
                label
            )));
        }
    }

    topics
        .iter()
        .map(|topic| {
            by_label
                .get(topic)
                .map(|&score| TopicScore::new(topic.clone(), score))
                .ok_or_else(|| {
                    Error::unavailable(format!("malformed response: missing label '{}'", topic))
                })
        })
        .collect()
}

/// Zero-shot scorer that delegates to a hosted inference endpoint.
///
/// Every failure (missing credential, transport error, non-2xx status,
/// malformed body) is reported as scorer-unavailable.
pub struct RemoteZeroShotScorer {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
    hypothesis_template: String,
}

impl RemoteZeroShotScorer {
    pub fn new(config: &ApiBackendConfig, api_key: Option<String>) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;

        let api_key = api_key.filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            warn!("No API key configured, remote scorer will report unavailable");
        }

        Ok(Self {
            client,
            url: format!(
                "{}/models/{}",
                config.endpoint.trim_end_matches('/'),
                config.model
            ),
            model: config.model.clone(),
            api_key,
            timeout,
            hypothesis_template: config.hypothesis_template.clone(),
        })
    }

    /// Full endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SemanticScorer for RemoteZeroShotScorer {
    async fn score(&self, content: &str, topics: &TopicSet<'_>) -> Result<Vec<TopicScore>> {
        let Some(api_key) = &self.api_key else {
            return Err(Error::unavailable("remote scorer has no API key"));
        };

        let start = Instant::now();
        let body = ZeroShotRequest {
            inputs: content,
            parameters: ZeroShotParameters {
                candidate_labels: topics.names(),
                hypothesis_template: &self.hypothesis_template,
                multi_label: false,
            },
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(self.timeout.as_millis() as u64)
                } else {
                    Error::unavailable(format!("request to {} failed: {}", self.url, e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(%status, model = %self.model, body = %detail, "Remote scorer returned an error");
            return Err(Error::unavailable(format!(
                "remote scorer returned {}: {}",
                status,
                error_excerpt(&detail)
            )));
        }

        let parsed: ZeroShotResponse = response
            .json()
            .await
            .map_err(|e| Error::unavailable(format!("malformed response: {}", e)))?;

        let scores = align_scores(topics.names(), parsed.into_pairs()?)?;

        debug!(
            topics = topics.len(),
            "Remote scoring in {}ms",
            start.elapsed().as_millis()
        );
        Ok(scores)
    }

    fn method(&self) -> Method {
        Method::Api
    }

    fn name(&self) -> &str {
        &self.model
    }

    fn readiness(&self) -> Readiness {
        if self.api_key.is_some() {
            Readiness::Ready
        } else {
            Readiness::NotReady(
                "no API key: set REMOVETUBE_API_KEY or HF_API_KEY".to_string(),
            )
        }
    }
}
