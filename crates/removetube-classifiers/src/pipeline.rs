//! Classification orchestrator
//!
//! Runs the keyword fast path first and falls back to the semantic scorer
//! only when no topic qualifies lexically:
//! - content is normalized and truncated once, both stages see the same text
//! - a keyword hit is returned as-is, without consulting the policy table
//! - semantic scores go through stable argmax and the decision policy
//! - scorer failures become errors, or a degraded verdict when configured

use removetube_core::{
    ClassificationRequest, ClassificationResponse, Error, ErrorKind, Method, Result,
};
use removetube_policy::DecisionPolicy;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::keyword::KeywordMatcher;
use crate::scorer::{stable_argmax, validate_scores, SemanticScorer, TopicSet};

/// Stage reached when a request failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Validation,
    Keyword,
    Semantic,
    Decision,
}

impl Stage {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Keyword => "keyword",
            Self::Semantic => "semantic",
            Self::Decision => "decision",
        }
    }
}

/// Hybrid keyword + semantic classification pipeline
#[derive(Clone)]
pub struct ClassificationPipeline {
    matcher: KeywordMatcher,
    scorer: Arc<dyn SemanticScorer>,
    policy: DecisionPolicy,
    scorer_timeout: Option<Duration>,
}

impl ClassificationPipeline {
    /// Create a pipeline around a scorer with default thresholds
    pub fn new(scorer: Arc<dyn SemanticScorer>) -> Self {
        Self {
            matcher: KeywordMatcher::new(),
            scorer,
            policy: DecisionPolicy::default(),
            scorer_timeout: None,
        }
    }

    /// Replace the decision policy
    pub fn with_policy(mut self, policy: DecisionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Bound the semantic scoring call
    pub fn with_scorer_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.scorer_timeout = timeout;
        self
    }

    pub fn scorer(&self) -> &Arc<dyn SemanticScorer> {
        &self.scorer
    }

    pub fn policy(&self) -> &DecisionPolicy {
        &self.policy
    }

    /// Classify one request
    pub async fn classify(&self, request: &ClassificationRequest) -> Result<ClassificationResponse> {
        let start = Instant::now();

        let result = self.run(request, start).await;

        if let Err((stage, err)) = &result {
            if err.kind() == ErrorKind::Internal {
                error!(
                    title = %request.title,
                    topics = ?request.topics,
                    strict_mode = request.strict_mode,
                    stage = stage.as_str(),
                    error = %err,
                    "Classification failed"
                );
            } else {
                warn!(
                    stage = stage.as_str(),
                    kind = err.kind().as_str(),
                    error = %err,
                    "Classification rejected"
                );
            }
        }

        result.map_err(|(_, err)| err)
    }

    async fn run(
        &self,
        request: &ClassificationRequest,
        start: Instant,
    ) -> std::result::Result<ClassificationResponse, (Stage, Error)> {
        request.validate().map_err(|e| (Stage::Validation, e))?;

        let content = request.content();
        let strict = request.strict_mode;

        // Fast path
        let min_confidence = self.policy.keyword_min_confidence(strict);
        let keyword = self
            .matcher
            .find(content.as_str(), &request.topics, min_confidence);

        if keyword.matched {
            let response = ClassificationResponse::new(
                true,
                keyword.topic,
                keyword.confidence,
                Method::Keyword,
            )
            .with_processing_time(start.elapsed());

            info!(
                topic = %response.topic,
                confidence = response.confidence,
                "Keyword match in {:.2}ms",
                response.processing_time_ms
            );
            return Ok(response);
        }

        if request.title.trim().is_empty() {
            return Err((
                Stage::Validation,
                Error::invalid_input("title is required for semantic classification"),
            ));
        }

        debug!(
            truncated = content.is_truncated(),
            scorer = self.scorer.name(),
            "No keyword match, falling back to semantic scoring"
        );

        let method = self.scorer.method();
        let scores = match self.score(content.as_str(), request).await {
            Ok(scores) => scores,
            Err(err) if err.kind() == ErrorKind::ScorerUnavailable => {
                match self.policy.degraded_verdict(method) {
                    Some(verdict) => {
                        warn!(
                            error = %err,
                            allowed = verdict.allowed,
                            "Scorer unavailable, returning degraded verdict"
                        );
                        return Ok(verdict.with_processing_time(start.elapsed()));
                    }
                    None => return Err((Stage::Semantic, err)),
                }
            }
            Err(err) => return Err((Stage::Semantic, err)),
        };

        let best = stable_argmax(&scores).ok_or_else(|| {
            (
                Stage::Decision,
                Error::internal("scorer returned no scores"),
            )
        })?;

        let response = self
            .policy
            .decide(best, strict, method)
            .with_processing_time(start.elapsed());

        info!(
            topic = %response.topic,
            confidence = response.confidence,
            allowed = response.allowed,
            %method,
            "Semantic classification in {:.2}ms",
            response.processing_time_ms
        );

        Ok(response)
    }

    /// Score once with the full topic list, bounded by the configured timeout
    async fn score(
        &self,
        content: &str,
        request: &ClassificationRequest,
    ) -> Result<Vec<removetube_core::TopicScore>> {
        let topics = TopicSet::from_request(request);
        let scoring = self.scorer.score(content, &topics);

        let scores = match self.scorer_timeout {
            Some(limit) => tokio::time::timeout(limit, scoring)
                .await
                .map_err(|_| Error::Timeout(limit.as_millis() as u64))??,
            None => scoring.await?,
        };

        validate_scores(&scores, &request.topics)?;
        Ok(scores)
    }
}
