//! Allow/block decision policy

use removetube_core::{ClassificationResponse, Method, Result, TopicScore};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ThresholdTable;

/// What to answer when the semantic scorer is unavailable.
///
/// Anything other than `Error` turns "we don't know" into a verdict, so it
/// has to be chosen explicitly in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegradedMode {
    /// Surface the failure to the caller
    #[default]
    Error,
    /// Fail open: allow the content
    Allow,
    /// Fail closed: block the content
    Block,
}

/// Policy section of the service configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Threshold table
    pub thresholds: ThresholdTable,

    /// Behavior when the scorer is unavailable
    pub degraded: DegradedMode,
}

impl PolicyConfig {
    /// Validate and build the decision policy
    pub fn build(self) -> Result<DecisionPolicy> {
        self.thresholds.validate()?;
        Ok(DecisionPolicy::new(self.thresholds).with_degraded_mode(self.degraded))
    }
}

/// Gates the best semantic score against the threshold table
#[derive(Debug, Clone, Default)]
pub struct DecisionPolicy {
    thresholds: ThresholdTable,
    degraded: DegradedMode,
}

impl DecisionPolicy {
    /// Create a policy that surfaces scorer failures
    pub fn new(thresholds: ThresholdTable) -> Self {
        Self {
            thresholds,
            degraded: DegradedMode::Error,
        }
    }

    /// Set the degraded-mode behavior
    pub fn with_degraded_mode(mut self, degraded: DegradedMode) -> Self {
        self.degraded = degraded;
        self
    }

    pub fn thresholds(&self) -> &ThresholdTable {
        &self.thresholds
    }

    pub fn degraded_mode(&self) -> DegradedMode {
        self.degraded
    }

    /// Minimum keyword confidence for the short-circuit path
    pub fn keyword_min_confidence(&self, strict_mode: bool) -> f32 {
        self.thresholds.threshold(Method::Keyword, strict_mode)
    }

    /// Turn the best semantic score into a verdict.
    ///
    /// The boundary is inclusive and the reported confidence is the score
    /// itself, clamped into [0, 1]; the policy only gates `allowed`.
    pub fn decide(&self, best: &TopicScore, strict_mode: bool, method: Method) -> ClassificationResponse {
        let threshold = self.thresholds.threshold(method, strict_mode);
        let allowed = best.score >= threshold;

        debug!(
            topic = %best.topic,
            score = best.score,
            threshold,
            strict_mode,
            %method,
            allowed,
            "Applied decision policy"
        );

        ClassificationResponse::new(allowed, best.topic.clone(), best.score, method)
    }

    /// Verdict to return when the scorer is unavailable, if one is configured
    pub fn degraded_verdict(&self, method: Method) -> Option<ClassificationResponse> {
        let allowed = match self.degraded {
            DegradedMode::Error => return None,
            DegradedMode::Allow => true,
            DegradedMode::Block => false,
        };
        Some(ClassificationResponse::new(allowed, "", 0.0, method).degraded())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn decide(score: f32, strict: bool, method: Method) -> bool {
        DecisionPolicy::default()
            .decide(&TopicScore::new("space", score), strict, method)
            .allowed
    }

    #[test]
    fn test_embedding_boundaries() {
        assert!(decide(0.15, false, Method::Embedding));
        assert!(!decide(0.149, false, Method::Embedding));
        assert!(!decide(0.29, true, Method::Embedding));
        assert!(decide(0.3, true, Method::Embedding));
    }

    #[test]
    fn test_entailment_boundaries() {
        for method in [Method::ZeroShot, Method::Api] {
            assert!(decide(0.3, false, method));
            assert!(!decide(0.29, false, method));
            assert!(!decide(0.49, true, method));
            assert!(decide(0.5, true, method));
        }
    }

    #[test]
    fn test_confidence_is_reported_unchanged() {
        let policy = DecisionPolicy::default();
        let resp = policy.decide(&TopicScore::new("music", 0.12), false, Method::Embedding);
        assert!(!resp.allowed);
        assert_eq!(resp.topic, "music");
        assert_eq!(resp.confidence, 0.12);
        assert_eq!(resp.method, Method::Embedding);

        let resp = policy.decide(&TopicScore::new("music", -0.2), false, Method::Embedding);
        assert!(!resp.allowed);
        assert_eq!(resp.confidence, 0.0);
    }

    #[test]
    fn test_degraded_verdicts() {
        let policy = DecisionPolicy::default();
        assert!(policy.degraded_verdict(Method::Api).is_none());

        let open = DecisionPolicy::default().with_degraded_mode(DegradedMode::Allow);
        let resp = open.degraded_verdict(Method::Api).unwrap();
        assert!(resp.allowed);
        assert!(resp.degraded);
        assert_eq!(resp.confidence, 0.0);

        let closed = DecisionPolicy::default().with_degraded_mode(DegradedMode::Block);
        let resp = closed.degraded_verdict(Method::ZeroShot).unwrap();
        assert!(!resp.allowed);
        assert!(resp.degraded);
    }

    #[test]
    fn test_policy_config_from_yaml() {
        let yaml = r#"
degraded: block
thresholds:
  api:
    lenient: 0.5
    strict: 0.7
"#;
        let config: PolicyConfig = serde_yaml::from_str(yaml).unwrap();
        let policy = config.build().unwrap();
        assert_eq!(policy.degraded_mode(), DegradedMode::Block);
        assert_eq!(policy.thresholds().threshold(Method::Api, true), 0.7);
        assert_eq!(policy.keyword_min_confidence(true), 0.8);
    }

    proptest! {
        #[test]
        fn strict_never_allows_what_lenient_blocks(score in -1.0f32..=1.0) {
            for method in [Method::Embedding, Method::ZeroShot, Method::Api] {
                if decide(score, true, method) {
                    prop_assert!(decide(score, false, method));
                }
            }
        }
    }
}
