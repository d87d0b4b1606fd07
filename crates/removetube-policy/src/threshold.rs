//! Strict/lenient threshold table

use removetube_core::{Error, Method, Result};
use serde::{Deserialize, Serialize};

/// Lenient and strict bars for a single source method
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Bar used when strict mode is off
    pub lenient: f32,

    /// Bar used when strict mode is on
    pub strict: f32,
}

impl Thresholds {
    pub const fn new(lenient: f32, strict: f32) -> Self {
        Self { lenient, strict }
    }

    /// Pick the bar for the requested mode
    pub fn select(&self, strict_mode: bool) -> f32 {
        if strict_mode {
            self.strict
        } else {
            self.lenient
        }
    }
}

/// Threshold per source method.
///
/// | method               | lenient | strict |
/// |----------------------|---------|--------|
/// | keyword              | 0.7     | 0.8    |
/// | embedding similarity | 0.15    | 0.3    |
/// | zero-shot            | 0.3     | 0.5    |
/// | remote api           | 0.3     | 0.5    |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdTable {
    /// Minimum keyword confidence for a short-circuit match
    pub keyword: Thresholds,

    /// Cosine similarity bar
    pub embedding: Thresholds,

    /// Local entailment probability bar
    pub zero_shot: Thresholds,

    /// Remote entailment probability bar
    pub api: Thresholds,
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self {
            keyword: Thresholds::new(0.7, 0.8),
            embedding: Thresholds::new(0.15, 0.3),
            zero_shot: Thresholds::new(0.3, 0.5),
            api: Thresholds::new(0.3, 0.5),
        }
    }
}

impl ThresholdTable {
    /// Row for a source method
    pub fn for_method(&self, method: Method) -> Thresholds {
        match method {
            Method::Keyword => self.keyword,
            Method::Embedding => self.embedding,
            Method::ZeroShot => self.zero_shot,
            Method::Api => self.api,
        }
    }

    /// Bar for a source method and mode
    pub fn threshold(&self, method: Method, strict_mode: bool) -> f32 {
        self.for_method(method).select(strict_mode)
    }

    /// Every bar must lie in [0, 1] and strict must never be below lenient
    pub fn validate(&self) -> Result<()> {
        for method in [Method::Keyword, Method::Embedding, Method::ZeroShot, Method::Api] {
            let row = self.for_method(method);
            for value in [row.lenient, row.strict] {
                if !(0.0..=1.0).contains(&value) {
                    return Err(Error::config(format!(
                        "{} threshold {} is outside [0, 1]",
                        method, value
                    )));
                }
            }
            if row.strict < row.lenient {
                return Err(Error::config(format!(
                    "{} strict threshold {} is below lenient threshold {}",
                    method, row.strict, row.lenient
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let table = ThresholdTable::default();

        assert_eq!(table.threshold(Method::Keyword, false), 0.7);
        assert_eq!(table.threshold(Method::Keyword, true), 0.8);
        assert_eq!(table.threshold(Method::Embedding, false), 0.15);
        assert_eq!(table.threshold(Method::Embedding, true), 0.3);
        assert_eq!(table.threshold(Method::ZeroShot, false), 0.3);
        assert_eq!(table.threshold(Method::ZeroShot, true), 0.5);
        assert_eq!(table.threshold(Method::Api, false), 0.3);
        assert_eq!(table.threshold(Method::Api, true), 0.5);
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let yaml = r#"
embedding:
  lenient: 0.2
  strict: 0.35
"#;
        let table: ThresholdTable = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(table.embedding, Thresholds::new(0.2, 0.35));
        assert_eq!(table.zero_shot, Thresholds::new(0.3, 0.5));
    }

    #[test]
    fn test_validate_rejects_inverted_row() {
        let mut table = ThresholdTable::default();
        table.api = Thresholds::new(0.6, 0.4);
        assert!(table.validate().is_err());

        let mut table = ThresholdTable::default();
        table.embedding = Thresholds::new(-0.1, 0.3);
        assert!(table.validate().is_err());
    }
}
