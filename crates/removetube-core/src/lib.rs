//! RemoveTube Core
//!
//! Core types and error handling shared across RemoveTube components.
//!
//! This crate provides:
//! - The request/response model for topic classification
//! - Content normalization (join, truncate) shared by every matching stage
//! - The error taxonomy: invalid input, scorer unavailable, internal failure

pub mod error;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use types::{
    clamp_confidence, ClassificationRequest, ClassificationResponse, MatchResult, Method,
    NormalizedContent, TopicScore, MAX_CONTENT_CHARS,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::types::{
        ClassificationRequest, ClassificationResponse, MatchResult, Method, NormalizedContent,
        TopicScore,
    };
}
