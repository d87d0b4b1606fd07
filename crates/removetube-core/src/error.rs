//! Error types for RemoveTube

/// Result type alias using RemoveTube's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for classification operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Request rejected before any scoring attempt
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Scoring oracle could not produce a result (remote failure, malformed payload, not initialized)
    #[error("scorer unavailable: {0}")]
    ScorerUnavailable(String),

    /// Semantic scoring did not finish in time
    #[error("scorer timed out after {0} ms")]
    Timeout(u64),

    /// Model loading or inference errors
    #[error("model error: {0}")]
    Model(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

/// Failure category a caller can branch on without inspecting messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself cannot be classified
    InvalidInput,
    /// "We don't know": the oracle was unreachable or returned garbage
    ScorerUnavailable,
    /// Anything else; the computation did not complete
    Internal,
}

impl ErrorKind {
    /// Stable label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::ScorerUnavailable => "scorer_unavailable",
            Self::Internal => "internal",
        }
    }
}

impl Error {
    /// Create a new invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new scorer unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::ScorerUnavailable(msg.into())
    }

    /// Create a new model error
    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Classify this error into one of the three caller-visible categories
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::ScorerUnavailable(_) | Self::Timeout(_) => ErrorKind::ScorerUnavailable,
            Self::Model(_)
            | Self::Config(_)
            | Self::Io(_)
            | Self::Serialization(_)
            | Self::Internal(_) => ErrorKind::Internal,
        }
    }
}
