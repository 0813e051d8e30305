//! Error types for docsieve

/// Result type alias using docsieve's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for docsieve operations
///
/// Per-item classification failures are not errors: they travel as
/// [`AttemptOutcome`](crate::AttemptOutcome) values. This type covers setup
/// and API misuse, which abort a run before or after the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Classifier construction errors
    #[error("classifier error: {0}")]
    Classifier(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// An operation was called out of order (e.g. finalizing an open aggregator)
    #[error("usage error: {0}")]
    Usage(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new classifier error
    pub fn classifier(msg: impl Into<String>) -> Self {
        Self::Classifier(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new usage error
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
