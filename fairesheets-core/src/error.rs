//! Error types for grid compilation and remote application

use thiserror::Error;

/// Main error type for FAIReSheets operations
#[derive(Error, Debug)]
pub enum FaireError {
    /// Malformed or missing checklist column/value. Fatal, raised before any
    /// remote call is made.
    #[error("Schema error: {message}")]
    Schema {
        /// Error message
        message: String,
        /// Location in the checklist if available (e.g. a row number)
        location: Option<String>,
    },

    /// Selection parameters that reference no fields. Callers degrade to an
    /// empty-but-valid grid rather than substituting defaults.
    #[error("Validation error: {message}")]
    Validation {
        /// Error message
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Non-quota remote failure (permission, not-found, malformed request).
    /// Never retried; retrying a structurally invalid request wastes quota.
    #[error("Remote error: {message}")]
    Remote {
        /// Error message reported by the remote service
        message: String,
    },

    /// A chunk exhausted its retry budget against the write quota. Carries
    /// the index of the first unapplied chunk so a caller can resume.
    #[error("Quota exhausted after {attempts} attempts; first unapplied chunk is {chunk_index}")]
    QuotaExhausted {
        /// Index of the first chunk that was not applied
        chunk_index: usize,
        /// Number of attempts made on that chunk
        attempts: u32,
    },
}

/// Result type alias for FAIReSheets operations
pub type Result<T> = std::result::Result<T, FaireError>;

impl FaireError {
    /// Create a new schema error
    #[must_use]
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
            location: None,
        }
    }

    /// Create a new schema error with a location
    #[must_use]
    pub fn schema_at(message: impl Into<String>, location: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
            location: Some(location.into()),
        }
    }

    /// Create a new validation error
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a new serialization error
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Create a new remote error
    #[must_use]
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }

    /// Create a quota-exhausted error for the given chunk
    #[must_use]
    pub fn quota_exhausted(chunk_index: usize, attempts: u32) -> Self {
        Self::QuotaExhausted {
            chunk_index,
            attempts,
        }
    }

    /// True for errors that are terminal-but-resumable (quota exhaustion)
    #[must_use]
    pub fn is_resumable(&self) -> bool {
        matches!(self, Self::QuotaExhausted { .. })
    }
}

// Implement conversions for common error types
impl From<serde_json::Error> for FaireError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for FaireError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for FaireError {
    fn from(err: anyhow::Error) -> Self {
        Self::Remote {
            message: err.to_string(),
        }
    }
}
