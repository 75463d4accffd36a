//! Error types for conceptrag

use thiserror::Error;

/// Result type alias using ConceptRagError
pub type Result<T> = std::result::Result<T, ConceptRagError>;

/// Error type alias for convenience
pub type Error = ConceptRagError;

/// Exit codes for CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const NOT_FOUND: i32 = 2;
    pub const INVALID_INPUT: i32 = 3;
}

/// Main error type for conceptrag
///
/// Variants map onto the retry policy: `is_retryable` decides whether the
/// resilience kernel may re-issue an operation after this failure.
#[derive(Debug, Error)]
pub enum ConceptRagError {
    #[error("Concept not found: {0}")]
    ConceptNotFound(String),

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Source not found: {0}")]
    SourceNotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Transient I/O failure in {operation}: {message}")]
    TransientIo { operation: String, message: String },

    #[error("Circuit breaker open for {0}")]
    CircuitBreakerOpen(String),

    #[error("Bulkhead rejected {0}: queue full")]
    BulkheadRejection(String),

    #[error("Operation {0} timed out")]
    Timeout(String),

    #[error("Fatal: {0}")]
    Fatal(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Walk directory error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Seeding error: {0}")]
    Seed(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl ConceptRagError {
    /// Wrap an infrastructure failure with the operation that produced it
    pub fn transient(operation: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::TransientIo {
            operation: operation.into(),
            message: cause.to_string(),
        }
    }

    /// Whether the resilience kernel may retry after this error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransientIo { .. } | Self::Io(_) | Self::Http(_) | Self::Database(_)
        )
    }

    /// Whether this error represents a missing entity rather than a failure
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ConceptNotFound(_) | Self::CategoryNotFound(_) | Self::SourceNotFound(_)
        )
    }

    /// Stable kind tag used in tool-facing error payloads
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConceptNotFound(_) | Self::CategoryNotFound(_) | Self::SourceNotFound(_) => {
                "not_found"
            }
            Self::Validation(_) => "validation",
            Self::TransientIo { .. } | Self::Io(_) | Self::Http(_) => "transient_io",
            Self::CircuitBreakerOpen(_) => "circuit_breaker_open",
            Self::BulkheadRejection(_) => "bulkhead_rejection",
            Self::Timeout(_) => "timeout",
            Self::Fatal(_) => "fatal",
            Self::Database(_) => "database",
            Self::WalkDir(_) | Self::Serialization(_) | Self::Yaml(_) | Self::Regex(_) => {
                "internal"
            }
            Self::Embedding(_) => "embedding",
            Self::Search(_) => "search",
            Self::Seed(_) => "seed",
            Self::Other(_) => "internal",
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConceptNotFound(_) | Self::CategoryNotFound(_) | Self::SourceNotFound(_) => {
                exit_codes::NOT_FOUND
            }
            Self::Validation(_) => exit_codes::INVALID_INPUT,
            _ => exit_codes::GENERAL_ERROR,
        }
    }
}
