//! Error types for the webdrops access layer.

use thiserror::Error;

/// Result type alias using WebdropsError.
pub type Result<T> = std::result::Result<T, WebdropsError>;

/// Primary error type for webdrops operations.
#[derive(Debug, Error)]
pub enum WebdropsError {
    // === Retryable ===
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Request to {url} failed{}: {message}", .status.map(|s| format!(" with HTTP {}", s)).unwrap_or_default())]
    Transport {
        url: String,
        status: Option<u16>,
        message: String,
    },

    // === Upstream contract violations ===
    #[error("Unexpected content type from {url}: expected {expected}, got {actual}")]
    ContentType {
        url: String,
        expected: String,
        actual: String,
    },

    #[error("Failed to decode {what}: {message}")]
    Decode { what: String, message: String },

    #[error("No common instant across {variables:?} near {requested}")]
    NoCommonInstant {
        requested: String,
        variables: Vec<String>,
    },

    // === Programming/configuration errors ===
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Worker task failed: {0}")]
    Worker(String),

    // === Wrapping ===
    #[error("{method} {url} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        method: String,
        url: String,
        attempts: u32,
        #[source]
        source: Box<WebdropsError>,
    },

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<WebdropsError>,
    },
}

impl WebdropsError {
    /// Whether the retrying client may spend another attempt on this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            WebdropsError::Auth(_) | WebdropsError::Transport { .. } => true,
            WebdropsError::Context { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Wrap this error with a description of the operation that failed.
    pub fn context(self, context: impl Into<String>) -> Self {
        WebdropsError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error, skipping retry and context wrappers.
    pub fn root(&self) -> &WebdropsError {
        match self {
            WebdropsError::RetriesExhausted { source, .. }
            | WebdropsError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    pub(crate) fn decode(what: impl Into<String>, err: impl std::fmt::Display) -> Self {
        WebdropsError::Decode {
            what: what.into(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for WebdropsError {
    fn from(err: serde_json::Error) -> Self {
        WebdropsError::decode("JSON body", err)
    }
}
