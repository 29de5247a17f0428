//! Error types for vidresolve

use thiserror::Error;

/// Main error type for resolution operations
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("URL {url} is not handled by the {decoder} decoder")]
    UrlMismatch { decoder: &'static str, url: String },

    #[error("{context}: failed to extract {what}")]
    ExtractionFailure { context: String, what: String },

    #[error("Remote unavailable ({status}) at {url}: {reason}")]
    RemoteUnavailable {
        status: u16,
        url: String,
        reason: String,
    },

    #[error("Decode corruption: {0}")]
    DecodeCorruption(String),

    #[error("No decoder registered for {0}")]
    NoDecoder(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),
}

impl ResolveError {
    /// Shorthand for a missing regex/selector capture
    pub fn extraction(context: impl Into<String>, what: impl Into<String>) -> Self {
        ResolveError::ExtractionFailure {
            context: context.into(),
            what: what.into(),
        }
    }

    /// Shorthand for a cipher/unpacker result that is structurally invalid
    pub fn corruption(message: impl Into<String>) -> Self {
        ResolveError::DecodeCorruption(message.into())
    }

    /// The "video is gone" class of remote response
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ResolveError::RemoteUnavailable { .. })
    }

    /// Whether the error must reach the caller instead of degrading to an empty result
    pub fn is_fatal(&self) -> bool {
        !self.is_unavailable()
    }
}
