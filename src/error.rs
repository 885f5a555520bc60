//! Error types for the product provider.

use thiserror::Error;

use crate::schema::Diagnostic;

/// Errors that can occur while reconciling or managing a product.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested resource was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A local validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A structural or programming error: an empty required slot, an
    /// unsupported wire variant. Never retried, never defaulted away.
    #[error("Internal error: {0}")]
    Internal(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Permission denied (authentication/authorization failure).
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Quota or rate limit exceeded.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Service temporarily unavailable.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// A single remote request timed out.
    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// Operation failed due to current remote state, e.g. a version conflict.
    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    /// Operation not implemented.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// The remote rejected the request as invalid.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A retried remote call kept failing until its budget ran out.
    #[error("{operation} still failing after {attempts} attempt(s): {last}")]
    RetriesExhausted {
        /// The name of the retried operation.
        operation: String,
        /// How many attempts were made.
        attempts: u32,
        /// The error returned by the final attempt.
        last: Box<ProviderError>,
    },

    /// A lifecycle operation failed; `summary` is the short user-facing title.
    #[error("{summary}: {source}")]
    Operation {
        /// Short title, e.g. "Error creating product".
        summary: String,
        /// The underlying failure.
        #[source]
        source: Box<ProviderError>,
    },
}

impl ProviderError {
    /// Get the error message as a string.
    ///
    /// Returns a reference to the error message for any variant.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg) => msg,
            Self::Validation(msg) => msg,
            Self::Internal(msg) => msg,
            Self::Configuration(msg) => msg,
            Self::Serialization(_err) => "serialization error (see Debug output)",
            Self::PermissionDenied(msg) => msg,
            Self::ResourceExhausted(msg) => msg,
            Self::Unavailable(msg) => msg,
            Self::DeadlineExceeded(msg) => msg,
            Self::FailedPrecondition(msg) => msg,
            Self::Unimplemented(msg) => msg,
            Self::InvalidRequest(msg) => msg,
            Self::RetriesExhausted { last, .. } => last.message(),
            Self::Operation { source, .. } => source.message(),
        }
    }

    /// Wrap this error with a short lifecycle summary.
    pub fn in_operation(self, summary: impl Into<String>) -> Self {
        Self::Operation {
            summary: summary.into(),
            source: Box::new(self),
        }
    }

    /// Whether a remote call that failed with this error may be retried.
    ///
    /// Transient failures (network, 5xx, rate limiting, request timeouts) are
    /// retryable. Everything the remote rejected on its merits is not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable(_) | Self::ResourceExhausted(_) | Self::DeadlineExceeded(_)
        )
    }

    /// Whether this error (or the error it wraps) means the resource is gone.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Operation { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Classify an HTTP status code returned by the platform API.
    ///
    /// Remote client implementations use this so that retry decisions stay a
    /// pure function of the returned error.
    pub fn from_http_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::PermissionDenied(message),
            404 => Self::NotFound(message),
            408 => Self::DeadlineExceeded(message),
            409 => Self::FailedPrecondition(message),
            429 => Self::ResourceExhausted(message),
            501 => Self::Unimplemented(message),
            500..=599 => Self::Unavailable(message),
            _ => Self::InvalidRequest(message),
        }
    }

    /// Convert this error into an error diagnostic.
    ///
    /// Operation errors keep their short summary as the title and carry the
    /// underlying error text as detail.
    pub fn diagnostic(&self) -> Diagnostic {
        match self {
            Self::Operation { summary, source } => {
                Diagnostic::error(summary.clone()).with_detail(source.to_string())
            },
            other => Diagnostic::error(other.to_string()),
        }
    }
}
