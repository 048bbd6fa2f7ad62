//! Error types for the nanoforge generation pipeline.

use std::fmt;
use thiserror::Error;

/// Classification of a single failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttemptErrorKind {
    /// Connectivity failure, timeout, or unreadable response body
    RetryableNetwork,
    /// 4xx response (bad request, auth, not found, quota)
    ClientRejected,
    /// 5xx or other non-success response
    ServerRejected,
    /// 2xx response without usable content, or a safety block
    Malformed,
}

impl fmt::Display for AttemptErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AttemptErrorKind::RetryableNetwork => "network",
            AttemptErrorKind::ClientRejected => "client_rejected",
            AttemptErrorKind::ServerRejected => "server_rejected",
            AttemptErrorKind::Malformed => "malformed",
        };
        f.write_str(label)
    }
}

/// Failure of one generation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct AttemptError {
    pub kind: AttemptErrorKind,
    pub message: String,
    pub http_status: Option<u16>,
}

impl AttemptError {
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: AttemptErrorKind::RetryableNetwork,
            message: message.into(),
            http_status: None,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: AttemptErrorKind::Malformed,
            message: message.into(),
            http_status: None,
        }
    }

    /// Build an error from a non-success HTTP status.
    ///
    /// 4xx statuses become `ClientRejected`; anything else `ServerRejected`.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let kind = if (400..500).contains(&status) {
            AttemptErrorKind::ClientRejected
        } else {
            AttemptErrorKind::ServerRejected
        };
        Self {
            kind,
            message: message.into(),
            http_status: Some(status),
        }
    }
}

/// Errors that know whether another attempt could succeed.
pub trait RetryableError {
    /// Returns true for terminal failures that must not consume further attempts.
    fn is_terminal(&self) -> bool;
}

impl RetryableError for AttemptError {
    fn is_terminal(&self) -> bool {
        if let Some(status) = self.http_status {
            if (400..500).contains(&status) {
                return true;
            }
        }
        matches!(
            self.kind,
            AttemptErrorKind::ClientRejected | AttemptErrorKind::Malformed
        )
    }
}

/// Crate-level errors surfaced to callers and the CLI
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("API key not configured: set {0} or api.api_key in config")]
    MissingApiKey(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Provider request failed: {0}")]
    ProviderRequestFailed(#[from] AttemptError),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Refinement failed: {0}")]
    RefinementFailed(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
