//! Error types for autosnap-provider

use thiserror::Error;

/// Errors raised by a cloud provider backend.
///
/// Transient and permanent failures are not distinguished; callers treat
/// every variant as fatal for the current run.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Provider CLI binary not found
    #[error("provider CLI `{binary}` is not installed or not in PATH")]
    CliNotFound { binary: String },

    /// Provider CLI exited unsuccessfully without a recognisable API error
    #[error("{operation} failed (exit code {exit_code}): {stderr}")]
    CommandFailed {
        operation: String,
        exit_code: i32,
        stderr: String,
    },

    /// The provider API rejected the request
    #[error("{operation} rejected by provider ({code}): {message}")]
    Api {
        operation: String,
        code: String,
        message: String,
    },

    /// Resource does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Response could not be interpreted
    #[error("invalid response from {operation}: {reason}")]
    InvalidResponse { operation: String, reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProviderError {
    /// Error code reported by the provider API, if any.
    pub fn api_code(&self) -> Option<&str> {
        match self {
            ProviderError::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}
