//! Error types for the prompt relay.
//!
//! Every client and service operation fails with exactly one [`PromptError`].
//! The four variants are data, not a hierarchy: callers match on them
//! exhaustively to decide whether to surface, retry later, or ask the user
//! for different input.

use serde_json::Value;
use thiserror::Error;

/// Main error type for prompt operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PromptError {
    /// The upstream returned a non-success status, or the call timed out or
    /// failed at the network level.
    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        /// Structured body (or raw text) returned by the upstream.
        details: Option<Value>,
    },

    /// Input rejected locally before any network call.
    #[error("Validation error for {field}: {constraint}")]
    Validation { field: String, constraint: String },

    /// Credentials missing locally or rejected upstream (401/403).
    #[error("Authentication error: {message}")]
    Authentication { message: String },

    /// Upstream answered 429.
    #[error("Rate limited, retry after {retry_after_secs} seconds")]
    RateLimit { retry_after_secs: u64 },
}

/// Result type alias for prompt operations.
pub type Result<T> = std::result::Result<T, PromptError>;

impl PromptError {
    /// Status used for calls that exceed the per-request timeout.
    pub const TIMEOUT_STATUS: u16 = 408;
    /// Status synthesized for operations the upstream does not offer.
    pub const NOT_IMPLEMENTED_STATUS: u16 = 501;
    /// Status synthesized for connection-level failures.
    pub const NETWORK_STATUS: u16 = 503;

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        PromptError::Api {
            status,
            message: message.into(),
            details: None,
        }
    }

    pub fn api_with_details(status: u16, message: impl Into<String>, details: Value) -> Self {
        PromptError::Api {
            status,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn validation(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        PromptError::Validation {
            field: field.into(),
            constraint: constraint.into(),
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        PromptError::Authentication {
            message: message.into(),
        }
    }

    pub fn timeout() -> Self {
        PromptError::api(Self::TIMEOUT_STATUS, "Request timeout")
    }

    /// Stable machine-readable tag for this error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            PromptError::Api { .. } => "api_error",
            PromptError::Validation { .. } => "validation_error",
            PromptError::Authentication { .. } => "authentication_error",
            PromptError::RateLimit { .. } => "rate_limit_error",
        }
    }

    /// HTTP status carried by an API error.
    pub fn status(&self) -> Option<u16> {
        match self {
            PromptError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if trying the same call again later may succeed.
    ///
    /// Timeouts and server-side failures qualify, except 501, which is
    /// permanent. Rate limiting is left to the caller. This is a hint for
    /// callers of a surfaced error; the client's own retry loop decides per
    /// attempt and does not retry an upstream 408.
    pub fn is_retryable(&self) -> bool {
        match self {
            PromptError::Api { status, .. } => {
                *status == Self::TIMEOUT_STATUS
                    || (*status >= 500 && *status != Self::NOT_IMPLEMENTED_STATUS)
            }
            PromptError::Validation { .. }
            | PromptError::Authentication { .. }
            | PromptError::RateLimit { .. } => false,
        }
    }

    /// Convert to a JSON-RPC error code.
    ///
    /// Application-defined codes (-32000 to -32099):
    /// - -32000: Upstream API error
    /// - -32001: Authentication error
    /// - -32002: Rate limited
    /// - -32005: Validation error
    pub fn to_rpc_error_code(&self) -> i32 {
        match self {
            PromptError::Api { .. } => -32000,
            PromptError::Authentication { .. } => -32001,
            PromptError::RateLimit { .. } => -32002,
            PromptError::Validation { .. } => -32005,
        }
    }
}
