//! Error types for spotctl
//!
//! This module defines the error handling strategy for spotctl. There are two
//! error types: `SpotctlError` (main error enum) and `ConfigError`
//! (configuration-specific).
//!
//! ## Error Handling Philosophy
//!
//! Library code uses `crate::error::Result<T>` which returns `SpotctlError`.
//! CLI code uses `anyhow::Result<T>` for top-level error handling. The
//! conversion happens at the CLI boundary, preserving error chains.
//!
//! A failed zone or region lookup is never fatal: the discovery engine logs
//! it and drops that unit from the run. Only failures that occur before any
//! lookup task starts (bad configuration, unresolvable credentials) terminate
//! the process.
//!
//! ## Retry Awareness
//!
//! Errors implement `IsRetryable` so the backoff policy in `src/retry.rs` can
//! decide whether another attempt is worthwhile. Retries happen only inside
//! the ECS collaborator, at the transport layer; the discovery engine itself
//! never retries. `CloudProvider`, `Io`, and `Retryable` are retryable;
//! an API rejection carried in `Api` is not (resending an invalid request
//! cannot succeed), and neither are `Validation` or `Config`.

use thiserror::Error;

/// Main error type for spotctl
#[derive(Error, Debug)]
pub enum SpotctlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cloud provider error: {provider} - {message}")]
    CloudProvider {
        provider: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The API accepted the request and returned a structured rejection.
    #[error("API error: {code} - {message}")]
    Api { code: String, message: String },

    #[error("Credential resolution failed: {0}")]
    Credentials(String),

    #[error("Retryable error (attempt {attempt}/{max_attempts}): {reason}")]
    Retryable {
        attempt: u32,
        max_attempts: u32,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {field} - {reason}")]
    Validation { field: String, reason: String },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    #[allow(dead_code)] // Reserved for stricter config validation
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Failed to parse config: {0}")]
    ParseError(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, SpotctlError>;

/// Trait for determining if an error is retryable
///
/// Used by `ExponentialBackoff` in `src/retry.rs` to decide whether an
/// operation should be attempted again.
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for SpotctlError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            SpotctlError::Retryable { .. }
                | SpotctlError::CloudProvider { .. }
                | SpotctlError::Io(_)
        )
    }
}

/// First line of an error's display text, for one-line skip diagnostics.
pub fn first_line(err: &SpotctlError) -> String {
    err.to_string()
        .lines()
        .next()
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_errors_are_not_retryable() {
        let err = SpotctlError::Api {
            code: "InvalidInstanceType.NotSupported".to_string(),
            message: "The instance type is not supported".to_string(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_provider_errors_are_retryable() {
        let err = SpotctlError::CloudProvider {
            provider: "ecs".to_string(),
            message: "connection reset".to_string(),
            source: None,
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn test_first_line_truncates_multiline_messages() {
        let err = SpotctlError::CloudProvider {
            provider: "ecs".to_string(),
            message: "line one\nline two".to_string(),
            source: None,
        };
        let line = first_line(&err);
        assert_eq!(line, "Cloud provider error: ecs - line one");
    }
}
