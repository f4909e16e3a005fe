// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error types for the Cadi orchestrator.
//!
//! This module provides strongly-typed errors for different parts of the application,
//! using `thiserror` for ergonomic error definitions and `anyhow` for error propagation.

use thiserror::Error;

/// Errors that can occur when talking to an LLM backend.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("API error: {message}")]
    ApiError {
        message: String,
        status_code: Option<u16>,
    },

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Response parsing error: {0}")]
    ParseError(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),
}

impl ProviderError {
    /// Create an API error with status code.
    pub fn api(message: impl Into<String>, status_code: u16) -> Self {
        Self::ApiError {
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Transient failures count against the pipeline retry budget;
    /// they are never surfaced across the session boundary.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited(_) | Self::NetworkError(_) | Self::Timeout(_) => true,
            Self::ApiError {
                status_code: Some(code),
                ..
            } => *code >= 500,
            _ => false,
        }
    }

    /// Permanent failures (auth/quota/configuration) are surfaced to the user
    /// as a system message without changing the conversation phase.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::AuthError(_)
                | Self::QuotaExceeded(_)
                | Self::NotConfigured(_)
                | Self::ModelNotFound(_)
        )
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(0)
        } else if let Some(status) = err.status() {
            Self::ApiError {
                message: err.to_string(),
                status_code: Some(status.as_u16()),
            }
        } else {
            Self::NetworkError(err.to_string())
        }
    }
}

/// Errors from the sandboxed CAD executor adapter.
///
/// Script failures are NOT errors at this level - they come back as a
/// structured [`crate::executor::ExecutionOutcome`]. These variants cover the
/// adapter itself misbehaving.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Execution timed out after {0} seconds")]
    Timeout(u64),

    #[error("Executor returned malformed output: {0}")]
    MalformedOutput(String),

    #[error("Failed to spawn executor process: {0}")]
    SpawnFailed(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for ExecutorError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

/// Errors that can occur during session operations.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Errors raised by the agent pipeline before any stage runs.
///
/// Stage failures never surface as errors - they are recorded as trace
/// messages and folded into the [`crate::pipeline::PipelineResult`] - so
/// rejected input is the only way a run can fail outright.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("IO error reading config: {0}")]
    IoError(String),

    #[error("YAML parsing error: {0}")]
    YamlError(String),

    #[error("JSON parsing error: {0}")]
    JsonError(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            _ => Self::IoError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::YamlError(err.to_string())
    }
}

/// Result type alias using anyhow for flexible error handling.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_transient() {
        assert!(ProviderError::RateLimited("wait 1s".to_string()).is_transient());
        assert!(ProviderError::NetworkError("reset".to_string()).is_transient());
        assert!(ProviderError::Timeout(60000).is_transient());
        assert!(ProviderError::api("upstream down", 503).is_transient());
        assert!(!ProviderError::api("bad request", 400).is_transient());
        assert!(!ProviderError::AuthError("invalid key".to_string()).is_transient());
    }

    #[test]
    fn test_provider_error_permanent() {
        assert!(ProviderError::AuthError("invalid key".to_string()).is_permanent());
        assert!(ProviderError::QuotaExceeded("monthly cap".to_string()).is_permanent());
        assert!(ProviderError::NotConfigured("no key".to_string()).is_permanent());
        assert!(!ProviderError::Timeout(100).is_permanent());
        assert!(!ProviderError::ParseError("not json".to_string()).is_permanent());
    }

    #[test]
    fn test_executor_error_display() {
        let err = ExecutorError::Timeout(30);
        assert!(format!("{}", err).contains("30 seconds"));
    }

    #[test]
    fn test_config_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let config_err: ConfigError = io_err.into();
        assert!(matches!(config_err, ConfigError::NotFound(_)));
    }
}
