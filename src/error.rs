//! Error types for word-ranker.
//!
//! One enum per concern. `main` wraps these in `anyhow` with context.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting (flag or environment variable) was not provided.
    #[error("missing required setting: {name}")]
    MissingSetting { name: &'static str },

    /// Batch size must be at least one word.
    #[error("invalid batch size {value}: must be greater than zero")]
    InvalidBatchSize { value: usize },

    /// Cost per call must be a finite, non-negative number.
    #[error("invalid cost per call {value}: must be a finite non-negative number")]
    InvalidCost { value: f64 },

    /// Path exists but is not a directory (when a directory was expected).
    #[error("path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// The reference phrase was empty after trimming.
    #[error("compare phrase must not be empty")]
    EmptyPhrase,
}

/// Errors from the word extractor.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to list directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the external scoring service.
///
/// Any of these aborts the run unless a transport retry policy absorbs it.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Network, timeout or body decoding failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-success HTTP status.
    #[error("service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The service answered 2xx but without any completion text.
    #[error("service response contained no completion content")]
    EmptyCompletion,
}

impl ServiceError {
    /// Whether a transport retry policy may try the call again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Transport(e) => e.is_timeout() || e.is_connect(),
            ServiceError::Status { status, .. } => *status == 429 || *status >= 500,
            ServiceError::EmptyCompletion => false,
        }
    }
}

/// A scoring response that failed validation. The whole batch is rejected.
#[derive(Debug, Error, PartialEq)]
pub enum ResponseError {
    #[error("line {line_no} is missing the `word: score` separator: {line:?}")]
    MissingSeparator { line_no: usize, line: String },

    #[error("line {line_no} has an empty word: {line:?}")]
    EmptyWord { line_no: usize, line: String },

    #[error("line {line_no} has a non-numeric score: {line:?}")]
    BadScore { line_no: usize, line: String },
}

/// Errors while persisting results.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write run ledger {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_retry_only_on_throttle_and_server_side() {
        let throttled = ServiceError::Status { status: 429, body: String::new() };
        let unavailable = ServiceError::Status { status: 503, body: String::new() };
        let bad_request = ServiceError::Status { status: 400, body: String::new() };
        let unauthorized = ServiceError::Status { status: 401, body: String::new() };

        assert!(throttled.is_retryable());
        assert!(unavailable.is_retryable());
        assert!(!bad_request.is_retryable());
        assert!(!unauthorized.is_retryable());
        assert!(!ServiceError::EmptyCompletion.is_retryable());
    }

    #[test]
    fn response_error_names_the_offending_line() {
        let err = ResponseError::MissingSeparator { line_no: 2, line: "badline".into() };
        assert_eq!(
            err.to_string(),
            "line 2 is missing the `word: score` separator: \"badline\""
        );
    }
}
