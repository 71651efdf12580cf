//! Core error types for quizroom-core.
//!
//! Every failure the session can run into is recovered locally by the
//! controller; these types exist so the recovery paths can say what went
//! wrong. Only configuration and validation errors ever reach a caller
//! as a hard failure, and only before a session starts.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for quizroom-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Question source errors
    #[error("Question fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Hint source errors
    #[error("Hint error: {0}")]
    Hint(#[from] HintError),

    /// Report sink errors
    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The question source could not hand out a question.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Connection failed or timed out
    #[error("question source unreachable: {0}")]
    Unreachable(String),

    /// Non-200 answer (404 when the category is exhausted)
    #[error("question source returned HTTP {status} for category '{category}'")]
    Status { status: u16, category: String },

    /// Body did not decode into a usable question
    #[error("malformed question: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Whether the source reported the category as exhausted.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, FetchError::Status { status: 404, .. })
    }
}

/// The hint source failed. Shown to the player as a fallback chat line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HintError {
    #[error("hint source unreachable: {0}")]
    Unreachable(String),

    #[error("hint source returned HTTP {0}")]
    Status(u16),

    #[error("malformed hint response: {0}")]
    Malformed(String),
}

/// The report sink refused the final results.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("report sink unreachable: {0}")]
    Unreachable(String),

    #[error("report sink returned HTTP {0}")]
    Status(u16),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Home/config directory could not be resolved or created
    #[error("Config directory unavailable: {0}")]
    DirectoryUnavailable(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A session needs at least one round
    #[error("total_rounds must be greater than zero")]
    ZeroRounds,

    /// A round needs a time limit
    #[error("time_limit_secs must be greater than zero")]
    ZeroTimeLimit,

    /// Every theme is switched off
    #[error("at least one theme must be enabled")]
    NoThemes,

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Malformed(err.to_string())
        } else {
            FetchError::Unreachable(err.to_string())
        }
    }
}

impl From<reqwest::Error> for HintError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            HintError::Malformed(err.to_string())
        } else {
            HintError::Unreachable(err.to_string())
        }
    }
}

impl From<reqwest::Error> for ReportError {
    fn from(err: reqwest::Error) -> Self {
        ReportError::Unreachable(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
