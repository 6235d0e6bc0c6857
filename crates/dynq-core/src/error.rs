//! Error types for DYNQ

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core error type for DYNQ operations
#[derive(Error, Debug)]
pub enum DynqError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Decode(String),

    #[error("{0}")]
    Remote(String),

    #[error("query cancelled: {0}")]
    Cancelled(String),

    #[error("{0}")]
    Timeout(String),

    #[error("{0}")]
    LimitExceeded(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DynqError {
    /// Wrap this error with a context prefix, keeping its classification
    pub fn context(self, prefix: impl std::fmt::Display) -> Self {
        match self {
            Self::Validation(msg) => Self::Validation(format!("{}: {}", prefix, msg)),
            Self::Decode(msg) => Self::Decode(format!("{}: {}", prefix, msg)),
            Self::Remote(msg) => Self::Remote(format!("{}: {}", prefix, msg)),
            Self::Timeout(msg) => Self::Timeout(format!("{}: {}", prefix, msg)),
            Self::LimitExceeded(msg) => Self::LimitExceeded(format!("{}: {}", prefix, msg)),
            Self::Configuration(msg) => Self::Configuration(format!("{}: {}", prefix, msg)),
            Self::Serialization(err) => Self::Decode(format!("{}: {}", prefix, err)),
            other => other,
        }
    }

    /// Classify the error the way the host reports it
    pub fn status(&self) -> ErrorStatus {
        match self {
            Self::Validation(_)
            | Self::Decode(_)
            | Self::Remote(_)
            | Self::Cancelled(_)
            | Self::Timeout(_)
            | Self::LimitExceeded(_) => ErrorStatus::BadRequest,
            Self::NotFound(_) => ErrorStatus::NotFound,
            Self::Forbidden(_) => ErrorStatus::Forbidden,
            Self::Configuration(_) | Self::Serialization(_) => ErrorStatus::Internal,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

/// Host-facing error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStatus {
    BadRequest,
    NotFound,
    Forbidden,
    Internal,
}

impl ErrorStatus {
    /// HTTP-style status code for resource responses
    pub fn code(&self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Internal => 500,
        }
    }
}

/// Error payload returned to the host in place of a frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: ErrorStatus,
    pub message: String,
}

impl From<&DynqError> for ErrorResponse {
    fn from(err: &DynqError) -> Self {
        Self {
            status: err.status(),
            message: err.to_string(),
        }
    }
}

impl From<DynqError> for ErrorResponse {
    fn from(err: DynqError) -> Self {
        Self::from(&err)
    }
}

/// Result type alias for DYNQ operations
pub type Result<T> = std::result::Result<T, DynqError>;
