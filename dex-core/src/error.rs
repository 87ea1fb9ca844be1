//! Error types for dex operations

use thiserror::Error;

/// Master error type for catalog operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DexError {
    #[error("Transport failure: {reason}")]
    Transport { reason: String },

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Failed to decode response: {reason}")]
    Decode { reason: String },

    #[error("Invalid config value for {field}: {reason}")]
    Config { field: &'static str, reason: String },

    #[error("Internal error: {reason}")]
    Internal { reason: String },
}

impl DexError {
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
        }
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal {
            reason: reason.into(),
        }
    }

    /// `true` only for the NotFound class; everything else is a transport-class failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<serde_json::Error> for DexError {
    fn from(err: serde_json::Error) -> Self {
        Self::decode(err.to_string())
    }
}

/// Result type alias for dex operations.
pub type DexResult<T> = Result<T, DexError>;
