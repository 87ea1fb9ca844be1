//! Transport-level errors and their mapping onto the catalog taxonomy.

use dex_core::DexError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unexpected response: HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Cannot build request URL from {0}")]
    InvalidUrl(String),
}

impl From<ClientError> for DexError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::NotFound(what) => DexError::not_found(what),
            ClientError::Serde(e) => DexError::decode(e.to_string()),
            ClientError::Http(e) if e.is_decode() => DexError::decode(e.to_string()),
            other => DexError::transport(other.to_string()),
        }
    }
}
