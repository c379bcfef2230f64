use std::result::Result as StdResult;

use thiserror::Error;

/// Error type that captures failures while loading, resolving or submitting a form.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Remote list returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Lookup data has not been loaded yet")]
    LookupPending,
    #[error("CDOA selection not found: {0}")]
    CdoaNotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = StdResult<T, FormError>;
