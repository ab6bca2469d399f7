//! Storage error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Required setting is missing (spreadsheet id, credentials, ...)
    #[error("Storage is not configured: {0}")]
    NotConfigured(String),

    /// The service sheet's first-data-row marker is empty or not a row number
    #[error("{0}")]
    BadFirstRow(String),

    #[error("Invalid service account key: {0}")]
    InvalidKey(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from Google
    #[error("API error: {status} {body}")]
    Api { status: u16, body: String },

    #[error("Token signing failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Blocking file task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, StoreError>;
