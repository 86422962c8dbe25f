//! Operations client errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Authentication with the operations service failed")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation {operation} failed ({status}): {message}")]
    Api {
        operation: String,
        status: u16,
        message: String,
    },
}
