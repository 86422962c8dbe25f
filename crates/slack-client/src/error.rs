//! Slack client errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SlackError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Slack answered with `"ok": false`.
    #[error("{method} returned ok=false: {error}")]
    Api { method: &'static str, error: String },

    #[error("HTTP {status} from {method}")]
    Status { method: &'static str, status: u16 },

    #[error("Rate limited by Slack")]
    RateLimit,
}
