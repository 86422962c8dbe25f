//! Client for the external cloud operations service.
//!
//! Storage transfers, bucket and service-account management and volume
//! processing all happen behind this service; the bot only forwards
//! parameters and formats what comes back.

mod client;
mod error;
mod types;

pub use client::OpsClient;
pub use error::OpsError;
pub use types::*;
