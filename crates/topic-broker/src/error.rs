//! Broker errors.

use thiserror::Error;

/// Broker-level failures. These are fatal to the worker that hits them.
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("AMQP error: {0}")]
    Amqp(#[from] lapin::Error),

    #[error("Invalid binding pattern `{0}`")]
    InvalidPattern(String),

    #[error("Invalid routing key `{0}`")]
    InvalidRoutingKey(String),

    #[error("Exchange `{0}` has not been declared")]
    UnknownExchange(String),

    #[error("Broker closed")]
    Closed,
}
