//! Topic-exchange message broker bindings.
//!
//! Workers share one topic exchange and each consumes from its own
//! exclusive, auto-named queue bound with a wildcard pattern. Deliveries
//! are acknowledged as they arrive, so processing is at-most-once.

mod amqp;
mod error;
mod memory;
mod topic;

pub use amqp::AmqpBroker;
pub use error::BrokerError;
pub use memory::MemoryBroker;
pub use topic::{validate_routing_key, TopicPattern};

use async_trait::async_trait;
use std::pin::Pin;
use tokio_stream::Stream;

/// A message taken off a worker queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub routing_key: String,
    pub body: Vec<u8>,
}

/// Stream of deliveries for one bound queue. Ends when the broker goes away.
pub type Subscription = Pin<Box<dyn Stream<Item = Result<Delivery, BrokerError>> + Send>>;

/// Publish/subscribe over a topic exchange.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Declare the shared durable topic exchange. Idempotent.
    async fn declare_exchange(&self, exchange: &str) -> Result<(), BrokerError>;

    /// Create an exclusive queue bound to `exchange` with `pattern` and
    /// start consuming from it.
    async fn subscribe(&self, exchange: &str, pattern: &str) -> Result<Subscription, BrokerError>;

    async fn publish(&self, exchange: &str, routing_key: &str, body: &[u8])
        -> Result<(), BrokerError>;
}
