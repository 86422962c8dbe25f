//! In-process topic exchange.

use crate::error::BrokerError;
use crate::topic::{validate_routing_key, TopicPattern};
use crate::{Broker, Delivery, Subscription};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, trace};

struct Binding {
    pattern: TopicPattern,
    tx: mpsc::UnboundedSender<Delivery>,
}

/// Broker that routes within the current process. Each subscription acts
/// like an exclusive queue: it receives its own copy of every matching
/// message, and it disappears once its stream is dropped.
#[derive(Default)]
pub struct MemoryBroker {
    exchanges: Mutex<HashMap<String, Vec<Binding>>>,
    published: AtomicUsize,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages accepted by [`Broker::publish`], delivered or not.
    pub fn published(&self) -> usize {
        self.published.load(Ordering::SeqCst)
    }

    /// Drop every binding, ending all open subscriptions.
    pub fn close(&self) {
        if let Ok(mut exchanges) = self.exchanges.lock() {
            for bindings in exchanges.values_mut() {
                bindings.clear();
            }
        }
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn declare_exchange(&self, exchange: &str) -> Result<(), BrokerError> {
        let mut exchanges = self.exchanges.lock().map_err(|_| BrokerError::Closed)?;
        exchanges.entry(exchange.to_string()).or_default();
        debug!("Declared exchange {}", exchange);
        Ok(())
    }

    async fn subscribe(&self, exchange: &str, pattern: &str) -> Result<Subscription, BrokerError> {
        let pattern = TopicPattern::parse(pattern)?;
        let mut exchanges = self.exchanges.lock().map_err(|_| BrokerError::Closed)?;
        let bindings = exchanges
            .get_mut(exchange)
            .ok_or_else(|| BrokerError::UnknownExchange(exchange.to_string()))?;

        let (tx, rx) = mpsc::unbounded_channel();
        debug!("Bound queue to {} with {}", exchange, pattern);
        bindings.push(Binding { pattern, tx });

        Ok(Box::pin(UnboundedReceiverStream::new(rx).map(Ok)))
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        body: &[u8],
    ) -> Result<(), BrokerError> {
        validate_routing_key(routing_key)?;
        let mut exchanges = self.exchanges.lock().map_err(|_| BrokerError::Closed)?;
        let bindings = exchanges
            .get_mut(exchange)
            .ok_or_else(|| BrokerError::UnknownExchange(exchange.to_string()))?;

        self.published.fetch_add(1, Ordering::SeqCst);
        bindings.retain(|b| !b.tx.is_closed());
        for binding in bindings.iter().filter(|b| b.pattern.matches(routing_key)) {
            let delivery = Delivery {
                routing_key: routing_key.to_string(),
                body: body.to_vec(),
            };
            if binding.tx.send(delivery).is_err() {
                trace!("Queue for {} went away", binding.pattern);
            }
        }
        Ok(())
    }
}
