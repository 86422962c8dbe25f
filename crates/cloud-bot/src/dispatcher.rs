//! Binds a worker to the shared topic exchange and feeds it deliveries.

use crate::envelope::MessageHandler;
use crate::error::AppResult;
use std::sync::Arc;
use tokio_stream::StreamExt;
use topic_broker::{Broker, BrokerError, Subscription};
use tracing::{info, warn};

/// One worker's view of the broker: an exchange and a binding pattern.
pub struct Dispatcher {
    broker: Arc<dyn Broker>,
    exchange: String,
    binding_key: String,
}

impl Dispatcher {
    pub fn new(
        broker: Arc<dyn Broker>,
        exchange: impl Into<String>,
        binding_key: impl Into<String>,
    ) -> Self {
        Self {
            broker,
            exchange: exchange.into(),
            binding_key: binding_key.into(),
        }
    }

    /// Declare the exchange and bind this worker's queue.
    pub async fn bind(&self) -> AppResult<Subscription> {
        self.broker.declare_exchange(&self.exchange).await?;
        let subscription = self
            .broker
            .subscribe(&self.exchange, &self.binding_key)
            .await?;
        info!(
            exchange = %self.exchange,
            binding_key = %self.binding_key,
            "Waiting for work"
        );
        Ok(subscription)
    }

    /// Handle deliveries one at a time until the broker goes away.
    ///
    /// Deliveries are already acknowledged, so a message whose handling
    /// fails is dropped. Only broker faults end the loop, always with an
    /// error.
    pub async fn serve(
        &self,
        mut subscription: Subscription,
        handler: &dyn MessageHandler,
    ) -> AppResult<()> {
        while let Some(delivery) = subscription.next().await {
            let delivery = delivery?;
            if let Err(e) = handler.handle(&delivery).await {
                warn!(routing_key = %delivery.routing_key, "Dropped message: {}", e);
            }
        }
        Err(BrokerError::Closed.into())
    }

    pub async fn run(&self, handler: &dyn MessageHandler) -> AppResult<()> {
        let subscription = self.bind().await?;
        self.serve(subscription, handler).await
    }
}
