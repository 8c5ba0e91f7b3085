//! NATS JetStream event bus
//!
//! Implements `EventBus` on top of a JetStream producer. Each provider's
//! id becomes the last token of the subject, so downstream consumers can
//! partition by provider.

mod client;
mod config;

pub use client::NatsClient;
pub use config::{NatsConfig, StorageType};

use crate::bus::{EventBus, EventBusFactory};
use crate::error::Result;
use crate::types::IntegrationEvent;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// NATS JetStream event bus
pub struct NatsEventBus {
    client: NatsClient,
}

impl NatsEventBus {
    /// Connect to NATS and initialize the JetStream stream
    pub async fn connect(config: NatsConfig) -> Result<Self> {
        let client = NatsClient::connect(config).await?;
        Ok(Self { client })
    }

    /// Get the underlying NATS client for advanced usage
    pub fn client(&self) -> &NatsClient {
        &self.client
    }
}

#[async_trait]
impl EventBus for NatsEventBus {
    async fn publish(&self, event: &IntegrationEvent) -> Result<()> {
        self.client.publish(event).await.map(|_| ())
    }

    fn name(&self) -> &str {
        "nats"
    }
}

/// Hands out NATS buses to providers
///
/// By default one connection is opened lazily and shared by the whole
/// fleet. With `per_worker_connection` every provider gets its own.
pub struct NatsEventBusFactory {
    config: NatsConfig,
    shared: OnceCell<Arc<NatsEventBus>>,
}

impl NatsEventBusFactory {
    pub fn new(config: NatsConfig) -> Self {
        Self {
            config,
            shared: OnceCell::new(),
        }
    }
}

#[async_trait]
impl EventBusFactory for NatsEventBusFactory {
    async fn create(&self) -> Result<Arc<dyn EventBus>> {
        if self.config.per_worker_connection {
            let bus = NatsEventBus::connect(self.config.clone()).await?;
            return Ok(Arc::new(bus));
        }

        let bus = self
            .shared
            .get_or_try_init(|| async {
                NatsEventBus::connect(self.config.clone()).await.map(Arc::new)
            })
            .await?;
        let bus: Arc<dyn EventBus> = bus.clone();
        Ok(bus)
    }
}
