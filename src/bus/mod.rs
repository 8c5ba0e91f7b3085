//! Event bus trait: the publishing seam between providers and a transport
//!
//! Providers only ever see `EventBus`. Backends (NATS, in-memory, etc.)
//! implement it and are handed out to workers by an `EventBusFactory`.

use crate::error::Result;
use crate::types::IntegrationEvent;
use async_trait::async_trait;
use std::sync::Arc;

pub mod memory;
pub mod nats;

/// Publishing capability used by provider workers
///
/// Implementations must tolerate concurrent `publish` calls from many
/// workers; a single instance may be shared by the whole fleet.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish a keyed event
    ///
    /// The envelope payload is opaque to the bus; `event.key` is used for
    /// routing/partitioning by the transport.
    async fn publish(&self, event: &IntegrationEvent) -> Result<()>;

    /// Backend name (e.g., "nats", "memory")
    fn name(&self) -> &str;
}

/// Source of event bus instances for newly spawned providers
///
/// May return a shared instance or a fresh one per call.
#[async_trait]
pub trait EventBusFactory: Send + Sync {
    /// Produce the bus for one provider
    async fn create(&self) -> Result<Arc<dyn EventBus>>;
}

/// Factory handing every provider the same bus
#[derive(Clone)]
pub struct SharedEventBus {
    bus: Arc<dyn EventBus>,
}

impl SharedEventBus {
    pub fn new(bus: impl EventBus + 'static) -> Self {
        Self { bus: Arc::new(bus) }
    }

    /// Wrap an already shared bus
    pub fn from_arc(bus: Arc<dyn EventBus>) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> Arc<dyn EventBus> {
        self.bus.clone()
    }
}

#[async_trait]
impl EventBusFactory for SharedEventBus {
    async fn create(&self) -> Result<Arc<dyn EventBus>> {
        Ok(self.bus.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::memory::MemoryEventBus;
    use crate::types::{ProviderId, ProviderLocationUpdated};

    #[tokio::test]
    async fn test_shared_factory_returns_same_bus() {
        let memory = Arc::new(MemoryEventBus::default());
        let factory = SharedEventBus::from_arc(memory.clone());

        let a = factory.create().await.unwrap();
        let b = factory.create().await.unwrap();
        assert_eq!(a.name(), "memory");

        let event = ProviderLocationUpdated::sample(ProviderId::new(), chrono::Utc::now());
        let envelope = IntegrationEvent::location_updated(&event).unwrap();
        a.publish(&envelope).await.unwrap();
        b.publish(&envelope).await.unwrap();

        assert_eq!(memory.count().await, 2);
    }
}
