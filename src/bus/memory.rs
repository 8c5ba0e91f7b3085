//! In-memory event bus for dry runs and testing
//!
//! Records every published envelope in a bounded `Vec`.

use super::EventBus;
use crate::error::Result;
use crate::types::IntegrationEvent;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory event bus
///
/// Keeps the most recent `max_events` envelopes (0 = unbounded) while
/// counting every publish it has ever accepted.
pub struct MemoryEventBus {
    events: Arc<RwLock<Vec<IntegrationEvent>>>,
    accepted: AtomicU64,
    max_events: usize,
}

impl MemoryEventBus {
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            accepted: AtomicU64::new(0),
            max_events,
        }
    }

    /// Total publishes accepted since creation
    pub async fn count(&self) -> u64 {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Retained envelopes, oldest first
    pub async fn events(&self) -> Vec<IntegrationEvent> {
        self.events.read().await.clone()
    }

    /// Retained envelopes published under `key`
    pub async fn events_for(&self, key: &str) -> Vec<IntegrationEvent> {
        let events = self.events.read().await;
        events.iter().filter(|e| e.key == key).cloned().collect()
    }
}

impl Default for MemoryEventBus {
    fn default() -> Self {
        Self::new(100_000)
    }
}

#[async_trait]
impl EventBus for MemoryEventBus {
    async fn publish(&self, event: &IntegrationEvent) -> Result<()> {
        {
            let mut events = self.events.write().await;
            events.push(event.clone());

            // Enforce max capacity
            if self.max_events > 0 && events.len() > self.max_events {
                let drain_count = events.len() - self.max_events;
                events.drain(..drain_count);
            }
        }

        self.accepted.fetch_add(1, Ordering::SeqCst);

        tracing::trace!(
            event_id = %event.id,
            key = %event.key,
            "Event recorded in memory"
        );

        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
