//! # a3s-fleet
//!
//! Simulated provider fleet publishing location updates through a
//! pluggable event bus.
//!
//! ## Overview
//!
//! A [`Coordinator`] spins up a pool of provider workers. Each provider
//! ticks on its own schedule, samples a location, and publishes a
//! [`ProviderLocationUpdated`] event keyed by its id. Stopping the fleet
//! cancels every schedule and returns the total number of events emitted.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use a3s_fleet::{Coordinator, CoordinatorConfig, MemoryEventBus, SharedEventBus};
//!
//! # async fn example() -> a3s_fleet::Result<()> {
//! let coordinator = Coordinator::spawn(CoordinatorConfig::default());
//! let factory = Arc::new(SharedEventBus::new(MemoryEventBus::default()));
//!
//! coordinator.start(10, factory).await?;
//! tokio::time::sleep(std::time::Duration::from_secs(1)).await;
//! let published = coordinator.stop().await?;
//!
//! println!("Published {} events", published);
//! # Ok(())
//! # }
//! ```
//!
//! ## Event buses
//!
//! - **memory**: records events in-process, for dry runs and tests
//! - **nats**: NATS JetStream, one subject per provider
//!
//! ## Architecture
//!
//! - **EventBus** trait: publish capability all backends implement
//! - **EventBusFactory** trait: hands a bus to each new provider
//! - **Provider**: one task per simulated provider, owns its counters
//! - **Coordinator**: task owning the pool, driven via `CoordinatorHandle`

pub mod bus;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod policy;
pub mod provider;
pub mod types;

// Re-export core types
pub use bus::{EventBus, EventBusFactory, SharedEventBus};
pub use config::FleetConfig;
pub use coordinator::{Coordinator, CoordinatorConfig, CoordinatorHandle};
pub use error::{FleetError, Result};
pub use policy::{PublishFailurePolicy, TickSchedule};
pub use provider::ProviderHandle;
pub use types::{
    Coordinates, FleetReport, FleetStatus, IntegrationEvent, ProviderId,
    ProviderLocationUpdated, ProviderReport,
};

// Re-export buses for convenience
pub use bus::memory::MemoryEventBus;
pub use bus::nats::{NatsClient, NatsConfig, NatsEventBus, NatsEventBusFactory, StorageType};
