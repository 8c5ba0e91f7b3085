//! Coordinator - supervises the provider pool
//!
//! The coordinator runs as a single task that owns the pool; clients talk
//! to it through a [`CoordinatorHandle`]. Stopping the fleet fans a stop
//! command out to every provider and fans their reports back in.

mod config;
mod core;
mod handle;
mod messages;

pub use config::CoordinatorConfig;
pub use self::core::Coordinator;
pub use handle::CoordinatorHandle;
pub use messages::CoordRequest;
