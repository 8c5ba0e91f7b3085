//! Requests processed by the coordinator task

use crate::bus::EventBusFactory;
use crate::error::Result;
use crate::types::{FleetReport, FleetStatus};
use std::sync::Arc;
use tokio::sync::oneshot;

/// A request to the coordinator, answered on its `reply` channel
pub enum CoordRequest {
    /// Spawn `pool_size` providers with buses from `factory`
    Start {
        pool_size: usize,
        factory: Arc<dyn EventBusFactory>,
        reply: oneshot::Sender<Result<()>>,
    },

    /// Stop every provider and aggregate their reports
    Stop {
        reply: oneshot::Sender<Result<FleetReport>>,
    },

    /// Report the pool size
    Status {
        reply: oneshot::Sender<FleetStatus>,
    },

    /// Stop the pool, then end the coordinator task
    Shutdown {
        reply: oneshot::Sender<Result<FleetReport>>,
    },
}

impl CoordRequest {
    /// Name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            CoordRequest::Start { .. } => "start",
            CoordRequest::Stop { .. } => "stop",
            CoordRequest::Status { .. } => "status",
            CoordRequest::Shutdown { .. } => "shutdown",
        }
    }
}
