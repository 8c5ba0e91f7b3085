//! CoordinatorHandle - client interface to the coordinator task

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use super::messages::CoordRequest;
use crate::bus::EventBusFactory;
use crate::error::{FleetError, Result};
use crate::types::{FleetReport, FleetStatus};

/// Cloneable handle to a running coordinator
///
/// Requests are processed one at a time, in the order they arrive.
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<CoordRequest>,
}

impl CoordinatorHandle {
    pub(crate) fn new(tx: mpsc::Sender<CoordRequest>) -> Self {
        Self { tx }
    }

    /// Spawn `pool_size` providers, each with a bus from `factory`
    ///
    /// All-or-nothing: if any bus cannot be created, the providers spawned
    /// so far are stopped and `FleetError::Spawn` is returned. Calling
    /// `start` on a running fleet retires the previous providers and
    /// discards their counts; call `stop` first.
    pub async fn start(&self, pool_size: usize, factory: Arc<dyn EventBusFactory>) -> Result<()> {
        self.request(|reply| CoordRequest::Start {
            pool_size,
            factory,
            reply,
        })
        .await?
    }

    /// Stop every provider and return the total events published
    ///
    /// Returns 0 when no fleet is running.
    pub async fn stop(&self) -> Result<u64> {
        Ok(self.stop_report().await?.events_published)
    }

    /// Stop every provider and return the per-provider breakdown
    pub async fn stop_report(&self) -> Result<FleetReport> {
        self.request(|reply| CoordRequest::Stop { reply }).await?
    }

    pub async fn status(&self) -> Result<FleetStatus> {
        self.request(|reply| CoordRequest::Status { reply }).await
    }

    /// Stop any running fleet and end the coordinator task
    pub async fn shutdown(&self) -> Result<FleetReport> {
        self.request(|reply| CoordRequest::Shutdown { reply }).await?
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> CoordRequest,
    ) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| FleetError::CoordinatorClosed)?;
        reply_rx.await.map_err(|_| FleetError::CoordinatorClosed)
    }
}
