//! Coordinator task - owns the provider pool

use futures::future::join_all;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::config::CoordinatorConfig;
use super::handle::CoordinatorHandle;
use super::messages::CoordRequest;
use crate::bus::EventBusFactory;
use crate::error::{FleetError, Result};
use crate::provider::{self, ProviderHandle};
use crate::types::{FleetReport, FleetStatus, ProviderId};

/// Supervisor of the provider pool
///
/// The pool is only touched from inside the coordinator task, which
/// handles one request at a time. It is non-empty exactly between a
/// completed start and a completed stop.
pub struct Coordinator {
    config: CoordinatorConfig,
    rx: mpsc::Receiver<CoordRequest>,
    pool: Vec<ProviderHandle>,
}

impl Coordinator {
    /// Spawn the coordinator task and return a handle to it
    ///
    /// The task ends on `shutdown` or once every handle is dropped; in
    /// both cases a running fleet is stopped first.
    pub fn spawn(config: CoordinatorConfig) -> CoordinatorHandle {
        let (tx, rx) = mpsc::channel(config.channel_buffer.max(1));
        let coordinator = Self {
            config,
            rx,
            pool: Vec::new(),
        };
        tokio::spawn(coordinator.run());
        CoordinatorHandle::new(tx)
    }

    async fn run(mut self) {
        debug!("Coordinator started");

        while let Some(request) = self.rx.recv().await {
            debug!(request = request.kind(), pool = self.pool.len(), "Coordinator request");
            match request {
                CoordRequest::Start {
                    pool_size,
                    factory,
                    reply,
                } => {
                    let result = self.start(pool_size, factory.as_ref()).await;
                    let _ = reply.send(result);
                }
                CoordRequest::Stop { reply } => {
                    let result = self.stop().await;
                    let _ = reply.send(result);
                }
                CoordRequest::Status { reply } => {
                    let _ = reply.send(self.status());
                }
                CoordRequest::Shutdown { reply } => {
                    let result = self.stop().await;
                    let _ = reply.send(result);
                    break;
                }
            }
        }

        if !self.pool.is_empty() {
            warn!(pool = self.pool.len(), "Coordinator closing with a running fleet, stopping it");
            if let Err(e) = self.stop().await {
                error!(error = %e, "Failed to stop fleet on coordinator exit");
            }
        }

        debug!("Coordinator stopped");
    }

    async fn start(&mut self, pool_size: usize, factory: &dyn EventBusFactory) -> Result<()> {
        if !self.pool.is_empty() {
            warn!(
                previous = self.pool.len(),
                "Start while a fleet is running, retiring previous providers"
            );
            self.pool.clear();
        }

        let mut pool = Vec::with_capacity(pool_size);
        for index in 0..pool_size {
            let bus = match factory.create().await {
                Ok(bus) => bus,
                Err(e) => {
                    error!(
                        index,
                        pool_size,
                        error = %e,
                        "Event bus creation failed, rolling back start"
                    );
                    let rolled_back = collect_reports(&pool).await;
                    debug!(
                        providers = rolled_back.providers.len(),
                        "Rolled back partially started fleet"
                    );
                    return Err(FleetError::Spawn {
                        index,
                        reason: e.to_string(),
                    });
                }
            };

            pool.push(provider::spawn(
                ProviderId::new(),
                bus,
                self.config.schedule,
                self.config.failure_policy,
            ));
        }

        self.pool = pool;
        info!(pool_size, "Fleet started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<FleetReport> {
        let pool = std::mem::take(&mut self.pool);
        if pool.is_empty() {
            return Ok(FleetReport::default());
        }

        let report = match self.config.stop_timeout {
            Some(timeout) => tokio::time::timeout(timeout, collect_reports(&pool))
                .await
                .map_err(|_| {
                    FleetError::Timeout(format!(
                        "{} providers did not acknowledge stop within {:?}",
                        pool.len(),
                        timeout
                    ))
                })?,
            None => collect_reports(&pool).await,
        };

        if report.missing > 0 {
            warn!(missing = report.missing, "Some providers ended without reporting");
        }

        info!(
            providers = report.providers.len(),
            events_published = report.events_published,
            publish_failures = report.publish_failures,
            "Fleet stopped"
        );

        Ok(report)
    }

    fn status(&self) -> FleetStatus {
        FleetStatus {
            running: !self.pool.is_empty(),
            providers: self.pool.len(),
        }
    }
}

/// Stop every provider in `pool` and aggregate their reports
///
/// Every stop request is sent before any reply is awaited, so the wait is
/// bounded by the slowest provider rather than the sum.
async fn collect_reports(pool: &[ProviderHandle]) -> FleetReport {
    let mut pending = Vec::with_capacity(pool.len());
    let mut missing = 0;

    for handle in pool {
        match handle.request_stop().await {
            Some(rx) => pending.push(rx),
            None => missing += 1,
        }
    }

    let mut reports = Vec::with_capacity(pending.len());
    for result in join_all(pending).await {
        match result {
            Ok(report) => reports.push(report),
            Err(_) => missing += 1,
        }
    }

    FleetReport::from_reports(reports, missing)
}
