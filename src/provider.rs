//! Provider worker: one simulated provider publishing its location
//!
//! Each provider runs as its own tokio task. The task owns the provider's
//! counters; the only way to read them is to stop the provider, which
//! answers with a [`ProviderReport`] over a oneshot channel.
//!
//! ```text
//! spawn ──► Scheduled ──(Stop)──► Stopping ──(report sent)──► Terminated
//!              │  ▲
//!              └──┘ tick: sample → count → publish (detached)
//! ```

use crate::bus::EventBus;
use crate::error::FleetError;
use crate::policy::{PublishFailurePolicy, TickSchedule};
use crate::types::{IntegrationEvent, ProviderId, ProviderLocationUpdated, ProviderReport};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};

/// Commands accepted by a provider task
#[derive(Debug)]
pub enum ProviderCommand {
    /// Cancel the schedule and reply with the final report
    Stop { reply: oneshot::Sender<ProviderReport> },
}

/// Lifecycle of a provider worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProviderState {
    Scheduled,
    Stopping,
    Terminated,
}

/// Owning handle to a running provider
///
/// Dropping the handle closes the command channel, which terminates the
/// provider without a report.
pub struct ProviderHandle {
    id: ProviderId,
    tx: mpsc::Sender<ProviderCommand>,
    task: JoinHandle<()>,
}

impl ProviderHandle {
    pub fn id(&self) -> ProviderId {
        self.id
    }

    /// Send the stop command without waiting for the answer
    ///
    /// Returns `None` if the provider task is already gone.
    pub async fn request_stop(&self) -> Option<oneshot::Receiver<ProviderReport>> {
        let (reply, rx) = oneshot::channel();
        match self.tx.send(ProviderCommand::Stop { reply }).await {
            Ok(()) => Some(rx),
            Err(_) => None,
        }
    }

    /// Stop the provider and wait for its report
    pub async fn stop(self) -> Option<ProviderReport> {
        let rx = self.request_stop().await?;
        rx.await.ok()
    }

    /// Whether the provider task has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawn a provider in the `Scheduled` state
///
/// Nothing is published until the first tick, which fires after the
/// schedule's id-derived jitter.
pub fn spawn(
    id: ProviderId,
    bus: Arc<dyn EventBus>,
    schedule: TickSchedule,
    policy: PublishFailurePolicy,
) -> ProviderHandle {
    let (tx, rx) = mpsc::channel(4);
    let provider = Provider {
        id,
        bus,
        schedule,
        policy,
        state: ProviderState::Scheduled,
        events_published: 0,
        publish_failures: 0,
        in_flight: JoinSet::new(),
    };
    let task = tokio::spawn(provider.run(rx));
    ProviderHandle { id, tx, task }
}

struct Provider {
    id: ProviderId,
    bus: Arc<dyn EventBus>,
    schedule: TickSchedule,
    policy: PublishFailurePolicy,
    state: ProviderState,
    events_published: u64,
    publish_failures: u64,
    /// Publishes dispatched by ticks and not yet reaped
    in_flight: JoinSet<crate::error::Result<()>>,
}

impl Provider {
    async fn run(mut self, mut commands: mpsc::Receiver<ProviderCommand>) {
        let delay = self.schedule.initial_delay(&self.id);
        let period = self.schedule.interval.max(Duration::from_millis(1));

        tracing::info!(
            provider_id = %self.id,
            delay_ms = delay.as_millis() as u64,
            "Provider delaying first publish"
        );

        let mut ticker = tokio::time::interval_at(Instant::now() + delay, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Commands are polled first so a stop preempts a due tick.
        let reply = loop {
            tokio::select! {
                biased;

                cmd = commands.recv() => match cmd {
                    Some(ProviderCommand::Stop { reply }) => break Some(reply),
                    None => break None,
                },
                Some(result) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    self.reap(result);
                }
                _ = ticker.tick() => self.tick(),
            }
        };

        self.state = ProviderState::Stopping;

        // In-flight publishes finish in the background; their outcome is
        // no longer observed.
        self.in_flight.detach_all();

        let report = ProviderReport {
            provider_id: self.id,
            events_published: self.events_published,
            publish_failures: self.publish_failures,
        };

        self.state = ProviderState::Terminated;

        tracing::debug!(
            provider_id = %self.id,
            state = ?self.state,
            events_published = report.events_published,
            publish_failures = report.publish_failures,
            acknowledged = reply.is_some(),
            "Provider stopped"
        );

        if let Some(reply) = reply {
            let _ = reply.send(report);
        }
    }

    fn tick(&mut self) {
        let event = ProviderLocationUpdated::sample(self.id, Utc::now());
        self.events_published += 1;

        let envelope = match IntegrationEvent::location_updated(&event) {
            Ok(envelope) => envelope,
            Err(e) => {
                self.record_failure(&e);
                return;
            }
        };

        let bus = self.bus.clone();
        let policy = self.policy;
        self.in_flight
            .spawn(async move { policy.publish(bus.as_ref(), &envelope).await });
    }

    fn reap(&mut self, result: Result<crate::error::Result<()>, JoinError>) {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => self.record_failure(&e),
            Err(e) => {
                let e = FleetError::Publish {
                    key: self.id.routing_key(),
                    reason: format!("publish task aborted: {}", e),
                };
                self.record_failure(&e);
            }
        }
    }

    fn record_failure(&mut self, error: &FleetError) {
        self.publish_failures += 1;
        self.policy.on_failure(&self.id, error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::memory::MemoryEventBus;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Counts attempts and rejects every publish
    #[derive(Default)]
    struct RejectingBus {
        attempts: AtomicU64,
    }

    #[async_trait]
    impl EventBus for RejectingBus {
        async fn publish(&self, event: &IntegrationEvent) -> crate::error::Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(FleetError::Publish {
                key: event.key.clone(),
                reason: "rejected".to_string(),
            })
        }

        fn name(&self) -> &str {
            "rejecting"
        }
    }

    fn fixed() -> TickSchedule {
        TickSchedule::fixed(Duration::from_millis(50))
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_published_before_first_tick() {
        let bus = Arc::new(MemoryEventBus::default());
        // 37 % 10 = 7 → 700ms jitter
        let id = ProviderId::from(uuid::Uuid::from_u128(37));
        let handle = spawn(id, bus.clone(), TickSchedule::default(), PublishFailurePolicy::Ignore);

        tokio::time::sleep(Duration::from_millis(650)).await;
        assert_eq!(bus.count().await, 0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(bus.count().await >= 1);

        handle.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_on_fixed_interval() {
        let bus = Arc::new(MemoryEventBus::default());
        let id = ProviderId::new();
        let handle = spawn(id, bus.clone(), fixed(), PublishFailurePolicy::Ignore);

        tokio::time::sleep(Duration::from_millis(500)).await;
        let report = handle.stop().await.unwrap();

        // ticks at 0, 50, ..., 450 and possibly 500
        assert!(
            (10..=11).contains(&report.events_published),
            "unexpected tick count {}",
            report.events_published
        );
        assert_eq!(report.provider_id, id);
        assert_eq!(report.publish_failures, 0);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(bus.count().await, report.events_published);
        assert_eq!(bus.events_for(&id.to_string()).await.len() as u64, report.events_published);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_ticks_after_stop() {
        let bus = Arc::new(MemoryEventBus::default());
        let handle = spawn(ProviderId::new(), bus.clone(), fixed(), PublishFailurePolicy::Ignore);

        tokio::time::sleep(Duration::from_millis(200)).await;
        let report = handle.stop().await.unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        let settled = bus.count().await;
        assert_eq!(settled, report.events_published);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(bus.count().await, settled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_publishes_still_count_ticks() {
        let bus = Arc::new(RejectingBus::default());
        let handle = spawn(ProviderId::new(), bus.clone(), fixed(), PublishFailurePolicy::Log);

        tokio::time::sleep(Duration::from_millis(300)).await;
        let report = handle.stop().await.unwrap();

        assert!(report.events_published >= 6);
        assert!(report.publish_failures <= report.events_published);
        assert!(report.publish_failures > 0);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(bus.attempts.load(Ordering::SeqCst), report.events_published);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_first_tick_reports_zero() {
        let bus = Arc::new(MemoryEventBus::default());
        let id = ProviderId::from(uuid::Uuid::from_u128(9));
        let handle = spawn(id, bus.clone(), TickSchedule::default(), PublishFailurePolicy::Ignore);

        let report = handle.stop().await.unwrap();
        assert_eq!(report.events_published, 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(bus.count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_terminates_provider() {
        let bus = Arc::new(MemoryEventBus::default());
        let ProviderHandle { tx, task, .. } =
            spawn(ProviderId::new(), bus.clone(), fixed(), PublishFailurePolicy::Ignore);

        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(tx);
        task.await.unwrap();

        let settled = bus.count().await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(bus.count().await, settled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_on_finished_provider_returns_none() {
        let bus = Arc::new(MemoryEventBus::default());
        let handle = spawn(ProviderId::new(), bus, fixed(), PublishFailurePolicy::Ignore);

        let rx = handle.request_stop().await.unwrap();
        rx.await.unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert!(handle.is_finished());
        assert!(handle.request_stop().await.is_none());
    }
}
