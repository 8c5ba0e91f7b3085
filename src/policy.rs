//! Provider tick schedule and publish-failure handling

use crate::bus::EventBus;
use crate::error::Result;
use crate::types::{IntegrationEvent, ProviderId};
use std::time::Duration;

/// When a provider ticks
///
/// The first tick is delayed by a jitter derived from the provider id:
/// `jitter_step * (id % jitter_steps)`, so a fleet started at once does
/// not publish in lockstep. Subsequent ticks follow every `interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSchedule {
    pub interval: Duration,
    pub jitter_step: Duration,
    pub jitter_steps: u32,
}

impl Default for TickSchedule {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(50),
            jitter_step: Duration::from_millis(100),
            jitter_steps: 10,
        }
    }
}

impl TickSchedule {
    /// Schedule with no start jitter
    pub fn fixed(interval: Duration) -> Self {
        Self {
            interval,
            jitter_step: Duration::ZERO,
            jitter_steps: 1,
        }
    }

    /// Delay before the first tick of `id`
    pub fn initial_delay(&self, id: &ProviderId) -> Duration {
        if self.jitter_steps == 0 {
            return Duration::ZERO;
        }
        let slot = (id.as_uuid().as_u128() % self.jitter_steps as u128) as u32;
        self.jitter_step * slot
    }

    /// Largest possible start jitter
    pub fn max_initial_delay(&self) -> Duration {
        self.jitter_step * self.jitter_steps.saturating_sub(1)
    }
}

/// What a provider does when the event bus rejects a publish
///
/// Whatever the policy, a failed publish never stops the provider's
/// schedule and never changes its tick count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublishFailurePolicy {
    /// Count the failure, log at debug
    #[default]
    Ignore,
    /// Count the failure, log at warn
    Log,
    /// Retry with a fixed backoff before counting the failure
    Retry { max_retries: u32, backoff: Duration },
}

impl PublishFailurePolicy {
    /// Publish `event`, retrying as the policy allows
    pub async fn publish(&self, bus: &dyn EventBus, event: &IntegrationEvent) -> Result<()> {
        let (max_retries, backoff) = match *self {
            PublishFailurePolicy::Retry {
                max_retries,
                backoff,
            } => (max_retries, backoff),
            _ => (0, Duration::ZERO),
        };

        let mut attempt = 0;
        loop {
            match bus.publish(event).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < max_retries => {
                    attempt += 1;
                    tracing::debug!(
                        event_id = %event.id,
                        key = %event.key,
                        attempt,
                        error = %e,
                        "Publish failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Record a publish that ultimately failed
    pub fn on_failure(&self, provider_id: &ProviderId, error: &crate::error::FleetError) {
        match self {
            PublishFailurePolicy::Ignore => {
                tracing::debug!(provider_id = %provider_id, error = %error, "Publish failed");
            }
            PublishFailurePolicy::Log | PublishFailurePolicy::Retry { .. } => {
                tracing::warn!(provider_id = %provider_id, error = %error, "Publish failed");
            }
        }
    }
}
