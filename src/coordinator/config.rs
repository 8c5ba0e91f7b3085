//! Coordinator configuration

use crate::policy::{PublishFailurePolicy, TickSchedule};
use std::time::Duration;

/// Runtime settings for the coordinator and the providers it spawns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Tick schedule handed to every provider
    pub schedule: TickSchedule,

    /// What providers do on publish failure
    pub failure_policy: PublishFailurePolicy,

    /// Upper bound on waiting for stop acknowledgements (`None` = wait forever)
    pub stop_timeout: Option<Duration>,

    /// Request channel buffer size
    pub channel_buffer: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            schedule: TickSchedule::default(),
            failure_policy: PublishFailurePolicy::Ignore,
            stop_timeout: None,
            channel_buffer: 32,
        }
    }
}

impl CoordinatorConfig {
    pub fn with_schedule(mut self, schedule: TickSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_failure_policy(mut self, policy: PublishFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = Some(timeout);
        self
    }
}
