//! Fleet configuration loaded from an HCL file
//!
//! ```hcl
//! fleet {
//!   providers     = 400
//!   tick_interval = "50ms"
//!   stop_timeout  = "30s"
//! }
//!
//! nats {
//!   url = "nats://127.0.0.1:4222"
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::bus::nats::NatsConfig;
use crate::coordinator::CoordinatorConfig;
use crate::error::{FleetError, Result};
use crate::policy::{PublishFailurePolicy, TickSchedule};

#[derive(Debug, Default, Deserialize)]
pub struct FleetConfig {
    #[serde(default)]
    pub fleet: FleetSettings,
    #[serde(default)]
    pub nats: NatsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FleetSettings {
    #[serde(default = "default_providers")]
    pub providers: usize,
    #[serde(default = "default_tick_interval", with = "duration_serde")]
    pub tick_interval: Duration,
    #[serde(default = "default_jitter_step", with = "duration_serde")]
    pub jitter_step: Duration,
    #[serde(default = "default_jitter_steps")]
    pub jitter_steps: u32,
    #[serde(default, with = "duration_serde::option")]
    pub stop_timeout: Option<Duration>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub on_publish_failure: FailureMode,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff", with = "duration_serde")]
    pub retry_backoff: Duration,
}

impl Default for FleetSettings {
    fn default() -> Self {
        Self {
            providers: default_providers(),
            tick_interval: default_tick_interval(),
            jitter_step: default_jitter_step(),
            jitter_steps: default_jitter_steps(),
            stop_timeout: None,
            log_level: default_log_level(),
            on_publish_failure: FailureMode::default(),
            max_retries: default_max_retries(),
            retry_backoff: default_retry_backoff(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    #[default]
    Ignore,
    Log,
    Retry,
}

fn default_providers() -> usize {
    400
}
fn default_tick_interval() -> Duration {
    Duration::from_millis(50)
}
fn default_jitter_step() -> Duration {
    Duration::from_millis(100)
}
fn default_jitter_steps() -> u32 {
    10
}
fn default_log_level() -> String {
    "info".into()
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_backoff() -> Duration {
    Duration::from_millis(100)
}

mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let s = String::deserialize(d)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use std::time::Duration;

        use serde::{Deserialize, Deserializer};

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
            match Option::<String>::deserialize(d)? {
                Some(s) => super::parse_duration(&s)
                    .map(Some)
                    .map_err(serde::de::Error::custom),
                None => Ok(None),
            }
        }
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, String> {
        if let Some(v) = s.strip_suffix("ms") {
            return v
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| e.to_string());
        }
        if let Some(v) = s.strip_suffix('s') {
            return v
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| e.to_string());
        }
        Err(format!("unknown duration format: '{s}' (use '2s' or '500ms')"))
    }
}

impl FleetConfig {
    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let src = std::fs::read_to_string(path)
            .map_err(|e| FleetError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::parse(&src)
            .map_err(|e| FleetError::Config(format!("{} in {}", e, path.display())))
    }

    pub fn parse(src: &str) -> Result<Self> {
        let cfg: FleetConfig =
            hcl::from_str(src).map_err(|e| FleetError::Config(format!("parse error: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fleet.tick_interval.is_zero() {
            return Err(FleetError::Config("fleet.tick_interval must be positive".into()));
        }
        if self.fleet.jitter_steps == 0 {
            return Err(FleetError::Config("fleet.jitter_steps must be at least 1".into()));
        }
        if self.nats.url.trim().is_empty() {
            return Err(FleetError::Config("nats.url must not be empty".into()));
        }
        if self.nats.stream_name.trim().is_empty() {
            return Err(FleetError::Config("nats.stream_name must not be empty".into()));
        }
        if self.nats.subject_prefix.trim().is_empty() {
            return Err(FleetError::Config("nats.subject_prefix must not be empty".into()));
        }
        Ok(())
    }

    pub fn schedule(&self) -> TickSchedule {
        TickSchedule {
            interval: self.fleet.tick_interval,
            jitter_step: self.fleet.jitter_step,
            jitter_steps: self.fleet.jitter_steps,
        }
    }

    pub fn failure_policy(&self) -> PublishFailurePolicy {
        match self.fleet.on_publish_failure {
            FailureMode::Ignore => PublishFailurePolicy::Ignore,
            FailureMode::Log => PublishFailurePolicy::Log,
            FailureMode::Retry => PublishFailurePolicy::Retry {
                max_retries: self.fleet.max_retries,
                backoff: self.fleet.retry_backoff,
            },
        }
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            schedule: self.schedule(),
            failure_policy: self.failure_policy(),
            stop_timeout: self.fleet.stop_timeout,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::nats::StorageType;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = FleetConfig::parse("").unwrap();
        assert_eq!(cfg.fleet.providers, 400);
        assert_eq!(cfg.fleet.tick_interval, Duration::from_millis(50));
        assert_eq!(cfg.fleet.stop_timeout, None);
        assert_eq!(cfg.fleet.log_level, "info");
        assert_eq!(cfg.failure_policy(), PublishFailurePolicy::Ignore);
        assert_eq!(cfg.schedule(), TickSchedule::default());
        assert_eq!(cfg.nats.subject_prefix, "provider-location");
    }

    #[test]
    fn test_full_config() {
        let src = r#"
fleet {
  providers          = 12
  tick_interval      = "20ms"
  jitter_step        = "5ms"
  jitter_steps       = 4
  stop_timeout       = "3s"
  log_level          = "debug"
  on_publish_failure = "retry"
  max_retries        = 5
  retry_backoff      = "250ms"
}

nats {
  url                   = "nats://broker:4222"
  stream_name           = "LOC"
  subject_prefix        = "loc"
  storage               = "memory"
  per_worker_connection = true
}
"#;
        let cfg = FleetConfig::parse(src).unwrap();
        assert_eq!(cfg.fleet.providers, 12);
        assert_eq!(cfg.fleet.stop_timeout, Some(Duration::from_secs(3)));
        assert_eq!(
            cfg.failure_policy(),
            PublishFailurePolicy::Retry {
                max_retries: 5,
                backoff: Duration::from_millis(250),
            }
        );
        assert_eq!(cfg.nats.storage, StorageType::Memory);
        assert!(cfg.nats.per_worker_connection);

        let coord = cfg.coordinator_config();
        assert_eq!(coord.schedule.interval, Duration::from_millis(20));
        assert_eq!(coord.schedule.jitter_steps, 4);
        assert_eq!(coord.stop_timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_rejects_zero_interval() {
        let err = FleetConfig::parse("fleet {\n  tick_interval = \"0ms\"\n}\n").unwrap_err();
        assert!(err.to_string().contains("tick_interval"));
    }

    #[test]
    fn test_rejects_bad_duration() {
        let err = FleetConfig::parse("fleet {\n  tick_interval = \"fast\"\n}\n").unwrap_err();
        assert!(matches!(err, FleetError::Config(_)));
    }

    #[test]
    fn test_rejects_empty_nats_url() {
        let err = FleetConfig::parse("nats {\n  url = \"\"\n}\n").unwrap_err();
        assert!(err.to_string().contains("nats.url"));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = FleetConfig::load(&dir.path().join("fleet.hcl")).unwrap();
        assert_eq!(cfg.fleet.providers, 400);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "fleet {{\n  providers = 7\n}}").unwrap();

        let cfg = FleetConfig::load(file.path()).unwrap();
        assert_eq!(cfg.fleet.providers, 7);
    }
}
