//! Core types for the a3s-fleet system
//!
//! All wire-facing types use camelCase JSON serialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::Result;

/// Identity of a simulated provider
///
/// Assigned once at spawn time. Its string form is the routing key
/// handed to the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(Uuid);

impl ProviderId {
    /// Generate a fresh random identity
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Routing/partition key used when publishing
    pub fn routing_key(&self) -> String {
        self.0.to_string()
    }
}

impl Default for ProviderId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ProviderId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Simulated position at a point in time (Unix milliseconds)
    ///
    /// Pure function of the timestamp: latitude sweeps [-90, 90) every
    /// 3 minutes, longitude sweeps [-180, 180) every 6 minutes.
    pub fn at(timestamp_millis: i64) -> Self {
        let ms = timestamp_millis.rem_euclid(360_000);
        Self {
            latitude: (ms % 180_000) as f64 / 1000.0 - 90.0,
            longitude: ms as f64 / 1000.0 - 180.0,
        }
    }
}

/// Emitted by a provider on every tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderLocationUpdated {
    pub provider_id: ProviderId,
    pub location: Coordinates,
    pub created_on: DateTime<Utc>,
}

impl ProviderLocationUpdated {
    /// Event type name carried on the integration envelope
    pub const EVENT_TYPE: &'static str = "provider.location_updated";

    /// Sample the provider's location at `now`
    pub fn sample(provider_id: ProviderId, now: DateTime<Utc>) -> Self {
        Self {
            provider_id,
            location: Coordinates::at(now.timestamp_millis()),
            created_on: now,
        }
    }
}

/// Keyed envelope handed to an event bus
///
/// The bus treats `payload` as opaque and uses `key` for routing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationEvent {
    /// Unique envelope identifier (evt-<uuid>)
    pub id: String,

    /// Routing/partition key
    pub key: String,

    /// Event type identifier (e.g. "provider.location_updated")
    pub event_type: String,

    /// Encoded event body
    pub payload: serde_json::Value,

    /// Unix timestamp in milliseconds
    pub timestamp: u64,
}

impl IntegrationEvent {
    /// Wrap a serializable event under `key`
    pub fn new<T: Serialize>(
        key: impl Into<String>,
        event_type: impl Into<String>,
        event: &T,
    ) -> Result<Self> {
        Ok(Self {
            id: format!("evt-{}", Uuid::new_v4()),
            key: key.into(),
            event_type: event_type.into(),
            payload: serde_json::to_value(event)?,
            timestamp: now_millis(),
        })
    }

    /// Envelope for a location update, keyed by the provider id
    pub fn location_updated(event: &ProviderLocationUpdated) -> Result<Self> {
        Self::new(
            event.provider_id.routing_key(),
            ProviderLocationUpdated::EVENT_TYPE,
            event,
        )
    }
}

/// Final count reported by a provider when it acknowledges a stop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderReport {
    pub provider_id: ProviderId,

    /// Ticks fired, regardless of publish outcome
    pub events_published: u64,

    /// Publishes that failed and were observed before the stop
    pub publish_failures: u64,
}

/// Aggregate result of stopping the fleet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetReport {
    /// One report per provider that acknowledged the stop
    pub providers: Vec<ProviderReport>,

    /// Sum of `events_published` over all reports
    pub events_published: u64,

    /// Sum of `publish_failures` over all reports
    pub publish_failures: u64,

    /// Providers that terminated without acknowledging
    pub missing: usize,
}

impl FleetReport {
    /// Aggregate individual reports, each contributing exactly once
    pub fn from_reports(providers: Vec<ProviderReport>, missing: usize) -> Self {
        let events_published = providers.iter().map(|r| r.events_published).sum();
        let publish_failures = providers.iter().map(|r| r.publish_failures).sum();
        Self {
            providers,
            events_published,
            publish_failures,
            missing,
        }
    }
}

/// Snapshot of the coordinator's pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetStatus {
    pub running: bool,
    pub providers: usize,
}

/// Current time in Unix milliseconds
pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_provider_id_unique() {
        let a = ProviderId::new();
        let b = ProviderId::new();
        assert_ne!(a, b);
        assert_eq!(a.routing_key(), a.as_uuid().to_string());
    }

    #[test]
    fn test_provider_id_serializes_as_plain_uuid() {
        let id = ProviderId::from(Uuid::nil());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"00000000-0000-0000-0000-000000000000\"");
    }

    #[test]
    fn test_coordinates_are_deterministic() {
        assert_eq!(Coordinates::at(1_700_000_000_123), Coordinates::at(1_700_000_000_123));
    }

    #[test]
    fn test_coordinates_within_bounds() {
        for ms in [0i64, 1, 89_999, 179_999, 180_000, 359_999, 1_700_000_000_000, -5] {
            let c = Coordinates::at(ms);
            assert!((-90.0..90.0).contains(&c.latitude), "latitude {} at {}", c.latitude, ms);
            assert!((-180.0..180.0).contains(&c.longitude), "longitude {} at {}", c.longitude, ms);
        }
    }

    #[test]
    fn test_coordinates_at_origin() {
        let c = Coordinates::at(0);
        assert_eq!(c, Coordinates::new(-90.0, -180.0));
    }

    #[test]
    fn test_location_updated_sample() {
        let id = ProviderId::new();
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let event = ProviderLocationUpdated::sample(id, now);

        assert_eq!(event.provider_id, id);
        assert_eq!(event.created_on, now);
        assert_eq!(event.location, Coordinates::at(1_700_000_000_000));
    }

    #[test]
    fn test_integration_event_keyed_by_provider() {
        let id = ProviderId::new();
        let event = ProviderLocationUpdated::sample(id, Utc::now());
        let envelope = IntegrationEvent::location_updated(&event).unwrap();

        assert!(envelope.id.starts_with("evt-"));
        assert_eq!(envelope.key, id.to_string());
        assert_eq!(envelope.event_type, "provider.location_updated");
        assert_eq!(envelope.payload["providerId"], id.to_string());
        assert!(envelope.payload["location"]["latitude"].is_number());
        assert!(envelope.payload["createdOn"].is_string());
        assert!(envelope.timestamp > 0);
    }

    #[test]
    fn test_fleet_report_sums_each_report_once() {
        let reports = vec![
            ProviderReport {
                provider_id: ProviderId::new(),
                events_published: 4,
                publish_failures: 1,
            },
            ProviderReport {
                provider_id: ProviderId::new(),
                events_published: 7,
                publish_failures: 0,
            },
        ];

        let report = FleetReport::from_reports(reports, 1);
        assert_eq!(report.events_published, 11);
        assert_eq!(report.publish_failures, 1);
        assert_eq!(report.missing, 1);
        assert_eq!(report.providers.len(), 2);
    }

    #[test]
    fn test_fleet_report_default_is_empty() {
        let report = FleetReport::default();
        assert_eq!(report.events_published, 0);
        assert!(report.providers.is_empty());
    }
}
