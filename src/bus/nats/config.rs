//! NATS JetStream configuration

use serde::{Deserialize, Serialize};

/// JetStream storage backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// Persist messages on disk
    #[default]
    File,
    /// Keep messages in server memory only
    Memory,
}

/// Connection and stream settings for the NATS event bus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NatsConfig {
    /// Server URL
    pub url: String,

    /// JetStream stream holding location updates
    pub stream_name: String,

    /// Subject prefix; events go to `<prefix>.<key>`
    pub subject_prefix: String,

    pub storage: StorageType,

    /// Maximum messages retained by the stream (-1 = unlimited)
    pub max_events: i64,

    /// Maximum message age in seconds (0 = unlimited)
    pub max_age_secs: u64,

    /// Maximum stream size in bytes (-1 = unlimited)
    pub max_bytes: i64,

    pub connect_timeout_secs: u64,

    pub request_timeout_secs: u64,

    /// Optional auth token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Open one connection per provider instead of sharing one
    pub per_worker_connection: bool,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://127.0.0.1:4222".to_string(),
            stream_name: "PROVIDER_LOCATION".to_string(),
            subject_prefix: "provider-location".to_string(),
            storage: StorageType::File,
            max_events: 1_000_000,
            max_age_secs: 24 * 60 * 60,
            max_bytes: -1,
            connect_timeout_secs: 5,
            request_timeout_secs: 10,
            token: None,
            per_worker_connection: false,
        }
    }
}

impl NatsConfig {
    /// Full subject for a routing key
    pub fn build_subject(&self, key: &str) -> String {
        format!("{}.{}", self.subject_prefix, key)
    }

    /// Subjects captured by the stream
    pub fn stream_subjects(&self) -> Vec<String> {
        vec![format!("{}.>", self.subject_prefix)]
    }
}
