//! NATS JetStream client: connect, ensure stream, publish

use super::config::{NatsConfig, StorageType};
use crate::error::{FleetError, Result};
use crate::types::IntegrationEvent;
use async_nats::jetstream;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

/// NATS JetStream client
///
/// Owns the connection and makes sure the location stream exists
/// before anything is published.
pub struct NatsClient {
    /// JetStream context (holds the connection)
    jetstream: jetstream::Context,

    /// Configuration
    config: Arc<NatsConfig>,
}

impl NatsClient {
    /// Connect to NATS and initialize the JetStream stream
    pub async fn connect(config: NatsConfig) -> Result<Self> {
        let connect_opts = build_connect_options(&config);

        let client = connect_opts
            .connect(&config.url)
            .await
            .map_err(|e| FleetError::Connection(format!("{}: {}", config.url, e)))?;

        tracing::info!(url = %config.url, "Connected to NATS");

        let jetstream = jetstream::new(client);
        ensure_stream(&jetstream, &config).await?;

        Ok(Self {
            jetstream,
            config: Arc::new(config),
        })
    }

    /// Publish an envelope's payload under `<prefix>.<key>`, returning the
    /// JetStream sequence number
    pub async fn publish(&self, event: &IntegrationEvent) -> Result<u64> {
        let subject = self.config.build_subject(&event.key);
        let payload = Bytes::from(serde_json::to_vec(&event.payload)?);

        let mut headers = async_nats::HeaderMap::new();
        headers.insert("Nats-Msg-Id", event.id.as_str());
        headers.insert("Event-Type", event.event_type.as_str());

        let ack = self
            .jetstream
            .publish_with_headers(subject.clone(), headers, payload)
            .await
            .map_err(|e| FleetError::Publish {
                key: event.key.clone(),
                reason: e.to_string(),
            })?
            .await
            .map_err(|e| FleetError::Publish {
                key: event.key.clone(),
                reason: format!("ack failed: {}", e),
            })?;

        tracing::trace!(
            event_id = %event.id,
            subject = %subject,
            sequence = ack.sequence,
            "Event published"
        );

        Ok(ack.sequence)
    }

    pub fn config(&self) -> &NatsConfig {
        &self.config
    }
}

/// Build NATS connect options from config
fn build_connect_options(config: &NatsConfig) -> async_nats::ConnectOptions {
    let mut opts = async_nats::ConnectOptions::new()
        .connection_timeout(Duration::from_secs(config.connect_timeout_secs))
        .request_timeout(Some(Duration::from_secs(config.request_timeout_secs)));

    if let Some(ref token) = config.token {
        opts = opts.token(token.clone());
    }

    opts
}

/// Ensure the JetStream stream exists with the correct configuration
async fn ensure_stream(js: &jetstream::Context, config: &NatsConfig) -> Result<()> {
    let storage = match config.storage {
        StorageType::File => jetstream::stream::StorageType::File,
        StorageType::Memory => jetstream::stream::StorageType::Memory,
    };

    let max_age = if config.max_age_secs > 0 {
        Duration::from_secs(config.max_age_secs)
    } else {
        Duration::ZERO
    };

    let stream_config = jetstream::stream::Config {
        name: config.stream_name.clone(),
        subjects: config.stream_subjects(),
        storage,
        max_messages: config.max_events,
        max_age,
        max_bytes: config.max_bytes,
        retention: jetstream::stream::RetentionPolicy::Limits,
        ..Default::default()
    };

    js.get_or_create_stream(stream_config)
        .await
        .map_err(|e| FleetError::Stream(format!(
            "Failed to create/get stream '{}': {}",
            config.stream_name, e
        )))?;

    tracing::info!(
        stream = %config.stream_name,
        subjects = ?config.stream_subjects(),
        "JetStream stream ready"
    );

    Ok(())
}
