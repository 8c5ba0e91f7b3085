//! Error types for a3s-fleet

use thiserror::Error;

/// Errors that can occur while running a provider fleet
#[derive(Debug, Error)]
pub enum FleetError {
    /// Event bus connection failure
    #[error("Connection error: {0}")]
    Connection(String),

    /// Stream/topic creation or management error
    #[error("Stream error: {0}")]
    Stream(String),

    /// Publish failure
    #[error("Failed to publish event with key '{key}': {reason}")]
    Publish {
        key: String,
        reason: String,
    },

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A provider could not be created during start
    #[error("Failed to spawn provider #{index}: {reason}")]
    Spawn {
        index: usize,
        reason: String,
    },

    /// Timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// The coordinator task is gone
    #[error("Coordinator channel closed")]
    CoordinatorClosed,

    /// I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for fleet operations
pub type Result<T> = std::result::Result<T, FleetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_error_display() {
        let err = FleetError::Publish {
            key: "abc".to_string(),
            reason: "broker down".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to publish event with key 'abc': broker down"
        );
    }

    #[test]
    fn test_spawn_error_display() {
        let err = FleetError::Spawn {
            index: 3,
            reason: "no connection".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to spawn provider #3: no connection");
    }

    #[test]
    fn test_serialization_error_from() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json");
        let err: FleetError = parse.unwrap_err().into();
        assert!(matches!(err, FleetError::Serialization(_)));
    }
}
