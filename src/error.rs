//! Error types for logstash-kafka-tail
//!
//! This module defines the error taxonomy used throughout the tail pipeline,
//! using `thiserror` for ergonomic error handling.
//!
//! Only the cluster and handle errors ([`TailError::Connection`],
//! [`TailError::Metadata`], [`TailError::HandleOpen`]) ever escape the task
//! that produced them. Per-record failures are logged and dropped where they
//! occur.

use thiserror::Error;

/// Main error type for tail operations
#[derive(Error, Debug)]
pub enum TailError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// No candidate broker accepted a control connection
    #[error("Connection error: unable to connect to broker {address}: {message}")]
    Connection {
        /// Address of the last candidate that was tried
        address: String,
        /// Failure reported for that candidate
        message: String,
    },

    /// Topology query failed or returned an unusable answer
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// A partition read handle could not be opened
    #[error("Unable to open reader for partition {partition}: {message}")]
    HandleOpen {
        /// Partition the handle was requested for
        partition: i32,
        /// Failure reported by the client
        message: String,
    },

    /// A partition read handle could not be released
    #[error("Unable to close reader for partition {partition}: {message}")]
    HandleClose {
        /// Partition owning the handle
        partition: i32,
        /// Failure reported by the client
        message: String,
    },

    /// A record payload could not be decoded
    #[error("Deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),

    /// A non-fatal error reported by the messaging client
    #[error("Client error: {0}")]
    Client(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl TailError {
    /// Returns true for errors that must end the process
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TailError::Connection { .. }
                | TailError::Metadata(_)
                | TailError::HandleOpen { .. }
                | TailError::Config(_)
        )
    }
}

/// Result type for the typed pipeline seams (broker, consumer, orchestrator)
pub type TailResult<T> = std::result::Result<T, TailError>;

/// Result type alias for application-level operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_display() {
        let error = TailError::Connection {
            address: "kafka-2:9092".to_string(),
            message: "connection refused".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Connection error: unable to connect to broker kafka-2:9092: connection refused"
        );
    }

    #[test]
    fn test_metadata_error_display() {
        let error = TailError::Metadata("Invalid number of topics: 0".to_string());
        assert_eq!(error.to_string(), "Metadata error: Invalid number of topics: 0");
    }

    #[test]
    fn test_handle_errors_display() {
        let open = TailError::HandleOpen {
            partition: 3,
            message: "offset out of range".to_string(),
        };
        assert_eq!(
            open.to_string(),
            "Unable to open reader for partition 3: offset out of range"
        );

        let close = TailError::HandleClose {
            partition: 1,
            message: "broker gone".to_string(),
        };
        assert_eq!(
            close.to_string(),
            "Unable to close reader for partition 1: broker gone"
        );
    }

    #[test]
    fn test_deserialize_error_from_serde() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error: TailError = err.into();
        assert!(matches!(error, TailError::Deserialize(_)));
        assert!(error.to_string().starts_with("Deserialization error:"));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(TailError::Metadata("x".to_string()).is_fatal());
        assert!(TailError::HandleOpen {
            partition: 0,
            message: "x".to_string()
        }
        .is_fatal());
        assert!(!TailError::Client("x".to_string()).is_fatal());
        assert!(!TailError::HandleClose {
            partition: 0,
            message: "x".to_string()
        }
        .is_fatal());
    }

    #[test]
    fn test_error_is_error_trait() {
        let err = TailError::Config("test".to_string());
        let _: &dyn std::error::Error = &err;
    }
}
