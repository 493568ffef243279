//! Error types and handling for Helios
//!
//! This module defines the error types used throughout the application.
//! Peripheral failures (decode, transport, metering) are represented here so
//! they can be logged at the edges without unwinding the control loop.

use thiserror::Error;

use crate::protocol::DecodeError;

/// Result type alias for Helios operations
pub type Result<T> = std::result::Result<T, HeliosError>;

/// Main error type for Helios
#[derive(Debug, Error)]
pub enum HeliosError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Inbound message could not be decoded
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// UDP send/receive failures
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Destination host could not be resolved
    #[error("Host resolution error: {host} - {message}")]
    HostResolution { host: String, message: String },

    /// Metering sink failures
    #[error("Metering error: {message}")]
    Metering { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Timeout errors
    #[error("Timeout error: {message}")]
    Timeout { message: String },

    /// Generic errors with context
    #[error("Error: {message}")]
    Generic { message: String },
}

impl HeliosError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        HeliosError::Config {
            message: message.into(),
        }
    }

    /// Create a new protocol error
    pub fn protocol<S: Into<String>>(message: S) -> Self {
        HeliosError::Protocol {
            message: message.into(),
        }
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        HeliosError::Transport {
            message: message.into(),
        }
    }

    /// Create a new host resolution error
    pub fn host_resolution<S: Into<String>>(host: S, message: S) -> Self {
        HeliosError::HostResolution {
            host: host.into(),
            message: message.into(),
        }
    }

    /// Create a new metering error
    pub fn metering<S: Into<String>>(message: S) -> Self {
        HeliosError::Metering {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        HeliosError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        HeliosError::Io {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        HeliosError::Timeout {
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        HeliosError::Generic {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for HeliosError {
    fn from(err: std::io::Error) -> Self {
        HeliosError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for HeliosError {
    fn from(err: serde_yaml::Error) -> Self {
        HeliosError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for HeliosError {
    fn from(err: serde_json::Error) -> Self {
        HeliosError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<DecodeError> for HeliosError {
    fn from(err: DecodeError) -> Self {
        HeliosError::protocol(err.to_string())
    }
}

#[cfg(feature = "metering")]
impl From<reqwest::Error> for HeliosError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            HeliosError::timeout(err.to_string())
        } else {
            HeliosError::metering(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = HeliosError::config("test config error");
        assert!(matches!(err, HeliosError::Config { .. }));

        let err = HeliosError::transport("test transport error");
        assert!(matches!(err, HeliosError::Transport { .. }));

        let err = HeliosError::validation("field", "test validation error");
        assert!(matches!(err, HeliosError::Validation { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = HeliosError::config("test error");
        assert_eq!(format!("{}", err), "Configuration error: test error");

        let err = HeliosError::host_resolution("keba.local", "no such host");
        assert_eq!(
            format!("{}", err),
            "Host resolution error: keba.local - no such host"
        );
    }

    #[test]
    fn test_decode_error_conversion() {
        let err: HeliosError = DecodeError::Unrecognized.into();
        assert!(matches!(err, HeliosError::Protocol { .. }));
    }
}
