//! Unified error handling for the vessel-track library.
//!
//! The segmentation core itself is infallible for validated input; errors come
//! from the aggregation helpers, the configuration layer and the I/O adapters.

use thiserror::Error;

/// Unified error type for vessel-track operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackError {
    /// An aggregate (mean) was requested over an empty sequence
    #[error("Cannot aggregate empty input: {what}")]
    EmptyInput { what: String },

    /// Track data could not be parsed into samples
    #[error("Malformed track data: {message}")]
    SourceData { message: String },

    /// Track data could not be downloaded
    #[error("{}", transport_message(.message, .status_code))]
    Transport {
        message: String,
        status_code: Option<u16>,
    },

    /// Segmentation configuration is invalid
    #[error("Configuration error: {message}")]
    Config { message: String },
}

fn transport_message(message: &str, status_code: &Option<u16>) -> String {
    match status_code {
        Some(code) => format!("HTTP error ({}): {}", code, message),
        None => format!("HTTP error: {}", message),
    }
}

impl TrackError {
    pub(crate) fn source_data(message: impl Into<String>) -> Self {
        TrackError::SourceData {
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        TrackError::Config {
            message: message.into(),
        }
    }
}

/// Result type alias for vessel-track operations.
pub type Result<T> = std::result::Result<T, TrackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TrackError::EmptyInput {
            what: "speed".to_string(),
        };
        assert!(err.to_string().contains("speed"));

        let err = TrackError::source_data("position 3 has no LAT attribute");
        assert!(err.to_string().contains("position 3"));
    }

    #[test]
    fn test_transport_display_with_status() {
        let err = TrackError::Transport {
            message: "Service Unavailable".to_string(),
            status_code: Some(503),
        };
        assert_eq!(err.to_string(), "HTTP error (503): Service Unavailable");

        let err = TrackError::Transport {
            message: "connection reset".to_string(),
            status_code: None,
        };
        assert_eq!(err.to_string(), "HTTP error: connection reset");
    }
}
