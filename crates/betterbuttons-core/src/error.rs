//! Unified error handling for BetterButtons.
//!
//! The button pipeline itself never fails: unknown devices and unmapped
//! actions are dropped or degraded. These errors cover the surrounding
//! system (transport, payloads, pairing storage and the accessory bridge).

/// Unified error type for BetterButtons.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// MQTT transport errors.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Inbound payload could not be decoded.
    #[error("Payload error on {topic}: {message}")]
    Payload { topic: String, message: String },

    /// Pairing state storage errors.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Accessory bridge errors.
    #[error("Bridge error: {0}")]
    Bridge(String),
}

impl Error {
    /// Build a payload error for the given topic.
    pub fn payload(topic: impl Into<String>, message: impl ToString) -> Self {
        Self::Payload {
            topic: topic.into(),
            message: message.to_string(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

/// Result type alias for convenience.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_error_display() {
        let err = Error::payload("zigbee2mqtt/0x01", "expected value at line 1");
        assert_eq!(
            err.to_string(),
            "Payload error on zigbee2mqtt/0x01: expected value at line 1"
        );
    }

    #[test]
    fn test_io_error_maps_to_storage() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(Error::from(io), Error::Storage(_)));
    }
}
