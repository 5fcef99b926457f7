//! Configuration defaults and the bridge configuration type.
//!
//! Keeps every default in one place so the CLI, the transport and the tests
//! agree on them.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Timing constants of the button pipeline.
pub mod timing {
    /// Window in which a second press upgrades a pending single into a double.
    pub const DEBOUNCE_WINDOW_MS: u64 = 300;
    /// Period of the reconciliation tick.
    pub const TICK_INTERVAL_MS: u64 = 100;
}

/// Battery reporting constants.
pub mod battery {
    /// Percentages strictly below this are reported as low.
    pub const LOW_THRESHOLD: f64 = 20.0;
}

/// Default values for the outer surfaces.
pub mod defaults {
    pub const MQTT_URL: &str = "mqtt://localhost:1883";
    pub const MQTT_PORT: u16 = 1883;
    pub const HOMEKIT_DIR: &str = "./db";
    pub const BASE_TOPIC: &str = "zigbee2mqtt";
    pub const CLIENT_ID: &str = "BetterButtons";
    pub const KEEP_ALIVE_SECS: u64 = 60;
}

/// Environment variable names.
pub mod env_vars {
    pub const MQTT_URL: &str = "BETTERBUTTONS_MQTT_URL";
    pub const HOMEKIT_DIR: &str = "BETTERBUTTONS_HOMEKIT_DIR";
    pub const BASE_TOPIC: &str = "BETTERBUTTONS_BASE_TOPIC";
    pub const CLIENT_ID: &str = "BETTERBUTTONS_CLIENT_ID";
    pub const DEBUG: &str = "BETTERBUTTONS_DEBUG";
    pub const LOG_JSON: &str = "BETTERBUTTONS_LOG_JSON";
}

/// Runtime configuration of the bridge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeConfig {
    /// Broker URL, `mqtt://host[:port]`.
    #[serde(default = "default_mqtt_url")]
    pub mqtt_url: String,

    /// Directory holding HomeKit pairing state.
    #[serde(default = "default_homekit_dir")]
    pub homekit_dir: PathBuf,

    /// zigbee2mqtt base topic.
    #[serde(default = "default_base_topic")]
    pub base_topic: String,

    /// MQTT client identifier.
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Debug logging.
    #[serde(default)]
    pub debug: bool,

    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

fn default_mqtt_url() -> String {
    defaults::MQTT_URL.to_string()
}
fn default_homekit_dir() -> PathBuf {
    PathBuf::from(defaults::HOMEKIT_DIR)
}
fn default_base_topic() -> String {
    defaults::BASE_TOPIC.to_string()
}
fn default_client_id() -> String {
    defaults::CLIENT_ID.to_string()
}
fn default_debounce_ms() -> u64 {
    timing::DEBOUNCE_WINDOW_MS
}
fn default_tick_ms() -> u64 {
    timing::TICK_INTERVAL_MS
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            mqtt_url: default_mqtt_url(),
            homekit_dir: default_homekit_dir(),
            base_topic: default_base_topic(),
            client_id: default_client_id(),
            debug: false,
            debounce_ms: default_debounce_ms(),
            tick_ms: default_tick_ms(),
        }
    }
}

impl BridgeConfig {
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Reject values the runtime cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.tick_ms == 0 {
            return Err(Error::Config("tick_ms must be greater than zero".into()));
        }
        if self.base_topic.is_empty() || self.base_topic.ends_with('/') {
            return Err(Error::Config(format!(
                "invalid base topic: {:?}",
                self.base_topic
            )));
        }
        if self.client_id.is_empty() {
            return Err(Error::Config("client_id must not be empty".into()));
        }
        Ok(())
    }
}

/// Read a boolean flag from the environment, accepting `1`/`true`.
pub fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.mqtt_url, "mqtt://localhost:1883");
        assert_eq!(config.homekit_dir, PathBuf::from("./db"));
        assert_eq!(config.debounce_window(), Duration::from_millis(300));
        assert_eq!(config.tick_interval(), Duration::from_millis(100));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_deserialize_fills_defaults() {
        let config: BridgeConfig =
            serde_json::from_str(r#"{"mqtt_url": "mqtt://broker:1884", "debug": true}"#).unwrap();
        assert_eq!(config.mqtt_url, "mqtt://broker:1884");
        assert!(config.debug);
        assert_eq!(config.base_topic, "zigbee2mqtt");
        assert_eq!(config.client_id, "BetterButtons");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = BridgeConfig::default();
        config.tick_ms = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = BridgeConfig::default();
        config.base_topic = "zigbee2mqtt/".into();
        assert!(config.validate().is_err());
    }
}
