//! zigbee2mqtt payloads and topics.
//!
//! Topic format:
//!
//! - device list: `{base}/bridge/devices` (retained JSON array)
//! - device state: `{base}/{ieee_address}` (JSON object)

use serde::Deserialize;

use betterbuttons_core::{DeviceIdentity, Error, Result};

/// One entry of the `bridge/devices` list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Device {
    pub ieee_address: String,
    #[serde(default)]
    pub interviewing: bool,
    #[serde(default)]
    pub interview_completed: bool,
    /// Absent for the coordinator and for devices still being interviewed.
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub software_build_id: Option<String>,
}

impl Device {
    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity::new(
            self.ieee_address.clone(),
            self.manufacturer.clone().unwrap_or_default(),
            self.model_id.clone().unwrap_or_default(),
        )
        .with_firmware(self.software_build_id.clone().unwrap_or_default())
    }
}

/// State message of one device. Only the fields the bridge uses are decoded.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DeviceUpdate {
    /// Filled from the topic, not the payload.
    #[serde(skip)]
    pub ieee_address: String,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub battery: Option<f64>,
}

impl DeviceUpdate {
    pub fn new(ieee_address: impl Into<String>) -> Self {
        Self {
            ieee_address: ieee_address.into(),
            ..Self::default()
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_battery(mut self, battery: f64) -> Self {
        self.battery = Some(battery);
        self
    }

    /// The action string, if present and non-empty.
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref().filter(|a| !a.is_empty())
    }
}

/// Topic layout under a zigbee2mqtt base topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    base: String,
}

impl Topics {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    pub fn device_list(&self) -> String {
        format!("{}/bridge/devices", self.base)
    }

    pub fn device(&self, ieee_address: &str) -> String {
        format!("{}/{}", self.base, ieee_address)
    }

    /// Device address of a per-device state topic.
    ///
    /// Returns `None` for bridge topics and for sub-topics such as
    /// `{base}/{id}/availability`.
    pub fn device_address<'a>(&self, topic: &'a str) -> Option<&'a str> {
        let rest = topic.strip_prefix(self.base.as_str())?.strip_prefix('/')?;
        if rest.is_empty() || rest.contains('/') || rest == "bridge" {
            return None;
        }
        Some(rest)
    }
}

pub fn parse_device_list(topic: &str, payload: &[u8]) -> Result<Vec<Device>> {
    serde_json::from_slice(payload).map_err(|e| Error::payload(topic, e))
}

pub fn parse_device_update(topic: &str, ieee_address: &str, payload: &[u8]) -> Result<DeviceUpdate> {
    let mut update: DeviceUpdate =
        serde_json::from_slice(payload).map_err(|e| Error::payload(topic, e))?;
    update.ieee_address = ieee_address.to_string();
    Ok(update)
}
