//! Events produced by the button pipeline.

use serde::{Deserialize, Serialize};

use crate::action::PressEvent;
use crate::config::battery::LOW_THRESHOLD;

/// Battery report derived from a raw percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatteryStatus {
    /// Rounded percentage, clamped to 0..=100.
    pub level: u8,
    /// Set when the raw value is below 20%.
    pub low: bool,
}

impl BatteryStatus {
    pub fn from_percentage(percentage: f64) -> Self {
        let level = percentage.round().clamp(0.0, 100.0) as u8;
        Self {
            level,
            low: percentage < LOW_THRESHOLD,
        }
    }
}

/// Event published on the bridge event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BridgeEvent {
    /// A canonical gesture on one button.
    ButtonPressed {
        device_id: String,
        button_index: usize,
        button_name: String,
        event: PressEvent,
    },

    /// Battery report from a battery-capable device.
    BatteryChanged {
        device_id: String,
        status: BatteryStatus,
    },

    /// The set of admitted devices grew.
    DevicesChanged { device_count: usize },
}

impl BridgeEvent {
    pub fn device_id(&self) -> Option<&str> {
        match self {
            Self::ButtonPressed { device_id, .. } | Self::BatteryChanged { device_id, .. } => {
                Some(device_id)
            }
            Self::DevicesChanged { .. } => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::ButtonPressed { .. } => "ButtonPressed",
            Self::BatteryChanged { .. } => "BatteryChanged",
            Self::DevicesChanged { .. } => "DevicesChanged",
        }
    }

    pub fn is_press(&self) -> bool {
        matches!(self, Self::ButtonPressed { .. })
    }
}

/// Metadata attached to every published event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event ID
    pub event_id: String,
    /// Component that published the event
    pub source: String,
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
}

impl EventMetadata {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            source: source.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}
