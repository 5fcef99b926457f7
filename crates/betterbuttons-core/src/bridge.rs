//! Seam to the smart-home accessory side.
//!
//! The device service hands the bridge a full snapshot whenever the set of
//! admitted devices changes and forwards every [`BridgeEvent`] to it.
//! Implementations own their protocol machinery; nothing here knows about
//! HAP.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::capability::ButtonSpec;
use crate::error::Result;
use crate::event::BridgeEvent;

/// Immutable identity of a sensor, fixed at admission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Hardware (IEEE) address, e.g. `0x0017880104abcdef`.
    pub address: String,
    pub manufacturer: String,
    pub model: String,
    pub firmware_build: String,
}

impl DeviceIdentity {
    pub fn new(
        address: impl Into<String>,
        manufacturer: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            manufacturer: manufacturer.into(),
            model: model.into(),
            firmware_build: String::new(),
        }
    }

    pub fn with_firmware(mut self, build: impl Into<String>) -> Self {
        self.firmware_build = build.into();
        self
    }
}

/// Read-only copy of an admitted device, without live button state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub identity: DeviceIdentity,
    pub supports_battery: bool,
    pub buttons: Vec<ButtonSpec>,
}

/// Accessory-protocol collaborator.
#[async_trait]
pub trait AccessoryBridge: Send + Sync {
    /// Replace the published accessory set with `devices`.
    ///
    /// Called once per batch of admissions, never while registry locks are
    /// held.
    async fn rebuild(&self, devices: Vec<DeviceSnapshot>) -> Result<()>;

    /// Deliver one event (button press, battery report, device-set change).
    async fn handle_event(&self, event: &BridgeEvent) -> Result<()>;
}
