//! HomeKit side of the accessory bridge.
//!
//! Holds the current accessory database and the pairing PIN. Each rebuild
//! replaces the database in one swap; each delivered event is written into
//! the matching characteristic and broadcast as a [`CharacteristicChange`]
//! for the HAP transport to relay to paired controllers.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use betterbuttons_core::{
    AccessoryBridge, BatteryStatus, BridgeEvent, DeviceSnapshot, Error, PressEvent, Result,
};

use crate::accessory::{
    switch_event_value, Accessory, AccessoryDatabase, CharacteristicType, CharacteristicValue,
};
use crate::pin::{format_setup_code, PinStore};

const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// A characteristic write that controllers must be notified about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacteristicChange {
    pub aid: u64,
    pub service_id: u64,
    pub characteristic: CharacteristicType,
    pub value: CharacteristicValue,
}

struct Published {
    database: AccessoryDatabase,
    pin: String,
}

/// [`AccessoryBridge`] that maintains the HomeKit accessory database.
pub struct HomeKitBridge {
    state_dir: PathBuf,
    pins: PinStore,
    firmware: String,
    published: RwLock<Option<Published>>,
    changes: broadcast::Sender<CharacteristicChange>,
}

impl HomeKitBridge {
    /// Bridge persisting its pairing state under `state_dir`.
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        let state_dir = state_dir.into();
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            pins: PinStore::new(state_dir.clone()),
            state_dir,
            firmware: betterbuttons_core::VERSION.to_string(),
            published: RwLock::new(None),
            changes,
        }
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Stream of characteristic writes.
    pub fn subscribe_changes(&self) -> broadcast::Receiver<CharacteristicChange> {
        self.changes.subscribe()
    }

    /// Pairing PIN of the published accessory set.
    pub fn pin(&self) -> Option<String> {
        self.published.read().as_ref().map(|p| p.pin.clone())
    }

    pub fn is_published(&self) -> bool {
        self.published.read().is_some()
    }

    /// Read access to the published database.
    pub fn with_database<T>(&self, f: impl FnOnce(&AccessoryDatabase) -> T) -> Option<T> {
        self.published.read().as_ref().map(|p| f(&p.database))
    }

    fn write(
        &self,
        device_id: &str,
        service: impl Fn(&Accessory) -> Option<u64>,
        writes: &[(CharacteristicType, CharacteristicValue)],
    ) -> Result<usize> {
        let mut guard = self.published.write();
        let Some(published) = guard.as_mut() else {
            return Err(Error::Bridge("no accessory set published yet".to_string()));
        };

        let Some(accessory) = published.database.accessory_mut(device_id) else {
            debug!("No accessory for device {}", device_id);
            return Ok(0);
        };
        let aid = accessory.aid;
        let Some(service_id) = service(accessory) else {
            debug!("Device {} has no matching service", device_id);
            return Ok(0);
        };
        let Some(service) = accessory.service_mut(service_id) else {
            return Ok(0);
        };

        let mut changes = Vec::with_capacity(writes.len());
        for (kind, value) in writes {
            let Some(characteristic) = service.characteristic_mut(*kind) else {
                continue;
            };
            if !characteristic.accepts(value) {
                warn!(
                    "Value {:?} not valid for {:?} on device {}",
                    value, kind, device_id
                );
                continue;
            }
            // Switch events are stateless; only the notification matters.
            if *kind != CharacteristicType::ProgrammableSwitchEvent {
                characteristic.value = Some(value.clone());
            }
            changes.push(CharacteristicChange {
                aid,
                service_id,
                characteristic: *kind,
                value: value.clone(),
            });
        }
        drop(guard);

        let count = changes.len();
        for change in changes {
            // No subscriber is not an error: nothing is paired yet.
            let _ = self.changes.send(change);
        }
        Ok(count)
    }

    fn press(&self, device_id: &str, button_index: usize, event: PressEvent) -> Result<usize> {
        let value = CharacteristicValue::Int(i64::from(switch_event_value(event)));
        debug!(
            "Publishing button event: device={} button={} value={:?}",
            device_id, button_index, value
        );
        self.write(
            device_id,
            |accessory| accessory.switch_service_id(button_index),
            &[(CharacteristicType::ProgrammableSwitchEvent, value)],
        )
    }

    fn battery(&self, device_id: &str, status: BatteryStatus) -> Result<usize> {
        self.write(
            device_id,
            |accessory| accessory.battery_service_id(),
            &[
                (
                    CharacteristicType::BatteryLevel,
                    CharacteristicValue::Int(i64::from(status.level)),
                ),
                (
                    CharacteristicType::StatusLowBattery,
                    CharacteristicValue::Int(i64::from(status.low)),
                ),
            ],
        )
    }
}

#[async_trait]
impl AccessoryBridge for HomeKitBridge {
    async fn rebuild(&self, devices: Vec<DeviceSnapshot>) -> Result<()> {
        let (database, skipped) = AccessoryDatabase::build(&devices, &self.firmware);
        for (address, e) in &skipped {
            warn!("Leaving device {} out of the accessory set: {}", address, e);
        }

        let pin = self.pins.load_or_generate().await?;

        let previous = self.published.write().replace(Published {
            database,
            pin: pin.clone(),
        });
        if previous.is_some() {
            info!("Replaced existing HomeKit accessory set");
        }

        info!(
            "HomeKit bridge ready: accessories={} pin={}",
            devices.len() - skipped.len(),
            format_setup_code(&pin)
        );
        Ok(())
    }

    async fn handle_event(&self, event: &BridgeEvent) -> Result<()> {
        match event {
            BridgeEvent::ButtonPressed {
                device_id,
                button_index,
                event,
                ..
            } => self.press(device_id, *button_index, *event).map(|_| ()),
            BridgeEvent::BatteryChanged { device_id, status } => {
                self.battery(device_id, *status).map(|_| ())
            }
            BridgeEvent::DevicesChanged { device_count } => {
                debug!("Accessory set now covers {} devices", device_count);
                Ok(())
            }
        }
    }
}
