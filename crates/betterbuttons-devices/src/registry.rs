//! Device registry - the set of admitted button devices.
//!
//! All mutation goes through four entry points:
//!
//! - [`DeviceRegistry::admit`] adds a device the capability registry knows
//! - [`DeviceRegistry::apply`] routes one telemetry update to its device
//! - [`DeviceRegistry::tick`] runs the periodic single-press flush
//! - [`DeviceRegistry::snapshot`] copies the device set for the accessory side
//!
//! ## Locking
//!
//! The device table sits behind a `RwLock` that is only held long enough to
//! look up or insert an entry. Each device has its own `Mutex`, so an inbound
//! release and the tick flush never interleave on the same buttons while
//! different devices proceed independently. No lock is held across an await.
//!
//! Devices are never removed: a sensor that disappears from a later device
//! list stays registered.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use betterbuttons_core::config::timing::DEBOUNCE_WINDOW_MS;
use betterbuttons_core::{
    ActionMapper, BatteryStatus, BridgeEvent, Button, ButtonState, Capability,
    CapabilityRegistry, DeviceIdentity, DeviceSnapshot, PressEvent,
};

use crate::zigbee2mqtt::DeviceUpdate;

/// An admitted sensor with its buttons.
#[derive(Debug)]
pub struct ButtonDevice {
    identity: DeviceIdentity,
    supports_battery: bool,
    buttons: Vec<Button>,
    mapper: Arc<dyn ActionMapper>,
}

impl ButtonDevice {
    fn new(identity: DeviceIdentity, capability: &Capability) -> Self {
        Self {
            identity,
            supports_battery: capability.layout.supports_battery,
            buttons: capability
                .layout
                .buttons
                .iter()
                .cloned()
                .map(Button::new)
                .collect(),
            mapper: capability.mapper.clone(),
        }
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn buttons(&self) -> &[Button] {
        &self.buttons
    }

    pub fn supports_battery(&self) -> bool {
        self.supports_battery
    }

    pub fn snapshot(&self) -> DeviceSnapshot {
        DeviceSnapshot {
            identity: self.identity.clone(),
            supports_battery: self.supports_battery,
            buttons: self.buttons.iter().map(|b| b.spec().clone()).collect(),
        }
    }

    fn apply(&mut self, update: &DeviceUpdate, now: Instant) -> Vec<BridgeEvent> {
        let mut events = Vec::new();

        if self.supports_battery {
            if let Some(battery) = update.battery {
                events.push(BridgeEvent::BatteryChanged {
                    device_id: self.identity.address.clone(),
                    status: BatteryStatus::from_percentage(battery),
                });
            }
        }

        let Some(raw) = update.action() else {
            return events;
        };

        let mapped = self.mapper.map(raw);
        let Some(button) = self.buttons.get_mut(mapped.button) else {
            debug!(
                "Dropping action {:?} for {}: button {} out of range",
                raw, self.identity.address, mapped.button
            );
            return events;
        };

        // Direct-report sensors already send the gesture; only raw phases go
        // through synthesis.
        let event = match mapped.action.press_event() {
            Some(event) => Some(event),
            None if mapped.action.is_raw() => button.handle(mapped.action, now),
            None => {
                debug!(
                    "Dropping unrecognised action {:?} from {}",
                    raw, self.identity.address
                );
                None
            }
        };

        if let Some(event) = event {
            events.push(self.press_event(mapped.button, event));
        }
        events
    }

    fn tick(&mut self, now: Instant, window: Duration) -> Vec<BridgeEvent> {
        let fired: Vec<(usize, PressEvent)> = self
            .buttons
            .iter_mut()
            .enumerate()
            .filter_map(|(index, button)| button.tick(now, window).map(|event| (index, event)))
            .collect();

        fired
            .into_iter()
            .map(|(index, event)| self.press_event(index, event))
            .collect()
    }

    fn press_event(&self, index: usize, event: PressEvent) -> BridgeEvent {
        debug!(
            "Button event: device={} button={} event={}",
            self.identity.address, index, event
        );
        BridgeEvent::ButtonPressed {
            device_id: self.identity.address.clone(),
            button_index: index,
            button_name: self.buttons[index].name().to_string(),
            event,
        }
    }
}

type DeviceHandle = Arc<Mutex<ButtonDevice>>;

#[derive(Default)]
struct DeviceTable {
    /// Admission order.
    order: Vec<DeviceHandle>,
    by_address: HashMap<String, DeviceHandle>,
}

/// Registry of admitted button devices.
pub struct DeviceRegistry {
    capabilities: CapabilityRegistry,
    devices: RwLock<DeviceTable>,
    debounce_window: Duration,
}

impl DeviceRegistry {
    /// Create a registry admitting the models in `capabilities`.
    pub fn new(capabilities: CapabilityRegistry) -> Self {
        Self {
            capabilities,
            devices: RwLock::new(DeviceTable::default()),
            debounce_window: Duration::from_millis(DEBOUNCE_WINDOW_MS),
        }
    }

    /// Registry with every built-in sensor model.
    pub fn builtin() -> Self {
        Self::new(CapabilityRegistry::builtin())
    }

    pub fn with_debounce_window(mut self, window: Duration) -> Self {
        self.debounce_window = window;
        self
    }

    pub fn debounce_window(&self) -> Duration {
        self.debounce_window
    }

    pub fn capabilities(&self) -> &CapabilityRegistry {
        &self.capabilities
    }

    /// Admit a device. Returns `false` if it is already known or its model
    /// is not supported.
    pub fn admit(&self, identity: &DeviceIdentity) -> bool {
        if self.contains(&identity.address) {
            return false;
        }

        let Some(capability) = self
            .capabilities
            .resolve(&identity.manufacturer, &identity.model)
        else {
            debug!(
                "Ignoring unsupported device: id={} manufacturer={:?} model={:?}",
                identity.address, identity.manufacturer, identity.model
            );
            return false;
        };

        let device = ButtonDevice::new(identity.clone(), capability);
        let button_count = device.buttons.len();

        let mut table = self.devices.write();
        if table.by_address.contains_key(&identity.address) {
            return false;
        }
        let handle = Arc::new(Mutex::new(device));
        table.order.push(handle.clone());
        table.by_address.insert(identity.address.clone(), handle);
        drop(table);

        info!(
            "Accepted new device: id={} manufacturer={} model={} buttons={}",
            identity.address, identity.manufacturer, identity.model, button_count
        );
        true
    }

    /// Apply a telemetry update at `now`. Unknown devices are ignored.
    pub fn apply(&self, update: &DeviceUpdate, now: Instant) -> Vec<BridgeEvent> {
        let Some(device) = self.get(&update.ieee_address) else {
            return Vec::new();
        };
        let mut device = device.lock();
        device.apply(update, now)
    }

    /// Flush every open press chain whose window has elapsed at `now`.
    pub fn tick(&self, now: Instant) -> Vec<BridgeEvent> {
        let devices: Vec<DeviceHandle> = self.devices.read().order.clone();
        devices
            .iter()
            .flat_map(|device| device.lock().tick(now, self.debounce_window))
            .collect()
    }

    /// Copy of every admitted device, in admission order.
    pub fn snapshot(&self) -> Vec<DeviceSnapshot> {
        let devices: Vec<DeviceHandle> = self.devices.read().order.clone();
        devices.iter().map(|d| d.lock().snapshot()).collect()
    }

    pub fn contains(&self, address: &str) -> bool {
        self.devices.read().by_address.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.devices.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Addresses of every admitted device, in admission order.
    pub fn addresses(&self) -> Vec<String> {
        let devices: Vec<DeviceHandle> = self.devices.read().order.clone();
        devices
            .iter()
            .map(|d| d.lock().identity.address.clone())
            .collect()
    }

    /// Current synthesis state of one button.
    pub fn button_state(&self, address: &str, button: usize) -> Option<ButtonState> {
        let device = self.get(address)?;
        let device = device.lock();
        device.buttons.get(button).map(|b| b.state())
    }

    fn get(&self, address: &str) -> Option<DeviceHandle> {
        self.devices.read().by_address.get(address).cloned()
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
