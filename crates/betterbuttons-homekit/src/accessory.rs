//! HomeKit accessory database.
//!
//! Built from device snapshots on every rebuild:
//!
//! - one bridge accessory (aid 1)
//! - one accessory per device, with an id derived from its IEEE address
//! - a battery service for battery-capable devices
//! - one stateless programmable switch per button
//!
//! Service ids are allocated sequentially after the accessory id. Characteristic
//! values live here; the HAP transport reads them and relays changes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use betterbuttons_core::{ButtonSpec, DeviceSnapshot, Error, PressEvent, Result};

/// Accessory id of the bridge itself.
pub const BRIDGE_AID: u64 = 1;

/// Service id of the accessory information service on every accessory.
pub const INFO_SERVICE_ID: u64 = 1;

const ACCESSORY_ID_MASK: u64 = 0x0000_0000_ffff_ff00;

/// Accessory category advertised for an accessory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Bridge,
    ProgrammableSwitch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceType {
    AccessoryInformation,
    Battery,
    StatelessProgrammableSwitch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharacteristicType {
    Name,
    Manufacturer,
    Model,
    SerialNumber,
    FirmwareRevision,
    BatteryLevel,
    StatusLowBattery,
    ChargingState,
    ProgrammableSwitchEvent,
    ServiceLabelIndex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CharacteristicValue {
    Int(i64),
    Str(String),
}

impl From<&str> for CharacteristicValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<i64> for CharacteristicValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

/// Value a programmable switch reports for a gesture.
pub fn switch_event_value(event: PressEvent) -> u8 {
    match event {
        PressEvent::Single => 0,
        PressEvent::Double => 1,
        PressEvent::Long => 2,
    }
}

/// Valid switch event values for a button, in ascending order.
pub fn valid_switch_values(spec: &ButtonSpec) -> Vec<u8> {
    [
        (spec.supports_single, PressEvent::Single),
        (spec.supports_double, PressEvent::Double),
        (spec.supports_long, PressEvent::Long),
    ]
    .into_iter()
    .filter(|(supported, _)| *supported)
    .map(|(_, event)| switch_event_value(event))
    .collect()
}

/// Accessory id of a device.
///
/// The `0x` prefix is dropped, the hex digits after the first four are read
/// as a 48-bit number, shifted left by 8 and masked to 24 significant bits.
pub fn accessory_id(ieee_address: &str) -> Result<u64> {
    let mac = ieee_address.strip_prefix("0x").unwrap_or(ieee_address);
    let tail = mac
        .get(4..)
        .filter(|t| !t.is_empty() && t.len() <= 12)
        .ok_or_else(|| Error::Bridge(format!("unusable IEEE address {:?}", ieee_address)))?;

    let id = u64::from_str_radix(tail, 16)
        .map_err(|e| Error::Bridge(format!("unusable IEEE address {:?}: {}", ieee_address, e)))?;

    Ok((id << 8) & ACCESSORY_ID_MASK)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Characteristic {
    pub kind: CharacteristicType,
    /// `None` until first written; switch events are never readable.
    pub value: Option<CharacteristicValue>,
    /// Empty means unrestricted.
    pub valid_values: Vec<u8>,
}

impl Characteristic {
    pub fn new(kind: CharacteristicType) -> Self {
        Self {
            kind,
            value: None,
            valid_values: Vec::new(),
        }
    }

    pub fn with_value(mut self, value: impl Into<CharacteristicValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_valid_values(mut self, values: Vec<u8>) -> Self {
        self.valid_values = values;
        self
    }

    pub fn accepts(&self, value: &CharacteristicValue) -> bool {
        match value {
            CharacteristicValue::Int(v) if !self.valid_values.is_empty() => self
                .valid_values
                .iter()
                .any(|allowed| i64::from(*allowed) == *v),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: u64,
    pub kind: ServiceType,
    pub characteristics: Vec<Characteristic>,
}

impl Service {
    fn new(id: u64, kind: ServiceType) -> Self {
        Self {
            id,
            kind,
            characteristics: Vec::new(),
        }
    }

    fn with(mut self, characteristic: Characteristic) -> Self {
        self.characteristics.push(characteristic);
        self
    }

    fn information(
        name: &str,
        manufacturer: &str,
        model: &str,
        serial: &str,
        firmware: &str,
    ) -> Self {
        use CharacteristicType::*;
        Self::new(INFO_SERVICE_ID, ServiceType::AccessoryInformation)
            .with(Characteristic::new(Name).with_value(name))
            .with(Characteristic::new(Manufacturer).with_value(manufacturer))
            .with(Characteristic::new(Model).with_value(model))
            .with(Characteristic::new(SerialNumber).with_value(serial))
            .with(Characteristic::new(FirmwareRevision).with_value(firmware))
    }

    fn battery(id: u64) -> Self {
        use CharacteristicType::*;
        Self::new(id, ServiceType::Battery)
            .with(Characteristic::new(BatteryLevel).with_value(0i64))
            .with(Characteristic::new(StatusLowBattery).with_value(0i64))
            // Not chargeable
            .with(Characteristic::new(ChargingState).with_value(2i64))
    }

    fn programmable_switch(id: u64, label_index: usize, spec: &ButtonSpec) -> Self {
        Self::new(id, ServiceType::StatelessProgrammableSwitch)
            .with(Characteristic::new(CharacteristicType::Name).with_value(spec.name.as_str()))
            .with(
                Characteristic::new(CharacteristicType::ProgrammableSwitchEvent)
                    .with_valid_values(valid_switch_values(spec)),
            )
            .with(
                Characteristic::new(CharacteristicType::ServiceLabelIndex)
                    .with_value(label_index as i64),
            )
    }

    pub fn characteristic(&self, kind: CharacteristicType) -> Option<&Characteristic> {
        self.characteristics.iter().find(|c| c.kind == kind)
    }

    pub fn characteristic_mut(&mut self, kind: CharacteristicType) -> Option<&mut Characteristic> {
        self.characteristics.iter_mut().find(|c| c.kind == kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accessory {
    pub aid: u64,
    pub category: Category,
    pub services: Vec<Service>,
    /// Switch service ids in button order.
    #[serde(skip)]
    switch_ids: Vec<u64>,
    #[serde(skip)]
    battery_id: Option<u64>,
}

impl Accessory {
    fn bridge(firmware: &str) -> Self {
        Self {
            aid: BRIDGE_AID,
            category: Category::Bridge,
            services: vec![Service::information(
                "BetterButtons",
                "BetterButtons",
                "BetterButtons",
                "1",
                firmware,
            )],
            switch_ids: Vec::new(),
            battery_id: None,
        }
    }

    fn for_device(device: &DeviceSnapshot) -> Result<Self> {
        let identity = &device.identity;
        let aid = accessory_id(&identity.address)?;
        let mut next_id = aid + 1;
        let mut alloc = || {
            let id = next_id;
            next_id += 1;
            id
        };

        let mut accessory = Self {
            aid,
            category: Category::ProgrammableSwitch,
            services: vec![Service::information(
                &format!("{} {}", identity.manufacturer, identity.model),
                &identity.manufacturer,
                &identity.model,
                &identity.address,
                &identity.firmware_build,
            )],
            switch_ids: Vec::new(),
            battery_id: None,
        };

        if device.supports_battery {
            let id = alloc();
            accessory.services.push(Service::battery(id));
            accessory.battery_id = Some(id);
        }

        for (n, spec) in device.buttons.iter().enumerate() {
            let id = alloc();
            accessory
                .services
                .push(Service::programmable_switch(id, n + 1, spec));
            accessory.switch_ids.push(id);
        }

        Ok(accessory)
    }

    pub fn name(&self) -> Option<&str> {
        let info = self.service(INFO_SERVICE_ID)?;
        match &info.characteristic(CharacteristicType::Name)?.value {
            Some(CharacteristicValue::Str(name)) => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn service(&self, id: u64) -> Option<&Service> {
        self.services.iter().find(|s| s.id == id)
    }

    pub fn service_mut(&mut self, id: u64) -> Option<&mut Service> {
        self.services.iter_mut().find(|s| s.id == id)
    }

    /// Switch service of button `index`.
    pub fn switch_service_id(&self, index: usize) -> Option<u64> {
        self.switch_ids.get(index).copied()
    }

    pub fn battery_service_id(&self) -> Option<u64> {
        self.battery_id
    }
}

/// The full accessory set published by the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessoryDatabase {
    bridge: Accessory,
    accessories: Vec<Accessory>,
    by_device: HashMap<String, usize>,
}

impl AccessoryDatabase {
    /// Build the accessory set for `devices`.
    ///
    /// A device whose address yields an unusable or already taken id is left
    /// out and reported in the second element.
    pub fn build(devices: &[DeviceSnapshot], firmware: &str) -> (Self, Vec<(String, Error)>) {
        let mut db = Self {
            bridge: Accessory::bridge(firmware),
            accessories: Vec::with_capacity(devices.len()),
            by_device: HashMap::with_capacity(devices.len()),
        };
        let mut skipped = Vec::new();

        for device in devices {
            let address = device.identity.address.clone();
            match Accessory::for_device(device) {
                Ok(accessory) if accessory.aid <= BRIDGE_AID => skipped.push((
                    address,
                    Error::Bridge(format!("accessory id {} is reserved", accessory.aid)),
                )),
                Ok(accessory) if db.accessory_by_aid(accessory.aid).is_some() => {
                    skipped.push((
                        address,
                        Error::Bridge(format!("accessory id {:#x} already in use", accessory.aid)),
                    ))
                }
                Ok(accessory) => {
                    db.by_device.insert(address, db.accessories.len());
                    db.accessories.push(accessory);
                }
                Err(e) => skipped.push((address, e)),
            }
        }

        (db, skipped)
    }

    pub fn bridge(&self) -> &Accessory {
        &self.bridge
    }

    /// Device accessories, in snapshot order.
    pub fn accessories(&self) -> &[Accessory] {
        &self.accessories
    }

    pub fn len(&self) -> usize {
        self.accessories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accessories.is_empty()
    }

    pub fn accessory(&self, device_id: &str) -> Option<&Accessory> {
        self.by_device.get(device_id).map(|&i| &self.accessories[i])
    }

    pub fn accessory_mut(&mut self, device_id: &str) -> Option<&mut Accessory> {
        let index = *self.by_device.get(device_id)?;
        self.accessories.get_mut(index)
    }

    fn accessory_by_aid(&self, aid: u64) -> Option<&Accessory> {
        self.accessories.iter().find(|a| a.aid == aid)
    }
}
