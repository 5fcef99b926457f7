//! HomeKit accessory side of BetterButtons.
//!
//! - **AccessoryDatabase**: accessories and services built from device snapshots
//! - **PinStore**: pairing PIN persisted in the state directory
//! - **HomeKitBridge**: `AccessoryBridge` implementation tying both together

pub mod accessory;
pub mod bridge;
pub mod pin;

pub use accessory::{
    accessory_id, Accessory, AccessoryDatabase, Category, Characteristic, CharacteristicType,
    CharacteristicValue, Service, ServiceType,
};
pub use bridge::{CharacteristicChange, HomeKitBridge};
pub use pin::PinStore;
