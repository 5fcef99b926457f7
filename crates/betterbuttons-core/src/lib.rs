//! Core types for BetterButtons.
//!
//! Turns the raw action strings of Zigbee button sensors into clean
//! Single/Double/Long gestures:
//!
//! - **CapabilityRegistry**: which `(manufacturer, model)` pairs are supported,
//!   with their button layout and action mapper
//! - **ActionMapper**: per-vendor parsing of raw action strings
//! - **Button / ButtonState**: per-button press synthesis with a debounce window
//! - **EventBus**: fan-out of the resulting events
//! - **AccessoryBridge**: seam to the accessory-protocol side

pub mod action;
pub mod bridge;
pub mod button;
pub mod capability;
pub mod config;
pub mod error;
pub mod event;
pub mod eventbus;
pub mod mapper;

pub use action::{ButtonAction, PressEvent};
pub use bridge::{AccessoryBridge, DeviceIdentity, DeviceSnapshot};
pub use button::{Button, ButtonPhase, ButtonState, Transition};
pub use capability::{ButtonLayout, ButtonSpec, Capability, CapabilityRegistry, DeviceModel};
pub use config::BridgeConfig;
pub use error::{Error, Result};
pub use event::{BatteryStatus, BridgeEvent, EventMetadata};
pub use eventbus::{EventBus, EventBusReceiver, FilteredReceiver};
pub use mapper::{ActionMapper, DirectReportMapper, MappedAction, SplitPhaseMapper};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
