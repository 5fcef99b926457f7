//! Button devices for BetterButtons.
//!
//! - **zigbee2mqtt**: device list and state payloads, topic layout
//! - **DeviceRegistry**: admitted devices and their per-button state
//! - **ButtonService**: registry, event bus and accessory bridge wired together
//! - **MqttTransport**: broker connection feeding the service (`mqtt` feature)

pub mod registry;
pub mod service;
pub mod zigbee2mqtt;

#[cfg(feature = "mqtt")]
pub mod mqtt;

pub use registry::{ButtonDevice, DeviceRegistry};
pub use service::{ButtonService, ServiceTasks};
pub use zigbee2mqtt::{parse_device_list, parse_device_update, Device, DeviceUpdate, Topics};

#[cfg(feature = "mqtt")]
pub use mqtt::{MqttTransport, MqttTransportConfig};
