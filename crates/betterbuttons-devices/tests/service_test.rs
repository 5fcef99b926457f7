//! Tests for ButtonService wiring

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::test;
use tokio_util::sync::CancellationToken;

use betterbuttons_core::{
    AccessoryBridge, BridgeEvent, DeviceSnapshot, Error, EventBus, PressEvent, Result,
};
use betterbuttons_devices::{parse_device_list, ButtonService, DeviceRegistry, DeviceUpdate};

/// Bridge double that records everything it is handed.
#[derive(Default)]
struct RecordingBridge {
    rebuilds: Mutex<Vec<Vec<DeviceSnapshot>>>,
    events: Mutex<Vec<BridgeEvent>>,
    attempts: Mutex<usize>,
    fail_rebuild: bool,
}

impl RecordingBridge {
    fn failing() -> Self {
        Self {
            fail_rebuild: true,
            ..Self::default()
        }
    }

    fn rebuild_sizes(&self) -> Vec<usize> {
        self.rebuilds.lock().iter().map(Vec::len).collect()
    }

    fn presses(&self) -> Vec<PressEvent> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                BridgeEvent::ButtonPressed { event, .. } => Some(*event),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl AccessoryBridge for RecordingBridge {
    async fn rebuild(&self, devices: Vec<DeviceSnapshot>) -> Result<()> {
        *self.attempts.lock() += 1;
        if self.fail_rebuild {
            return Err(Error::Bridge("accessory store unavailable".to_string()));
        }
        self.rebuilds.lock().push(devices);
        Ok(())
    }

    async fn handle_event(&self, event: &BridgeEvent) -> Result<()> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

const DEVICE_LIST: &[u8] = br#"[
    {"ieee_address": "0x00124b0022aabbcc", "type": "Coordinator"},
    {"ieee_address": "0x0017880104abcdef", "manufacturer": "Philips", "model_id": "RWL021"},
    {"ieee_address": "0x00124b0025e1f2a3", "manufacturer": "eWeLink", "model_id": "SNZB-01P"}
]"#;

fn service(bridge: Arc<RecordingBridge>) -> Arc<ButtonService> {
    Arc::new(
        ButtonService::new(
            Arc::new(DeviceRegistry::builtin()),
            EventBus::with_name("test"),
            bridge,
        )
        .with_tick_interval(Duration::from_millis(20)),
    )
}

async fn wait_for<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[test]
async fn test_device_list_rebuilds_once_per_batch() {
    let bridge = Arc::new(RecordingBridge::default());
    let service = service(bridge.clone());
    let devices = parse_device_list("zigbee2mqtt/bridge/devices", DEVICE_LIST).unwrap();

    let admitted = service.handle_device_list(&devices).await;
    assert_eq!(
        admitted,
        vec![
            "0x0017880104abcdef".to_string(),
            "0x00124b0025e1f2a3".to_string()
        ]
    );
    assert_eq!(bridge.rebuild_sizes(), vec![2]);

    // Same list again: nothing new, no rebuild
    let admitted = service.handle_device_list(&devices).await;
    assert!(admitted.is_empty());
    assert_eq!(bridge.rebuild_sizes(), vec![2]);
}

#[test]
async fn test_first_empty_list_still_builds_bridge() {
    let bridge = Arc::new(RecordingBridge::default());
    let service = service(bridge.clone());

    assert!(service.handle_device_list(&[]).await.is_empty());
    assert_eq!(bridge.rebuild_sizes(), vec![0]);

    service.handle_device_list(&[]).await;
    assert_eq!(bridge.rebuild_sizes(), vec![0]);
}

#[test]
async fn test_failed_rebuild_is_retried_on_next_list() {
    let bridge = Arc::new(RecordingBridge::failing());
    let service = service(bridge.clone());
    let mut rx = service.event_bus().subscribe();

    service.handle_device_list(&[]).await;
    service.handle_device_list(&[]).await;
    assert_eq!(*bridge.attempts.lock(), 2);
    assert!(bridge.rebuild_sizes().is_empty());

    // No DevicesChanged was published for a failed rebuild
    assert!(rx.try_recv().is_none());
}

#[test]
async fn test_update_events_published_on_bus() {
    let bridge = Arc::new(RecordingBridge::default());
    let service = service(bridge);
    let devices = parse_device_list("zigbee2mqtt/bridge/devices", DEVICE_LIST).unwrap();
    service.handle_device_list(&devices).await;

    let mut rx = service.event_bus().subscribe();
    let update = DeviceUpdate::new("0x00124b0025e1f2a3")
        .with_action("long")
        .with_battery(12.0);
    assert_eq!(service.handle_update(&update), 2);

    let (first, meta) = rx.recv().await.unwrap();
    assert_eq!(first.type_name(), "BatteryChanged");
    assert_eq!(meta.source, "button_service");
    let (second, _) = rx.recv().await.unwrap();
    assert!(second.is_press());
}

#[test]
async fn test_spawned_tasks_flush_and_forward() {
    let bridge = Arc::new(RecordingBridge::default());
    let service = Arc::new(
        ButtonService::new(
            Arc::new(DeviceRegistry::builtin().with_debounce_window(Duration::from_millis(50))),
            EventBus::new(),
            bridge.clone(),
        )
        .with_tick_interval(Duration::from_millis(10)),
    );

    let cancel = CancellationToken::new();
    let tasks = service.spawn(cancel.clone());

    let devices = parse_device_list("zigbee2mqtt/bridge/devices", DEVICE_LIST).unwrap();
    service.handle_device_list(&devices).await;

    service.handle_update(&DeviceUpdate::new("0x0017880104abcdef").with_action("on_press"));
    service
        .handle_update(&DeviceUpdate::new("0x0017880104abcdef").with_action("on_press_release"));

    assert!(wait_for(|| bridge.presses() == vec![PressEvent::Single]).await);

    let device_changes = bridge
        .events
        .lock()
        .iter()
        .filter(|e| matches!(e, BridgeEvent::DevicesChanged { device_count: 2 }))
        .count();
    assert_eq!(device_changes, 1);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), tasks.join())
        .await
        .expect("service tasks should stop on cancel");
}

#[test]
async fn test_forwarder_delivers_every_press_when_bus_lags() {
    let bridge = Arc::new(RecordingBridge::default());
    let service = Arc::new(ButtonService::new(
        Arc::new(DeviceRegistry::builtin()),
        EventBus::with_capacity(2),
        bridge.clone(),
    ));
    let mut slow = service.event_bus().subscribe();

    let cancel = CancellationToken::new();
    let tasks = service.spawn(cancel.clone());
    let devices = parse_device_list("zigbee2mqtt/bridge/devices", DEVICE_LIST).unwrap();
    service.handle_device_list(&devices).await;

    // Published back to back, well past the bus capacity
    let update = DeviceUpdate::new("0x00124b0025e1f2a3").with_action("single");
    for _ in 0..10 {
        service.handle_update(&update);
    }

    assert!(wait_for(|| bridge.presses().len() == 10).await);
    assert!(bridge.presses().iter().all(|p| *p == PressEvent::Single));

    // The bus subscriber only kept the newest events
    let mut kept = 0;
    while slow.try_recv().is_some() {
        kept += 1;
    }
    assert!(kept <= 2);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), tasks.join())
        .await
        .expect("service tasks should stop on cancel");
}
