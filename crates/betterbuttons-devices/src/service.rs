//! Button service - runs the registry against the outside world.
//!
//! The service is the single place where registry results meet I/O:
//!
//! - device lists admit devices and trigger one bridge rebuild per batch
//! - telemetry updates are applied and their events published on the bus
//! - a ticker task drives the single-press flush
//! - a forwarder task hands every published event to the accessory bridge
//!   over its own unbounded channel, so a lagging bus subscriber never
//!   costs the bridge a press
//!
//! Both tasks stop when the shared cancellation token fires.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use betterbuttons_core::config::timing::TICK_INTERVAL_MS;
use betterbuttons_core::{AccessoryBridge, BridgeEvent, EventBus};

use crate::registry::DeviceRegistry;
use crate::zigbee2mqtt::{Device, DeviceUpdate};

const EVENT_SOURCE: &str = "button_service";

/// Orchestrates the registry, the event bus and the accessory bridge.
pub struct ButtonService {
    registry: Arc<DeviceRegistry>,
    event_bus: EventBus,
    bridge: Arc<dyn AccessoryBridge>,
    tick_interval: Duration,
    /// Serializes bridge rebuilds.
    rebuild_lock: tokio::sync::Mutex<()>,
    /// Set after the first rebuild, so the bridge exists even with no devices.
    bridge_built: AtomicBool,
    /// Feed of the running bridge forwarder, if any.
    forward_tx: Mutex<Option<mpsc::UnboundedSender<BridgeEvent>>>,
}

/// Join handles of the background tasks started by [`ButtonService::spawn`].
pub struct ServiceTasks {
    pub ticker: JoinHandle<()>,
    pub forwarder: JoinHandle<()>,
}

impl ServiceTasks {
    /// Wait for both tasks to finish.
    pub async fn join(self) {
        if let Err(e) = self.ticker.await {
            error!("Ticker task failed: {}", e);
        }
        if let Err(e) = self.forwarder.await {
            error!("Bridge forwarder task failed: {}", e);
        }
    }
}

impl ButtonService {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        event_bus: EventBus,
        bridge: Arc<dyn AccessoryBridge>,
    ) -> Self {
        Self {
            registry,
            event_bus,
            bridge,
            tick_interval: Duration::from_millis(TICK_INTERVAL_MS),
            rebuild_lock: tokio::sync::Mutex::new(()),
            bridge_built: AtomicBool::new(false),
            forward_tx: Mutex::new(None),
        }
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Offer every device of a device list to the registry.
    ///
    /// Returns the addresses admitted by this call. The bridge is rebuilt once
    /// if anything was admitted, or if it has never been built.
    pub async fn handle_device_list(&self, devices: &[Device]) -> Vec<String> {
        let admitted: Vec<String> = devices
            .iter()
            .map(Device::identity)
            .filter(|identity| self.registry.admit(identity))
            .map(|identity| identity.address)
            .collect();

        if !admitted.is_empty() || !self.bridge_built.load(Ordering::Acquire) {
            self.refresh_bridge().await;
        }

        admitted
    }

    /// Rebuild the accessory side from the current snapshot.
    pub async fn refresh_bridge(&self) {
        let _guard = self.rebuild_lock.lock().await;

        let snapshot = self.registry.snapshot();
        let device_count = snapshot.len();
        info!("Refreshing accessory bridge with {} devices", device_count);

        match self.bridge.rebuild(snapshot).await {
            Ok(()) => {
                self.bridge_built.store(true, Ordering::Release);
                self.publish(vec![BridgeEvent::DevicesChanged { device_count }]);
            }
            Err(e) => error!("Failed to rebuild accessory bridge: {}", e),
        }
    }

    /// Apply one telemetry update and publish what it produced.
    pub fn handle_update(&self, update: &DeviceUpdate) -> usize {
        let events = self.registry.apply(update, Instant::now());
        self.publish(events)
    }

    /// Run one flush pass and publish what it produced.
    pub fn tick(&self) -> usize {
        let events = self.registry.tick(Instant::now());
        self.publish(events)
    }

    fn publish(&self, events: Vec<BridgeEvent>) -> usize {
        let count = events.len();
        let forward_tx = self.forward_tx.lock().clone();
        for event in events {
            if let Some(tx) = &forward_tx {
                if tx.send(event.clone()).is_err() {
                    debug!("Bridge forwarder gone, dropping {}", event.type_name());
                }
            }
            self.event_bus.publish_with_source(event, EVENT_SOURCE);
        }
        count
    }

    /// Start the ticker and the bridge forwarder.
    pub fn spawn(self: &Arc<Self>, cancel: CancellationToken) -> ServiceTasks {
        // Attach before returning so no event published afterwards is missed.
        let (tx, rx) = mpsc::unbounded_channel();
        if self.forward_tx.lock().replace(tx).is_some() {
            debug!("Replacing previous bridge forwarder feed");
        }

        let service = Arc::clone(self);
        let ticker_cancel = cancel.clone();
        let ticker = tokio::spawn(async move { service.run_ticker(ticker_cancel).await });

        let service = Arc::clone(self);
        let forwarder = tokio::spawn(async move { service.run_bridge_forwarder(rx, cancel).await });

        ServiceTasks { ticker, forwarder }
    }

    /// Tick every `tick_interval` until cancelled.
    pub async fn run_ticker(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    self.tick();
                }
            }
        }
        debug!("Ticker stopped");
    }

    /// Forward published events to the bridge until cancelled or the feed closes.
    pub async fn run_bridge_forwarder(
        &self,
        mut rx: mpsc::UnboundedReceiver<BridgeEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            let received = tokio::select! {
                _ = cancel.cancelled() => break,
                received = rx.recv() => received,
            };
            let Some(event) = received else {
                break;
            };
            if let Err(e) = self.bridge.handle_event(&event).await {
                error!("Accessory bridge rejected {}: {}", event.type_name(), e);
            }
        }
        drop(rx);
        let mut forward_tx = self.forward_tx.lock();
        if forward_tx.as_ref().is_some_and(|tx| tx.is_closed()) {
            *forward_tx = None;
        }
        drop(forward_tx);
        debug!("Bridge forwarder stopped");
    }
}
