//! Command-line entry point for BetterButtons.
//!
//! Bridges Zigbee button sensors seen through zigbee2mqtt to HomeKit
//! stateless programmable switches.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use betterbuttons_core::config::{defaults, env_flag, env_vars};
use betterbuttons_core::{BridgeConfig, CapabilityRegistry, EventBus};
use betterbuttons_devices::{ButtonService, DeviceRegistry, MqttTransport, MqttTransportConfig};
use betterbuttons_homekit::HomeKitBridge;

/// BetterButtons - Zigbee buttons as HomeKit switches.
#[derive(Parser, Debug)]
#[command(name = "betterbuttons")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// MQTT broker URL.
    #[arg(long, env = env_vars::MQTT_URL, default_value = defaults::MQTT_URL)]
    mqtt_url: String,

    /// Directory for HomeKit pairing state.
    #[arg(long, env = env_vars::HOMEKIT_DIR, default_value = defaults::HOMEKIT_DIR)]
    homekit_dir: PathBuf,

    /// zigbee2mqtt base topic.
    #[arg(long, env = env_vars::BASE_TOPIC, default_value = defaults::BASE_TOPIC)]
    base_topic: String,

    /// MQTT client identifier.
    #[arg(long, env = env_vars::CLIENT_ID, default_value = defaults::CLIENT_ID)]
    client_id: String,

    /// Enable debug logging.
    #[arg(long, env = env_vars::DEBUG)]
    debug: bool,
}

impl Args {
    fn into_config(self) -> BridgeConfig {
        BridgeConfig {
            mqtt_url: self.mqtt_url,
            homekit_dir: self.homekit_dir,
            base_topic: self.base_topic,
            client_id: self.client_id,
            debug: self.debug,
            ..BridgeConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let config = args.into_config();
    config.validate()?;

    info!("Starting BetterButtons {}", betterbuttons_core::VERSION);
    run(config).await
}

fn init_logging(debug: bool) {
    let json_logging = env_flag(env_vars::LOG_JSON);
    let level = if debug { "debug" } else { "info" };

    // RUST_LOG wins over --debug
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .init();
    }
}

async fn run(config: BridgeConfig) -> Result<()> {
    let transport_config = MqttTransportConfig::from_bridge_config(&config)?;

    let registry = Arc::new(
        DeviceRegistry::new(CapabilityRegistry::builtin())
            .with_debounce_window(config.debounce_window()),
    );
    let bridge = Arc::new(HomeKitBridge::new(config.homekit_dir.clone()));
    let service = Arc::new(
        ButtonService::new(registry, EventBus::with_name("betterbuttons"), bridge)
            .with_tick_interval(config.tick_interval()),
    );

    let cancel = CancellationToken::new();
    let tasks = service.spawn(cancel.clone());

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Stopping program");
                shutdown.cancel();
            }
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
    });

    let transport = MqttTransport::new(transport_config, Arc::clone(&service));
    let result = transport.run(cancel.clone()).await;

    cancel.cancel();
    tasks.join().await;

    result.context("MQTT transport stopped")
}
