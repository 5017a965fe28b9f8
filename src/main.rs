//! ThingsLink device daemon - Main Entry Point
//!
//! Drives a [`Coordinator`] over MQTT from a fixed-period loop until SIGINT
//! or SIGTERM arrives.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use thingslink::config::DeviceConfig;
use thingslink::observability::init_default_logging;
use thingslink::{Coordinator, MqttLink, SystemClock, Value};
use tokio::{
    signal,
    time::{interval, Duration, MissedTickBehavior},
};
use tracing::{error, info};

/// Device telemetry session daemon
#[derive(Parser)]
#[command(name = "thingslink")]
#[command(about = "Keeps a device session alive and ships telemetry on an interval")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "THINGSLINK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the coordinator loop
    Run {
        /// Delay between ticks
        #[arg(long, default_value_t = 1000)]
        loop_interval_ms: u64,

        /// Telemetry value to buffer at startup (repeatable)
        #[arg(long = "telemetry", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        telemetry: Vec<(String, Value)>,

        /// Attribute value to buffer at startup (repeatable)
        #[arg(long = "attribute", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        attributes: Vec<(String, Value)>,
    },
    /// Validate configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_default_logging();

    info!("Starting thingslink v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_configuration(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run {
            loop_interval_ms,
            telemetry,
            attributes,
        } => run_device(config, loop_interval_ms, telemetry, attributes).await,
        Commands::Config { show } => handle_config_command(config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }

    info!("Application shutdown complete");
}

/// Parse `key=value`; values that parse as integers become integers
fn parse_key_value(s: &str) -> Result<(String, Value), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.to_string(), Value::parse_lossy(value)))
}

fn load_configuration(
    config_path: &Option<PathBuf>,
) -> Result<DeviceConfig, Box<dyn std::error::Error>> {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Ok(DeviceConfig::load_from_file(path)?)
        }
        None => {
            // Try default locations
            let default_paths = ["thingslink.toml", "config/thingslink.toml"];

            for path_str in default_paths {
                let path = PathBuf::from(path_str);
                if path.exists() {
                    info!("Loading configuration from: {}", path.display());
                    return Ok(DeviceConfig::load_from_file(&path)?);
                }
            }

            Err("No configuration file found. Provide one with -c/--config or create thingslink.toml".into())
        }
    }
}

async fn run_device(
    config: DeviceConfig,
    loop_interval_ms: u64,
    telemetry: Vec<(String, Value)>,
    attributes: Vec<(String, Value)>,
) -> Result<(), Box<dyn std::error::Error>> {
    let client_id = config.device.client_id();
    info!(client_id = %client_id, endpoint = %config.session.endpoint, "Device starting");

    let link = MqttLink::new(client_id, config.mqtt.clone());
    let mut coordinator = Coordinator::from_config(&config, link, SystemClock::new());

    for (key, value) in telemetry {
        coordinator.set_telemetry(key, value);
    }
    for (key, value) in attributes {
        coordinator.set_attribute(key, value);
    }

    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;

    let mut ticker = interval(Duration::from_millis(loop_interval_ms.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down gracefully...");
                break;
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down gracefully...");
                break;
            }
            _ = ticker.tick() => {
                coordinator.tick().await;
            }
        }
    }

    coordinator.shutdown().await;
    Ok(())
}

fn handle_config_command(
    config: DeviceConfig,
    show: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if show {
        println!("Current device configuration:");
        println!("{}", toml::to_string_pretty(&config)?);
    }

    info!("Configuration validation complete");
    Ok(())
}
