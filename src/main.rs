use std::str::FromStr;

use actuatord::config::{resolve_config_path, Config};
use actuatord::controller::{run_control_loop, ControlLoop, LoopSettings};
use actuatord::hardware::open_board;
use actuatord::mqtt::MqttHandler;
use color_eyre::{eyre::eyre, Result};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    setup()?;

    let config_path = resolve_config_path(std::env::args().nth(1));
    let config = Config::load(&config_path)
        .await
        .map_err(|e| eyre!("Failed to load {}: {}", config_path.display(), e))?;

    let board = open_board(&config.hardware, &config.profile)
        .map_err(|e| eyre!("Failed to open hardware: {}", e))?;
    let policy = config.profile.build_policy();
    info!(
        "Running {} policy, subscribing to {:?}",
        policy.name(),
        policy.command_topics()
    );

    let shutdown = CancellationToken::new();
    let capacity = config.mqtt.channel_capacity;
    let (event_tx, event_rx) = mpsc::channel(capacity);
    let (publish_tx, publish_rx) = mpsc::channel(capacity);
    let (resync_tx, resync_rx) = watch::channel(0u64);

    let handler = MqttHandler::new(
        config.mqtt.clone(),
        policy.command_topics(),
        publish_rx,
        event_tx,
        resync_tx,
        shutdown.clone(),
    );
    let mqtt_task = tokio::spawn(handler.run());

    let settings = LoopSettings {
        interval: config.loop_interval(),
        ..LoopSettings::default()
    };
    let control = ControlLoop::create(
        policy,
        Box::new(board.sensors),
        board.actuators,
        event_rx,
        resync_rx,
        publish_tx,
        settings,
    );
    let control_task = tokio::spawn(run_control_loop(control, shutdown.clone()));

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| eyre!("Failed to listen for Ctrl-C: {}", e))?;
    info!("Shutdown requested");
    shutdown.cancel();

    match control_task.await {
        Ok(control) => info!("Control loop finished after {} cycles", control.stats().cycles),
        Err(e) => error!("Control loop task failed: {}", e),
    }
    match mqtt_task.await {
        Ok(status) => info!("MQTT handler finished with {} errors", status.error_messages.len()),
        Err(e) => error!("MQTT task failed: {}", e),
    }

    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|value| Level::from_str(value.trim()).ok())
        .unwrap_or(Level::INFO);

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
