//! onair-sync - station status synchronization service
//!
//! Polls the hosted radio API for one station, diffs consecutive snapshots
//! and pushes transitions to connected clients over SSE. `WentLive` is also
//! forwarded to the push-notification service.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use onair_common::config::{self, ConfigResolver, TomlConfig};
use onair_common::db::{self, DeviceStore};
use onair_common::events::EventBus;
use onair_sync::cell::status_cell;
use onair_sync::dispatch::HttpPushDispatcher;
use onair_sync::history::TransitionLog;
use onair_sync::notifier::Notifier;
use onair_sync::poller::Poller;
use onair_sync::source::{RadioCoClient, StationSource};
use onair_sync::AppState;
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Poller → notifier queue length
const POLLER_QUEUE: usize = 64;

/// Command-line arguments for onair-sync
#[derive(Parser, Debug)]
#[command(name = "onair-sync")]
#[command(about = "Station status synchronization service")]
#[command(version)]
struct Args {
    /// Config file (overrides ONAIR_CONFIG and the default locations)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Station identifier at the remote source
    #[arg(short, long, global = true, env = "ONAIR_STATION_ID")]
    station: Option<String>,

    /// Port to listen on
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Seconds between polls (minimum 10)
    #[arg(long, global = true)]
    poll_interval: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the poller and the HTTP/SSE server (default)
    Serve {
        /// Keep registered devices in memory only
        #[arg(long)]
        no_db: bool,
    },
    /// Fetch the station status once and print it
    Check,
    /// Write a config file with the effective settings
    InitConfig {
        /// Target path (defaults to the per-user config location)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let resolver = ConfigResolver::new(args.config.clone());
    let config_path = resolver.resolve();
    let mut config = resolver.load().context("Failed to load configuration")?;
    apply_overrides(&mut config, &args);

    init_tracing(&config.logging.level);
    match &config_path {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("Configuration: built-in defaults"),
    }

    match args.command.unwrap_or(Command::Serve { no_db: false }) {
        Command::Serve { no_db } => serve(config, no_db).await,
        Command::Check => check(config).await,
        Command::InitConfig { path, force } => init_config(&config, path, force),
    }
}

fn apply_overrides(config: &mut TomlConfig, args: &Args) {
    if let Some(station) = &args.station {
        config.station_id = Some(station.clone());
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(secs) = args.poll_interval {
        config.poll_interval_secs = secs;
    }
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("onair_sync={level},onair_common={level},tower_http=info").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn serve(config: TomlConfig, no_db: bool) -> Result<()> {
    config.validate()?;
    let station_id = config.require_station_id()?.to_string();

    info!("Starting onair-sync for station {}", station_id);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let pool = if no_db {
        warn!("Device registry is in memory; registrations are lost on exit");
        db::connect_in_memory().await?
    } else {
        db::connect(&config.database_path())
            .await
            .context("Failed to open device database")?
    };
    let devices = DeviceStore::new(pool);

    let source = RadioCoClient::new(&config.api_base_url, &station_id, config.request_timeout())?;
    let dispatcher = HttpPushDispatcher::from_config(&config.notifications, config.request_timeout())?;

    let (writer, reader) = status_cell();
    let bus = EventBus::new(config.client_queue_capacity);
    let history = TransitionLog::new(config.history_size);
    let (tx, rx) = mpsc::channel(POLLER_QUEUE);
    let cancel = CancellationToken::new();

    let poller = Poller::new(source, writer, tx, config.poll_interval());
    let notifier = Notifier::new(bus.clone(), history.clone(), dispatcher)
        .with_devices(devices.clone())
        .with_notification_title(config.notifications.title.clone());

    let poller_task = tokio::spawn(poller.run(cancel.child_token()));
    let notifier_task = tokio::spawn(notifier.run(rx, cancel.child_token()));

    let app = onair_sync::build_router(AppState {
        station_id,
        status: reader,
        bus,
        history,
        devices,
    });

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Event stream: http://{}/api/events", addr);

    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Ends the poller and notifier; the notifier closes all SSE streams
            shutdown.cancel();
        })
        .await
        .context("Server error")?;

    cancel.cancel();
    let (poller_result, notifier_result) = tokio::join!(poller_task, notifier_task);
    if let Err(e) = poller_result {
        error!("Poller task failed: {}", e);
    }
    if let Err(e) = notifier_result {
        error!("Notifier task failed: {}", e);
    }

    info!("Server shutdown complete");
    Ok(())
}

async fn check(config: TomlConfig) -> Result<()> {
    let station_id = config.require_station_id()?;
    let client = RadioCoClient::new(&config.api_base_url, station_id, config.request_timeout())?;

    let status = client
        .fetch_status()
        .await
        .with_context(|| format!("Fetching {}", client.status_url()))?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    println!("now playing: {}", status.now_playing().label());

    match client.current_track().await {
        Ok(Some(track)) => println!("current track: {}", track.title),
        Ok(None) => println!("current track: none"),
        Err(e) => warn!("Current track endpoint failed: {}", e),
    }
    Ok(())
}

fn init_config(config: &TomlConfig, path: Option<PathBuf>, force: bool) -> Result<()> {
    let target = match path.or_else(config::user_config_path) {
        Some(path) => path,
        None => anyhow::bail!("No config directory on this platform; pass a path"),
    };
    if target.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", target.display());
    }

    config::write_toml_config(config, &target)?;
    info!("Wrote {}", target.display());
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
