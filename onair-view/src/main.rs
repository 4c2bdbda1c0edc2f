//! onair-view - terminal now-playing display
//!
//! Follows an onair-sync server and prints a line whenever the rendered
//! now-playing state changes.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use onair_view::{SyncClient, ViewRunner};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for onair-view
#[derive(Parser, Debug)]
#[command(name = "onair-view")]
#[command(about = "Now-playing display for an onair-sync server")]
#[command(version)]
struct Args {
    /// Base URL of the onair-sync server
    #[arg(short, long, default_value = "http://127.0.0.1:5750", env = "ONAIR_SERVER")]
    server: String,

    /// Polling interval in seconds while the push channel is down (minimum 10)
    #[arg(short, long, default_value = "15")]
    interval: u64,

    /// Request timeout in seconds
    #[arg(long, default_value = "8")]
    timeout: u64,

    /// Print the current status once and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the now-playing lines
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "onair_view=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let client = SyncClient::new(&args.server, Duration::from_secs(args.timeout.max(1)))?;

    if args.once {
        let status = client
            .status()
            .await
            .with_context(|| format!("Fetching status from {}", args.server))?;
        let mut view = onair_view::NowPlayingView::new();
        view.apply_snapshot(status);
        println!("{}", view.render());
        return Ok(());
    }

    let (runner, rx) = ViewRunner::new(client, Duration::from_secs(args.interval));
    let cancel = CancellationToken::new();
    let runner_task = tokio::spawn(runner.run(cancel.clone()));

    let mut updates = WatchStream::new(rx);
    let mut last_line = String::new();
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!("Failed to listen for Ctrl+C: {}", e);
                }
                info!("Shutting down");
                break;
            }
            update = updates.next() => match update {
                Some(view) => {
                    let line = view.render();
                    if line != last_line {
                        println!("{}", line);
                        last_line = line;
                    }
                }
                None => break,
            },
        }
    }

    cancel.cancel();
    runner_task.await.context("View runner failed")?;
    Ok(())
}
