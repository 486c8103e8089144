//! simlink-monitor: command-line monitor for a Simlink simulation feed
//!
//! Connects to the backend, prints one line per snapshot, and can issue a
//! one-shot command or an area subscription once the channel opens.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use simlink_client::{ClientConfig, ConnectionState, SyncClient};
use simlink_protocol::OutboundIntent;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Simlink monitor - live simulation feed watcher")]
struct Args {
    /// WebSocket endpoint of the simulation backend
    endpoint: String,

    /// Reconnect delay in milliseconds
    #[arg(long, default_value = "3000")]
    reconnect_interval_ms: u64,

    /// Disable automatic reconnection
    #[arg(long)]
    no_reconnect: bool,

    /// Subscribe to scoped updates for an area after connecting
    #[arg(long)]
    subscribe: Option<String>,

    /// Issue a one-shot command after connecting
    #[arg(long)]
    command: Option<String>,

    /// Command parameters as a JSON object
    #[arg(long, requires = "command")]
    params: Option<String>,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(args.log_level.as_filter())),
        )
        .init();

    let params = args.params.as_deref().map(parse_params).transpose()?;

    let mut config = ClientConfig::new(&args.endpoint);
    config.auto_reconnect = !args.no_reconnect;
    config.reconnect_interval = Duration::from_millis(args.reconnect_interval_ms);

    let client = SyncClient::new(config);
    let _subscription = client.register(|snapshot| {
        info!(
            vehicles = snapshot.vehicles.len(),
            queues = ?snapshot.traffic_flow.queues,
            phase = snapshot.traffic_flow.phase,
            pm25 = snapshot.air_quality.pm25,
            reward = ?snapshot.reward,
            "snapshot"
        );
    });
    client.connect();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut poll = tokio::time::interval(Duration::from_millis(200));
    let mut sent_intents = false;

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            _ = poll.tick() => {
                if args.no_reconnect && client.state() == ConnectionState::Closed {
                    break;
                }
                if !sent_intents && client.is_connected() {
                    if let Some(area) = &args.subscribe {
                        client.subscribe_to_area(area.clone());
                    }
                    if let Some(name) = &args.command {
                        client.send(&OutboundIntent::Command {
                            name: name.clone(),
                            params: params.clone(),
                        });
                    }
                    sent_intents = true;
                }
            }
        }
    }

    client.disconnect().await;
    Ok(())
}

fn parse_params(raw: &str) -> Result<serde_json::Map<String, serde_json::Value>> {
    let value: serde_json::Value =
        serde_json::from_str(raw).context("--params must be valid JSON")?;
    match value {
        serde_json::Value::Object(map) => Ok(map),
        _ => anyhow::bail!("--params must be a JSON object"),
    }
}
