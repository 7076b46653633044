//! Follow the market channels from a terminal.
//!
//! Connects to the price and/or trade channel and prints every envelope as
//! one JSON line on stdout. Connection status goes to the log on stderr.
//!
//! ```text
//! tickstream-tail --origin https://markets.example.com --channel trades
//! RUST_LOG=tickstream_net=debug tickstream-tail --config tickstream.toml
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tickstream::channel::{ChannelClient, Envelope, Subscription, handler};
use tickstream::market::MarketChannels;
use tickstream::settings::Settings;
use tracing_subscriber::EnvFilter;

/// Envelope types each channel is known to carry.
const PRICE_KINDS: &[&str] = &["price_update"];
const TRADE_KINDS: &[&str] = &["message", "trade", "buy", "sell"];

/// How long to wait for channels to finish closing on exit.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Channel {
    Prices,
    Trades,
    All,
}

#[derive(Parser, Debug)]
#[command(name = "tickstream-tail")]
#[command(about = "Print live market envelopes from the tickstream channels")]
#[command(version)]
struct Cli {
    /// Settings file (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the origin from the settings, e.g. https://markets.example.com
    #[arg(short, long)]
    origin: Option<String>,

    /// Which channel to follow.
    #[arg(long, value_enum, default_value_t = Channel::All)]
    channel: Channel,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> tickstream::Result<()> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(origin) = cli.origin {
        settings.origin = origin;
    }

    let channels = MarketChannels::new(&settings)?;
    let mut followed: Vec<(&str, &ChannelClient, &[&str])> = Vec::new();
    if matches!(cli.channel, Channel::Prices | Channel::All) {
        followed.push(("prices", channels.prices(), PRICE_KINDS));
    }
    if matches!(cli.channel, Channel::Trades | Channel::All) {
        followed.push(("trades", channels.trades(), TRADE_KINDS));
    }

    let mut subscriptions: Vec<Subscription> = Vec::new();
    for (name, client, kinds) in &followed {
        let name = *name;
        client.connected().changed().connect(move |up: &bool| {
            if *up {
                tracing::info!(channel = name, "connected");
            } else {
                tracing::info!(channel = name, "disconnected");
            }
        });
        let print = handler(|envelope: &Envelope| println!("{}", envelope.to_json()));
        for kind in kinds.iter() {
            subscriptions.push(client.on(*kind, print.clone()));
        }
        tracing::info!(channel = name, url = %client.url(), "following");
        client.connect();
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not listen for ctrl-c, exiting");
    }

    for subscription in &subscriptions {
        subscription.dispose();
    }
    channels.close_all();
    wait_until_closed(&followed).await;
    Ok(())
}

/// Give each driver a moment to send its close frame.
async fn wait_until_closed(followed: &[(&str, &ChannelClient, &[&str])]) {
    let closed = async {
        while followed
            .iter()
            .any(|(_, client, _)| !client.state().is_terminal())
        {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    };
    if tokio::time::timeout(SHUTDOWN_GRACE, closed).await.is_err() {
        tracing::warn!("channels did not close in time");
    }
}
