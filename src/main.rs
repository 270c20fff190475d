//! router-wifi-switch - Wi-Fi control for a consumer router's web admin UI
//!
//! Logs in to the router's admin pages, reads the Wi-Fi credentials and
//! radio state, and switches the 2.4 GHz / 5 GHz radios on and off, either
//! once or on a daily schedule.

mod config;
mod error;
mod router;
mod schedule;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::error::on_off;
use crate::router::{FrequencyBand, RouterSession};
use crate::schedule::{SessionSwitch, WifiScheduler};

#[derive(Parser)]
#[command(name = "router-wifi-switch", version, about)]
struct Cli {
    /// Configuration file (default: config/default, optional)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the Wi-Fi network name and password
    Credentials,
    /// Show whether the radios are on
    Status {
        /// Only this band (2.4 or 5)
        #[arg(long)]
        band: Option<FrequencyBand>,
    },
    /// Turn Wi-Fi on
    On {
        /// Only this band (2.4 or 5)
        #[arg(long)]
        band: Option<FrequencyBand>,
    },
    /// Turn Wi-Fi off
    Off {
        /// Only this band (2.4 or 5)
        #[arg(long)]
        band: Option<FrequencyBand>,
    },
    /// Turn Wi-Fi on and off at the configured times until interrupted
    Schedule,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr, command output to stdout
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "router_wifi_switch=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    let password = config.router.password()?.to_string();

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    match cli.command {
        Command::Schedule => run_schedule(&config, password, cancel).await,
        command => {
            tokio::select! {
                result = run_once(command, &config, &password) => result,
                _ = cancel.cancelled() => anyhow::bail!("Interrupted"),
            }
        }
    }
}

/// Cancel `cancel` on Ctrl-C
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Interrupt received, shutting down");
                cancel.cancel();
            }
            Err(e) => tracing::warn!("Failed to listen for Ctrl-C: {}", e),
        }
    });
}

async fn run_once(command: Command, config: &Config, password: &str) -> anyhow::Result<()> {
    let session = RouterSession::connect(&config.router, password)
        .await
        .with_context(|| format!("Login to {} failed", config.router.base_url))?;

    match command {
        Command::Credentials => {
            println!("SSID:     {}", session.ssid().await);
            println!("Password: {}", session.wifi_password().await);
        }
        Command::Status { band: Some(band) } => {
            println!("{}: {}", band, on_off(session.band_status(band).await?));
        }
        Command::Status { band: None } => {
            for (band, enabled) in session.wifi_status().await? {
                println!("{}: {}", band, on_off(enabled));
            }
        }
        Command::On { band } => switch(&session, band, true).await?,
        Command::Off { band } => switch(&session, band, false).await?,
        // Long-running, handled by run_schedule
        Command::Schedule => {}
    }

    Ok(())
}

async fn switch(
    session: &RouterSession,
    band: Option<FrequencyBand>,
    enable: bool,
) -> anyhow::Result<()> {
    match band {
        None => {
            session.toggle_wifi(enable).await?;
            println!("WiFi turned {}", on_off(enable));
        }
        Some(band) => {
            if !session.toggle_band(band, enable).await? {
                anyhow::bail!("Failed to turn {} band {}", band, on_off(enable));
            }
            println!("{} band turned {}", band, on_off(enable));
        }
    }
    Ok(())
}

async fn run_schedule(
    config: &Config,
    password: String,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let session = RouterSession::new(&config.router)?;
    let scheduler = WifiScheduler::new(SessionSwitch::new(session, password), &config.schedule)?;
    scheduler.run(cancel).await;
    Ok(())
}
