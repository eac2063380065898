mod config;
mod error;
mod job;
mod on_demand;
mod report;
mod search_console;
mod server;
mod telegram;

use anyhow::{bail, Context, Result};
use chrono::{NaiveTime, Utc};
use clap::{Parser, Subcommand};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{error, info};

use config::Config;
use job::{Endpoints, RunOutcome};
use search_console::client::http_client;

/// Daily Search Console digest delivered to Telegram.
#[derive(Debug, Parser)]
#[command(name = "gsc-digest", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Stay resident and run the digest every day at a fixed UTC time
    Schedule {
        /// Wall-clock time of the daily run, UTC, HH:MM
        #[arg(long, env = "DIGEST_SCHEDULE_UTC", default_value = "05:30", value_parser = parse_hh_mm)]
        at: NaiveTime,
    },
    /// Run the digest once and exit; non-zero exit on failure (for cron)
    Once,
    /// Run the digest once and print a diagnostic report instead of failing
    RunNow,
    /// Serve the manual trigger over HTTP at /run-now (GET or POST)
    Serve {
        #[arg(long, env = "DIGEST_LISTEN", default_value = "0.0.0.0:8080")]
        listen: String,
    },
}

fn parse_hh_mm(s: &str) -> std::result::Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|e| format!("expected HH:MM: {}", e))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("gsc_digest=info")),
        )
        .init();

    let cli = Cli::parse();
    let http = http_client()?;
    let endpoints = Endpoints::default();

    match cli.command {
        Command::Schedule { at } => schedule(at, &http, &endpoints).await,
        Command::Once => {
            let config = Config::from_env().context("Failed to load config")?;
            match job::run_daily(&config, &http, &endpoints, Utc::now()).await? {
                RunOutcome::NotYetDue { start_at } => {
                    info!(%start_at, "Not yet due, nothing sent")
                }
                RunOutcome::Done { date, sites } => info!(%date, sites, "Done"),
            }
            Ok(())
        }
        Command::RunNow => {
            let resp =
                on_demand::run_now(|name| std::env::var(name).ok(), &http, &endpoints, Utc::now()).await;
            println!("{}", resp.body);
            if resp.status != 200 {
                bail!("Manual run failed with status {}", resp.status);
            }
            Ok(())
        }
        Command::Serve { listen } => server::serve(&listen, http, endpoints).await,
    }
}

/// Resident daily loop. A failed run is logged and the loop waits for the
/// next day; configuration is re-read each time.
async fn schedule(at: NaiveTime, http: &reqwest::Client, endpoints: &Endpoints) -> Result<()> {
    // Fail at startup rather than at the first tick.
    Config::from_env().context("Failed to load config")?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutdown signal received");
        r.store(false, Ordering::SeqCst);
    });

    info!(at = %at.format("%H:%M"), "Starting daily digest scheduler (UTC)");

    while running.load(Ordering::SeqCst) {
        let next = job::next_run_after(Utc::now(), at);
        info!(next_run = %next.format("%Y-%m-%dT%H:%M:%SZ"), "Waiting for next run");

        // Sleep with early exit on shutdown
        while running.load(Ordering::SeqCst) && Utc::now() < next {
            sleep(Duration::from_secs(1)).await;
        }
        if !running.load(Ordering::SeqCst) {
            break;
        }

        let outcome = match Config::from_env() {
            Ok(config) => job::run_daily(&config, http, endpoints, Utc::now()).await,
            Err(e) => Err(e),
        };
        match outcome {
            Ok(RunOutcome::NotYetDue { start_at }) => info!(%start_at, "Not yet due, nothing sent"),
            Ok(RunOutcome::Done { date, sites }) => info!(%date, sites, "Daily run complete"),
            Err(e) => error!("Daily run failed: {:#}", e),
        }
    }

    info!("Shut down cleanly");
    Ok(())
}
