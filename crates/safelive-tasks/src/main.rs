//! `safelived`: the SafeLive background worker
//!
//! Runs the progress reconciliation pass, the inspector reminder pass, and
//! the store maintenance sweeps against an in-memory store with the
//! built-in heuristic oracle and a log-only notification gateway.

use clap::{value_parser, Arg, Command};
use safelive_core::gateway::{Clock, LoggingGateway, NotificationGateway, SystemClock};
use safelive_core::oracle::{HeuristicOracle, PredictionOracle};
use safelive_store::{purge_orphan_tickets, sweep_expired_challenges, MemoryStore};
use safelive_tasks::{ProgressTask, ReminderConfig, ReminderTask};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = Command::new("safelived")
        .version(env!("CARGO_PKG_VERSION"))
        .about("SafeLive background worker")
        .arg(
            Arg::new("progress-interval")
                .long("progress-interval")
                .default_value("600")
                .value_parser(value_parser!(u64))
                .help("Seconds between progress reconciliation passes"),
        )
        .arg(
            Arg::new("reminder-interval")
                .long("reminder-interval")
                .default_value("300")
                .value_parser(value_parser!(u64))
                .help("Seconds between inspector reminder checks"),
        )
        .arg(
            Arg::new("maintenance-interval")
                .long("maintenance-interval")
                .default_value("3600")
                .value_parser(value_parser!(u64))
                .help("Seconds between store maintenance sweeps"),
        )
        .get_matches();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let progress_every =
        Duration::from_secs(matches.get_one::<u64>("progress-interval").copied().unwrap_or(600));
    let reminder_every =
        Duration::from_secs(matches.get_one::<u64>("reminder-interval").copied().unwrap_or(300));
    let maintenance_every = Duration::from_secs(
        matches
            .get_one::<u64>("maintenance-interval")
            .copied()
            .unwrap_or(3600),
    );

    let store = MemoryStore::new();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let gateway: Arc<dyn NotificationGateway> = Arc::new(LoggingGateway);
    let oracle: Arc<dyn PredictionOracle> = Arc::new(HeuristicOracle);

    let progress = Arc::new(ProgressTask::new(
        store.incidents.clone(),
        store.tickets.clone(),
        store.audit.clone(),
        oracle,
        clock.clone(),
    ));
    let reminders = Arc::new(ReminderTask::new(
        store.tickets.clone(),
        store.users.clone(),
        gateway,
        clock.clone(),
        ReminderConfig::default(),
    ));

    let progress_handle = progress.spawn(progress_every);
    let reminder_handle = reminders.spawn(reminder_every);
    tracing::info!(version = safelive_tasks::VERSION, "safelived started");

    let mut maintenance = tokio::time::interval(maintenance_every);
    loop {
        tokio::select! {
            _ = maintenance.tick() => {
                if let Err(error) =
                    purge_orphan_tickets(store.incidents.as_ref(), store.tickets.as_ref()).await
                {
                    tracing::warn!(%error, "orphan ticket sweep failed");
                }
                if let Err(error) =
                    sweep_expired_challenges(store.otp.as_ref(), clock.now()).await
                {
                    tracing::warn!(%error, "otp challenge sweep failed");
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    progress_handle.stop().await;
    reminder_handle.stop().await;
    tracing::info!("safelived stopped");
    Ok(())
}
