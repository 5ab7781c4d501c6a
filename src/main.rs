/// ProClubs Tracker: Stats Tracker
///
/// Co dělá:
///   1. Každých 30s stáhne poslední zápasy klubu z Pro Clubs API
///   2. Porovná je s historií (most_recent_matches.csv) → nové zápasy
///   3. Z nejnovějšího nového zápasu udělá fakta "Jméno Stat Hodnota"
///   4. Každý fakt pošle zvlášť do Google Sheets (Apps Script doPost)
///
/// Spuštění:
///   PROCLUBS_CLUB_ID=3439844 SHEETS_SCRIPT_URL=https://... cargo run --bin stats-tracker

mod config;
mod export;
mod pipeline;

use anyhow::{Context, Result};
use dotenv::dotenv;
use logger::EventLogger;
use match_history::HistoryStore;
use proclubs_api::ProClubsClient;
use sheets_sink::SheetsSink;
use std::fs::{self, File};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use config::Config;
use export::Exporter;
use pipeline::{CycleSettings, Dispatcher};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cfg = Config::from_env().context("invalid configuration")?;

    info!("=== Pro Clubs Stats Tracker ===");
    info!(
        club = %cfg.club_id,
        match_type = %cfg.match_type,
        history = %cfg.history_path.display(),
        logs = %cfg.log_dir.display(),
        "Starting"
    );

    // Single instance lock: history má jediného zapisovatele
    let lock_file_path = cfg.lock_path();
    if let Some(parent) = lock_file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).ok();
    }
    let lock_file = match File::create(&lock_file_path) {
        Ok(f) => f,
        Err(e) => {
            warn!("Failed to create lock file at {:?}: {}", lock_file_path, e);
            return Ok(());
        }
    };

    let mut lock = fd_lock::RwLock::new(lock_file);
    let _write_guard = match lock.try_write() {
        Ok(guard) => {
            info!("Acquired single-instance lock.");
            guard
        }
        Err(_) => {
            warn!("Another instance is already tracking {:?}! Exiting.", cfg.history_path);
            return Ok(());
        }
    };

    let api = ProClubsClient::new(&cfg.base_url, &cfg.platform, cfg.http_timeout)
        .context("failed to build Pro Clubs client")?;
    let sink = SheetsSink::new(&cfg.script_url, cfg.http_timeout)
        .context("failed to build Sheets sink")?;

    match api.fetch_club_info(&cfg.club_id).await {
        Ok(Some(club)) => info!("Tracking club {} ({})", club.name, club.club_id),
        Ok(None) => warn!("Club {} not found in clubs/info, continuing anyway", cfg.club_id),
        Err(e) => warn!("Club info lookup failed: {e}"),
    }

    let exporter = cfg.export_dir.as_ref().map(|dir| Exporter::new(dir, cfg.export_format));
    let dispatcher = Dispatcher::new(
        api,
        sink,
        HistoryStore::new(&cfg.history_path),
        EventLogger::new(&cfg.log_dir),
        exporter,
        CycleSettings::from(&cfg),
    );
    info!("Initialization complete. Entering main loop...");

    if cfg.run_once {
        info!("Running in one-shot mode (RUN_ONCE=true)");
        let report = dispatcher.run_cycle().await;
        info!(outcome = report.outcome.as_str(), "One-shot cycle done");
        return Ok(());
    }

    dispatcher
        .run(cfg.poll_interval, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Cannot listen for Ctrl-C, running until killed: {e}");
                std::future::pending::<()>().await;
            }
        })
        .await;

    info!("Stopped.");
    Ok(())
}
