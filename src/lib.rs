pub mod analytics;
pub mod config;
pub mod engine;
pub mod error;
pub mod settings;
mod utils;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use analytics::{
    format_duration, system_clock, weekly_average_score, AnalyticsStore, DailyStats, StoreOptions,
};
use config::LedgerConfig;
use engine::{parse_event, ControllerOptions, MachineOptions, PostureController, PostureHandle};
use settings::SettingsStore;

pub use error::LedgerError;

pub fn run() {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Dorso starting up...");

    if let Err(err) = run_session() {
        log::error!("Dorso exited with an error: {err:#}");
        std::process::exit(1);
    }
}

fn run_session() -> Result<()> {
    let config = LedgerConfig::from_env()?;
    let settings = SettingsStore::new(config.settings_path())?;

    let store_options = StoreOptions::new(config.history_path(), config.calendar, system_clock())
        .with_legacy(config.legacy_history_path(), config.migration_flag_key.clone());
    let store = AnalyticsStore::open(store_options, &settings)?;

    let controller_options = ControllerOptions {
        machine: MachineOptions {
            tracking_source: config
                .tracking_source
                .unwrap_or_else(|| settings.tracking_source()),
            is_calibrated: settings.is_calibrated(),
            detector_available: true,
        },
        save_interval: config.save_interval,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("dorso-runtime")
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(async move {
        let handle = PostureController::spawn(store, controller_options);
        let fed = feed_stdin(&handle).await;

        // Queued events are processed in order, so this reply also means the
        // snapshot reflects every event read above.
        let today = handle.today_stats().await?;
        let week = handle.last_7_days().await?;
        let snapshot = handle.snapshot();
        handle.shutdown().await?;
        fed?;

        if let Err(err) = settings.update_calibrated(snapshot.is_calibrated) {
            log::warn!("Failed to persist calibration state: {err:#}");
        }
        if let Err(err) = settings.update_tracking_source(snapshot.tracking_source) {
            log::warn!("Failed to persist tracking source: {err:#}");
        }

        print_report(&config, &today, &week);
        Ok(())
    })
}

async fn feed_stdin(handle: &PostureHandle) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_number = 0usize;

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        line_number += 1;
        match parse_event(&line) {
            Ok(Some(event)) => handle.send(event)?,
            Ok(None) => {}
            Err(reason) => log::warn!("Skipping line {line_number}: {reason}"),
        }
    }

    Ok(())
}

fn print_report(config: &LedgerConfig, today: &DailyStats, week: &[DailyStats]) {
    println!(
        "Today: score {:.0} ({}), monitored {}, {} slouch events",
        today.posture_score(),
        today.score_band().as_str(),
        format_duration(today.total_seconds),
        today.slouch_count
    );
    println!();
    println!("{:<12} {:>6} {:<6} {:>10} {:>8}", "day", "score", "band", "monitored", "slouches");
    for day in week {
        println!(
            "{:<12} {:>6.0} {:<6} {:>10} {:>8}",
            day.day_key(&config.calendar),
            day.posture_score(),
            day.score_band().as_str(),
            format_duration(day.total_seconds),
            day.slouch_count
        );
    }
    match weekly_average_score(week) {
        Some(average) => println!("\nWeekly average: {average:.0}"),
        None => println!("\nWeekly average: no data"),
    }
}
