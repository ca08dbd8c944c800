use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc},
};

use anyhow::Result;
use chrono::{DateTime, Utc};

use super::{
    calendar::DayCalendar,
    fs::{FileSystem, OsFileSystem},
    migration::{migrate_legacy_analytics_if_needed, FlagStore},
    persistence::{load_history, HistoryWriter, SaveOutcome},
    stats::{AnalyticsHistory, DailyStats},
};
use crate::error::LedgerError;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

const WEEK_DAYS: i64 = 7;

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// Prior product's history file and the flag that records it was merged.
#[derive(Debug, Clone)]
pub struct LegacySource {
    pub path: PathBuf,
    pub flag_key: String,
}

pub struct StoreOptions {
    pub history_path: PathBuf,
    pub calendar: DayCalendar,
    pub clock: Clock,
    pub fs: Arc<dyn FileSystem>,
    pub legacy: Option<LegacySource>,
}

impl StoreOptions {
    pub fn new(history_path: PathBuf, calendar: DayCalendar, clock: Clock) -> Self {
        Self {
            history_path,
            calendar,
            clock,
            fs: Arc::new(OsFileSystem),
            legacy: None,
        }
    }

    pub fn with_legacy(mut self, path: PathBuf, flag_key: impl Into<String>) -> Self {
        self.legacy = Some(LegacySource {
            path,
            flag_key: flag_key.into(),
        });
        self
    }

    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }
}

/// Day-bucketed posture statistics.
///
/// The store is owner-confined: every mutation goes through `&mut self`.
/// Persistence hands the background writer an `Arc` snapshot of the mapping;
/// later mutations copy-on-write via `Arc::make_mut`, so the writer never
/// observes the live map.
///
/// `generation` counts mutations. A save is dispatched only when it is ahead
/// of the last generation the writer confirmed, and the confirmation is
/// applied here, on the owner's side, when the outcome is drained.
pub struct AnalyticsStore {
    history: Arc<AnalyticsHistory>,
    history_path: PathBuf,
    calendar: DayCalendar,
    clock: Clock,
    generation: u64,
    last_saved_generation: u64,
    in_flight_generation: Option<u64>,
    writer: HistoryWriter,
    outcomes: mpsc::Receiver<SaveOutcome>,
}

impl AnalyticsStore {
    /// Runs the one-time legacy merge (when configured), then loads the
    /// history. A failed merge is logged and retried on the next open.
    pub fn open(options: StoreOptions, flags: &dyn FlagStore) -> Result<Self> {
        let StoreOptions {
            history_path,
            calendar,
            clock,
            fs,
            legacy,
        } = options;

        if let Some(legacy) = &legacy {
            match migrate_legacy_analytics_if_needed(
                &history_path,
                &legacy.path,
                &legacy.flag_key,
                flags,
                fs.as_ref(),
            ) {
                Ok(true) => log_info!("Legacy analytics merged from {}", legacy.path.display()),
                Ok(false) => {}
                Err(err @ LedgerError::Flag { .. }) => log_error!(
                    "Legacy analytics already merged into {} but the completion flag was not saved; \
                     the next start will merge it again: {err}",
                    history_path.display()
                ),
                Err(err) => log_error!("Legacy analytics migration failed, will retry: {err}"),
            }
        }

        let history = load_history(fs.as_ref(), &history_path);
        log_info!(
            "Analytics history loaded from {} ({} days)",
            history_path.display(),
            history.len()
        );

        let (outcome_tx, outcome_rx) = mpsc::channel();
        let writer = HistoryWriter::spawn(history_path.clone(), fs, outcome_tx)?;

        Ok(Self {
            history: Arc::new(history),
            history_path,
            calendar,
            clock,
            generation: 0,
            last_saved_generation: 0,
            in_flight_generation: None,
            writer,
            outcomes: outcome_rx,
        })
    }

    pub fn history_path(&self) -> &Path {
        &self.history_path
    }

    pub fn calendar(&self) -> &DayCalendar {
        &self.calendar
    }

    pub fn history(&self) -> &AnalyticsHistory {
        &self.history
    }

    /// Adds `interval` seconds of monitored time to today, and to today's
    /// slouch time when `is_slouching`. Non-positive or non-finite intervals
    /// are ignored.
    pub fn track_time(&mut self, interval: f64, is_slouching: bool) {
        if !interval.is_finite() || interval <= 0.0 {
            log_debug!("Ignoring non-positive tracking interval {interval}");
            return;
        }

        let today = self.today_entry();
        today.total_seconds += interval;
        if is_slouching {
            today.slouch_seconds += interval;
        }
        self.mark_dirty();
    }

    pub fn record_slouch_event(&mut self) {
        let today = self.today_entry();
        today.slouch_count = today.slouch_count.saturating_add(1);
        self.mark_dirty();
    }

    pub fn today_stats(&self) -> DailyStats {
        let now = (self.clock)();
        self.history
            .get(&self.calendar.day_key(now))
            .cloned()
            .unwrap_or_else(|| DailyStats::empty(self.calendar.start_of_day(now)))
    }

    /// The seven local days ending today, oldest first. Days without data are
    /// reported as zero-valued entries.
    pub fn last_7_days(&self) -> Vec<DailyStats> {
        let now = (self.clock)();
        (0..WEEK_DAYS)
            .rev()
            .map(|days_ago| {
                let day_start = self.calendar.days_back(now, days_ago);
                self.history
                    .get(&self.calendar.day_key(day_start))
                    .cloned()
                    .unwrap_or_else(|| DailyStats::empty(day_start))
            })
            .collect()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn last_saved_generation(&self) -> u64 {
        self.last_saved_generation
    }

    pub fn is_dirty(&mut self) -> bool {
        self.absorb_save_outcomes();
        self.generation > self.last_saved_generation
    }

    /// Dispatches a background write when there are unsaved mutations.
    /// Never blocks; returns whether a write was queued.
    pub fn save_history_if_needed(&mut self) -> bool {
        self.absorb_save_outcomes();

        if self.generation <= self.last_saved_generation {
            log_debug!("History clean at generation {}, skipping save", self.generation);
            return false;
        }

        if let Some(in_flight) = self.in_flight_generation {
            if in_flight >= self.generation {
                log_debug!("Save for generation {in_flight} already in flight");
                return false;
            }
        }

        let snapshot = Arc::clone(&self.history);
        match self.writer.submit(self.generation, snapshot) {
            Ok(()) => {
                self.in_flight_generation = Some(self.generation);
                true
            }
            Err(err) => {
                log_error!("Failed to queue history save: {err:#}");
                false
            }
        }
    }

    /// Waits for queued writes to finish and applies their outcomes.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.absorb_save_outcomes();
        Ok(())
    }

    fn today_entry(&mut self) -> &mut DailyStats {
        let now = (self.clock)();
        let key = self.calendar.day_key(now);
        let day_start = self.calendar.start_of_day(now);
        Arc::make_mut(&mut self.history)
            .entry(key)
            .or_insert_with(|| DailyStats::empty(day_start))
    }

    fn mark_dirty(&mut self) {
        self.generation += 1;
    }

    fn absorb_save_outcomes(&mut self) {
        while let Ok(outcome) = self.outcomes.try_recv() {
            if self.in_flight_generation == Some(outcome.generation) {
                self.in_flight_generation = None;
            }
            match outcome.result {
                Ok(()) => {
                    self.last_saved_generation = self.last_saved_generation.max(outcome.generation);
                }
                Err(err) => {
                    log_warn!(
                        "History generation {} not saved, will retry: {err}",
                        outcome.generation
                    );
                }
            }
        }
    }
}
