//! One-time merge of the previous product's analytics file into the current one.
//!
//! The merge is additive, so running it twice would double-count. The
//! persisted completion flag is the only thing that makes it idempotent: it is
//! set right after the merged file has been written, and left unset when
//! anything fails so the next startup retries.

use std::{collections::HashMap, path::Path, sync::Mutex};

use super::{
    fs::FileSystem,
    persistence::decode_history,
    stats::AnalyticsHistory,
};
use crate::error::LedgerError;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

pub const LEGACY_MIGRATION_FLAG: &str = "didMigrateLegacyAnalytics";

/// Small persistent key/value store for boolean markers.
pub trait FlagStore {
    fn get_flag(&self, key: &str) -> bool;

    fn set_flag(&self, key: &str, value: bool) -> anyhow::Result<()>;
}

/// In-process flag store for embedders that keep markers elsewhere, and for tests.
#[derive(Debug, Default)]
pub struct MemoryFlagStore {
    flags: Mutex<HashMap<String, bool>>,
}

impl FlagStore for MemoryFlagStore {
    fn get_flag(&self, key: &str) -> bool {
        let guard = match self.flags.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.get(key).copied().unwrap_or(false)
    }

    fn set_flag(&self, key: &str, value: bool) -> anyhow::Result<()> {
        let mut guard = match self.flags.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.insert(key.to_string(), value);
        Ok(())
    }
}

/// Returns `Ok(true)` when legacy data was merged into `current_path`.
///
/// The legacy file is never modified or removed.
pub fn migrate_legacy_analytics_if_needed(
    current_path: &Path,
    legacy_path: &Path,
    migration_flag_key: &str,
    flags: &dyn FlagStore,
    fs: &dyn FileSystem,
) -> Result<bool, LedgerError> {
    if flags.get_flag(migration_flag_key) {
        return Ok(false);
    }

    if !fs.exists(legacy_path) {
        mark_done(flags, migration_flag_key)?;
        return Ok(false);
    }

    let legacy_bytes = fs
        .read(legacy_path)
        .map_err(|err| LedgerError::io(legacy_path, err))?;
    let legacy = decode_history(&legacy_bytes)?;
    let mut current = if fs.exists(current_path) {
        read_current_history(fs, current_path)?
    } else {
        AnalyticsHistory::new()
    };

    let merged_days = merge_additive(&mut current, &legacy);

    let bytes = serde_json::to_vec_pretty(&current)?;
    fs.write_atomic(current_path, &bytes)
        .map_err(|err| LedgerError::io(current_path, err))?;

    mark_done(flags, migration_flag_key)?;

    log_info!(
        "Merged {} legacy analytics day(s) from {} into {}",
        merged_days,
        legacy_path.display(),
        current_path.display()
    );
    Ok(true)
}

/// Folds `legacy` into `current` day by day. Returns the number of legacy days.
pub fn merge_additive(current: &mut AnalyticsHistory, legacy: &AnalyticsHistory) -> usize {
    for (key, day) in legacy {
        match current.get_mut(key) {
            Some(existing) => existing.absorb(day),
            None => {
                current.insert(key.clone(), day.clone());
            }
        }
    }
    legacy.len()
}

/// The current file is replaced by the merge, so a corrupt one only loses
/// what `load_history` would have discarded anyway.
fn read_current_history(fs: &dyn FileSystem, path: &Path) -> Result<AnalyticsHistory, LedgerError> {
    let bytes = fs.read(path).map_err(|err| LedgerError::io(path, err))?;
    match decode_history(&bytes) {
        Ok(history) => Ok(history),
        Err(err) => {
            log_warn!(
                "Analytics file {} is corrupt, treating it as empty: {err}",
                path.display()
            );
            Ok(AnalyticsHistory::new())
        }
    }
}

fn mark_done(flags: &dyn FlagStore, key: &str) -> Result<(), LedgerError> {
    flags.set_flag(key, true).map_err(|err| LedgerError::Flag {
        key: key.to_string(),
        reason: format!("{err:#}"),
    })
}
