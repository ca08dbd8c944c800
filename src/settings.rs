use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::PathBuf,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{
    analytics::{FileSystem, FlagStore, OsFileSystem},
    engine::TrackingSource,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct UserSettings {
    tracking_source: TrackingSource,
    is_calibrated: bool,
    flags: BTreeMap<String, bool>,
}

/// JSON-backed user settings. Also serves as the persistent store for
/// one-time markers such as the legacy migration flag.
pub struct SettingsStore {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        Self::with_file_system(path, Arc::new(OsFileSystem))
    }

    pub fn with_file_system(path: PathBuf, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let data = if fs.exists(&path) {
            let contents = fs
                .read(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_slice(&contents).unwrap_or_else(|err| {
                log::warn!("Settings at {} are corrupt, using defaults: {err}", path.display());
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            fs,
            data: RwLock::new(data),
        })
    }

    pub fn tracking_source(&self) -> TrackingSource {
        self.read().tracking_source
    }

    pub fn update_tracking_source(&self, source: TrackingSource) -> Result<()> {
        let mut guard = self.write();
        guard.tracking_source = source;
        self.persist(&guard)
    }

    pub fn is_calibrated(&self) -> bool {
        self.read().is_calibrated
    }

    pub fn update_calibrated(&self, calibrated: bool) -> Result<()> {
        let mut guard = self.write();
        guard.is_calibrated = calibrated;
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_vec_pretty(data)?;
        self.fs
            .write_atomic(&self.path, &serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl FlagStore for SettingsStore {
    fn get_flag(&self, key: &str) -> bool {
        self.read().flags.get(key).copied().unwrap_or(false)
    }

    /// The flag is only kept in memory once it has reached disk.
    fn set_flag(&self, key: &str, value: bool) -> Result<()> {
        let mut guard = self.write();
        let mut next = guard.clone();
        next.flags.insert(key.to_string(), value);
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }
}
