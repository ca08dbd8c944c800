use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};

use crate::{
    analytics::{DayCalendar, LEGACY_MIGRATION_FLAG},
    engine::TrackingSource,
    error::LedgerError,
};

const HISTORY_FILE_NAME: &str = "analytics.json";
const SETTINGS_FILE_NAME: &str = "settings.json";
const DEFAULT_SAVE_INTERVAL_SECS: u64 = 60;
const DEBUG_SAVE_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub data_dir: PathBuf,
    pub legacy_dir: PathBuf,
    pub calendar: DayCalendar,
    pub save_interval: Duration,
    pub tracking_source: Option<TrackingSource>,
    pub migration_flag_key: String,
}

impl LedgerConfig {
    /// Reads `DORSO_*` environment variables, falling back to directories
    /// under `$HOME` and the host's timezone.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let home = lookup("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let data_dir = lookup("DORSO_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join(".dorso"));
        let legacy_dir = lookup("DORSO_LEGACY_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join(".posturr"));

        let calendar = match lookup("DORSO_UTC_OFFSET_MINUTES") {
            Some(raw) => {
                let minutes = raw.trim().parse::<i32>().map_err(|_| {
                    LedgerError::Config(format!(
                        "DORSO_UTC_OFFSET_MINUTES '{raw}' is not an integer"
                    ))
                })?;
                DayCalendar::from_offset_minutes(minutes)?
            }
            None => DayCalendar::local(),
        };

        let debug_mode = lookup("DORSO_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let save_interval_secs = match lookup("DORSO_SAVE_INTERVAL_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .with_context(|| format!("DORSO_SAVE_INTERVAL_SECS '{raw}' must be a positive integer"))?,
            None if debug_mode => DEBUG_SAVE_INTERVAL_SECS,
            None => DEFAULT_SAVE_INTERVAL_SECS,
        };

        let tracking_source = match lookup("DORSO_TRACKING_SOURCE") {
            Some(raw) => Some(TrackingSource::parse(&raw).ok_or_else(|| {
                LedgerError::Config(format!("DORSO_TRACKING_SOURCE '{raw}' is not camera or motion"))
            })?),
            None => None,
        };

        Ok(Self {
            data_dir,
            legacy_dir,
            calendar,
            save_interval: Duration::from_secs(save_interval_secs),
            tracking_source,
            migration_flag_key: LEGACY_MIGRATION_FLAG.to_string(),
        })
    }

    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join(HISTORY_FILE_NAME)
    }

    pub fn legacy_history_path(&self) -> PathBuf {
        self.legacy_dir.join(HISTORY_FILE_NAME)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<LedgerConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LedgerConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_live_under_home() {
        let config = config_from(&[("HOME", "/home/ada")]).unwrap();
        assert_eq!(config.history_path(), PathBuf::from("/home/ada/.dorso/analytics.json"));
        assert_eq!(
            config.legacy_history_path(),
            PathBuf::from("/home/ada/.posturr/analytics.json")
        );
        assert_eq!(config.settings_path(), PathBuf::from("/home/ada/.dorso/settings.json"));
        assert_eq!(config.save_interval, Duration::from_secs(60));
        assert_eq!(config.calendar, DayCalendar::local());
        assert_eq!(config.tracking_source, None);
        assert_eq!(config.migration_flag_key, LEGACY_MIGRATION_FLAG);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = config_from(&[
            ("DORSO_DATA_DIR", "/data"),
            ("DORSO_LEGACY_DIR", "/old"),
            ("DORSO_UTC_OFFSET_MINUTES", "-300"),
            ("DORSO_SAVE_INTERVAL_SECS", "15"),
            ("DORSO_TRACKING_SOURCE", "motion"),
        ])
        .unwrap();
        assert_eq!(config.history_path(), PathBuf::from("/data/analytics.json"));
        assert_eq!(config.legacy_history_path(), PathBuf::from("/old/analytics.json"));
        assert_eq!(config.calendar.fixed_offset_minutes(), Some(-300));
        assert_eq!(config.save_interval, Duration::from_secs(15));
        assert_eq!(config.tracking_source, Some(TrackingSource::MotionAccessory));
    }

    #[test]
    fn debug_mode_shortens_save_interval() {
        let config = config_from(&[("DORSO_DEBUG", "true")]).unwrap();
        assert_eq!(config.save_interval, Duration::from_secs(5));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(config_from(&[("DORSO_UTC_OFFSET_MINUTES", "east")]).is_err());
        assert!(config_from(&[("DORSO_UTC_OFFSET_MINUTES", "2000")]).is_err());
        assert!(config_from(&[("DORSO_SAVE_INTERVAL_SECS", "0")]).is_err());
        assert!(config_from(&[("DORSO_TRACKING_SOURCE", "radar")]).is_err());
    }
}
