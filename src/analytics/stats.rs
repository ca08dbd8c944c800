use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::calendar::DayCalendar;

/// Day-key (`YYYY-MM-DD`) to that day's totals.
pub type AnalyticsHistory = BTreeMap<String, DailyStats>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub date: DateTime<Utc>,
    pub total_seconds: f64,
    pub slouch_seconds: f64,
    pub slouch_count: u32,
}

impl DailyStats {
    pub fn new(date: DateTime<Utc>, total_seconds: f64, slouch_seconds: f64, slouch_count: u32) -> Self {
        Self {
            date,
            total_seconds,
            slouch_seconds,
            slouch_count,
        }
    }

    pub fn empty(date: DateTime<Utc>) -> Self {
        Self::new(date, 0.0, 0.0, 0)
    }

    pub fn day_key(&self, calendar: &DayCalendar) -> String {
        calendar.day_key(self.date)
    }

    /// Percentage of monitored time spent upright. Days with no monitored
    /// time score 0; a slouch total larger than the day total clamps to 0.
    pub fn posture_score(&self) -> f64 {
        if self.total_seconds <= 0.0 {
            return 0.0;
        }
        let ratio = self.slouch_seconds / self.total_seconds;
        ((1.0 - ratio) * 100.0).clamp(0.0, 100.0)
    }

    pub fn score_band(&self) -> ScoreBand {
        ScoreBand::for_score(self.posture_score())
    }

    pub fn has_data(&self) -> bool {
        self.total_seconds > 0.0
    }

    /// Additive merge used when folding another ledger's day into this one.
    pub fn absorb(&mut self, other: &DailyStats) {
        self.total_seconds += other.total_seconds;
        self.slouch_seconds += other.slouch_seconds;
        self.slouch_count = self.slouch_count.saturating_add(other.slouch_count);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScoreBand {
    Good,
    Fair,
    Poor,
}

impl ScoreBand {
    pub fn for_score(score: f64) -> Self {
        if score >= 85.0 {
            ScoreBand::Good
        } else if score >= 70.0 {
            ScoreBand::Fair
        } else {
            ScoreBand::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreBand::Good => "good",
            ScoreBand::Fair => "fair",
            ScoreBand::Poor => "poor",
        }
    }
}

/// Compact human duration: `1h 5m`, `3m 20s` or `45s`. Fractions truncate.
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

/// Mean score over the days that actually have monitored time.
pub fn weekly_average_score(days: &[DailyStats]) -> Option<f64> {
    let scored: Vec<f64> = days
        .iter()
        .filter(|day| day.has_data())
        .map(DailyStats::posture_score)
        .collect();

    if scored.is_empty() {
        None
    } else {
        Some(scored.iter().sum::<f64>() / scored.len() as f64)
    }
}
