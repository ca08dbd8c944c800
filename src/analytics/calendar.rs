use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveTime, Offset, TimeZone, Utc};

use crate::error::LedgerError;

const DAY_KEY_FORMAT: &str = "%Y-%m-%d";
const MAX_OFFSET_MINUTES: i32 = 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zone {
    /// The host's timezone, DST rules included.
    Local,
    Fixed(FixedOffset),
}

/// Calendar used to bucket timestamps into local days.
///
/// Two instants that fall on the same local date always produce the same
/// day-key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayCalendar {
    zone: Zone,
}

impl Default for DayCalendar {
    fn default() -> Self {
        Self::local()
    }
}

impl DayCalendar {
    pub fn local() -> Self {
        Self { zone: Zone::Local }
    }

    pub fn utc() -> Self {
        Self {
            zone: Zone::Fixed(Utc.fix()),
        }
    }

    pub fn from_offset_minutes(minutes: i32) -> Result<Self, LedgerError> {
        if minutes.abs() >= MAX_OFFSET_MINUTES {
            return Err(LedgerError::Config(format!(
                "UTC offset of {minutes} minutes is outside ±24h"
            )));
        }
        let offset = FixedOffset::east_opt(minutes * 60).ok_or_else(|| {
            LedgerError::Config(format!("UTC offset of {minutes} minutes is not representable"))
        })?;
        Ok(Self {
            zone: Zone::Fixed(offset),
        })
    }

    /// `None` for the host's local zone, whose offset varies over the year.
    pub fn fixed_offset_minutes(&self) -> Option<i32> {
        match self.zone {
            Zone::Local => None,
            Zone::Fixed(offset) => Some(offset.local_minus_utc() / 60),
        }
    }

    pub fn day_key(&self, timestamp: DateTime<Utc>) -> String {
        self.local_date(timestamp).format(DAY_KEY_FORMAT).to_string()
    }

    /// Midnight of the local day containing `timestamp`, expressed in UTC.
    pub fn start_of_day(&self, timestamp: DateTime<Utc>) -> DateTime<Utc> {
        self.midnight(self.local_date(timestamp))
    }

    /// Start of the local day `days` calendar days before the one containing
    /// `timestamp`. Counts dates, not 24h spans, so DST shifts do not skip or
    /// repeat a day.
    pub fn days_back(&self, timestamp: DateTime<Utc>, days: i64) -> DateTime<Utc> {
        self.midnight(self.local_date(timestamp) - Duration::days(days))
    }

    fn local_date(&self, timestamp: DateTime<Utc>) -> NaiveDate {
        match self.zone {
            Zone::Local => timestamp.with_timezone(&Local).date_naive(),
            Zone::Fixed(offset) => timestamp.with_timezone(&offset).date_naive(),
        }
    }

    fn midnight(&self, date: NaiveDate) -> DateTime<Utc> {
        match self.zone {
            Zone::Local => first_instant_of(&Local, date),
            Zone::Fixed(offset) => first_instant_of(&offset, date),
        }
    }
}

/// First instant of `date` in `zone`. Where a DST gap swallows midnight the
/// day starts at the first hour that exists.
fn first_instant_of<Tz: TimeZone>(zone: &Tz, date: NaiveDate) -> DateTime<Utc> {
    (0..24)
        .filter_map(|hour| NaiveTime::from_hms_opt(hour, 0, 0))
        .find_map(|time| zone.from_local_datetime(&date.and_time(time)).earliest())
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}
