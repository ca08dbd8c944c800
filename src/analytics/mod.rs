pub mod calendar;
pub mod fs;
pub mod migration;
pub mod persistence;
pub mod stats;
pub mod store;

pub use calendar::DayCalendar;
pub use fs::{FileSystem, OsFileSystem};
pub use migration::{
    migrate_legacy_analytics_if_needed, FlagStore, MemoryFlagStore, LEGACY_MIGRATION_FLAG,
};
pub use stats::{format_duration, weekly_average_score, AnalyticsHistory, DailyStats, ScoreBand};
pub use store::{system_clock, AnalyticsStore, Clock, LegacySource, StoreOptions};
