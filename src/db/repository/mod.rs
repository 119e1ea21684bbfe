//! Repository layer — entity-scoped database operations.
//!
//! Free functions over `&Connection`, one sub-module per entity.
//! All public functions are re-exported here.

mod dose_log;
mod medicine;
mod profile;
mod share;
mod token;

pub use dose_log::*;
pub use medicine::*;
pub use profile::*;
pub use share::*;
pub use token::*;

use chrono::{NaiveDateTime, NaiveTime};

/// Wire format for timestamps: ISO-8601 with a `T` separator, which
/// sorts lexicographically and is understood by SQLite's date().
pub(crate) const DATETIME_FMT: &str = "%Y-%m-%dT%H:%M:%S";

/// Wire format for slot times.
pub(crate) const TIME_FMT: &str = "%H:%M";

pub(crate) fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FMT).to_string()
}

pub(crate) fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, DATETIME_FMT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .ok()
}

pub(crate) fn format_time(t: &NaiveTime) -> String {
    t.format(TIME_FMT).to_string()
}

pub(crate) fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, TIME_FMT)
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}
