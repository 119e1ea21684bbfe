//! Adherence scoring — point-in-time scores, streaks, and daily stats
//! derived from dose-log history. Nothing here is authoritative state;
//! everything recomputes from the logs.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::db::repository::logs_since;
use crate::db::DatabaseError;
use crate::models::enums::DoseStatus;
use crate::models::DoseLog;

/// Streak walks are bounded to keep the computation cheap.
const STREAK_LOOKBACK_DAYS: i64 = 30;

/// Window for the cached profile snapshot.
pub const SNAPSHOT_WINDOW_DAYS: i64 = 30;

/// Adherence score over a set of logs, 0–100.
///
/// Only terminal entries count: pending doses are unresolved and must
/// not penalise. Zero terminal entries scores a perfect 100 so new
/// users start encouraged. `suspected` earns half credit.
pub fn score(logs: &[DoseLog]) -> u8 {
    let terminal: Vec<&DoseLog> = logs.iter().filter(|l| l.status.is_terminal()).collect();
    if terminal.is_empty() {
        return 100;
    }

    let taken = terminal
        .iter()
        .filter(|l| l.status == DoseStatus::Taken)
        .count() as f64;
    let suspected = terminal
        .iter()
        .filter(|l| l.status == DoseStatus::Suspected)
        .count() as f64;

    ((taken + 0.5 * suspected) / terminal.len() as f64 * 100.0).round() as u8
}

/// Consecutive all-taken days, walking back from `today` (inclusive).
///
/// Days with no terminal logs are skipped — they neither extend nor
/// break the run. The first day that has terminal logs not all taken
/// stops the walk. Bounded to the last 30 days.
pub fn streak(logs: &[DoseLog], today: NaiveDate) -> u32 {
    let mut run = 0;
    for offset in 0..STREAK_LOOKBACK_DAYS {
        let day = today - Duration::days(offset);
        let day_logs: Vec<&DoseLog> = logs
            .iter()
            .filter(|l| l.scheduled_time.date() == day && l.status.is_terminal())
            .collect();

        if day_logs.is_empty() {
            continue;
        }
        if day_logs.iter().all(|l| l.status == DoseStatus::Taken) {
            run += 1;
        } else {
            break;
        }
    }
    run
}

/// Today's dose counts, partitioned by status. `suspected` folds into
/// the total without its own bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TodayStats {
    pub total: u32,
    pub taken: u32,
    pub missed: u32,
    pub pending: u32,
}

pub fn today_stats(logs: &[DoseLog], today: NaiveDate) -> TodayStats {
    let todays: Vec<&DoseLog> = logs
        .iter()
        .filter(|l| l.scheduled_time.date() == today)
        .collect();
    TodayStats {
        total: todays.len() as u32,
        taken: count_status(&todays, DoseStatus::Taken),
        missed: count_status(&todays, DoseStatus::Missed),
        pending: count_status(&todays, DoseStatus::Pending),
    }
}

fn count_status(logs: &[&DoseLog], status: DoseStatus) -> u32 {
    logs.iter().filter(|l| l.status == status).count() as u32
}

/// Seven-day summary feeding the dashboard and the caretaker report.
///
/// `total` counts every scheduled dose in the window; `score` applies
/// the terminal-only algorithm above.
#[derive(Debug, Clone, Serialize)]
pub struct WeeklySummary {
    pub score: u8,
    pub taken: u32,
    pub missed: u32,
    pub total: u32,
    pub streak: u32,
}

pub fn weekly_summary(
    conn: &Connection,
    user_id: &Uuid,
    now: NaiveDateTime,
) -> Result<WeeklySummary, DatabaseError> {
    let week_ago = now - Duration::days(7);
    let logs = logs_since(conn, user_id, week_ago)?;
    let refs: Vec<&DoseLog> = logs.iter().collect();

    Ok(WeeklySummary {
        score: score(&logs),
        taken: count_status(&refs, DoseStatus::Taken),
        missed: count_status(&refs, DoseStatus::Missed),
        total: logs.len() as u32,
        streak: streak(&logs, now.date()),
    })
}

/// Recompute the bounded snapshot score persisted on the profile.
pub fn snapshot_score(
    conn: &Connection,
    user_id: &Uuid,
    now: NaiveDateTime,
) -> Result<u8, DatabaseError> {
    let window_start = now - Duration::days(SNAPSHOT_WINDOW_DAYS);
    let logs = logs_since(conn, user_id, window_start)?;
    Ok(score(&logs))
}
