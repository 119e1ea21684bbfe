use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::{format_datetime, parse_datetime};
use crate::db::DatabaseError;
use crate::models::enums::{DoseStatus, TimeSlot};
use crate::models::DoseLog;

const DOSE_LOG_COLUMNS: &str = "id, user_id, medicine_id, scheduled_time, taken_time,
     status, time_slot, response_time_seconds";

/// Alias-qualified column list for joins against `medicines`.
const DOSE_LOG_COLUMNS_D: &str = "d.id, d.user_id, d.medicine_id, d.scheduled_time, d.taken_time,
     d.status, d.time_slot, d.response_time_seconds";

/// Insert a dose log, ignoring the row if one already exists for the
/// same (medicine, slot, calendar day). Returns whether a row was
/// actually created — the generator relies on this for idempotence.
pub fn insert_dose_log(conn: &Connection, log: &DoseLog) -> Result<bool, DatabaseError> {
    let affected = conn.execute(
        "INSERT OR IGNORE INTO dose_logs (id, user_id, medicine_id, scheduled_time,
         taken_time, status, time_slot, response_time_seconds)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            log.id.to_string(),
            log.user_id.to_string(),
            log.medicine_id.to_string(),
            format_datetime(&log.scheduled_time),
            log.taken_time.as_ref().map(format_datetime),
            log.status.as_str(),
            log.time_slot.as_str(),
            log.response_time_seconds,
        ],
    )?;
    Ok(affected > 0)
}

pub fn get_dose_log(conn: &Connection, id: &Uuid) -> Result<Option<DoseLog>, DatabaseError> {
    let result = conn.query_row(
        &format!("SELECT {DOSE_LOG_COLUMNS} FROM dose_logs WHERE id = ?1"),
        params![id.to_string()],
        dose_log_row,
    );
    match result {
        Ok(log) => Ok(Some(log)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DatabaseError::from(e)),
    }
}

/// Persist a terminal transition. The WHERE clause re-checks `pending`
/// so a concurrent resolution loses cleanly; returns whether this call
/// won the write.
pub fn update_dose_outcome(
    conn: &Connection,
    id: &Uuid,
    status: DoseStatus,
    taken_time: Option<NaiveDateTime>,
    response_time_seconds: Option<u32>,
) -> Result<bool, DatabaseError> {
    let affected = conn.execute(
        "UPDATE dose_logs
         SET status = ?2, taken_time = ?3, response_time_seconds = ?4
         WHERE id = ?1 AND status = 'pending'",
        params![
            id.to_string(),
            status.as_str(),
            taken_time.as_ref().map(format_datetime),
            response_time_seconds,
        ],
    )?;
    Ok(affected > 0)
}

/// Slots already materialised for (medicine, day).
pub fn slots_logged_on(
    conn: &Connection,
    medicine_id: &Uuid,
    date: NaiveDate,
) -> Result<Vec<TimeSlot>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT time_slot FROM dose_logs
         WHERE medicine_id = ?1 AND date(scheduled_time) = ?2",
    )?;
    let rows = stmt
        .query_map(
            params![medicine_id.to_string(), date.to_string()],
            |row| row.get::<_, String>(0),
        )?
        .collect::<Result<Vec<_>, _>>()?;
    rows.iter().map(|s| TimeSlot::from_str(s)).collect()
}

/// All of one owner's logs scheduled on `date`.
pub fn logs_for_day(
    conn: &Connection,
    user_id: &Uuid,
    date: NaiveDate,
) -> Result<Vec<DoseLog>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOSE_LOG_COLUMNS} FROM dose_logs
         WHERE user_id = ?1 AND date(scheduled_time) = ?2
         ORDER BY scheduled_time ASC"
    ))?;
    let rows = stmt
        .query_map(params![user_id.to_string(), date.to_string()], dose_log_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// All of one owner's logs scheduled at or after `since`.
pub fn logs_since(
    conn: &Connection,
    user_id: &Uuid,
    since: NaiveDateTime,
) -> Result<Vec<DoseLog>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOSE_LOG_COLUMNS} FROM dose_logs
         WHERE user_id = ?1 AND scheduled_time >= ?2
         ORDER BY scheduled_time ASC"
    ))?;
    let rows = stmt
        .query_map(
            params![user_id.to_string(), format_datetime(&since)],
            dose_log_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// A dose log joined with its medicine's display name.
#[derive(Debug, Clone)]
pub struct DoseLogWithMedicine {
    pub log: DoseLog,
    pub medicine_name: String,
}

/// Most recent logs for the caretaker share view, newest first.
pub fn recent_logs_with_medicine(
    conn: &Connection,
    user_id: &Uuid,
    limit: u32,
) -> Result<Vec<DoseLogWithMedicine>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOSE_LOG_COLUMNS_D}, m.name
         FROM dose_logs d
         INNER JOIN medicines m ON m.id = d.medicine_id
         WHERE d.user_id = ?1
         ORDER BY d.scheduled_time DESC
         LIMIT ?2"
    ))?;
    let rows = stmt
        .query_map(params![user_id.to_string(), limit], |row| {
            Ok(DoseLogWithMedicine {
                log: dose_log_row(row)?,
                medicine_name: row.get(8)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Pending logs scheduled after `after`, across all owners — the
/// reminder scheduler rebuilds from this at startup.
pub fn pending_logs_after(
    conn: &Connection,
    after: NaiveDateTime,
) -> Result<Vec<DoseLogWithMedicine>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOSE_LOG_COLUMNS_D}, m.name
         FROM dose_logs d
         INNER JOIN medicines m ON m.id = d.medicine_id
         WHERE d.status = 'pending' AND d.scheduled_time > ?1
         ORDER BY d.scheduled_time ASC"
    ))?;
    let rows = stmt
        .query_map(params![format_datetime(&after)], |row| {
            Ok(DoseLogWithMedicine {
                log: dose_log_row(row)?,
                medicine_name: row.get(8)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Ids of a medicine's still-pending logs — cancelled alongside the
/// medicine itself.
pub fn pending_log_ids_for_medicine(
    conn: &Connection,
    medicine_id: &Uuid,
) -> Result<Vec<Uuid>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id FROM dose_logs WHERE medicine_id = ?1 AND status = 'pending'",
    )?;
    let rows = stmt
        .query_map(params![medicine_id.to_string()], |row| {
            row.get::<_, String>(0)
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows.into_iter().filter_map(|s| s.parse().ok()).collect())
}

/// Transition pending logs scheduled before `cutoff` to missed.
/// Returns the number of logs expired. Policy lives with the caller.
pub fn expire_pending_before(
    conn: &Connection,
    cutoff: NaiveDateTime,
) -> Result<usize, DatabaseError> {
    let affected = conn.execute(
        "UPDATE dose_logs SET status = 'missed'
         WHERE status = 'pending' AND scheduled_time < ?1",
        params![format_datetime(&cutoff)],
    )?;
    Ok(affected)
}

fn dose_log_row(row: &Row) -> rusqlite::Result<DoseLog> {
    let status_str: String = row.get(5)?;
    let slot_str: String = row.get(6)?;
    Ok(DoseLog {
        id: row
            .get::<_, String>(0)?
            .parse()
            .unwrap_or_else(|_| Uuid::nil()),
        user_id: row
            .get::<_, String>(1)?
            .parse()
            .unwrap_or_else(|_| Uuid::nil()),
        medicine_id: row
            .get::<_, String>(2)?
            .parse()
            .unwrap_or_else(|_| Uuid::nil()),
        scheduled_time: row
            .get::<_, String>(3)
            .map(|s| parse_datetime(&s).unwrap_or_default())?,
        taken_time: row
            .get::<_, Option<String>>(4)?
            .and_then(|s| parse_datetime(&s)),
        status: DoseStatus::from_str(&status_str).unwrap_or(DoseStatus::Pending),
        time_slot: TimeSlot::from_str(&slot_str).unwrap_or(TimeSlot::Morning),
        response_time_seconds: row.get(7)?,
    })
}
