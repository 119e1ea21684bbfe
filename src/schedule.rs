//! Schedule generation — turns medicine definitions into concrete
//! per-day dose logs, plus the slot-grouped daily view.
//!
//! Generation is idempotent per (medicine, day, slot): existing logs
//! are skipped and the store's unique index backstops any race.

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::db::repository::{insert_dose_log, slots_logged_on};
use crate::db::DatabaseError;
use crate::models::enums::{DoseStatus, TimeSlot};
use crate::models::{DoseLog, Medicine};

/// Materialise dose logs for `medicine` on `date` — one pending log per
/// enabled slot that doesn't already have one. Returns only the logs
/// created by this call.
///
/// A medicine with no enabled slots yields zero logs; validation
/// rejects that shape at creation, so it should not occur.
pub fn generate_for_date(
    conn: &Connection,
    medicine: &Medicine,
    date: NaiveDate,
) -> Result<Vec<DoseLog>, DatabaseError> {
    let slots = medicine.enabled_slots();
    if slots.is_empty() {
        return Ok(Vec::new());
    }

    let existing = slots_logged_on(conn, &medicine.id, date)?;

    let mut created = Vec::new();
    for (slot, time) in slots {
        if existing.contains(&slot) {
            continue;
        }
        let log = DoseLog {
            id: Uuid::new_v4(),
            user_id: medicine.user_id,
            medicine_id: medicine.id,
            scheduled_time: date.and_time(time),
            taken_time: None,
            status: DoseStatus::Pending,
            time_slot: slot,
            response_time_seconds: None,
        };
        if insert_dose_log(conn, &log)? {
            created.push(log);
        }
    }

    if !created.is_empty() {
        tracing::debug!(
            medicine = %medicine.name,
            %date,
            count = created.len(),
            "Materialised dose logs"
        );
    }

    Ok(created)
}

// ═══════════════════════════════════════════
// Daily schedule view
// ═══════════════════════════════════════════

/// One medicine/log pairing inside a slot section.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleEntry {
    pub medicine: Medicine,
    pub log: DoseLog,
}

/// A slot section of the day view. Slots with no entries are omitted.
#[derive(Debug, Clone, Serialize)]
pub struct SlotSchedule {
    pub time_slot: TimeSlot,
    pub label: &'static str,
    pub entries: Vec<ScheduleEntry>,
}

/// Group a day's logs under morning/afternoon/night, pairing each with
/// its medicine. Logs whose medicine is gone are dropped.
pub fn daily_schedule(medicines: &[Medicine], logs: &[DoseLog]) -> Vec<SlotSchedule> {
    let mut sections: Vec<SlotSchedule> = TimeSlot::ALL
        .iter()
        .map(|slot| SlotSchedule {
            time_slot: *slot,
            label: slot.label(),
            entries: Vec::new(),
        })
        .collect();

    for log in logs {
        let Some(medicine) = medicines.iter().find(|m| m.id == log.medicine_id) else {
            continue;
        };
        if let Some(section) = sections.iter_mut().find(|s| s.time_slot == log.time_slot) {
            section.entries.push(ScheduleEntry {
                medicine: medicine.clone(),
                log: log.clone(),
            });
        }
    }

    sections.retain(|s| !s.entries.is_empty());
    sections
}
