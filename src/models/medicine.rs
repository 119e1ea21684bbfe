use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{MedicineColor, TimeSlot};

/// A prescribed (or self-reported) medicine with up to three daily
/// dose slots. Slot times are wall-clock; the schedule generator pairs
/// them with calendar dates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medicine {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub dosage: String,
    pub morning: bool,
    pub morning_time: Option<NaiveTime>,
    pub afternoon: bool,
    pub afternoon_time: Option<NaiveTime>,
    pub night: bool,
    pub night_time: Option<NaiveTime>,
    pub before_food: bool,
    pub days_remaining: i32,
    pub start_date: NaiveDate,
    pub color: MedicineColor,
}

impl Medicine {
    /// Enabled slots with their configured times, in chronological order.
    pub fn enabled_slots(&self) -> Vec<(TimeSlot, NaiveTime)> {
        let mut slots = Vec::new();
        if self.morning {
            if let Some(t) = self.morning_time {
                slots.push((TimeSlot::Morning, t));
            }
        }
        if self.afternoon {
            if let Some(t) = self.afternoon_time {
                slots.push((TimeSlot::Afternoon, t));
            }
        }
        if self.night {
            if let Some(t) = self.night_time {
                slots.push((TimeSlot::Night, t));
            }
        }
        slots
    }
}

/// Validation failures for medicine input, surfaced before any dose
/// log generation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Medicine name is required")]
    MissingName,
    #[error("Dosage is required")]
    MissingDosage,
    #[error("At least one time slot must be enabled")]
    NoSlotEnabled,
    #[error("Missing time for enabled {0} slot")]
    MissingSlotTime(&'static str),
    #[error("Invalid time '{value}' for {slot} slot (expected HH:MM)")]
    InvalidSlotTime { slot: &'static str, value: String },
}

/// User-supplied medicine input. Times arrive as `HH:MM` strings from
/// the form layer and are parsed during validation.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMedicine {
    pub name: String,
    pub dosage: String,
    #[serde(default)]
    pub morning: bool,
    pub morning_time: Option<String>,
    #[serde(default)]
    pub afternoon: bool,
    pub afternoon_time: Option<String>,
    #[serde(default)]
    pub night: bool,
    pub night_time: Option<String>,
    #[serde(default)]
    pub before_food: bool,
    pub days_remaining: i32,
    pub start_date: NaiveDate,
}

impl NewMedicine {
    /// Validate and convert into a `Medicine` owned by `user_id`.
    ///
    /// The color tag is drawn at creation and never changes.
    pub fn into_medicine(self, user_id: Uuid) -> Result<Medicine, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingName);
        }
        if self.dosage.trim().is_empty() {
            return Err(ValidationError::MissingDosage);
        }
        if !self.morning && !self.afternoon && !self.night {
            return Err(ValidationError::NoSlotEnabled);
        }

        let morning_time = parse_slot_time("morning", self.morning, self.morning_time)?;
        let afternoon_time = parse_slot_time("afternoon", self.afternoon, self.afternoon_time)?;
        let night_time = parse_slot_time("night", self.night, self.night_time)?;

        Ok(Medicine {
            id: Uuid::new_v4(),
            user_id,
            name: self.name.trim().to_string(),
            dosage: self.dosage.trim().to_string(),
            morning: self.morning,
            morning_time,
            afternoon: self.afternoon,
            afternoon_time,
            night: self.night,
            night_time,
            before_food: self.before_food,
            days_remaining: self.days_remaining,
            start_date: self.start_date,
            color: MedicineColor::random(),
        })
    }
}

/// Parse an enabled slot's time. A disabled slot ignores any supplied
/// value; an enabled slot requires a parseable `HH:MM` (seconds accepted).
fn parse_slot_time(
    slot: &'static str,
    enabled: bool,
    value: Option<String>,
) -> Result<Option<NaiveTime>, ValidationError> {
    if !enabled {
        return Ok(None);
    }
    let raw = value.ok_or(ValidationError::MissingSlotTime(slot))?;
    NaiveTime::parse_from_str(&raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
        .map(Some)
        .map_err(|_| ValidationError::InvalidSlotTime {
            slot,
            value: raw,
        })
}
