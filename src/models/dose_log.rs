use chrono::{NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{DoseStatus, TimeSlot};

/// One scheduled dose instance for one medicine on one calendar day.
///
/// `time_slot` is copied from the generating medicine at creation so the
/// historical record stays stable if the medicine is later edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoseLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub medicine_id: Uuid,
    pub scheduled_time: NaiveDateTime,
    pub taken_time: Option<NaiveDateTime>,
    pub status: DoseStatus,
    pub time_slot: TimeSlot,
    pub response_time_seconds: Option<u32>,
}

impl DoseLog {
    /// The scheduled instant as UTC, for reminder delay math.
    pub fn scheduled_utc(&self) -> chrono::DateTime<Utc> {
        Utc.from_utc_datetime(&self.scheduled_time)
    }
}
