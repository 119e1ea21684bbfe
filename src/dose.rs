//! Dose lifecycle — the single write path for resolving a pending dose.
//!
//! Transitions are forward-only: pending → taken/missed/suspected.
//! Resolving an already-terminal log is rejected so callers can tell a
//! double-tap race from success. After a successful transition the
//! profile's cached adherence snapshot is refreshed.

use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;

use crate::adherence;
use crate::db::repository::{get_dose_log, update_adherence_snapshot, update_dose_outcome};
use crate::db::DatabaseError;
use crate::models::enums::DoseStatus;
use crate::models::DoseLog;

/// Terminal outcomes a caller may record. `pending` is unrepresentable
/// here, which keeps the forward-only invariant out of runtime checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoseOutcome {
    Taken,
    Missed,
    Suspected,
}

impl DoseOutcome {
    pub fn to_status(self) -> DoseStatus {
        match self {
            Self::Taken => DoseStatus::Taken,
            Self::Missed => DoseStatus::Missed,
            Self::Suspected => DoseStatus::Suspected,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Dose log not found: {0}")]
    NotFound(Uuid),
    #[error("Dose log {0} is already resolved")]
    AlreadyResolved(Uuid),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Resolve a pending dose log.
///
/// `taken` and `suspected` stamp the taken time with `now`;
/// `response_time_seconds` records notification-to-action latency when
/// the client measured one. Returns the updated log.
pub fn record_outcome(
    conn: &Connection,
    dose_log_id: &Uuid,
    outcome: DoseOutcome,
    response_time_seconds: Option<u32>,
    now: NaiveDateTime,
) -> Result<DoseLog, LifecycleError> {
    let log = get_dose_log(conn, dose_log_id)?
        .ok_or(LifecycleError::NotFound(*dose_log_id))?;

    if log.status.is_terminal() {
        return Err(LifecycleError::AlreadyResolved(*dose_log_id));
    }

    let taken_time = match outcome {
        DoseOutcome::Taken | DoseOutcome::Suspected => Some(now),
        DoseOutcome::Missed => None,
    };

    let won = update_dose_outcome(
        conn,
        dose_log_id,
        outcome.to_status(),
        taken_time,
        response_time_seconds,
    )?;
    if !won {
        // Lost a race between the read above and the guarded update
        return Err(LifecycleError::AlreadyResolved(*dose_log_id));
    }

    tracing::info!(
        dose_log = %dose_log_id,
        outcome = ?outcome,
        "Dose resolved"
    );

    // Refresh the cached snapshot; failure here must not undo the
    // resolution, so it only logs.
    match adherence::snapshot_score(conn, &log.user_id, now) {
        Ok(score) => {
            if let Err(e) = update_adherence_snapshot(conn, &log.user_id, score) {
                tracing::warn!(error = %e, "Adherence snapshot update failed");
            }
        }
        Err(e) => tracing::warn!(error = %e, "Adherence snapshot recompute failed"),
    }

    let updated = get_dose_log(conn, dose_log_id)?
        .ok_or(LifecycleError::NotFound(*dose_log_id))?;
    Ok(updated)
}
