//! Dose endpoints — today's schedule and the guarded action flow.
//!
//! "Mark taken" runs through the quick-confirm guard: a press that
//! lands too soon after the previous one on the same card returns
//! `requires_confirmation` instead of committing, and the follow-up
//! `/confirm` call either commits the dose as `suspected` or discards
//! the press.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::adherence::{today_stats, TodayStats};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, UserContext};
use crate::db::repository::{get_dose_log, get_profile, list_medicines, logs_for_day};
use crate::dose::{record_outcome, DoseOutcome};
use crate::guard::{GuardDecision, Resolution};
use crate::models::DoseLog;
use crate::schedule::{daily_schedule, SlotSchedule};

#[derive(Serialize)]
pub struct TodayResponse {
    pub schedule: Vec<SlotSchedule>,
    pub stats: TodayStats,
}

/// `GET /api/doses/today`
pub async fn today(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<TodayResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    let today = Utc::now().naive_utc().date();

    let medicines = list_medicines(&conn, &user.user_id)?;
    let logs = logs_for_day(&conn, &user.user_id, today)?;

    Ok(Json(TodayResponse {
        schedule: daily_schedule(&medicines, &logs),
        stats: today_stats(&logs, today),
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoseAction {
    Taken,
    Missed,
}

#[derive(Deserialize)]
pub struct ActionRequest {
    pub action: DoseAction,
    /// Seconds between notification fire and this action, when the
    /// client measured one.
    pub response_time_seconds: Option<u32>,
}

#[derive(Serialize)]
pub struct ActionResponse {
    pub requires_confirmation: bool,
    pub log: Option<DoseLog>,
}

/// `POST /api/doses/:id/action`
pub async fn action(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Path(dose_log_id): Path<Uuid>,
    Json(req): Json<ActionRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    let log = owned_log(&conn, &user, &dose_log_id)?;
    if log.status.is_terminal() {
        return Err(ApiError::AlreadyResolved);
    }

    let now = Utc::now();

    let outcome = match req.action {
        DoseAction::Taken => match ctx.core.guard_register_taken(dose_log_id, now) {
            GuardDecision::NeedsConfirmation => {
                tracing::debug!(dose_log = %dose_log_id, "Quick-confirm prompt raised");
                return Ok(Json(ActionResponse {
                    requires_confirmation: true,
                    log: None,
                }));
            }
            GuardDecision::Commit => DoseOutcome::Taken,
        },
        DoseAction::Missed => DoseOutcome::Missed,
    };

    let updated = commit(&ctx, &conn, &user, &dose_log_id, outcome, req.response_time_seconds)?;
    Ok(Json(ActionResponse {
        requires_confirmation: false,
        log: Some(updated),
    }))
}

#[derive(Deserialize)]
pub struct ConfirmRequest {
    pub confirmed: bool,
}

/// `POST /api/doses/:id/confirm` — resolve a quick-confirm prompt.
pub async fn confirm(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Path(dose_log_id): Path<Uuid>,
    Json(req): Json<ConfirmRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    owned_log(&conn, &user, &dose_log_id)?;

    match ctx.core.guard_resolve(&dose_log_id, req.confirmed) {
        Resolution::CommitSuspected => {
            let updated =
                commit(&ctx, &conn, &user, &dose_log_id, DoseOutcome::Suspected, None)?;
            Ok(Json(ActionResponse {
                requires_confirmation: false,
                log: Some(updated),
            }))
        }
        Resolution::Discard => Ok(Json(ActionResponse {
            requires_confirmation: false,
            log: None,
        })),
        Resolution::NotAwaiting => Err(ApiError::BadRequest(
            "No confirmation pending for this dose".into(),
        )),
    }
}

/// Fetch a log and verify ownership; a foreign log reads as missing.
fn owned_log(
    conn: &rusqlite::Connection,
    user: &UserContext,
    dose_log_id: &Uuid,
) -> Result<DoseLog, ApiError> {
    let log = get_dose_log(conn, dose_log_id)?
        .filter(|l| l.user_id == user.user_id)
        .ok_or_else(|| ApiError::NotFound("Dose log not found".into()))?;
    Ok(log)
}

/// Commit a terminal outcome: record it, silence reminders, drop guard
/// state, and kick off the caretaker alert on a miss.
fn commit(
    ctx: &ApiContext,
    conn: &rusqlite::Connection,
    user: &UserContext,
    dose_log_id: &Uuid,
    outcome: DoseOutcome,
    response_time_seconds: Option<u32>,
) -> Result<DoseLog, ApiError> {
    let updated = record_outcome(
        conn,
        dose_log_id,
        outcome,
        response_time_seconds,
        Utc::now().naive_utc(),
    )?;

    ctx.core.reminders.cancel(dose_log_id);
    ctx.core.guard_forget(dose_log_id);

    if outcome == DoseOutcome::Missed {
        notify_caretaker_missed(ctx, conn, user, &updated);
    }

    Ok(updated)
}

/// Fire-and-forget caretaker alert — a mail failure must never fail
/// the dose action itself.
fn notify_caretaker_missed(
    ctx: &ApiContext,
    conn: &rusqlite::Connection,
    user: &UserContext,
    log: &DoseLog,
) {
    let profile = match get_profile(conn, &user.user_id) {
        Ok(Some(p)) => p,
        Ok(None) => return,
        Err(e) => {
            tracing::warn!(error = %e, "Profile lookup for caretaker alert failed");
            return;
        }
    };
    let medicine_name = crate::db::repository::get_medicine(conn, &log.medicine_id)
        .ok()
        .flatten()
        .map(|m| m.name)
        .unwrap_or_else(|| "their medication".to_string());
    let scheduled = log.scheduled_utc();

    let core = ctx.core.clone();
    tokio::spawn(async move {
        if let Err(e) = core
            .mailer
            .send_missed_dose(&profile, &medicine_name, scheduled)
            .await
        {
            tracing::warn!(error = %e, "Missed-dose email failed");
        }
    });
}
