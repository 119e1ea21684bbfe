//! Profile endpoints — settings incl. the caretaker email, plus the
//! explicit weekly-report trigger.

use axum::extract::State;
use axum::{Extension, Json};
use chrono::Utc;
use serde::Serialize;

use crate::adherence::weekly_summary;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, UserContext};
use crate::db::repository::{get_profile, update_profile};
use crate::models::{Profile, ProfileUpdate};

/// `GET /api/profile`
pub async fn get(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<Profile>, ApiError> {
    let conn = ctx.core.open_db()?;
    let profile = get_profile(&conn, &user.user_id)?
        .ok_or_else(|| ApiError::NotFound("Profile not found".into()))?;
    Ok(Json(profile))
}

/// `PUT /api/profile`
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Json(req): Json<ProfileUpdate>,
) -> Result<Json<Profile>, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Name is required".into()));
    }

    let conn = ctx.core.open_db()?;
    if !update_profile(&conn, &user.user_id, &req)? {
        return Err(ApiError::NotFound("Profile not found".into()));
    }
    let profile = get_profile(&conn, &user.user_id)?
        .ok_or_else(|| ApiError::NotFound("Profile not found".into()))?;
    Ok(Json(profile))
}

#[derive(Serialize)]
pub struct WeeklyReportResponse {
    pub sent: bool,
}

/// `POST /api/profile/weekly-report` — email the weekly summary to the
/// configured caretaker. `sent: false` when no caretaker is set up.
pub async fn send_weekly_report(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<WeeklyReportResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    let profile = get_profile(&conn, &user.user_id)?
        .ok_or_else(|| ApiError::NotFound("Profile not found".into()))?;

    if !ctx.core.mailer.can_notify(&profile) {
        return Ok(Json(WeeklyReportResponse { sent: false }));
    }

    let summary = weekly_summary(&conn, &user.user_id, Utc::now().naive_utc())?;
    ctx.core
        .mailer
        .send_weekly_report(&profile, &summary)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(WeeklyReportResponse { sent: true }))
}
