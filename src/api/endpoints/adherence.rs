//! Adherence endpoint — scores, today stats, weekly summary, streak.

use axum::extract::State;
use axum::{Extension, Json};
use chrono::Utc;
use serde::Serialize;

use crate::adherence::{snapshot_score, today_stats, weekly_summary, TodayStats, WeeklySummary};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, UserContext};
use crate::db::repository::logs_for_day;

#[derive(Serialize)]
pub struct AdherenceResponse {
    /// Score over the 30-day snapshot window.
    pub score: u8,
    pub today: TodayStats,
    pub weekly: WeeklySummary,
}

/// `GET /api/adherence`
pub async fn summary(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<AdherenceResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    let now = Utc::now().naive_utc();

    let score = snapshot_score(&conn, &user.user_id, now)?;
    let logs = logs_for_day(&conn, &user.user_id, now.date())?;
    let weekly = weekly_summary(&conn, &user.user_id, now)?;

    Ok(Json(AdherenceResponse {
        score,
        today: today_stats(&logs, now.date()),
        weekly,
    }))
}
