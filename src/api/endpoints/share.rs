//! Caretaker sharing — link management (authed) and the public
//! token-addressed snapshot view.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{generate_token, ApiContext, UserContext};
use crate::db::repository::{
    get_profile, get_share_by_token, insert_share, list_medicines, list_shares,
    recent_logs_with_medicine, revoke_share,
};
use crate::models::enums::DoseStatus;
use crate::models::CaretakerShare;

/// Dose history entries shown to the caretaker.
const RECENT_LOG_LIMIT: u32 = 20;

#[derive(Serialize)]
pub struct SharesResponse {
    pub shares: Vec<CaretakerShare>,
}

/// `GET /api/shares`
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<SharesResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    let shares = list_shares(&conn, &user.user_id)?;
    Ok(Json(SharesResponse { shares }))
}

/// `POST /api/shares` — mint a new sharing link.
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<CaretakerShare>, ApiError> {
    let conn = ctx.core.open_db()?;
    let share = CaretakerShare {
        id: Uuid::new_v4(),
        patient_user_id: user.user_id,
        share_token: generate_token(),
        is_active: true,
        created_at: Utc::now().naive_utc(),
    };
    insert_share(&conn, &share)?;
    tracing::info!(share = %share.id, "Caretaker share created");
    Ok(Json(share))
}

#[derive(Serialize)]
pub struct RevokeResponse {
    pub revoked: bool,
}

/// `POST /api/shares/:id/revoke`
pub async fn revoke(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Path(share_id): Path<Uuid>,
) -> Result<Json<RevokeResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    if !revoke_share(&conn, &user.user_id, &share_id)? {
        return Err(ApiError::NotFound("Share not found".into()));
    }
    Ok(Json(RevokeResponse { revoked: true }))
}

// ═══════════════════════════════════════════
// Public snapshot view
// ═══════════════════════════════════════════

#[derive(Serialize)]
pub struct SharedMedicine {
    pub id: Uuid,
    pub name: String,
    pub dosage: String,
}

#[derive(Serialize)]
pub struct SharedLogEntry {
    pub id: Uuid,
    pub medicine_name: String,
    pub status: DoseStatus,
    pub scheduled_time: NaiveDateTime,
}

#[derive(Serialize)]
pub struct SharedView {
    pub patient_name: String,
    pub adherence_score: u8,
    pub medicines: Vec<SharedMedicine>,
    pub recent_logs: Vec<SharedLogEntry>,
}

/// `GET /share/:token` — read-only caretaker snapshot. No bearer auth;
/// the share token is the credential. Unknown tokens 404, revoked 403.
pub async fn view(
    State(ctx): State<ApiContext>,
    Path(token): Path<String>,
) -> Result<Json<SharedView>, ApiError> {
    let conn = ctx.core.open_db()?;

    let share = get_share_by_token(&conn, &token)?
        .ok_or_else(|| ApiError::NotFound("Invalid or expired sharing link".into()))?;
    if !share.is_active {
        return Err(ApiError::ShareRevoked);
    }

    let patient = share.patient_user_id;
    let profile = get_profile(&conn, &patient)?
        .ok_or_else(|| ApiError::NotFound("Invalid or expired sharing link".into()))?;

    let medicines = list_medicines(&conn, &patient)?
        .into_iter()
        .map(|m| SharedMedicine {
            id: m.id,
            name: m.name,
            dosage: m.dosage,
        })
        .collect();

    let recent_logs = recent_logs_with_medicine(&conn, &patient, RECENT_LOG_LIMIT)?
        .into_iter()
        .map(|item| SharedLogEntry {
            id: item.log.id,
            medicine_name: item.medicine_name,
            status: item.log.status,
            scheduled_time: item.log.scheduled_time,
        })
        .collect();

    Ok(Json(SharedView {
        patient_name: profile.name,
        adherence_score: profile.adherence_score,
        medicines,
        recent_logs,
    }))
}
