//! Medicine endpoints — list, create (single and batch), delete.
//!
//! Creation validates the definition, materialises today's dose logs,
//! and schedules reminders for the slots still ahead of the clock.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, UserContext};
use crate::db::repository::{
    delete_medicine, insert_medicine, list_medicines, pending_log_ids_for_medicine,
};
use crate::models::{Medicine, NewMedicine};
use crate::schedule::generate_for_date;

#[derive(Serialize)]
pub struct MedicinesResponse {
    pub medicines: Vec<Medicine>,
}

/// `GET /api/medicines`
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<MedicinesResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    let medicines = list_medicines(&conn, &user.user_id)?;
    Ok(Json(MedicinesResponse { medicines }))
}

/// `POST /api/medicines`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Json(input): Json<NewMedicine>,
) -> Result<Json<Medicine>, ApiError> {
    let conn = ctx.core.open_db()?;
    let medicine = add_one(&ctx, &conn, &user, input)?;
    Ok(Json(medicine))
}

#[derive(Deserialize)]
pub struct BatchRequest {
    pub medicines: Vec<NewMedicine>,
}

#[derive(Serialize)]
pub struct BatchResponse {
    pub created: Vec<Medicine>,
}

/// `POST /api/medicines/batch` — extraction review flow. All entries
/// are validated before any is inserted, so a bad row rejects the
/// whole batch rather than leaving a partial one.
pub async fn create_batch(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Json(req): Json<BatchRequest>,
) -> Result<Json<BatchResponse>, ApiError> {
    let conn = ctx.core.open_db()?;

    let mut validated = Vec::with_capacity(req.medicines.len());
    for input in req.medicines {
        validated.push(input.into_medicine(user.user_id)?);
    }

    let mut created = Vec::with_capacity(validated.len());
    for medicine in validated {
        insert_medicine(&conn, &medicine)?;
        schedule_today(&ctx, &conn, &medicine)?;
        created.push(medicine);
    }

    tracing::info!(count = created.len(), "Batch medicine add");
    Ok(Json(BatchResponse { created }))
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

/// `DELETE /api/medicines/:id` — cascades dose logs and cancels any
/// live reminders for them.
pub async fn remove(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Path(medicine_id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let conn = ctx.core.open_db()?;

    let pending = pending_log_ids_for_medicine(&conn, &medicine_id)?;
    let deleted = delete_medicine(&conn, &user.user_id, &medicine_id)?;
    if !deleted {
        return Err(ApiError::NotFound("Medicine not found".into()));
    }

    for log_id in pending {
        ctx.core.reminders.cancel(&log_id);
        ctx.core.guard_forget(&log_id);
    }

    Ok(Json(DeleteResponse { deleted }))
}

fn add_one(
    ctx: &ApiContext,
    conn: &rusqlite::Connection,
    user: &UserContext,
    input: NewMedicine,
) -> Result<Medicine, ApiError> {
    let medicine = input.into_medicine(user.user_id)?;
    insert_medicine(conn, &medicine)?;
    schedule_today(ctx, conn, &medicine)?;
    tracing::info!(medicine = %medicine.name, "Medicine added");
    Ok(medicine)
}

/// Materialise today's logs for a fresh medicine and arm reminders.
fn schedule_today(
    ctx: &ApiContext,
    conn: &rusqlite::Connection,
    medicine: &Medicine,
) -> Result<(), ApiError> {
    let today = Utc::now().naive_utc().date();
    let created = generate_for_date(conn, medicine, today)?;
    for log in &created {
        ctx.core
            .reminders
            .schedule(log.id, log.user_id, &medicine.name, log.scheduled_utc());
    }
    Ok(())
}
