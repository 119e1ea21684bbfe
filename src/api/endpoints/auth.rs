//! Registration endpoint — provisions a profile and its bearer token.
//!
//! Stand-in for the external authentication collaborator: identity
//! lives elsewhere, this only mints the token the API validates.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{generate_token, hash_token, ApiContext};
use crate::db::repository::{insert_api_token, insert_profile};
use crate::models::Profile;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub caretaker_email: Option<String>,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    /// Returned exactly once; only its hash is stored.
    pub token: String,
}

/// `POST /auth/register`
pub async fn register(
    State(ctx): State<ApiContext>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Name is required".into()));
    }

    let conn = ctx.core.open_db()?;
    let user_id = Uuid::new_v4();
    insert_profile(
        &conn,
        &Profile {
            user_id,
            name: req.name.trim().to_string(),
            age: req.age,
            gender: req.gender,
            caretaker_email: req.caretaker_email,
            adherence_score: 100,
        },
    )?;

    let token = generate_token();
    insert_api_token(&conn, &user_id, &hash_token(&token), Some("web"))?;

    tracing::info!(%user_id, "Profile registered");
    Ok(Json(RegisterResponse { user_id, token }))
}
