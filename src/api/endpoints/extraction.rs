//! Prescription analysis endpoint.
//!
//! Forwards the image to the extraction collaborator and returns the
//! cleaned candidate names. Failures map to distinct statuses so the
//! frontend can message each case and fall back to manual entry.

use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, UserContext};

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    pub image_base64: String,
}

#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub medicines: Vec<String>,
}

/// `POST /api/extraction/analyze`
pub async fn analyze(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<UserContext>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    if req.image_base64.trim().is_empty() {
        return Err(ApiError::BadRequest("No image provided".into()));
    }

    let medicines = ctx.core.analyzer.analyze(&req.image_base64).await?;
    Ok(Json(AnalyzeResponse { medicines }))
}
