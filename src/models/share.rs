use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A caretaker sharing link: a token-addressed, revocable grant of
/// read-only access to a patient's adherence snapshot. The token is the
/// only credential a caretaker needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaretakerShare {
    pub id: Uuid,
    pub patient_user_id: Uuid,
    pub share_token: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}
