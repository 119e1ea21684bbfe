use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The owning user's profile. Identity comes from the external auth
/// layer; this record carries display data and the caretaker contact.
///
/// `adherence_score` is a cached snapshot — always recomputable from
/// dose-log history, refreshed after every dose resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub name: String,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub caretaker_email: Option<String>,
    pub adherence_score: u8,
}

/// Mutable profile fields accepted from the settings screen.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUpdate {
    pub name: String,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub caretaker_email: Option<String>,
}
