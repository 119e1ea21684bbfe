//! Transport-agnostic application state.
//!
//! `CoreState` is the single shared state behind the HTTP API and the
//! background tasks. SQLite connections are opened per operation; the
//! reminder scheduler and guard sessions are in-memory and rebuilt or
//! recreated on restart.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use crate::caretaker::CaretakerMailer;
use crate::config::AppConfig;
use crate::db::{self, DatabaseError};
use crate::extraction::PrescriptionAnalyzer;
use crate::guard::{CardSession, GuardDecision, Resolution};
use crate::reminder::ReminderScheduler;

pub struct CoreState {
    database_path: PathBuf,
    pub reminders: ReminderScheduler,
    pub mailer: CaretakerMailer,
    pub analyzer: PrescriptionAnalyzer,
    /// Quick-confirm sessions, one per dose card the user has acted on.
    /// Client-session-scoped state: cleared on restart by construction.
    guard_sessions: Mutex<HashMap<Uuid, CardSession>>,
}

impl CoreState {
    pub fn new(config: &AppConfig, reminders: ReminderScheduler) -> Self {
        Self {
            database_path: config.database_path.clone(),
            reminders,
            mailer: CaretakerMailer::new(config.email_api_key.clone(), config.mail_from.clone()),
            analyzer: PrescriptionAnalyzer::new(config.gateway_api_key.clone()),
            guard_sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Open a connection to the application database. Migrations are
    /// versioned and re-running them is a no-op.
    pub fn open_db(&self) -> Result<Connection, DatabaseError> {
        db::sqlite::open_database(&self.database_path)
    }

    // ── Quick-confirm guard sessions ────────────────────────

    /// Run a "mark taken" press through the card's guard session.
    pub fn guard_register_taken(&self, dose_log_id: Uuid, now: DateTime<Utc>) -> GuardDecision {
        let mut sessions = match self.guard_sessions.lock() {
            Ok(s) => s,
            Err(poisoned) => poisoned.into_inner(),
        };
        sessions
            .entry(dose_log_id)
            .or_insert_with(CardSession::new)
            .register_taken(now)
    }

    /// Resolve a pending confirmation for a card.
    pub fn guard_resolve(&self, dose_log_id: &Uuid, confirmed: bool) -> Resolution {
        let mut sessions = match self.guard_sessions.lock() {
            Ok(s) => s,
            Err(poisoned) => poisoned.into_inner(),
        };
        match sessions.get_mut(dose_log_id) {
            Some(card) => card.resolve(confirmed),
            None => Resolution::NotAwaiting,
        }
    }

    /// Drop guard state for a card — called once its log is terminal.
    pub fn guard_forget(&self, dose_log_id: &Uuid) {
        if let Ok(mut sessions) = self.guard_sessions.lock() {
            sessions.remove(dose_log_id);
        }
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::Arc;

    use tempfile::TempDir;
    use tokio::sync::mpsc;

    use super::*;
    use crate::notify::testing::RecordingNotifier;
    use crate::reminder::IgnoredDose;

    /// A `CoreState` over a throwaway on-disk database, plus the pieces
    /// tests assert against.
    pub struct TestCore {
        pub core: Arc<CoreState>,
        pub notifier: RecordingNotifier,
        pub ignored_rx: mpsc::UnboundedReceiver<IgnoredDose>,
        _dir: TempDir,
    }

    pub fn test_core() -> TestCore {
        let dir = TempDir::new().expect("tempdir");
        let config = AppConfig {
            database_path: dir.path().join("test.db"),
            listen_addr: ([127, 0, 0, 1], 0).into(),
            email_api_key: None,
            mail_from: "DoseWise <test@example.com>".into(),
            gateway_api_key: None,
            auto_expire_hours: Some(12),
        };
        let notifier = RecordingNotifier::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let reminders = ReminderScheduler::new(Arc::new(notifier.clone()), tx);
        TestCore {
            core: Arc::new(CoreState::new(&config, reminders)),
            notifier,
            ignored_rx: rx,
            _dir: dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::test_core;
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn open_db_is_migrated_and_reusable() {
        let t = test_core();
        let conn = t.core.open_db().unwrap();
        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 1);

        // A second open sees the same database
        drop(conn);
        assert!(t.core.open_db().is_ok());
    }

    #[tokio::test]
    async fn guard_sessions_are_per_card() {
        let t = test_core();
        let card_a = Uuid::new_v4();
        let card_b = Uuid::new_v4();
        let now = Utc::now();

        assert_eq!(
            t.core.guard_register_taken(card_a, now),
            GuardDecision::Commit
        );
        // Rapid press on a *different* card is its own first press
        assert_eq!(
            t.core
                .guard_register_taken(card_b, now + Duration::milliseconds(500)),
            GuardDecision::Commit
        );
        // Rapid second press on the same card prompts
        assert_eq!(
            t.core
                .guard_register_taken(card_a, now + Duration::milliseconds(1500)),
            GuardDecision::NeedsConfirmation
        );
    }

    #[tokio::test]
    async fn guard_forget_resets_history() {
        let t = test_core();
        let card = Uuid::new_v4();
        let now = Utc::now();

        t.core.guard_register_taken(card, now);
        t.core.guard_forget(&card);
        assert_eq!(
            t.core
                .guard_register_taken(card, now + Duration::milliseconds(100)),
            GuardDecision::Commit
        );
    }

    #[tokio::test]
    async fn resolve_unknown_card_is_not_awaiting() {
        let t = test_core();
        assert_eq!(
            t.core.guard_resolve(&Uuid::new_v4(), true),
            Resolution::NotAwaiting
        );
    }
}
