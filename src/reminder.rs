//! Reminder scheduling — per-dose timers with a follow-up escalation.
//!
//! Each scheduled dose gets a primary timer for its wall-clock time and,
//! once that fires, a follow-up timer 10 minutes later. An unanswered
//! follow-up emits an ignored-dose event so the caretaker pipeline can
//! escalate. Timer state is in-memory only: on startup
//! `rebuild_pending` re-schedules every pending future dose from the
//! store, so a restart loses nothing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::db::repository::pending_logs_after;
use crate::db::DatabaseError;
use crate::notify::Notifier;

/// Escalation delay after the primary reminder fires.
pub const FOLLOW_UP_DELAY: Duration = Duration::from_secs(10 * 60);

/// Emitted when a follow-up reminder fires without the dose being
/// acted on. The receiver drives caretaker notification.
#[derive(Debug, Clone)]
pub struct IgnoredDose {
    pub dose_log_id: Uuid,
    pub user_id: Uuid,
    pub medicine_name: String,
    pub scheduled_time: DateTime<Utc>,
}

/// Live timers for one dose reminder.
struct ReminderEntry {
    primary: Option<JoinHandle<()>>,
    follow_up: Option<JoinHandle<()>>,
}

impl ReminderEntry {
    fn abort_all(&mut self) {
        if let Some(h) = self.primary.take() {
            h.abort();
        }
        if let Some(h) = self.follow_up.take() {
            h.abort();
        }
    }
}

/// Schedules, fires, and cancels dose reminders.
///
/// Cancellation is idempotent: cancelling a fired, cancelled, or
/// unknown reminder is a no-op.
pub struct ReminderScheduler {
    entries: Arc<Mutex<HashMap<Uuid, ReminderEntry>>>,
    notifier: Arc<dyn Notifier>,
    ignored_tx: mpsc::UnboundedSender<IgnoredDose>,
    follow_up_delay: Duration,
}

impl ReminderScheduler {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        ignored_tx: mpsc::UnboundedSender<IgnoredDose>,
    ) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            notifier,
            ignored_tx,
            follow_up_delay: FOLLOW_UP_DELAY,
        }
    }

    /// Shorten the escalation window — used by tests.
    #[cfg(test)]
    pub fn with_follow_up_delay(mut self, delay: Duration) -> Self {
        self.follow_up_delay = delay;
        self
    }

    /// Arrange a reminder for `dose_log_id` at `scheduled_time`.
    ///
    /// Past times are skipped silently — a reminder for a moment that
    /// already went by is meaningless. Re-scheduling an id replaces its
    /// existing timers.
    pub fn schedule(
        &self,
        dose_log_id: Uuid,
        user_id: Uuid,
        medicine_name: &str,
        scheduled_time: DateTime<Utc>,
    ) {
        let now = Utc::now();
        let Ok(delay) = (scheduled_time - now).to_std() else {
            tracing::debug!(dose_log = %dose_log_id, "Skipping past reminder");
            return;
        };

        let entries = Arc::clone(&self.entries);
        let notifier = Arc::clone(&self.notifier);
        let ignored_tx = self.ignored_tx.clone();
        let follow_up_delay = self.follow_up_delay;
        let name = medicine_name.to_string();

        let primary = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            notifier.notify(
                "Medicine Reminder",
                &format!("Time to take {name}!"),
                &format!("reminder-{dose_log_id}"),
            );

            // Escalate unless the user acts within the window
            let follow_up_notifier = Arc::clone(&notifier);
            let follow_up_name = name.clone();
            let follow_up = tokio::spawn(async move {
                tokio::time::sleep(follow_up_delay).await;

                follow_up_notifier.notify(
                    "Follow-up Reminder",
                    &format!("Don't forget to take {follow_up_name}!"),
                    &format!("followup-{dose_log_id}"),
                );

                let _ = ignored_tx.send(IgnoredDose {
                    dose_log_id,
                    user_id,
                    medicine_name: follow_up_name,
                    scheduled_time,
                });
            });

            if let Ok(mut map) = entries.lock() {
                match map.get_mut(&dose_log_id) {
                    Some(entry) => {
                        entry.primary = None;
                        entry.follow_up = Some(follow_up);
                    }
                    // Cancelled between the notify and this lock
                    None => follow_up.abort(),
                }
            }
        });

        let mut map = match self.entries.lock() {
            Ok(map) => map,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(mut old) = map.insert(
            dose_log_id,
            ReminderEntry {
                primary: Some(primary),
                follow_up: None,
            },
        ) {
            old.abort_all();
        }
    }

    /// Cancel both timers for a dose — called when the user acts.
    pub fn cancel(&self, dose_log_id: &Uuid) {
        let Ok(mut map) = self.entries.lock() else {
            return;
        };
        if let Some(mut entry) = map.remove(dose_log_id) {
            entry.abort_all();
        }
    }

    /// Cancel only the escalation, leaving the record of the primary
    /// reminder intact.
    pub fn cancel_follow_up(&self, dose_log_id: &Uuid) {
        let Ok(mut map) = self.entries.lock() else {
            return;
        };
        if let Some(entry) = map.get_mut(dose_log_id) {
            if let Some(h) = entry.follow_up.take() {
                h.abort();
            }
        }
    }

    /// Number of doses with live timer state.
    pub fn active_count(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    /// Re-schedule every pending future dose from the store.
    ///
    /// Timer state does not survive a restart; the pending dose logs
    /// do. Called once at startup. Returns how many reminders were
    /// rebuilt.
    pub fn rebuild_pending(&self, conn: &Connection) -> Result<usize, DatabaseError> {
        let now = Utc::now();
        let pending = pending_logs_after(conn, now.naive_utc())?;
        for item in &pending {
            self.schedule(
                item.log.id,
                item.log.user_id,
                &item.medicine_name,
                item.log.scheduled_utc(),
            );
        }
        tracing::info!(count = pending.len(), "Rebuilt pending reminders");
        Ok(pending.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::testing::RecordingNotifier;
    use chrono::Duration as ChronoDuration;

    fn scheduler(
        notifier: RecordingNotifier,
        follow_up: Duration,
    ) -> (ReminderScheduler, mpsc::UnboundedReceiver<IgnoredDose>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let s = ReminderScheduler::new(Arc::new(notifier), tx).with_follow_up_delay(follow_up);
        (s, rx)
    }

    #[tokio::test]
    async fn past_reminder_is_skipped() {
        let notifier = RecordingNotifier::new();
        let (s, _rx) = scheduler(notifier.clone(), Duration::from_millis(50));

        s.schedule(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Metformin",
            Utc::now() - ChronoDuration::minutes(5),
        );

        assert_eq!(s.active_count(), 0);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(notifier.count(), 0);
    }

    #[tokio::test]
    async fn primary_fires_then_follow_up_escalates() {
        let notifier = RecordingNotifier::new();
        let (s, mut rx) = scheduler(notifier.clone(), Duration::from_millis(50));
        let id = Uuid::new_v4();
        let user = Uuid::new_v4();

        s.schedule(id, user, "Metformin", Utc::now() + ChronoDuration::milliseconds(30));

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(notifier.count(), 2);
        let tags = notifier.tags();
        assert_eq!(tags[0], format!("reminder-{id}"));
        assert_eq!(tags[1], format!("followup-{id}"));

        let ignored = rx.try_recv().unwrap();
        assert_eq!(ignored.dose_log_id, id);
        assert_eq!(ignored.user_id, user);
        assert_eq!(ignored.medicine_name, "Metformin");
    }

    #[tokio::test]
    async fn cancel_before_fire_silences_everything() {
        let notifier = RecordingNotifier::new();
        let (s, mut rx) = scheduler(notifier.clone(), Duration::from_millis(30));
        let id = Uuid::new_v4();

        s.schedule(id, Uuid::new_v4(), "Metformin", Utc::now() + ChronoDuration::milliseconds(50));
        s.cancel(&id);

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(notifier.count(), 0);
        assert!(rx.try_recv().is_err());
        assert_eq!(s.active_count(), 0);
    }

    #[tokio::test]
    async fn acting_within_window_cancels_follow_up() {
        let notifier = RecordingNotifier::new();
        let (s, mut rx) = scheduler(notifier.clone(), Duration::from_millis(500));
        let id = Uuid::new_v4();

        s.schedule(id, Uuid::new_v4(), "Metformin", Utc::now() + ChronoDuration::milliseconds(30));

        // Wait for the primary, then act before the follow-up window ends
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(notifier.count(), 1);
        s.cancel(&id);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(notifier.count(), 1); // no follow-up
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn cancel_follow_up_only_keeps_primary_record() {
        let notifier = RecordingNotifier::new();
        let (s, mut rx) = scheduler(notifier.clone(), Duration::from_millis(500));
        let id = Uuid::new_v4();

        s.schedule(id, Uuid::new_v4(), "Metformin", Utc::now() + ChronoDuration::milliseconds(30));
        tokio::time::sleep(Duration::from_millis(150)).await;

        s.cancel_follow_up(&id);
        tokio::time::sleep(Duration::from_millis(600)).await;

        assert_eq!(notifier.count(), 1);
        assert!(rx.try_recv().is_err());
        // Entry remains until cancelled outright
        assert_eq!(s.active_count(), 1);
    }

    #[tokio::test]
    async fn cancellation_is_idempotent() {
        let notifier = RecordingNotifier::new();
        let (s, _rx) = scheduler(notifier, Duration::from_millis(30));
        let id = Uuid::new_v4();

        // Never scheduled — all no-ops
        s.cancel(&id);
        s.cancel_follow_up(&id);

        s.schedule(id, Uuid::new_v4(), "Metformin", Utc::now() + ChronoDuration::seconds(60));
        s.cancel(&id);
        s.cancel(&id);
        s.cancel_follow_up(&id);
        assert_eq!(s.active_count(), 0);
    }

    #[tokio::test]
    async fn rescheduling_replaces_existing_timers() {
        let notifier = RecordingNotifier::new();
        let (s, _rx) = scheduler(notifier.clone(), Duration::from_millis(200));
        let id = Uuid::new_v4();

        s.schedule(id, Uuid::new_v4(), "Metformin", Utc::now() + ChronoDuration::milliseconds(50));
        s.schedule(id, Uuid::new_v4(), "Metformin", Utc::now() + ChronoDuration::seconds(60));

        tokio::time::sleep(Duration::from_millis(200)).await;
        // First timer was replaced before it fired
        assert_eq!(notifier.count(), 0);
        assert_eq!(s.active_count(), 1);
    }

    #[tokio::test]
    async fn rebuild_schedules_future_pending_only() {
        use crate::db::repository::{
            insert_dose_log, insert_medicine, insert_profile, update_dose_outcome,
        };
        use crate::db::sqlite::open_memory_database;
        use crate::models::enums::{DoseStatus, TimeSlot};
        use crate::models::{DoseLog, NewMedicine, Profile};

        let conn = open_memory_database().unwrap();
        let user_id = Uuid::new_v4();
        insert_profile(
            &conn,
            &Profile {
                user_id,
                name: "Priya".into(),
                age: None,
                gender: None,
                caretaker_email: None,
                adherence_score: 100,
            },
        )
        .unwrap();
        let med = NewMedicine {
            name: "Metformin".into(),
            dosage: "500mg".into(),
            morning: true,
            morning_time: Some("08:00".into()),
            afternoon: false,
            afternoon_time: None,
            night: false,
            night_time: None,
            before_food: false,
            days_remaining: 30,
            start_date: chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        }
        .into_medicine(user_id)
        .unwrap();
        insert_medicine(&conn, &med).unwrap();

        let make_log = |when: DateTime<Utc>, slot: TimeSlot| DoseLog {
            id: Uuid::new_v4(),
            user_id,
            medicine_id: med.id,
            scheduled_time: when.naive_utc(),
            taken_time: None,
            status: DoseStatus::Pending,
            time_slot: slot,
            response_time_seconds: None,
        };

        let past = make_log(Utc::now() - ChronoDuration::hours(2), TimeSlot::Morning);
        let future = make_log(Utc::now() + ChronoDuration::hours(2), TimeSlot::Night);
        let resolved = make_log(Utc::now() + ChronoDuration::hours(5), TimeSlot::Afternoon);
        insert_dose_log(&conn, &past).unwrap();
        insert_dose_log(&conn, &future).unwrap();
        insert_dose_log(&conn, &resolved).unwrap();
        update_dose_outcome(&conn, &resolved.id, DoseStatus::Taken, None, None).unwrap();

        let notifier = RecordingNotifier::new();
        let (s, _rx) = scheduler(notifier, Duration::from_millis(30));
        let rebuilt = s.rebuild_pending(&conn).unwrap();

        assert_eq!(rebuilt, 1);
        assert_eq!(s.active_count(), 1);
    }
}
