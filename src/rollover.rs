//! Daily rollover — periodic background materialisation.
//!
//! Every 15 minutes: make sure today's dose logs exist for every
//! medicine with supply left, schedule reminders for the logs just
//! created, decrement each medicine's remaining-days counter once per
//! materialised day, and (when configured) sweep long-overdue pending
//! doses to `missed`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, NaiveDateTime, Utc};
use tokio::sync::oneshot;

use crate::core_state::CoreState;
use crate::db::repository::{decrement_days_remaining, expire_pending_before, list_medicines_with_supply};
use crate::db::DatabaseError;
use crate::schedule::generate_for_date;

/// Check interval: every 15 minutes.
pub const CHECK_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// What one rollover pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RolloverStats {
    pub logs_created: usize,
    pub medicines_materialised: usize,
    pub logs_expired: usize,
}

/// Handle for the rollover task. Supports graceful shutdown via
/// `shutdown()` or automatic cleanup on `Drop`.
pub struct RolloverHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl RolloverHandle {
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for RolloverHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Start the rollover task. Runs one pass immediately, then every
/// `CHECK_INTERVAL` until shut down.
pub fn start_rollover(core: Arc<CoreState>, auto_expire_hours: Option<i64>) -> RolloverHandle {
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        tracing::info!(
            interval_secs = CHECK_INTERVAL.as_secs(),
            "Rollover task started"
        );
        loop {
            match run_once(&core, Utc::now().naive_utc(), auto_expire_hours) {
                Ok(stats) if stats != RolloverStats::default() => {
                    tracing::info!(
                        created = stats.logs_created,
                        expired = stats.logs_expired,
                        "Rollover pass"
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Rollover pass failed"),
            }

            tokio::select! {
                _ = tokio::time::sleep(CHECK_INTERVAL) => {}
                _ = &mut shutdown_rx => {
                    tracing::info!("Rollover task shutting down");
                    return;
                }
            }
        }
    });

    RolloverHandle {
        shutdown_tx: Some(shutdown_tx),
    }
}

/// One rollover pass at `now`. Factored out for tests.
pub fn run_once(
    core: &CoreState,
    now: NaiveDateTime,
    auto_expire_hours: Option<i64>,
) -> Result<RolloverStats, DatabaseError> {
    let conn = core.open_db()?;
    let today = now.date();
    let mut stats = RolloverStats::default();

    for medicine in list_medicines_with_supply(&conn)? {
        let created = generate_for_date(&conn, &medicine, today)?;
        if created.is_empty() {
            continue;
        }
        // First materialisation of this day consumes one supply day
        decrement_days_remaining(&conn, &medicine.id)?;
        stats.medicines_materialised += 1;
        stats.logs_created += created.len();

        for log in &created {
            core.reminders.schedule(
                log.id,
                log.user_id,
                &medicine.name,
                log.scheduled_utc(),
            );
        }
    }

    if let Some(hours) = auto_expire_hours {
        let cutoff = now - ChronoDuration::hours(hours);
        stats.logs_expired = expire_pending_before(&conn, cutoff)?;
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_state::testing::test_core;
    use crate::db::repository::{
        get_medicine, insert_medicine, insert_profile, logs_for_day,
    };
    use crate::models::{NewMedicine, Profile};
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn seed_medicine(core: &CoreState, days: i32, morning_time: &str) -> (Uuid, Uuid) {
        let conn = core.open_db().unwrap();
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
            morning_time: Some(morning_time.into()),
            afternoon: false,
            afternoon_time: None,
            night: false,
            night_time: None,
            before_food: false,
            days_remaining: days,
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        }
        .into_medicine(user_id)
        .unwrap();
        insert_medicine(&conn, &med).unwrap();
        (user_id, med.id)
    }

    fn noon(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn pass_materialises_and_decrements_once_per_day() {
        let t = test_core();
        let (user_id, med_id) = seed_medicine(&t.core, 10, "08:00");

        let first = run_once(&t.core, noon(1), None).unwrap();
        assert_eq!(first.logs_created, 1);
        assert_eq!(first.medicines_materialised, 1);

        // Re-running the same day creates nothing and spends nothing
        let second = run_once(&t.core, noon(1), None).unwrap();
        assert_eq!(second.logs_created, 0);
        assert_eq!(second.medicines_materialised, 0);

        let conn = t.core.open_db().unwrap();
        let med = get_medicine(&conn, &med_id).unwrap().unwrap();
        assert_eq!(med.days_remaining, 9);

        let logs = logs_for_day(&conn, &user_id, noon(1).date()).unwrap();
        assert_eq!(logs.len(), 1);
    }

    #[tokio::test]
    async fn next_day_spends_another_supply_day() {
        let t = test_core();
        let (_, med_id) = seed_medicine(&t.core, 2, "08:00");

        run_once(&t.core, noon(1), None).unwrap();
        run_once(&t.core, noon(2), None).unwrap();
        // Supply exhausted — day 3 creates nothing
        let third = run_once(&t.core, noon(3), None).unwrap();
        assert_eq!(third.logs_created, 0);

        let conn = t.core.open_db().unwrap();
        assert_eq!(
            get_medicine(&conn, &med_id).unwrap().unwrap().days_remaining,
            0
        );
    }

    #[tokio::test]
    async fn overdue_pending_doses_expire_when_configured() {
        let t = test_core();
        let (user_id, _) = seed_medicine(&t.core, 10, "08:00");

        run_once(&t.core, noon(1), None).unwrap();
        // Next day, 28h after the 08:00 dose: sweep with a 12h grace
        let stats = run_once(&t.core, noon(2), Some(12)).unwrap();
        assert_eq!(stats.logs_expired, 1);

        let conn = t.core.open_db().unwrap();
        let logs = logs_for_day(&conn, &user_id, noon(1).date()).unwrap();
        assert_eq!(
            logs[0].status,
            crate::models::enums::DoseStatus::Missed
        );
    }

    #[tokio::test]
    async fn expiry_disabled_leaves_pending_alone() {
        let t = test_core();
        let (user_id, _) = seed_medicine(&t.core, 10, "08:00");

        run_once(&t.core, noon(1), None).unwrap();
        let stats = run_once(&t.core, noon(2), None).unwrap();
        assert_eq!(stats.logs_expired, 0);

        let conn = t.core.open_db().unwrap();
        let logs = logs_for_day(&conn, &user_id, noon(1).date()).unwrap();
        assert_eq!(
            logs[0].status,
            crate::models::enums::DoseStatus::Pending
        );
    }

    #[tokio::test]
    async fn future_slot_gets_a_reminder() {
        let t = test_core();
        // Schedule far in the future so the timer is live when we check
        let (_, _) = seed_medicine(&t.core, 10, "23:59");
        let now = Utc::now().naive_utc();
        // Only meaningful when the slot is still ahead of wall clock
        if now.format("%H:%M").to_string().as_str() < "23:59" {
            run_once(&t.core, now, None).unwrap();
            assert_eq!(t.core.reminders.active_count(), 1);
        }
    }
}
