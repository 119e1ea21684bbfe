//! Caretaker email collaborator.
//!
//! Missed-dose alerts and weekly adherence reports go out through a
//! Resend-compatible HTTP email API. Both sends no-op silently when the
//! patient has no caretaker email configured or the process has no API
//! key — a missing caretaker is a normal state, not an error.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::adherence::WeeklySummary;
use crate::models::enums::NotificationKind;
use crate::models::Profile;

const EMAIL_ENDPOINT: &str = "https://api.resend.com/emails";

#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    #[error("Email request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Email API returned {status}: {body}")]
    Api { status: u16, body: String },
}

#[derive(Serialize)]
struct EmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: String,
    html: String,
}

/// Outbound caretaker notifications.
pub struct CaretakerMailer {
    client: reqwest::Client,
    api_key: Option<String>,
    from: String,
    endpoint: String,
}

impl CaretakerMailer {
    pub fn new(api_key: Option<String>, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            from,
            endpoint: EMAIL_ENDPOINT.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Whether a send would actually go out for this patient.
    pub fn can_notify(&self, profile: &Profile) -> bool {
        self.api_key.is_some()
            && profile
                .caretaker_email
                .as_deref()
                .is_some_and(|e| !e.trim().is_empty())
    }

    /// Alert the caretaker that a dose was missed.
    pub async fn send_missed_dose(
        &self,
        profile: &Profile,
        medicine_name: &str,
        scheduled_time: DateTime<Utc>,
    ) -> Result<(), MailerError> {
        let Some((api_key, to)) = self.credentials(profile) else {
            tracing::debug!(kind = %NotificationKind::MissedDose.as_str(), "No caretaker configured, skipping email");
            return Ok(());
        };

        let formatted_time = scheduled_time.format("%-I:%M %p").to_string();
        let subject = format!("Missed Dose Alert: {}", profile.name);
        let html = missed_dose_html(&profile.name, medicine_name, &formatted_time);

        self.send(api_key, to, subject, html).await?;
        tracing::info!(patient = %profile.name, medicine = %medicine_name, "Missed-dose email sent");
        Ok(())
    }

    /// Send the weekly adherence report.
    pub async fn send_weekly_report(
        &self,
        profile: &Profile,
        summary: &WeeklySummary,
    ) -> Result<(), MailerError> {
        let Some((api_key, to)) = self.credentials(profile) else {
            tracing::debug!(kind = %NotificationKind::WeeklyReport.as_str(), "No caretaker configured, skipping email");
            return Ok(());
        };

        let subject = format!("Weekly Report: {}'s Medication Adherence", profile.name);
        let html = weekly_report_html(&profile.name, summary);

        self.send(api_key, to, subject, html).await?;
        tracing::info!(patient = %profile.name, score = summary.score, "Weekly report email sent");
        Ok(())
    }

    fn credentials<'a>(&'a self, profile: &'a Profile) -> Option<(&'a str, &'a str)> {
        let api_key = self.api_key.as_deref()?;
        let to = profile
            .caretaker_email
            .as_deref()
            .filter(|e| !e.trim().is_empty())?;
        Some((api_key, to))
    }

    async fn send(
        &self,
        api_key: &str,
        to: &str,
        subject: String,
        html: String,
    ) -> Result<(), MailerError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&EmailRequest {
                from: &self.from,
                to: vec![to],
                subject,
                html,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailerError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// Bridge ignored-reminder events into caretaker email.
///
/// Consumes `IgnoredDose` events from the reminder scheduler. The dose
/// is re-checked against the store first: a dose the user resolved
/// right after the escalation fired should not alarm anyone.
pub fn spawn_escalation_forwarder(
    core: std::sync::Arc<crate::core_state::CoreState>,
    mut ignored_rx: tokio::sync::mpsc::UnboundedReceiver<crate::reminder::IgnoredDose>,
) -> tokio::task::JoinHandle<()> {
    use crate::db::repository::{get_dose_log, get_profile};

    tokio::spawn(async move {
        while let Some(ignored) = ignored_rx.recv().await {
            let profile = {
                let conn = match core.open_db() {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::warn!(error = %e, "Escalation db open failed");
                        continue;
                    }
                };

                let still_pending = get_dose_log(&conn, &ignored.dose_log_id)
                    .ok()
                    .flatten()
                    .map(|l| !l.status.is_terminal())
                    .unwrap_or(false);
                if !still_pending {
                    continue;
                }

                match get_profile(&conn, &ignored.user_id) {
                    Ok(Some(p)) => p,
                    Ok(None) => continue,
                    Err(e) => {
                        tracing::warn!(error = %e, "Escalation profile lookup failed");
                        continue;
                    }
                }
            };

            if let Err(e) = core
                .mailer
                .send_missed_dose(&profile, &ignored.medicine_name, ignored.scheduled_time)
                .await
            {
                tracing::warn!(error = %e, "Escalation email failed");
            }
        }
    })
}

fn missed_dose_html(patient_name: &str, medicine_name: &str, formatted_time: &str) -> String {
    format!(
        "<div style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;\">\
           <h1>Missed Dose Alert</h1>\
           <h2>{patient_name} missed their medication</h2>\
           <p><strong>Medicine:</strong> {medicine_name}<br>\
              <strong>Scheduled Time:</strong> {formatted_time}</p>\
           <p>Please check in with them to ensure they take their medication.</p>\
         </div>"
    )
}

fn weekly_report_html(patient_name: &str, summary: &WeeklySummary) -> String {
    let encouragement = if summary.score >= 80 {
        "Great job! Keep up the excellent work!"
    } else if summary.score >= 50 {
        "There's room for improvement. Consider checking in more often."
    } else {
        "Please check in with them regularly to help improve adherence."
    };
    format!(
        "<div style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;\">\
           <h1>Weekly Adherence Report</h1>\
           <h2>{patient_name}'s Progress</h2>\
           <p style=\"font-size: 48px; font-weight: bold;\">{score}%</p>\
           <p>Doses taken: {taken} &middot; Doses missed: {missed} &middot; Total: {total}</p>\
           <p>{encouragement}</p>\
         </div>",
        score = summary.score,
        taken = summary.taken,
        missed = summary.missed,
        total = summary.total,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(caretaker: Option<&str>) -> Profile {
        Profile {
            user_id: uuid::Uuid::new_v4(),
            name: "Priya".into(),
            age: None,
            gender: None,
            caretaker_email: caretaker.map(String::from),
            adherence_score: 100,
        }
    }

    fn summary(score: u8) -> WeeklySummary {
        WeeklySummary {
            score,
            taken: 10,
            missed: 2,
            total: 14,
            streak: 3,
        }
    }

    #[test]
    fn can_notify_requires_key_and_address() {
        let with_key = CaretakerMailer::new(Some("key".into()), "DoseWise <r@example.com>".into());
        assert!(with_key.can_notify(&profile(Some("son@example.com"))));
        assert!(!with_key.can_notify(&profile(None)));
        assert!(!with_key.can_notify(&profile(Some("  "))));

        let keyless = CaretakerMailer::new(None, "DoseWise <r@example.com>".into());
        assert!(!keyless.can_notify(&profile(Some("son@example.com"))));
    }

    #[tokio::test]
    async fn missing_caretaker_is_silent_success() {
        let mailer = CaretakerMailer::new(Some("key".into()), "DoseWise <r@example.com>".into());
        let result = mailer
            .send_missed_dose(&profile(None), "Metformin", Utc::now())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn missing_api_key_is_silent_success() {
        let mailer = CaretakerMailer::new(None, "DoseWise <r@example.com>".into());
        let result = mailer
            .send_weekly_report(&profile(Some("son@example.com")), &summary(85))
            .await;
        assert!(result.is_ok());
    }

    #[test]
    fn missed_dose_body_names_medicine_and_time() {
        let html = missed_dose_html("Priya", "Metformin", "8:00 AM");
        assert!(html.contains("Priya missed their medication"));
        assert!(html.contains("Metformin"));
        assert!(html.contains("8:00 AM"));
    }

    #[test]
    fn weekly_body_tiers_encouragement_by_score() {
        assert!(weekly_report_html("Priya", &summary(90)).contains("Great job"));
        assert!(weekly_report_html("Priya", &summary(60)).contains("room for improvement"));
        assert!(weekly_report_html("Priya", &summary(30)).contains("check in with them regularly"));
    }
}
