//! Quick-confirm guard — catches reflexive double-taps on "taken".
//!
//! Two "mark taken" presses within 3 seconds on the same dose card look
//! like an accidental or reflexive tap, not real dose-taking. The guard
//! suspends the second press and demands a yes/no confirmation; a
//! confirmed press commits with status `suspected` (half credit), a
//! declined press changes nothing.
//!
//! The guard is a pure function of (previous action time, current
//! action time, threshold) over an explicit per-card session — no UI
//! state involved.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Presses closer together than this are suspicious.
pub const QUICK_CONFIRM_THRESHOLD_MS: i64 = 3000;

/// Guard state for one dose card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardState {
    Normal,
    AwaitingConfirmation,
}

/// What the caller should do with a "mark taken" press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Commit the action as a normal `taken`.
    Commit,
    /// Suspend the action and ask the user to confirm.
    NeedsConfirmation,
}

/// Outcome of resolving a pending confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// User confirmed — commit with status `suspected`.
    CommitSuspected,
    /// User declined — no state change.
    Discard,
    /// Nothing was awaiting confirmation.
    NotAwaiting,
}

/// Per-dose-card guard session. Created on the first action against a
/// card and kept for the lifetime of the client session.
#[derive(Debug, Clone, Copy, Default)]
pub struct CardSession {
    state: Option<GuardState>,
    last_action_at: Option<DateTime<Utc>>,
}

impl CardSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GuardState {
        self.state.unwrap_or(GuardState::Normal)
    }

    /// Register a "mark taken" press at `now`.
    ///
    /// Below-threshold spacing since the previous press flips the card
    /// to awaiting-confirmation; otherwise the press commits. Either
    /// way the press becomes the new previous-action instant.
    pub fn register_taken(&mut self, now: DateTime<Utc>) -> GuardDecision {
        let decision = match self.last_action_at {
            Some(prev)
                if (now - prev).num_milliseconds() < QUICK_CONFIRM_THRESHOLD_MS =>
            {
                self.state = Some(GuardState::AwaitingConfirmation);
                GuardDecision::NeedsConfirmation
            }
            _ => {
                self.state = Some(GuardState::Normal);
                GuardDecision::Commit
            }
        };
        self.last_action_at = Some(now);
        decision
    }

    /// Resolve a pending confirmation prompt.
    pub fn resolve(&mut self, confirmed: bool) -> Resolution {
        if self.state() != GuardState::AwaitingConfirmation {
            return Resolution::NotAwaiting;
        }
        self.state = Some(GuardState::Normal);
        if confirmed {
            Resolution::CommitSuspected
        } else {
            Resolution::Discard
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_740_000_000_000 + ms).unwrap()
    }

    #[test]
    fn first_press_commits() {
        let mut card = CardSession::new();
        assert_eq!(card.register_taken(t(0)), GuardDecision::Commit);
        assert_eq!(card.state(), GuardState::Normal);
    }

    #[test]
    fn rapid_second_press_needs_confirmation() {
        let mut card = CardSession::new();
        card.register_taken(t(0));
        assert_eq!(card.register_taken(t(1500)), GuardDecision::NeedsConfirmation);
        assert_eq!(card.state(), GuardState::AwaitingConfirmation);
    }

    #[test]
    fn slow_second_press_commits() {
        let mut card = CardSession::new();
        card.register_taken(t(0));
        assert_eq!(card.register_taken(t(5000)), GuardDecision::Commit);
        assert_eq!(card.state(), GuardState::Normal);
    }

    #[test]
    fn threshold_boundary_is_exclusive() {
        let mut card = CardSession::new();
        card.register_taken(t(0));
        // Exactly at the threshold is no longer "too fast"
        assert_eq!(card.register_taken(t(3000)), GuardDecision::Commit);

        let mut card = CardSession::new();
        card.register_taken(t(0));
        assert_eq!(card.register_taken(t(2999)), GuardDecision::NeedsConfirmation);
    }

    #[test]
    fn confirm_commits_as_suspected() {
        let mut card = CardSession::new();
        card.register_taken(t(0));
        card.register_taken(t(1000));
        assert_eq!(card.resolve(true), Resolution::CommitSuspected);
        assert_eq!(card.state(), GuardState::Normal);
    }

    #[test]
    fn decline_discards_and_returns_to_normal() {
        let mut card = CardSession::new();
        card.register_taken(t(0));
        card.register_taken(t(1000));
        assert_eq!(card.resolve(false), Resolution::Discard);
        assert_eq!(card.state(), GuardState::Normal);
    }

    #[test]
    fn resolve_without_prompt_is_not_awaiting() {
        let mut card = CardSession::new();
        assert_eq!(card.resolve(true), Resolution::NotAwaiting);
        card.register_taken(t(0));
        assert_eq!(card.resolve(true), Resolution::NotAwaiting);
    }

    #[test]
    fn suspended_press_still_updates_previous_instant() {
        let mut card = CardSession::new();
        card.register_taken(t(0));
        card.register_taken(t(1000)); // prompt
        card.resolve(false); // declined
        // A third press 1s after the second is measured against the
        // second press, not the first
        assert_eq!(card.register_taken(t(2000)), GuardDecision::NeedsConfirmation);
    }
}
