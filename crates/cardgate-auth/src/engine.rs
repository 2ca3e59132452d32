//! Transition helpers shared by both engines

use cardgate_core::{AuthStatus, CardSummary, LockoutPolicy, LoggedOutReason, User};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::reader::CardReader;

/// Input fed to an engine's transition function
///
/// `LogOut` is only ever issued by the dipped engine.
#[derive(Debug)]
pub(crate) enum AuthAction<'a> {
    CheckCardReader(CardSummary),
    CheckPin(&'a str),
    LogOut,
    UpdateSessionExpiry(DateTime<Utc>),
}

/// Wrong-PIN bookkeeping for one card user
#[derive(Debug, Clone, PartialEq)]
struct PinAttemptRecord {
    user: User,
    incorrect_pin_attempts: u32,
    wrong_pin_entered_at: Option<DateTime<Utc>>,
    locked_out_until: Option<DateTime<Utc>>,
}

/// Wrong-PIN counters that outlive the `CheckingPin` status
///
/// Records are keyed by the decoded card user, so pulling and re-seating a
/// card resumes its count and any running lockout. A correct PIN clears the
/// record.
#[derive(Debug, Default)]
pub(crate) struct PinAttempts {
    records: Vec<PinAttemptRecord>,
}

impl PinAttempts {
    /// `CheckingPin` for `user`, carrying over any recorded failures
    pub(crate) fn checking_pin(&self, user: User) -> AuthStatus {
        match self.records.iter().find(|record| record.user == user) {
            Some(record) => AuthStatus::CheckingPin {
                user,
                wrong_pin_entered_at: record.wrong_pin_entered_at,
                locked_out_until: record.locked_out_until,
                incorrect_pin_attempts: record.incorrect_pin_attempts,
            },
            None => AuthStatus::checking_pin(user),
        }
    }

    /// Record the counters carried by a freshly applied status
    pub(crate) fn observe(&mut self, status: &AuthStatus) {
        match status {
            AuthStatus::CheckingPin {
                user,
                wrong_pin_entered_at,
                locked_out_until,
                incorrect_pin_attempts,
            } if *incorrect_pin_attempts > 0 => {
                let record = PinAttemptRecord {
                    user: user.clone(),
                    incorrect_pin_attempts: *incorrect_pin_attempts,
                    wrong_pin_entered_at: *wrong_pin_entered_at,
                    locked_out_until: *locked_out_until,
                };
                match self.records.iter_mut().find(|r| r.user == *user) {
                    Some(existing) => *existing = record,
                    None => self.records.push(record),
                }
            }
            AuthStatus::RemoveCard { user } | AuthStatus::LoggedIn { user, .. } => {
                self.records.retain(|record| record.user != *user);
            }
            _ => {}
        }
    }
}

/// Poll the reader, mapping adapter failures to the reader error summary
pub(crate) async fn read_summary_or_error<R: CardReader + ?Sized>(card: &R) -> CardSummary {
    match card.read_summary().await {
        Ok(summary) => summary,
        Err(e) => {
            warn!("Card reader poll failed: {}", e);
            CardSummary::Error
        }
    }
}

/// Collapse an expired session to the engine's idle status
pub(crate) fn expire_session(
    status: &AuthStatus,
    now: DateTime<Utc>,
    idle: LoggedOutReason,
) -> Option<AuthStatus> {
    if status.is_session_expired(now) {
        info!(reason = %idle, "Session expired");
        Some(AuthStatus::logged_out(idle))
    } else {
        None
    }
}

/// Apply a PIN attempt to a `CheckingPin` status
///
/// Returns `None` when the status is not `CheckingPin` or PIN entry is locked
/// out. A correct PIN yields `on_correct(user)`.
pub(crate) fn check_pin_transition<F>(
    current: &AuthStatus,
    pin: &str,
    now: DateTime<Utc>,
    lockout: Option<&LockoutPolicy>,
    on_correct: F,
) -> Option<AuthStatus>
where
    F: FnOnce(User) -> AuthStatus,
{
    let AuthStatus::CheckingPin {
        user,
        incorrect_pin_attempts,
        ..
    } = current
    else {
        return None;
    };

    if current.is_locked_out(now) {
        info!(role = user.role().as_str(), "PIN entry ignored while locked out");
        return None;
    }

    if user.passcode().is_some_and(|passcode| passcode.matches(pin)) {
        return Some(on_correct(user.clone()));
    }

    let attempts = incorrect_pin_attempts.saturating_add(1);
    let locked_out_until = lockout
        .and_then(|policy| policy.lockout_duration(attempts))
        .and_then(|duration| chrono::Duration::from_std(duration).ok())
        .and_then(|duration| now.checked_add_signed(duration));

    Some(AuthStatus::CheckingPin {
        user: user.clone(),
        wrong_pin_entered_at: Some(now),
        locked_out_until,
        incorrect_pin_attempts: attempts,
    })
}

/// Status for a card that failed validation
pub(crate) fn rejected(reason: LoggedOutReason, user: Option<&User>) -> AuthStatus {
    AuthStatus::LoggedOut {
        reason,
        card_user_role: user.map(User::role),
    }
}
