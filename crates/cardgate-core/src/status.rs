//! Externally observable authentication status

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::card::ProgrammableCard;
use crate::types::UserRole;
use crate::user::User;

/// Why the machine is logged out
///
/// Each reason maps to a distinct host screen; two different failures never
/// share a reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoggedOutReason {
    /// Inserted-card idle: no card in the reader
    NoCard,
    /// Dipped-card idle, or after log out / aborted PIN entry
    MachineLocked,
    /// Reader hardware or communication fault
    CardError,
    InvalidUserOnCard,
    UserRoleNotAllowed,
    MachineNotConfigured,
    ElectionManagerWrongElection,
    PollWorkerWrongElection,
}

impl LoggedOutReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoggedOutReason::NoCard => "no_card",
            LoggedOutReason::MachineLocked => "machine_locked",
            LoggedOutReason::CardError => "card_error",
            LoggedOutReason::InvalidUserOnCard => "invalid_user_on_card",
            LoggedOutReason::UserRoleNotAllowed => "user_role_not_allowed",
            LoggedOutReason::MachineNotConfigured => "machine_not_configured",
            LoggedOutReason::ElectionManagerWrongElection => "election_manager_wrong_election",
            LoggedOutReason::PollWorkerWrongElection => "poll_worker_wrong_election",
        }
    }

    /// Resting reasons that do not indicate a failed login
    pub fn is_idle(&self) -> bool {
        matches!(self, LoggedOutReason::NoCard | LoggedOutReason::MachineLocked)
    }
}

impl fmt::Display for LoggedOutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication status produced by an engine on every poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuthStatus {
    LoggedOut {
        reason: LoggedOutReason,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        card_user_role: Option<UserRole>,
    },
    CheckingPin {
        user: User,
        /// Most recent failed attempt, for the host's retry countdown
        #[serde(default, skip_serializing_if = "Option::is_none")]
        wrong_pin_entered_at: Option<DateTime<Utc>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        locked_out_until: Option<DateTime<Utc>>,
        #[serde(default)]
        incorrect_pin_attempts: u32,
    },
    /// Dipped mode only: correct PIN entered, waiting for the card to be withdrawn
    RemoveCard {
        user: User,
    },
    LoggedIn {
        user: User,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_expires_at: Option<DateTime<Utc>>,
        /// Dipped mode system administrators only
        #[serde(default, skip_serializing_if = "Option::is_none")]
        programmable_card: Option<ProgrammableCard>,
    },
}

impl AuthStatus {
    pub fn logged_out(reason: LoggedOutReason) -> Self {
        AuthStatus::LoggedOut {
            reason,
            card_user_role: None,
        }
    }

    pub fn checking_pin(user: User) -> Self {
        AuthStatus::CheckingPin {
            user,
            wrong_pin_entered_at: None,
            locked_out_until: None,
            incorrect_pin_attempts: 0,
        }
    }

    /// Tag name of the status, as serialized
    pub fn name(&self) -> &'static str {
        match self {
            AuthStatus::LoggedOut { .. } => "logged_out",
            AuthStatus::CheckingPin { .. } => "checking_pin",
            AuthStatus::RemoveCard { .. } => "remove_card",
            AuthStatus::LoggedIn { .. } => "logged_in",
        }
    }

    /// The seated or authenticated user, if any
    pub fn user(&self) -> Option<&User> {
        match self {
            AuthStatus::LoggedOut { .. } => None,
            AuthStatus::CheckingPin { user, .. }
            | AuthStatus::RemoveCard { user }
            | AuthStatus::LoggedIn { user, .. } => Some(user),
        }
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self, AuthStatus::LoggedIn { .. })
    }

    pub fn logged_out_reason(&self) -> Option<LoggedOutReason> {
        match self {
            AuthStatus::LoggedOut { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// Whether a logged-in session has passed its expiry at `now`
    pub fn is_session_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(
            self,
            AuthStatus::LoggedIn {
                session_expires_at: Some(expires_at),
                ..
            } if now >= *expires_at
        )
    }

    /// Whether PIN entry is currently locked out at `now`
    pub fn is_locked_out(&self, now: DateTime<Utc>) -> bool {
        matches!(
            self,
            AuthStatus::CheckingPin {
                locked_out_until: Some(until),
                ..
            } if now < *until
        )
    }
}
