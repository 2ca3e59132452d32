//! Card reader snapshots

use serde::{Deserialize, Serialize};

use crate::codec::decode_user;
use crate::user::User;

/// Polled snapshot of the physical card reader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CardSummary {
    /// No card in the reader
    NoCard,
    /// Reader or card communication fault
    Error,
    /// A card is seated and its short payload was read
    Ready {
        short_value: Option<String>,
        long_value_present: bool,
    },
}

impl CardSummary {
    pub fn ready(short_value: Option<String>, long_value_present: bool) -> Self {
        CardSummary::Ready {
            short_value,
            long_value_present,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, CardSummary::Ready { .. })
    }

    pub fn short_value(&self) -> Option<&str> {
        match self {
            CardSummary::Ready { short_value, .. } => short_value.as_deref(),
            CardSummary::NoCard | CardSummary::Error => None,
        }
    }
}

/// The auxiliary card a logged-in system administrator may program
///
/// Mirrors the reader independently of the authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProgrammableCard {
    NoCard,
    Error,
    Ready {
        /// User the card would authenticate as (not validated against the machine)
        programmed_user: Option<User>,
        has_stored_data: bool,
    },
}

impl ProgrammableCard {
    pub fn from_summary(summary: &CardSummary) -> Self {
        match summary {
            CardSummary::NoCard => ProgrammableCard::NoCard,
            CardSummary::Error => ProgrammableCard::Error,
            CardSummary::Ready {
                short_value,
                long_value_present,
            } => ProgrammableCard::Ready {
                programmed_user: decode_user(short_value.as_deref()),
                has_stored_data: *long_value_present,
            },
        }
    }

    pub fn programmed_user(&self) -> Option<&User> {
        match self {
            ProgrammableCard::Ready {
                programmed_user, ..
            } => programmed_user.as_ref(),
            ProgrammableCard::NoCard | ProgrammableCard::Error => None,
        }
    }
}
