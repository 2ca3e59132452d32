//! Operator identity decoded from a card

use serde::{Deserialize, Serialize};

use crate::types::{ElectionHash, Passcode, UserRole};

/// A card user, tagged by role
///
/// Each variant carries exactly the fields its role needs, so a decoded user
/// can never be missing its election binding or PIN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum User {
    SystemAdministrator {
        passcode: Passcode,
    },
    ElectionManager {
        election_hash: ElectionHash,
        passcode: Passcode,
    },
    PollWorker {
        election_hash: ElectionHash,
    },
}

impl User {
    pub fn role(&self) -> UserRole {
        match self {
            User::SystemAdministrator { .. } => UserRole::SystemAdministrator,
            User::ElectionManager { .. } => UserRole::ElectionManager,
            User::PollWorker { .. } => UserRole::PollWorker,
        }
    }

    /// PIN the user must enter, if the role is PIN-bearing
    pub fn passcode(&self) -> Option<&Passcode> {
        match self {
            User::SystemAdministrator { passcode } | User::ElectionManager { passcode, .. } => {
                Some(passcode)
            }
            User::PollWorker { .. } => None,
        }
    }

    /// Election this credential is bound to
    pub fn election_hash(&self) -> Option<&ElectionHash> {
        match self {
            User::SystemAdministrator { .. } => None,
            User::ElectionManager { election_hash, .. } | User::PollWorker { election_hash } => {
                Some(election_hash)
            }
        }
    }

    pub fn is_system_administrator(&self) -> bool {
        matches!(self, User::SystemAdministrator { .. })
    }
}
