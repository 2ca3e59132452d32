//! Machine state supplied by the host on every engine call

use serde::{Deserialize, Serialize};

use crate::types::{ElectionHash, UserRole};

/// Host-owned view of how the kiosk is configured
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineState {
    /// Hash of the configured election; `None` means the machine is unconfigured
    pub election_hash: Option<ElectionHash>,

    /// Roles the host accepts for this engine instance
    pub allowed_user_roles: Vec<UserRole>,

    /// Let election managers log in to a machine with no election configured
    pub allow_election_managers_on_unconfigured_machines: bool,

    /// Let election managers log in to a machine configured for a different election
    pub allow_election_managers_on_other_elections: bool,
}

impl Default for MachineState {
    fn default() -> Self {
        Self {
            election_hash: None,
            allowed_user_roles: UserRole::ALL.to_vec(),
            allow_election_managers_on_unconfigured_machines: true,
            allow_election_managers_on_other_elections: false,
        }
    }
}

impl MachineState {
    /// Machine configured for the given election
    pub fn configured(election_hash: ElectionHash) -> Self {
        Self {
            election_hash: Some(election_hash),
            ..Default::default()
        }
    }

    pub fn with_allowed_roles(mut self, roles: &[UserRole]) -> Self {
        self.allowed_user_roles = roles.to_vec();
        self
    }

    pub fn with_unconfigured_election_manager_access(mut self, allow: bool) -> Self {
        self.allow_election_managers_on_unconfigured_machines = allow;
        self
    }

    pub fn with_other_election_manager_access(mut self, allow: bool) -> Self {
        self.allow_election_managers_on_other_elections = allow;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.election_hash.is_some()
    }

    pub fn allows_role(&self, role: UserRole) -> bool {
        self.allowed_user_roles.contains(&role)
    }
}
