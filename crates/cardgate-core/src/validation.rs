//! Role and election validation shared by both auth engines
//!
//! Checks run in a fixed order and the first failure wins, so a card whose
//! role is disallowed always reports `UserRoleNotAllowed` even if its election
//! binding is also wrong.

use crate::machine::MachineState;
use crate::status::LoggedOutReason;
use crate::types::UserRole;
use crate::user::User;

/// Roles a dipped-card engine can ever accept
pub const DIPPED_CARD_ROLES: &[UserRole] =
    &[UserRole::SystemAdministrator, UserRole::ElectionManager];

/// Roles an inserted-card engine can ever accept
pub const INSERTED_CARD_ROLES: &[UserRole] = &UserRole::ALL;

/// Validate a decoded card user against the machine
///
/// `engine_roles` is the engine's own role ceiling; a role must appear both
/// there and in `machine_state.allowed_user_roles`.
pub fn validate_card_user(
    user: Option<&User>,
    machine_state: &MachineState,
    engine_roles: &[UserRole],
) -> Result<(), LoggedOutReason> {
    let user = user.ok_or(LoggedOutReason::InvalidUserOnCard)?;
    let role = user.role();

    if !engine_roles.contains(&role) || !machine_state.allows_role(role) {
        return Err(LoggedOutReason::UserRoleNotAllowed);
    }

    match user {
        User::SystemAdministrator { .. } => Ok(()),
        User::ElectionManager { election_hash, .. } => match &machine_state.election_hash {
            None if machine_state.allow_election_managers_on_unconfigured_machines => Ok(()),
            None => Err(LoggedOutReason::MachineNotConfigured),
            Some(configured)
                if configured != election_hash
                    && !machine_state.allow_election_managers_on_other_elections =>
            {
                Err(LoggedOutReason::ElectionManagerWrongElection)
            }
            Some(_) => Ok(()),
        },
        User::PollWorker { election_hash } => match &machine_state.election_hash {
            None => Err(LoggedOutReason::MachineNotConfigured),
            Some(configured) if configured != election_hash => {
                Err(LoggedOutReason::PollWorkerWrongElection)
            }
            Some(_) => Ok(()),
        },
    }
}
