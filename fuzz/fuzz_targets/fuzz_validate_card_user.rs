#![no_main]

use arbitrary::Arbitrary;
use cardgate_core::{
    decode_user, validate_card_user, ElectionHash, LoggedOutReason, MachineState, UserRole,
    DIPPED_CARD_ROLES, INSERTED_CARD_ROLES,
};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    short_value: Option<String>,
    machine_hash: Option<String>,
    allowed_roles: [bool; 3],
    allow_unconfigured: bool,
    allow_other_elections: bool,
    dipped: bool,
}

fuzz_target!(|input: Input| {
    let roles: Vec<UserRole> = UserRole::ALL
        .iter()
        .zip(input.allowed_roles)
        .filter(|(_, allowed)| *allowed)
        .map(|(role, _)| *role)
        .collect();
    let machine_state = MachineState {
        election_hash: input
            .machine_hash
            .and_then(|hash| ElectionHash::new(hash).ok()),
        ..Default::default()
    }
    .with_allowed_roles(&roles)
    .with_unconfigured_election_manager_access(input.allow_unconfigured)
    .with_other_election_manager_access(input.allow_other_elections);
    let engine_roles = if input.dipped {
        DIPPED_CARD_ROLES
    } else {
        INSERTED_CARD_ROLES
    };

    let user = decode_user(input.short_value.as_deref());
    let result = validate_card_user(user.as_ref(), &machine_state, engine_roles);

    match &user {
        None => assert_eq!(result, Err(LoggedOutReason::InvalidUserOnCard)),
        Some(user) => {
            let role_allowed =
                engine_roles.contains(&user.role()) && machine_state.allows_role(user.role());
            if !role_allowed {
                assert_eq!(result, Err(LoggedOutReason::UserRoleNotAllowed));
            }
            // Idle reasons are never validation outcomes
            if let Err(reason) = result {
                assert!(!reason.is_idle());
            }
        }
    }
});
