//! Property-based tests for cardgate-core using proptest
//!
//! These tests verify invariants that should hold for all valid inputs.

use proptest::prelude::*;
use cardgate_core::{
    decode_user, encode_user, validate_card_user, ElectionHash, LoggedOutReason, MachineState,
    Passcode, User, UserRole, INSERTED_CARD_ROLES,
};

// ============================================
// Arbitrary Implementations
// ============================================

fn arb_election_hash() -> impl Strategy<Value = ElectionHash> {
    "[0-9a-fA-F]{1,64}".prop_map(|s| ElectionHash::new(s).unwrap())
}

fn arb_passcode() -> impl Strategy<Value = Passcode> {
    "[0-9]{1,12}".prop_map(|s| Passcode::new(s).unwrap())
}

fn arb_user() -> impl Strategy<Value = User> {
    prop_oneof![
        arb_passcode().prop_map(|passcode| User::SystemAdministrator { passcode }),
        (arb_election_hash(), arb_passcode()).prop_map(|(election_hash, passcode)| {
            User::ElectionManager {
                election_hash,
                passcode,
            }
        }),
        arb_election_hash().prop_map(|election_hash| User::PollWorker { election_hash }),
    ]
}

fn arb_role() -> impl Strategy<Value = UserRole> {
    prop_oneof![
        Just(UserRole::SystemAdministrator),
        Just(UserRole::ElectionManager),
        Just(UserRole::PollWorker),
    ]
}

fn arb_machine_state() -> impl Strategy<Value = MachineState> {
    (
        prop::option::of(arb_election_hash()),
        prop::collection::vec(arb_role(), 0..3),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(election_hash, roles, unconfigured, other)| MachineState {
            election_hash,
            allowed_user_roles: roles,
            allow_election_managers_on_unconfigured_machines: unconfigured,
            allow_election_managers_on_other_elections: other,
        })
}

// ============================================
// Codec Properties
// ============================================

proptest! {
    #[test]
    fn decode_never_panics(input in ".*") {
        let _ = decode_user(Some(&input));
    }

    #[test]
    fn encoded_users_decode_to_themselves(user in arb_user()) {
        let encoded = encode_user(&user).unwrap();
        prop_assert_eq!(decode_user(Some(&encoded)), Some(user));
    }
}

// ============================================
// Validation Properties
// ============================================

proptest! {
    #[test]
    fn disallowed_role_always_wins(user in arb_user(), state in arb_machine_state()) {
        prop_assume!(!state.allowed_user_roles.contains(&user.role()));
        prop_assert_eq!(
            validate_card_user(Some(&user), &state, INSERTED_CARD_ROLES),
            Err(LoggedOutReason::UserRoleNotAllowed)
        );
    }

    #[test]
    fn system_administrators_only_fail_on_role(passcode in arb_passcode(), state in arb_machine_state()) {
        let user = User::SystemAdministrator { passcode };
        let result = validate_card_user(Some(&user), &state, INSERTED_CARD_ROLES);
        if state.allows_role(UserRole::SystemAdministrator) {
            prop_assert!(result.is_ok());
        } else {
            prop_assert_eq!(result, Err(LoggedOutReason::UserRoleNotAllowed));
        }
    }

    #[test]
    fn matching_poll_worker_is_valid(hash in arb_election_hash()) {
        let state = MachineState::configured(hash.clone());
        let user = User::PollWorker { election_hash: hash };
        prop_assert!(validate_card_user(Some(&user), &state, INSERTED_CARD_ROLES).is_ok());
    }
}
