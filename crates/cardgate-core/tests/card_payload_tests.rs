//! Integration tests for cardgate-core card payloads and validation

use cardgate_core::{
    decode_long_payload, decode_user, encode_long_payload, validate_card_user, CardSummary,
    ElectionHash, LoggedOutReason, MachineState, ProgrammableCard, User, UserRole,
    DIPPED_CARD_ROLES, INSERTED_CARD_ROLES,
};
use serde::{Deserialize, Serialize};

fn machine(hash: &str) -> MachineState {
    MachineState::configured(ElectionHash::new(hash).unwrap())
}

#[test]
fn test_election_manager_wrong_election_scenario() {
    let user = decode_user(Some(r#"{"t":"election_manager","h":"E2","p":"1234"}"#));
    let result = validate_card_user(user.as_ref(), &machine("E1"), DIPPED_CARD_ROLES);
    assert_eq!(result, Err(LoggedOutReason::ElectionManagerWrongElection));
    assert_eq!(user.map(|u| u.role()), Some(UserRole::ElectionManager));
}

#[test]
fn test_poll_worker_matching_election_scenario() {
    let user = decode_user(Some(r#"{"t":"poll_worker","h":"E1"}"#));
    assert!(validate_card_user(user.as_ref(), &machine("E1"), INSERTED_CARD_ROLES).is_ok());
}

#[test]
fn test_garbage_card_is_invalid_user() {
    let summary = CardSummary::ready(Some("{{{".to_string()), false);
    let user = decode_user(summary.short_value());
    assert_eq!(
        validate_card_user(user.as_ref(), &machine("E1"), INSERTED_CARD_ROLES),
        Err(LoggedOutReason::InvalidUserOnCard)
    );
}

#[test]
fn test_programmable_card_reports_unvalidated_user() {
    // A poll worker card for another election is still reported as programmed
    let summary = CardSummary::ready(Some(r#"{"t":"poll_worker","h":"ff"}"#.to_string()), false);
    match ProgrammableCard::from_summary(&summary) {
        ProgrammableCard::Ready {
            programmed_user: Some(User::PollWorker { election_hash }),
            has_stored_data,
        } => {
            assert_eq!(election_hash.as_str(), "ff");
            assert!(!has_stored_data);
        }
        other => panic!("unexpected programmable card: {:?}", other),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SessionToken {
    token: String,
    issued_at: u64,
}

#[test]
fn test_long_payload_typed_round_trip() {
    let token = SessionToken {
        token: "abc".to_string(),
        issued_at: 1_700_000_000,
    };
    let bytes = encode_long_payload(&token).unwrap();
    let decoded: Option<SessionToken> = decode_long_payload(&bytes).unwrap();
    assert_eq!(decoded, Some(token));
}
