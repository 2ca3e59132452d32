//! Dipped-card engine tests against the in-memory reader

use cardgate_auth::{
    AuthConfig, AuthError, CardError, DippedCardAuth, MemoryCard, ProgramCardInput,
};
use cardgate_core::{
    decode_user, encode_user, AuthStatus, ElectionHash, LockoutPolicy, LoggedOutReason,
    MachineState, Passcode, ProgrammableCard, User, UserRole,
};
use chrono::{Duration, Utc};

const ELECTION: &str = "e1e1e1";
const ADMIN_PIN: &str = "999999";
const MANAGER_PIN: &str = "123456";

fn admin() -> User {
    User::SystemAdministrator {
        passcode: Passcode::new(ADMIN_PIN).unwrap(),
    }
}

fn manager(hash: &str) -> User {
    User::ElectionManager {
        election_hash: ElectionHash::new(hash).unwrap(),
        passcode: Passcode::new(MANAGER_PIN).unwrap(),
    }
}

fn poll_worker(hash: &str) -> User {
    User::PollWorker {
        election_hash: ElectionHash::new(hash).unwrap(),
    }
}

fn configured() -> MachineState {
    MachineState::configured(ElectionHash::new(ELECTION).unwrap())
}

async fn insert(card: &MemoryCard, user: &User) {
    card.insert_card(Some(&encode_user(user).unwrap()), &[]).await;
}

fn setup() -> (MemoryCard, DippedCardAuth<MemoryCard>) {
    let card = MemoryCard::new();
    let auth = DippedCardAuth::new(card.clone(), AuthConfig::default());
    (card, auth)
}

/// Drive a system administrator through PIN entry and withdrawal
async fn log_in_admin(
    card: &MemoryCard,
    auth: &mut DippedCardAuth<MemoryCard>,
    machine: &MachineState,
) {
    insert(card, &admin()).await;
    auth.get_auth_status(machine).await;
    auth.check_pin(machine, ADMIN_PIN).await;
    card.remove_card().await;
    assert!(auth.get_auth_status(machine).await.is_logged_in());
}

#[tokio::test]
async fn test_initial_status_is_machine_locked() {
    let (_card, mut auth) = setup();
    assert_eq!(
        auth.get_auth_status(&configured()).await,
        AuthStatus::logged_out(LoggedOutReason::MachineLocked)
    );
}

#[tokio::test]
async fn test_system_administrator_flow() {
    let (card, mut auth) = setup();
    let machine = MachineState::default();

    insert(&card, &admin()).await;
    assert_eq!(
        auth.get_auth_status(&machine).await,
        AuthStatus::checking_pin(admin())
    );

    auth.check_pin(&machine, ADMIN_PIN).await;
    assert_eq!(
        auth.get_auth_status(&machine).await,
        AuthStatus::RemoveCard { user: admin() }
    );

    card.remove_card().await;
    match auth.get_auth_status(&machine).await {
        AuthStatus::LoggedIn {
            user,
            programmable_card,
            session_expires_at,
        } => {
            assert_eq!(user, admin());
            assert_eq!(programmable_card, Some(ProgrammableCard::NoCard));
            assert!(session_expires_at.is_some());
        }
        other => panic!("unexpected status: {:?}", other),
    }
}

#[tokio::test]
async fn test_election_manager_wrong_election() {
    let (card, mut auth) = setup();
    insert(&card, &manager("e2")).await;
    assert_eq!(
        auth.get_auth_status(&configured()).await,
        AuthStatus::LoggedOut {
            reason: LoggedOutReason::ElectionManagerWrongElection,
            card_user_role: Some(UserRole::ElectionManager),
        }
    );
}

#[tokio::test]
async fn test_poll_worker_not_allowed_in_dipped_mode() {
    let (card, mut auth) = setup();
    // Wrong election too, but the role check comes first
    insert(&card, &poll_worker("e2")).await;
    assert_eq!(
        auth.get_auth_status(&configured()).await,
        AuthStatus::LoggedOut {
            reason: LoggedOutReason::UserRoleNotAllowed,
            card_user_role: Some(UserRole::PollWorker),
        }
    );
}

#[tokio::test]
async fn test_invalid_and_unreadable_cards() {
    let (card, mut auth) = setup();
    let machine = configured();

    card.insert_card(Some("not a user"), &[]).await;
    assert_eq!(
        auth.get_auth_status(&machine).await,
        AuthStatus::logged_out(LoggedOutReason::InvalidUserOnCard)
    );

    card.insert_backward_card().await;
    assert_eq!(
        auth.get_auth_status(&machine).await,
        AuthStatus::logged_out(LoggedOutReason::CardError)
    );

    card.set_reader_fault(Some("reader unplugged")).await;
    assert_eq!(
        auth.get_auth_status(&machine).await,
        AuthStatus::logged_out(LoggedOutReason::CardError)
    );
}

#[tokio::test]
async fn test_withdrawal_during_pin_entry_aborts() {
    let (card, mut auth) = setup();
    let machine = configured();

    insert(&card, &manager(ELECTION)).await;
    auth.get_auth_status(&machine).await;
    card.remove_card().await;
    assert_eq!(
        auth.get_auth_status(&machine).await,
        AuthStatus::logged_out(LoggedOutReason::MachineLocked)
    );
}

#[tokio::test]
async fn test_remove_card_waits_for_full_withdrawal() {
    let (card, mut auth) = setup();
    let machine = configured();

    insert(&card, &manager(ELECTION)).await;
    auth.get_auth_status(&machine).await;
    auth.check_pin(&machine, MANAGER_PIN).await;

    // Still seated, then a read error: neither completes login
    let expected = AuthStatus::RemoveCard {
        user: manager(ELECTION),
    };
    assert_eq!(auth.get_auth_status(&machine).await, expected);
    card.insert_backward_card().await;
    assert_eq!(auth.get_auth_status(&machine).await, expected);

    card.remove_card().await;
    match auth.get_auth_status(&machine).await {
        AuthStatus::LoggedIn {
            programmable_card, ..
        } => assert_eq!(programmable_card, None),
        other => panic!("unexpected status: {:?}", other),
    }
}

#[tokio::test]
async fn test_polling_is_idempotent() {
    let (card, mut auth) = setup();
    let machine = configured();

    insert(&card, &manager(ELECTION)).await;
    let first = auth.get_auth_status(&machine).await;
    let second = auth.get_auth_status(&machine).await;
    assert_eq!(first, second);

    auth.check_pin(&machine, MANAGER_PIN).await;
    let first = auth.get_auth_status(&machine).await;
    let second = auth.get_auth_status(&machine).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_wrong_pin_records_timestamp() {
    let (card, mut auth) = setup();
    let machine = configured();

    insert(&card, &manager(ELECTION)).await;
    auth.get_auth_status(&machine).await;

    let before = Utc::now();
    auth.check_pin(&machine, "000000").await;
    let after = Utc::now();

    match auth.get_auth_status(&machine).await {
        AuthStatus::CheckingPin {
            user,
            wrong_pin_entered_at: Some(at),
            incorrect_pin_attempts,
            ..
        } => {
            assert_eq!(user, manager(ELECTION));
            assert!(before <= at && at <= after);
            assert_eq!(incorrect_pin_attempts, 1);
        }
        other => panic!("unexpected status: {:?}", other),
    }
}

#[tokio::test]
async fn test_pin_lockout_ignores_entry() {
    let card = MemoryCard::new();
    let config = AuthConfig {
        pin_lockout: Some(LockoutPolicy {
            threshold: 2,
            lockout_durations: vec![3600],
        }),
        ..Default::default()
    };
    let mut auth = DippedCardAuth::new(card.clone(), config);
    let machine = configured();

    insert(&card, &manager(ELECTION)).await;
    auth.get_auth_status(&machine).await;
    auth.check_pin(&machine, "000000").await;
    auth.check_pin(&machine, "111111").await;

    let locked = auth.get_auth_status(&machine).await;
    assert!(locked.is_locked_out(Utc::now()));

    // The correct PIN is ignored while locked out
    auth.check_pin(&machine, MANAGER_PIN).await;
    assert_eq!(auth.get_auth_status(&machine).await, locked);
}

#[tokio::test]
async fn test_lockout_survives_redipping() {
    let card = MemoryCard::new();
    let config = AuthConfig {
        pin_lockout: Some(LockoutPolicy {
            threshold: 2,
            lockout_durations: vec![3600],
        }),
        ..Default::default()
    };
    let mut auth = DippedCardAuth::new(card.clone(), config);
    let machine = configured();

    insert(&card, &manager(ELECTION)).await;
    auth.get_auth_status(&machine).await;
    auth.check_pin(&machine, "000000").await;
    auth.check_pin(&machine, "111111").await;
    let locked = auth.get_auth_status(&machine).await;

    card.remove_card().await;
    assert_eq!(
        auth.get_auth_status(&machine).await,
        AuthStatus::logged_out(LoggedOutReason::MachineLocked)
    );
    insert(&card, &manager(ELECTION)).await;
    assert_eq!(auth.get_auth_status(&machine).await, locked);

    auth.check_pin(&machine, MANAGER_PIN).await;
    assert_eq!(auth.get_auth_status(&machine).await, locked);
}

#[tokio::test]
async fn test_check_pin_after_card_removed_is_noop() {
    let (card, mut auth) = setup();
    let machine = configured();

    insert(&card, &manager(ELECTION)).await;
    auth.get_auth_status(&machine).await;
    card.remove_card().await;
    auth.check_pin(&machine, MANAGER_PIN).await;
    assert_eq!(
        auth.get_auth_status(&machine).await,
        AuthStatus::logged_out(LoggedOutReason::MachineLocked)
    );
}

#[tokio::test]
async fn test_log_out() {
    let (card, mut auth) = setup();
    let machine = MachineState::default();
    log_in_admin(&card, &mut auth, &machine).await;

    auth.log_out(&machine);
    assert_eq!(
        auth.get_auth_status(&machine).await,
        AuthStatus::logged_out(LoggedOutReason::MachineLocked)
    );
}

#[tokio::test]
async fn test_session_expiry() {
    let (card, mut auth) = setup();
    let machine = MachineState::default();
    log_in_admin(&card, &mut auth, &machine).await;

    let expires_at = Utc::now() + Duration::hours(1);
    auth.update_session_expiry(&machine, expires_at).await;
    match auth.get_auth_status(&machine).await {
        AuthStatus::LoggedIn {
            session_expires_at, ..
        } => assert_eq!(session_expires_at, Some(expires_at)),
        other => panic!("unexpected status: {:?}", other),
    }

    auth.update_session_expiry(&machine, Utc::now() - Duration::seconds(1))
        .await;
    assert_eq!(
        auth.get_auth_status(&machine).await,
        AuthStatus::logged_out(LoggedOutReason::MachineLocked)
    );
}

#[tokio::test]
async fn test_programmable_card_tracks_reader() {
    let (card, mut auth) = setup();
    let machine = configured();
    log_in_admin(&card, &mut auth, &machine).await;

    card.insert_card(None, &[]).await;
    match auth.get_auth_status(&machine).await {
        AuthStatus::LoggedIn {
            user,
            programmable_card,
            ..
        } => {
            assert_eq!(user, admin());
            assert_eq!(
                programmable_card,
                Some(ProgrammableCard::Ready {
                    programmed_user: None,
                    has_stored_data: false
                })
            );
        }
        other => panic!("unexpected status: {:?}", other),
    }
}

#[tokio::test]
async fn test_program_election_manager_card() {
    let (card, mut auth) = setup();
    let machine = configured();
    log_in_admin(&card, &mut auth, &machine).await;

    card.insert_write_protected_card(None, &[]).await;
    let input = ProgramCardInput::new(UserRole::ElectionManager)
        .with_election_data(b"{\"title\":\"x\"}".to_vec());
    let outcome = auth.program_card(&machine, input).await.unwrap();
    let pin = outcome.pin.expect("election managers get a PIN");
    assert_eq!(pin.as_str().len(), 6);

    let programmed = decode_user(card.short_value().await.as_deref()).unwrap();
    assert_eq!(
        programmed,
        User::ElectionManager {
            election_hash: ElectionHash::new(ELECTION).unwrap(),
            passcode: pin,
        }
    );
    assert_eq!(card.long_value().await, b"{\"title\":\"x\"}".to_vec());
    assert!(!card.is_write_protected().await);

    match auth.get_auth_status(&machine).await {
        AuthStatus::LoggedIn {
            user,
            programmable_card: Some(programmable),
            ..
        } => {
            assert_eq!(user, admin());
            assert_eq!(programmable.programmed_user(), Some(&programmed));
        }
        other => panic!("unexpected status: {:?}", other),
    }
}

#[tokio::test]
async fn test_program_poll_worker_card_has_no_pin() {
    let (card, mut auth) = setup();
    let machine = configured();
    log_in_admin(&card, &mut auth, &machine).await;

    card.insert_card(None, &[]).await;
    let outcome = auth
        .program_card(&machine, ProgramCardInput::new(UserRole::PollWorker))
        .await
        .unwrap();
    assert!(outcome.pin.is_none());
    assert_eq!(
        decode_user(card.short_value().await.as_deref()),
        Some(poll_worker(ELECTION))
    );
}

#[tokio::test]
async fn test_program_clears_stale_card_data() {
    let (card, mut auth) = setup();
    let machine = configured();
    log_in_admin(&card, &mut auth, &machine).await;

    for role in [UserRole::PollWorker, UserRole::SystemAdministrator] {
        card.insert_card(None, br#"{"title":"Old Election"}"#).await;
        auth.program_card(&machine, ProgramCardInput::new(role))
            .await
            .unwrap();
        assert!(card.long_value().await.is_empty());

        match auth.get_auth_status(&machine).await {
            AuthStatus::LoggedIn {
                programmable_card:
                    Some(ProgrammableCard::Ready {
                        programmed_user: Some(programmed),
                        has_stored_data,
                    }),
                ..
            } => {
                assert_eq!(programmed.role(), role);
                assert!(!has_stored_data);
            }
            other => panic!("unexpected status: {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_program_card_errors() {
    let (card, mut auth) = setup();
    let unconfigured = MachineState::default();

    // Not logged in
    card.insert_card(None, &[]).await;
    assert!(matches!(
        auth.program_card(&unconfigured, ProgramCardInput::new(UserRole::SystemAdministrator))
            .await,
        Err(AuthError::NotLoggedIn)
    ));

    card.remove_card().await;
    auth.get_auth_status(&unconfigured).await;
    log_in_admin(&card, &mut auth, &unconfigured).await;
    card.insert_card(None, &[]).await;

    assert!(matches!(
        auth.program_card(&unconfigured, ProgramCardInput::new(UserRole::PollWorker))
            .await,
        Err(AuthError::MachineNotConfigured)
    ));
    assert!(matches!(
        auth.program_card(&configured(), ProgramCardInput::new(UserRole::ElectionManager))
            .await,
        Err(AuthError::MissingElectionData)
    ));

    card.fail_writes(true).await;
    let result = auth
        .program_card(&unconfigured, ProgramCardInput::new(UserRole::SystemAdministrator))
        .await;
    assert!(matches!(
        result,
        Err(AuthError::Card(CardError::ReaderFault(_)))
    ));
    // The session is unaffected by programming failures
    assert!(auth.get_auth_status(&unconfigured).await.is_logged_in());
}

#[tokio::test]
async fn test_election_manager_cannot_program() {
    let (card, mut auth) = setup();
    let machine = configured();

    insert(&card, &manager(ELECTION)).await;
    auth.get_auth_status(&machine).await;
    auth.check_pin(&machine, MANAGER_PIN).await;
    card.remove_card().await;
    assert!(auth.get_auth_status(&machine).await.is_logged_in());

    card.insert_card(None, &[]).await;
    assert!(matches!(
        auth.program_card(&machine, ProgramCardInput::new(UserRole::PollWorker))
            .await,
        Err(AuthError::NotSystemAdministrator)
    ));
}

#[tokio::test]
async fn test_unprogram_card() {
    let (card, mut auth) = setup();
    let machine = configured();
    log_in_admin(&card, &mut auth, &machine).await;

    let short_value = encode_user(&manager(ELECTION)).unwrap();
    card.insert_card(Some(&short_value), b"election").await;
    auth.unprogram_card(&machine).await.unwrap();

    assert_eq!(card.short_value().await, None);
    assert!(card.long_value().await.is_empty());
    match auth.get_auth_status(&machine).await {
        AuthStatus::LoggedIn {
            programmable_card, ..
        } => assert_eq!(
            programmable_card,
            Some(ProgrammableCard::Ready {
                programmed_user: None,
                has_stored_data: false
            })
        ),
        other => panic!("unexpected status: {:?}", other),
    }

    // Already blank: succeeds without writing
    card.fail_writes(true).await;
    auth.unprogram_card(&machine).await.unwrap();
}
