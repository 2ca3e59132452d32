//! Dipped-card auth engine
//!
//! Used by system administrators and election managers. The operator dips the
//! card, enters the PIN while it is seated, then withdraws it; only the
//! withdrawal completes login. A logged-in system administrator may then
//! insert other cards to program or unprogram them.

use cardgate_core::{
    decode_user, encode_user, generate_pin, validate_card_user, AuthStatus, CardSummary,
    LoggedOutReason, MachineState, Passcode, ProgrammableCard, User, UserRole,
    DIPPED_CARD_ROLES,
};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::AuthConfig;
use crate::engine::{
    check_pin_transition, expire_session, read_summary_or_error, rejected, AuthAction,
    PinAttempts,
};
use crate::error::{AuthError, Result};
use crate::events;
use crate::reader::CardReader;

/// Card to program on behalf of a logged-in system administrator
#[derive(Debug, Clone)]
pub struct ProgramCardInput {
    pub role: UserRole,
    /// Election definition written to election manager cards
    pub election_data: Option<Vec<u8>>,
}

impl ProgramCardInput {
    pub fn new(role: UserRole) -> Self {
        Self {
            role,
            election_data: None,
        }
    }

    pub fn with_election_data(mut self, election_data: impl Into<Vec<u8>>) -> Self {
        self.election_data = Some(election_data.into());
        self
    }
}

/// Result of programming a card
#[derive(Debug, Clone)]
pub struct ProgramCardOutcome {
    /// Freshly generated PIN, to be shown to the operator exactly once
    pub pin: Option<Passcode>,
}

/// Dipped-card auth engine
pub struct DippedCardAuth<R: CardReader> {
    card: R,
    config: AuthConfig,
    auth_status: AuthStatus,
    pin_attempts: PinAttempts,
}

impl<R: CardReader> DippedCardAuth<R> {
    pub fn new(card: R, config: AuthConfig) -> Self {
        Self {
            card,
            config,
            pin_attempts: PinAttempts::default(),
            auth_status: AuthStatus::logged_out(LoggedOutReason::MachineLocked),
        }
    }

    pub fn card(&self) -> &R {
        &self.card
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Poll the reader and return the resulting status
    pub async fn get_auth_status(&mut self, machine_state: &MachineState) -> AuthStatus {
        self.check_card_reader_and_update_auth_status(machine_state)
            .await;
        self.auth_status.clone()
    }

    /// Submit a PIN for the seated card
    ///
    /// Ignored unless the status is `CheckingPin` and PIN entry is not locked out.
    pub async fn check_pin(&mut self, machine_state: &MachineState, pin: &str) {
        self.check_card_reader_and_update_auth_status(machine_state)
            .await;
        self.update_auth_status(machine_state, AuthAction::CheckPin(pin));
    }

    /// End the session, or abort a login in progress
    pub fn log_out(&mut self, machine_state: &MachineState) {
        self.update_auth_status(machine_state, AuthAction::LogOut);
    }

    /// Replace the expiry of the current session; no-op unless logged in
    pub async fn update_session_expiry(
        &mut self,
        machine_state: &MachineState,
        session_expires_at: DateTime<Utc>,
    ) {
        self.check_card_reader_and_update_auth_status(machine_state)
            .await;
        self.update_auth_status(
            machine_state,
            AuthAction::UpdateSessionExpiry(session_expires_at),
        );
    }

    /// Program the card in the reader for the given role
    ///
    /// Election manager and poll worker cards are bound to the machine's
    /// configured election. PIN-bearing roles get a fresh random PIN, returned
    /// so the host can display it once.
    pub async fn program_card(
        &mut self,
        machine_state: &MachineState,
        input: ProgramCardInput,
    ) -> Result<ProgramCardOutcome> {
        self.check_card_reader_and_update_auth_status(machine_state)
            .await;
        self.require_system_administrator()?;

        let role = input.role;
        events::log_program_init(role);
        let result = self.write_programmed_user(machine_state, input).await;
        events::log_program_complete(role, result.as_ref().map(|_| ()));

        self.check_card_reader_and_update_auth_status(machine_state)
            .await;
        result
    }

    /// Blank both payloads of the card in the reader
    ///
    /// Succeeds without writing if the card is already blank.
    pub async fn unprogram_card(&mut self, machine_state: &MachineState) -> Result<()> {
        let summary = self
            .check_card_reader_and_update_auth_status(machine_state)
            .await;
        self.require_system_administrator()?;

        if let CardSummary::Ready {
            short_value: None,
            long_value_present: false,
        } = summary
        {
            events::log_unprogram_noop();
            return Ok(());
        }

        let programmed_role = decode_user(summary.short_value()).map(|user| user.role());
        events::log_unprogram_init(programmed_role);
        let result = self.blank_card().await;
        events::log_unprogram_complete(programmed_role, result.as_ref().map(|_| ()));

        self.check_card_reader_and_update_auth_status(machine_state)
            .await;
        result
    }

    fn require_system_administrator(&self) -> Result<()> {
        match &self.auth_status {
            AuthStatus::LoggedIn { user, .. } if user.is_system_administrator() => Ok(()),
            AuthStatus::LoggedIn { .. } => Err(AuthError::NotSystemAdministrator),
            _ => Err(AuthError::NotLoggedIn),
        }
    }

    async fn write_programmed_user(
        &self,
        machine_state: &MachineState,
        input: ProgramCardInput,
    ) -> Result<ProgramCardOutcome> {
        let election_hash = || {
            machine_state
                .election_hash
                .clone()
                .ok_or(AuthError::MachineNotConfigured)
        };

        let (user, election_data) = match input.role {
            UserRole::SystemAdministrator => (
                User::SystemAdministrator {
                    passcode: generate_pin(),
                },
                None,
            ),
            UserRole::ElectionManager => {
                let election_hash = election_hash()?;
                let election_data = input
                    .election_data
                    .ok_or(AuthError::MissingElectionData)?;
                (
                    User::ElectionManager {
                        election_hash,
                        passcode: generate_pin(),
                    },
                    Some(election_data),
                )
            }
            UserRole::PollWorker => (
                User::PollWorker {
                    election_hash: election_hash()?,
                },
                None,
            ),
        };
        let short_value = encode_user(&user)?;

        // Roles without a long payload still clear whatever the card held
        let long_value = election_data.unwrap_or_default();
        self.card.override_write_protection().await?;
        self.card
            .write_short_and_long_values(&short_value, &long_value)
            .await?;

        Ok(ProgramCardOutcome {
            pin: user.passcode().cloned(),
        })
    }

    async fn blank_card(&self) -> Result<()> {
        self.card.override_write_protection().await?;
        self.card.write_short_and_long_values("", &[]).await?;
        Ok(())
    }

    async fn check_card_reader_and_update_auth_status(
        &mut self,
        machine_state: &MachineState,
    ) -> CardSummary {
        let summary = read_summary_or_error(&self.card).await;
        self.update_auth_status(machine_state, AuthAction::CheckCardReader(summary.clone()));
        summary
    }

    fn update_auth_status(&mut self, machine_state: &MachineState, action: AuthAction<'_>) {
        let new_status = self.determine_new_auth_status(machine_state, action);
        self.pin_attempts.observe(&new_status);
        let previous = std::mem::replace(&mut self.auth_status, new_status);
        if previous != self.auth_status {
            debug!(
                from = previous.name(),
                to = self.auth_status.name(),
                "Dipped auth status changed"
            );
        }
        events::log_auth_event(&previous, &self.auth_status);
    }

    fn determine_new_auth_status(
        &self,
        machine_state: &MachineState,
        action: AuthAction<'_>,
    ) -> AuthStatus {
        let now = Utc::now();
        let current = expire_session(&self.auth_status, now, LoggedOutReason::MachineLocked)
            .unwrap_or_else(|| self.auth_status.clone());

        match action {
            AuthAction::CheckCardReader(summary) => {
                self.on_card_summary(machine_state, current, &summary, now)
            }
            AuthAction::CheckPin(pin) => check_pin_transition(
                &current,
                pin,
                now,
                self.config.pin_lockout.as_ref(),
                |user| AuthStatus::RemoveCard { user },
            )
            .unwrap_or(current),
            AuthAction::LogOut => AuthStatus::logged_out(LoggedOutReason::MachineLocked),
            AuthAction::UpdateSessionExpiry(expires_at) => match current {
                AuthStatus::LoggedIn {
                    user,
                    programmable_card,
                    ..
                } => AuthStatus::LoggedIn {
                    user,
                    session_expires_at: Some(expires_at),
                    programmable_card,
                },
                other => other,
            },
        }
    }

    fn on_card_summary(
        &self,
        machine_state: &MachineState,
        current: AuthStatus,
        summary: &CardSummary,
        now: DateTime<Utc>,
    ) -> AuthStatus {
        match current {
            AuthStatus::LoggedOut { .. } => match summary {
                CardSummary::NoCard => AuthStatus::logged_out(LoggedOutReason::MachineLocked),
                CardSummary::Error => AuthStatus::logged_out(LoggedOutReason::CardError),
                CardSummary::Ready { short_value, .. } => {
                    let user = decode_user(short_value.as_deref());
                    match validate_card_user(user.as_ref(), machine_state, DIPPED_CARD_ROLES) {
                        Ok(()) => match user {
                            Some(user) => self.pin_attempts.checking_pin(user),
                            None => rejected(LoggedOutReason::InvalidUserOnCard, None),
                        },
                        Err(reason) => rejected(reason, user.as_ref()),
                    }
                }
            },

            AuthStatus::CheckingPin { .. } => match summary {
                CardSummary::NoCard => AuthStatus::logged_out(LoggedOutReason::MachineLocked),
                _ => current,
            },

            AuthStatus::RemoveCard { user } => match summary {
                CardSummary::NoCard => {
                    let programmable_card = user
                        .is_system_administrator()
                        .then_some(ProgrammableCard::NoCard);
                    AuthStatus::LoggedIn {
                        user,
                        session_expires_at: self.config.session_expires_at(now),
                        programmable_card,
                    }
                }
                _ => AuthStatus::RemoveCard { user },
            },

            AuthStatus::LoggedIn {
                user,
                session_expires_at,
                programmable_card,
            } => {
                let programmable_card = if user.is_system_administrator() {
                    Some(ProgrammableCard::from_summary(summary))
                } else {
                    programmable_card
                };
                AuthStatus::LoggedIn {
                    user,
                    session_expires_at,
                    programmable_card,
                }
            }
        }
    }
}
