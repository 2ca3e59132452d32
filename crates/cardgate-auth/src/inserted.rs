//! Inserted-card auth engine
//!
//! The card stays in the reader for the whole session. Poll workers log in as
//! soon as a valid card is seated; PIN-bearing roles log in right after the
//! correct PIN. Removing the card ends the session on the next poll.
//!
//! While a card is seated the host may use its long payload as a session data
//! channel through `read_card_data`, `write_card_data`, and `clear_card_data`.

use cardgate_core::{
    decode_long_payload, decode_user, encode_long_payload, validate_card_user, AuthStatus,
    CardSummary, LoggedOutReason, MachineState, INSERTED_CARD_ROLES,
};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::AuthConfig;
use crate::engine::{
    check_pin_transition, expire_session, read_summary_or_error, rejected, AuthAction,
    PinAttempts,
};
use crate::error::{AuthError, Result};
use crate::events;
use crate::reader::{read_long_object, CardReader};

/// Inserted-card auth engine
pub struct InsertedCardAuth<R: CardReader> {
    card: R,
    config: AuthConfig,
    auth_status: AuthStatus,
    pin_attempts: PinAttempts,
}

impl<R: CardReader> InsertedCardAuth<R> {
    pub fn new(card: R, config: AuthConfig) -> Self {
        Self {
            card,
            config,
            pin_attempts: PinAttempts::default(),
            auth_status: AuthStatus::logged_out(LoggedOutReason::NoCard),
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
    pub async fn check_pin(&mut self, machine_state: &MachineState, pin: &str) {
        self.check_card_reader_and_update_auth_status(machine_state)
            .await;
        self.update_auth_status(machine_state, AuthAction::CheckPin(pin));
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

    /// Read the seated card's long payload as `T`
    ///
    /// `Ok(None)` if nothing is stored.
    pub async fn read_card_data<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        read_long_object(&self.card).await
    }

    /// Read the seated card's long payload as text
    pub async fn read_card_data_as_string(&self) -> Result<Option<String>> {
        let bytes = self.card.read_long_value().await?;
        if bytes.is_empty() {
            return Ok(None);
        }
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| cardgate_core::Error::InvalidLongPayload(e.to_string()).into())
    }

    /// Write `data` to the seated card's long payload, then read it back
    ///
    /// A readback that does not reproduce the written data fails with
    /// `WriteVerificationFailed`, even though the write itself went through.
    pub async fn write_card_data<T>(&self, data: &T) -> Result<()>
    where
        T: Serialize + DeserializeOwned + Sync,
    {
        let bytes = encode_long_payload(data)?;
        self.card.write_long_value(&bytes).await?;

        let readback = self.card.read_long_value().await.map_err(|e| {
            AuthError::WriteVerificationFailed(format!("readback failed: {}", e))
        })?;
        if readback != bytes {
            warn!(
                written = bytes.len(),
                read = readback.len(),
                "Card data readback differs from written data"
            );
            return Err(AuthError::WriteVerificationFailed(
                "readback differs from written data".to_string(),
            ));
        }
        match decode_long_payload::<T>(&readback) {
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err(AuthError::WriteVerificationFailed(
                "card data is empty after write".to_string(),
            )),
            Err(e) => Err(AuthError::WriteVerificationFailed(e.to_string())),
        }
    }

    /// Erase the seated card's long payload
    pub async fn clear_card_data(&self) -> Result<()> {
        self.card.write_long_value(&[]).await?;
        Ok(())
    }

    async fn check_card_reader_and_update_auth_status(&mut self, machine_state: &MachineState) {
        let summary = read_summary_or_error(&self.card).await;
        self.update_auth_status(machine_state, AuthAction::CheckCardReader(summary));
    }

    fn update_auth_status(&mut self, machine_state: &MachineState, action: AuthAction<'_>) {
        let new_status = self.determine_new_auth_status(machine_state, action);
        self.pin_attempts.observe(&new_status);
        let previous = std::mem::replace(&mut self.auth_status, new_status);
        if previous != self.auth_status {
            debug!(
                from = previous.name(),
                to = self.auth_status.name(),
                "Inserted auth status changed"
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
        let current = expire_session(&self.auth_status, now, LoggedOutReason::NoCard)
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
                |user| AuthStatus::LoggedIn {
                    user,
                    session_expires_at: self.config.session_expires_at(now),
                    programmable_card: None,
                },
            )
            .unwrap_or(current),
            // Never issued here: inserted sessions end by removing the card
            AuthAction::LogOut => current,
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
        let short_value = match summary {
            CardSummary::NoCard => return AuthStatus::logged_out(LoggedOutReason::NoCard),
            CardSummary::Error => return AuthStatus::logged_out(LoggedOutReason::CardError),
            CardSummary::Ready { short_value, .. } => short_value.as_deref(),
        };

        let user = decode_user(short_value);
        if let Err(reason) = validate_card_user(user.as_ref(), machine_state, INSERTED_CARD_ROLES)
        {
            return rejected(reason, user.as_ref());
        }
        let Some(user) = user else {
            return rejected(LoggedOutReason::InvalidUserOnCard, None);
        };

        let same_card = matches!(
            &current,
            AuthStatus::CheckingPin { user: current_user, .. }
            | AuthStatus::LoggedIn { user: current_user, .. } if *current_user == user
        );
        if same_card {
            return current;
        }

        if user.role().requires_pin() {
            self.pin_attempts.checking_pin(user)
        } else {
            AuthStatus::LoggedIn {
                user,
                session_expires_at: self.config.session_expires_at(now),
                programmable_card: None,
            }
        }
    }
}
