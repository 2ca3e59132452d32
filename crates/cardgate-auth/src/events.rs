//! Auth event logging
//!
//! Events are derived from the `(previous, new)` status pair after every
//! transition and emitted through `tracing` with structured fields, so a host
//! can route them to its audit log with a subscriber layer.

use cardgate_core::{AuthStatus, User, UserRole};
use tracing::{debug, info, warn};

pub const AUTH_LOGIN: &str = "auth_login";
pub const AUTH_LOGOUT: &str = "auth_logout";
pub const AUTH_PIN_ENTRY: &str = "auth_pin_entry";
pub const SMART_CARD_PROGRAM_INIT: &str = "smart_card_program_init";
pub const SMART_CARD_PROGRAM_COMPLETE: &str = "smart_card_program_complete";
pub const SMART_CARD_UNPROGRAM_INIT: &str = "smart_card_unprogram_init";
pub const SMART_CARD_UNPROGRAM_COMPLETE: &str = "smart_card_unprogram_complete";

const SUCCESS: &str = "success";
const FAILURE: &str = "failure";

fn role_name(role: Option<UserRole>) -> &'static str {
    role.map_or("unknown", |role| role.as_str())
}

/// Log the auth event implied by a status transition, if any
pub fn log_auth_event(previous: &AuthStatus, new: &AuthStatus) {
    match previous {
        AuthStatus::LoggedOut {
            reason: previous_reason,
            ..
        } => match new {
            AuthStatus::LoggedOut {
                reason,
                card_user_role,
            } if previous_reason.is_idle() && !reason.is_idle() => {
                warn!(
                    event = AUTH_LOGIN,
                    role = role_name(*card_user_role),
                    disposition = FAILURE,
                    reason = %reason,
                    "User failed login."
                );
            }
            AuthStatus::LoggedIn { user, .. } => log_login(user),
            AuthStatus::CheckingPin { user, .. } => {
                debug!(role = user.role().as_str(), "Card accepted, awaiting PIN");
            }
            _ => {}
        },

        AuthStatus::CheckingPin {
            user,
            wrong_pin_entered_at: previous_wrong_pin,
            ..
        } => match new {
            AuthStatus::LoggedOut { .. } => {
                info!(
                    event = AUTH_PIN_ENTRY,
                    role = user.role().as_str(),
                    disposition = FAILURE,
                    "User canceled PIN entry."
                );
            }
            AuthStatus::CheckingPin {
                wrong_pin_entered_at,
                incorrect_pin_attempts,
                locked_out_until,
                ..
            } if wrong_pin_entered_at != previous_wrong_pin => {
                warn!(
                    event = AUTH_PIN_ENTRY,
                    role = user.role().as_str(),
                    disposition = FAILURE,
                    attempts = *incorrect_pin_attempts,
                    locked_out_until = ?locked_out_until,
                    "User entered incorrect PIN."
                );
            }
            AuthStatus::RemoveCard { .. } => log_correct_pin(user),
            AuthStatus::LoggedIn { user, .. } => {
                log_correct_pin(user);
                log_login(user);
            }
            _ => {}
        },

        AuthStatus::RemoveCard { .. } => {
            if let AuthStatus::LoggedIn { user, .. } = new {
                log_login(user);
            }
        }

        AuthStatus::LoggedIn { user, .. } => {
            if let AuthStatus::LoggedOut { reason, .. } = new {
                info!(
                    event = AUTH_LOGOUT,
                    role = user.role().as_str(),
                    disposition = SUCCESS,
                    reason = %reason,
                    "User logged out."
                );
            }
        }
    }
}

fn log_correct_pin(user: &User) {
    info!(
        event = AUTH_PIN_ENTRY,
        role = user.role().as_str(),
        disposition = SUCCESS,
        "User entered correct PIN."
    );
}

fn log_login(user: &User) {
    info!(
        event = AUTH_LOGIN,
        role = user.role().as_str(),
        disposition = SUCCESS,
        "User logged in."
    );
}

/// Log the start of a card programming operation
pub fn log_program_init(role: UserRole) {
    info!(
        event = SMART_CARD_PROGRAM_INIT,
        programmed_user_role = role.as_str(),
        "Programming smart card."
    );
}

/// Log the outcome of a card programming operation
pub fn log_program_complete<E: std::fmt::Display>(
    role: UserRole,
    result: std::result::Result<(), &E>,
) {
    match result {
        Ok(()) => info!(
            event = SMART_CARD_PROGRAM_COMPLETE,
            programmed_user_role = role.as_str(),
            disposition = SUCCESS,
            "Successfully programmed smart card."
        ),
        Err(e) => warn!(
            event = SMART_CARD_PROGRAM_COMPLETE,
            programmed_user_role = role.as_str(),
            disposition = FAILURE,
            error = %e,
            "Error programming smart card."
        ),
    }
}

/// Log the start of a card unprogramming operation
pub fn log_unprogram_init(programmed_role: Option<UserRole>) {
    info!(
        event = SMART_CARD_UNPROGRAM_INIT,
        programmed_user_role = role_name(programmed_role),
        "Unprogramming smart card."
    );
}

/// Log the outcome of a card unprogramming operation
pub fn log_unprogram_complete<E: std::fmt::Display>(
    programmed_role: Option<UserRole>,
    result: std::result::Result<(), &E>,
) {
    match result {
        Ok(()) => info!(
            event = SMART_CARD_UNPROGRAM_COMPLETE,
            previously_programmed_user_role = role_name(programmed_role),
            disposition = SUCCESS,
            "Successfully unprogrammed smart card."
        ),
        Err(e) => warn!(
            event = SMART_CARD_UNPROGRAM_COMPLETE,
            previously_programmed_user_role = role_name(programmed_role),
            disposition = FAILURE,
            error = %e,
            "Error unprogramming smart card."
        ),
    }
}

/// Log an unprogram request against an already blank card
pub fn log_unprogram_noop() {
    info!(
        event = SMART_CARD_UNPROGRAM_COMPLETE,
        disposition = SUCCESS,
        "Smart card already unprogrammed (no-op)."
    );
}
