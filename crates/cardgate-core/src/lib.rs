//! Cardgate Core - Shared types, card payload codec, and role validation
//!
//! This crate provides the foundational types for smart-card operator
//! authentication on an election kiosk. It performs no I/O: the async
//! engines in `cardgate-auth` feed it card summaries and machine state.

pub mod card;
pub mod codec;
pub mod error;
pub mod lockout;
pub mod machine;
pub mod pin;
pub mod status;
pub mod types;
pub mod user;
pub mod validation;

pub use card::{CardSummary, ProgrammableCard};
pub use codec::{decode_long_payload, decode_user, encode_long_payload, encode_user, parse_user};
pub use error::{Error, Result};
pub use lockout::LockoutPolicy;
pub use machine::MachineState;
pub use pin::{generate_pin, generate_pin_with};
pub use status::{AuthStatus, LoggedOutReason};
pub use types::{ElectionHash, Passcode, UserRole};
pub use user::User;
pub use validation::{validate_card_user, DIPPED_CARD_ROLES, INSERTED_CARD_ROLES};

/// Interval at which hosts poll the card reader (milliseconds)
pub const CARD_POLLING_INTERVAL_MS: u64 = 100;

/// Number of digits in a generated PIN
pub const PIN_LENGTH: usize = 6;

/// Maximum size of the long payload region on a card
pub const MAX_LONG_VALUE_BYTES: usize = 32_500;
