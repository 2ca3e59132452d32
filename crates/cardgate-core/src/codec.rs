//! Card payload codec
//!
//! The short payload is a compact JSON record `{ "t": role, "h"?: hash, "p"?: pin }`
//! identifying the card's user. The long payload is an arbitrary JSON document
//! owned by the host; the type it is decoded into acts as its schema.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{ElectionHash, Passcode};
use crate::user::User;
use crate::MAX_LONG_VALUE_BYTES;

/// On-card short payload layout
#[derive(Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
enum ShortPayload {
    SystemAdministrator { p: Passcode },
    ElectionManager { h: ElectionHash, p: Passcode },
    PollWorker { h: ElectionHash },
}

impl From<ShortPayload> for User {
    fn from(payload: ShortPayload) -> Self {
        match payload {
            ShortPayload::SystemAdministrator { p } => User::SystemAdministrator { passcode: p },
            ShortPayload::ElectionManager { h, p } => User::ElectionManager {
                election_hash: h,
                passcode: p,
            },
            ShortPayload::PollWorker { h } => User::PollWorker { election_hash: h },
        }
    }
}

impl From<&User> for ShortPayload {
    fn from(user: &User) -> Self {
        match user {
            User::SystemAdministrator { passcode } => ShortPayload::SystemAdministrator {
                p: passcode.clone(),
            },
            User::ElectionManager {
                election_hash,
                passcode,
            } => ShortPayload::ElectionManager {
                h: election_hash.clone(),
                p: passcode.clone(),
            },
            User::PollWorker { election_hash } => ShortPayload::PollWorker {
                h: election_hash.clone(),
            },
        }
    }
}

/// Parse a short payload, reporting why it was rejected
pub fn parse_user(short_value: &str) -> Result<User> {
    let payload: ShortPayload = serde_json::from_str(short_value)
        .map_err(|e| Error::InvalidShortPayload(e.to_string()))?;
    Ok(payload.into())
}

/// Decode the user a card represents
///
/// A missing, malformed, or schema-invalid payload is not an error: the card
/// simply carries no credential.
pub fn decode_user(short_value: Option<&str>) -> Option<User> {
    short_value.and_then(|value| parse_user(value).ok())
}

/// Serialize a user into its short payload form
pub fn encode_user(user: &User) -> Result<String> {
    Ok(serde_json::to_string(&ShortPayload::from(user))?)
}

/// Serialize host data for the long payload region
pub fn encode_long_payload<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let bytes = serde_json::to_vec(value)?;
    if bytes.len() > MAX_LONG_VALUE_BYTES {
        return Err(Error::InvalidLongPayload(format!(
            "{} bytes exceeds capacity of {} bytes",
            bytes.len(),
            MAX_LONG_VALUE_BYTES
        )));
    }
    Ok(bytes)
}

/// Decode the long payload region as `T`
///
/// An empty region decodes to `None`.
pub fn decode_long_payload<T: DeserializeOwned>(bytes: &[u8]) -> Result<Option<T>> {
    if bytes.is_empty() {
        return Ok(None);
    }
    let text = std::str::from_utf8(bytes).map_err(|e| Error::InvalidLongPayload(e.to_string()))?;
    Ok(Some(serde_json::from_str(text)?))
}
