//! Error types for the Cardgate core library

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid short payload: {0}")]
    InvalidShortPayload(String),

    #[error("Invalid election hash: {0}")]
    InvalidElectionHash(String),

    #[error("Invalid passcode: {0}")]
    InvalidPasscode(String),

    #[error("Invalid long payload: {0}")]
    InvalidLongPayload(String),

    #[error("Unknown user role: {0}")]
    UnknownRole(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
