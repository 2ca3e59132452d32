//! Error types for the Cardgate auth engines

use thiserror::Error;

/// Result type alias for engine commands
pub type Result<T> = std::result::Result<T, AuthError>;

/// Failures reported by a card reader adapter
#[derive(Debug, Error)]
pub enum CardError {
    /// No card seated in the reader
    #[error("No card in reader")]
    NoCard,

    /// Reader hardware or communication fault
    #[error("Card reader fault: {0}")]
    ReaderFault(String),

    /// Short payload write attempted without overriding write protection
    #[error("Card is write protected")]
    WriteProtected,

    /// Long payload larger than the card can hold
    #[error("Long value of {size} bytes exceeds card capacity of {capacity} bytes")]
    CapacityExceeded { size: usize, capacity: usize },

    /// Stored long payload does not match its recorded hash
    #[error("Card data integrity check failed: {0}")]
    Integrity(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CardError {
    fn from(e: serde_json::Error) -> Self {
        CardError::Serialization(e.to_string())
    }
}

/// Errors returned to the host by engine commands
#[derive(Debug, Error)]
pub enum AuthError {
    /// Card reader I/O failed
    #[error("Card error: {0}")]
    Card(#[from] CardError),

    /// Payload encode/decode failed
    #[error("Decode error: {0}")]
    Decode(#[from] cardgate_core::Error),

    /// Command requires a logged-in user
    #[error("User is not logged in")]
    NotLoggedIn,

    /// Command requires a logged-in system administrator
    #[error("User is not a system administrator")]
    NotSystemAdministrator,

    /// Command requires a configured election
    #[error("Machine is not configured for an election")]
    MachineNotConfigured,

    /// Election manager cards carry the election definition
    #[error("Election data is required to program an election manager card")]
    MissingElectionData,

    /// Data was written but reading it back did not reproduce it
    #[error("Verification of write by reading data failed: {0}")]
    WriteVerificationFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AuthError {
    /// Whether the failure is transient and the command may be retried
    ///
    /// Write verification failures point at card integrity and are never retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AuthError::Card(CardError::NoCard | CardError::ReaderFault(_) | CardError::Io(_))
        )
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(e: serde_json::Error) -> Self {
        AuthError::Config(e.to_string())
    }
}
