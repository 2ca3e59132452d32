//! Core newtypes and the operator role tag

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};

/// Operator role carried on a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    SystemAdministrator,
    ElectionManager,
    PollWorker,
}

impl UserRole {
    /// All roles, in privilege order
    pub const ALL: [UserRole; 3] = [
        UserRole::SystemAdministrator,
        UserRole::ElectionManager,
        UserRole::PollWorker,
    ];

    /// Wire/log name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::SystemAdministrator => "system_administrator",
            UserRole::ElectionManager => "election_manager",
            UserRole::PollWorker => "poll_worker",
        }
    }

    /// Whether a user with this role must enter a PIN to log in
    pub fn requires_pin(&self) -> bool {
        match self {
            UserRole::SystemAdministrator | UserRole::ElectionManager => true,
            UserRole::PollWorker => false,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "system_administrator" => Ok(UserRole::SystemAdministrator),
            "election_manager" => Ok(UserRole::ElectionManager),
            "poll_worker" => Ok(UserRole::PollWorker),
            other => Err(Error::UnknownRole(other.to_string())),
        }
    }
}

/// Hash binding an operator credential to one configured election
///
/// Always a non-empty hex string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElectionHash(String);

impl ElectionHash {
    /// Create an election hash, rejecting empty or non-hex input
    pub fn new(hash: impl Into<String>) -> Result<Self> {
        let hash = hash.into();
        if hash.is_empty() {
            return Err(Error::InvalidElectionHash("empty".to_string()));
        }
        // Odd-length strings are still hex digits; decode the padded form to check the alphabet
        let padded = if hash.len() % 2 == 1 {
            format!("0{}", hash)
        } else {
            hash.clone()
        };
        hex::decode(&padded).map_err(|e| Error::InvalidElectionHash(e.to_string()))?;
        Ok(Self(hash))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short display format (first 10 characters)
    pub fn short(&self) -> &str {
        let end = self.0.len().min(10);
        &self.0[..end]
    }
}

impl fmt::Display for ElectionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ElectionHash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl Serialize for ElectionHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ElectionHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

/// Operator PIN stored on a card
///
/// Digits only. Zeroized on drop and redacted in debug output.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Passcode(String);

impl Passcode {
    /// Create a passcode, rejecting empty or non-digit input
    pub fn new(passcode: impl Into<String>) -> Result<Self> {
        let passcode = passcode.into();
        if passcode.is_empty() {
            return Err(Error::InvalidPasscode("empty".to_string()));
        }
        if !passcode.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidPasscode("must contain only digits".to_string()));
        }
        Ok(Self(passcode))
    }

    /// Wrap digits already known to be valid
    pub(crate) fn from_digits(digits: String) -> Self {
        debug_assert!(!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()));
        Self(digits)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare against an entered PIN without short-circuiting on the first differing digit
    pub fn matches(&self, entered: &str) -> bool {
        let expected = self.0.as_bytes();
        let entered = entered.as_bytes();
        if expected.len() != entered.len() {
            return false;
        }
        expected
            .iter()
            .zip(entered.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl fmt::Debug for Passcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passcode(****)")
    }
}

impl Serialize for Passcode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Passcode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_names_round_trip() {
        for role in UserRole::ALL {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), role);
        }
        assert!("voter".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_only_poll_workers_skip_pin() {
        assert!(UserRole::SystemAdministrator.requires_pin());
        assert!(UserRole::ElectionManager.requires_pin());
        assert!(!UserRole::PollWorker.requires_pin());
    }

    #[test]
    fn test_election_hash_validation() {
        assert!(ElectionHash::new("E1").is_ok());
        assert!(ElectionHash::new("abc").is_ok());
        assert!(ElectionHash::new("").is_err());
        assert!(ElectionHash::new("not-hex").is_err());
    }

    #[test]
    fn test_election_hash_short() {
        let hash = ElectionHash::new("0123456789abcdef").unwrap();
        assert_eq!(hash.short(), "0123456789");
        assert_eq!(ElectionHash::new("E1").unwrap().short(), "E1");
    }

    #[test]
    fn test_passcode_validation() {
        assert!(Passcode::new("123456").is_ok());
        assert!(Passcode::new("").is_err());
        assert!(Passcode::new("12a4").is_err());
    }

    #[test]
    fn test_passcode_matches() {
        let passcode = Passcode::new("9999").unwrap();
        assert!(passcode.matches("9999"));
        assert!(!passcode.matches("9998"));
        assert!(!passcode.matches("99999"));
        assert!(!passcode.matches(""));
    }

    #[test]
    fn test_passcode_debug_is_redacted() {
        let passcode = Passcode::new("123456").unwrap();
        assert!(!format!("{:?}", passcode).contains("123456"));
    }
}
