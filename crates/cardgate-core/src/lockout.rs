//! Progressive PIN lockout policy
//!
//! Lockout durations increase with consecutive wrong PINs on the seated card:
//!
//! - 1-4 failures: No lockout (allow typos)
//! - 5 failures: 15 second lockout
//! - 6 failures: 1 minute lockout
//! - 7 failures: 5 minute lockout
//! - 8 failures: 15 minute lockout
//! - 9+ failures: 1 hour lockout

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Progressive lockout policy
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutPolicy {
    /// Wrong PINs allowed before the first lockout
    pub threshold: u32,
    /// Lockout durations for each level (in seconds)
    pub lockout_durations: Vec<u64>,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            threshold: 5,
            lockout_durations: vec![
                15,   // 5 failures: 15 seconds
                60,   // 6 failures: 1 minute
                300,  // 7 failures: 5 minutes
                900,  // 8 failures: 15 minutes
                3600, // 9+ failures: 1 hour
            ],
        }
    }
}

impl LockoutPolicy {
    /// Get the lockout duration for the given number of failed attempts
    /// Returns None if not yet locked out
    pub fn lockout_duration(&self, failed_attempts: u32) -> Option<Duration> {
        if failed_attempts < self.threshold {
            return None;
        }

        let lockout_level = (failed_attempts - self.threshold) as usize;
        let last = self.lockout_durations.len().checked_sub(1)?;
        let secs = self.lockout_durations.get(lockout_level.min(last))?;

        Some(Duration::from_secs(*secs))
    }

    /// Check if the card should be locked
    pub fn is_locked(&self, failed_attempts: u32) -> bool {
        self.lockout_duration(failed_attempts).is_some()
    }

    /// Get a human-readable description of the current lockout state
    pub fn describe_lockout(&self, failed_attempts: u32) -> String {
        if let Some(duration) = self.lockout_duration(failed_attempts) {
            let secs = duration.as_secs();
            let span = if secs < 60 {
                count(secs, "second")
            } else if secs < 3600 {
                count(secs / 60, "minute")
            } else {
                count(secs / 3600, "hour")
            };
            format!("Locked for {}", span)
        } else {
            let remaining = self.threshold.saturating_sub(failed_attempts);
            format!("{} remaining", count(remaining.into(), "attempt"))
        }
    }
}

fn count(n: u64, unit: &str) -> String {
    if n == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", n, unit)
    }
}
