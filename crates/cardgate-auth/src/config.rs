//! Engine configuration

use std::path::Path;
use std::time::Duration;

use cardgate_core::{LockoutPolicy, CARD_POLLING_INTERVAL_MS};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default overall session time limit (12 hours)
pub const DEFAULT_SESSION_DURATION_SECS: u64 = 12 * 60 * 60;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// How often the host polls `get_auth_status` (milliseconds)
    pub poll_interval_ms: u64,

    /// Overall session time limit; `None` disables session expiry
    pub session_duration_secs: Option<u64>,

    /// PIN lockout policy; `None` disables lockout
    pub pin_lockout: Option<LockoutPolicy>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: CARD_POLLING_INTERVAL_MS,
            session_duration_secs: Some(DEFAULT_SESSION_DURATION_SECS),
            pin_lockout: Some(LockoutPolicy::default()),
        }
    }
}

impl AuthConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Expiry for a session starting at `now`
    pub fn session_expires_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.session_duration_secs
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(chrono::Duration::try_seconds)
            .and_then(|duration| now.checked_add_signed(duration))
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
