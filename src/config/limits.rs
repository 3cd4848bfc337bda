use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Sliding-window rate limiting with temporary bans, keyed on the
/// resolved client IP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Attempts permitted inside one window. Zero rejects everything.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Window length in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Ban duration in seconds once the window fills. Zero disables the
    /// penalty but still closes the window.
    #[serde(default = "default_ban_secs")]
    pub ban_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts: default_max_attempts(),
            window_secs: default_window_secs(),
            ban_secs: default_ban_secs(),
        }
    }
}

impl RateLimitConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.window_secs == 0 {
            return Err(ConfigError::Validation(
                "rate_limit.window_secs must be positive when enabled".into(),
            ));
        }
        Ok(())
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_window_secs() -> u64 {
    300
}

fn default_ban_secs() -> u64 {
    900
}
