//! Batch pacing configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Fixed delay between records, in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Emit a progress line every N records (0 disables).
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,

    /// Re-acquire the bearer token once it is older than this many seconds.
    #[serde(default = "default_token_refresh_secs")]
    pub token_refresh_secs: u64,

    /// Cache resolved roles by name for the duration of a run.
    #[serde(default = "default_cache_roles")]
    pub cache_roles: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            progress_every: default_progress_every(),
            token_refresh_secs: default_token_refresh_secs(),
            cache_roles: default_cache_roles(),
        }
    }
}

impl BatchConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn token_refresh(&self) -> Duration {
        Duration::from_secs(self.token_refresh_secs)
    }
}

fn default_delay_ms() -> u64 {
    100
}

fn default_progress_every() -> usize {
    50
}

fn default_token_refresh_secs() -> u64 {
    240
}

fn default_cache_roles() -> bool {
    true
}
