//! Coordinator tuning.

use std::time::Duration;

use accord_shared::EngineConfig;

/// Retry and timeout settings for the commit loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Retries after the first attempt when the store reports a conflict.
    pub max_conflict_retries: u32,
    /// Base backoff; attempt `n` sleeps `n * retry_backoff`.
    pub retry_backoff: Duration,
    /// Upper bound on one commit attempt.
    pub commit_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for CoordinatorConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            max_conflict_retries: config.max_conflict_retries,
            retry_backoff: config.retry_backoff(),
            commit_timeout: config.commit_timeout(),
        }
    }
}

impl CoordinatorConfig {
    /// Backoff before retry number `attempt` (1-based).
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.retry_backoff.saturating_mul(attempt)
    }
}
