//! Queue configuration.

use std::time::Duration;

/// Configuration shared by all queue backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// How long a PROCESSING row may go without an update before it becomes
    /// claimable again. `None` disables reclaiming: a worker that dies
    /// mid-pipeline leaves its row in PROCESSING for good.
    pub claim_ttl: Option<Duration>,

    /// Whether re-enqueueing the dedupe key of a FAILED event resets it to
    /// PENDING. When `false` every duplicate enqueue is a no-op, so a failed
    /// filing rediscovered by the watcher is never retried automatically.
    pub retry_failed_on_rediscovery: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            claim_ttl: Some(Duration::from_secs(30 * 60)),
            retry_failed_on_rediscovery: false,
        }
    }
}

impl QueueConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the claim lease (`None` disables reclaiming).
    pub fn with_claim_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.claim_ttl = ttl;
        self
    }

    /// Builder: reset FAILED events to PENDING when they are rediscovered.
    pub fn with_retry_failed_on_rediscovery(mut self, enabled: bool) -> Self {
        self.retry_failed_on_rediscovery = enabled;
        self
    }

    /// Loads configuration from environment variables.
    ///
    /// `QUEUE_CLAIM_TTL_SECS=0` disables reclaiming.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(secs) = std::env::var("QUEUE_CLAIM_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.claim_ttl = if secs == 0 {
                None
            } else {
                Some(Duration::from_secs(secs))
            };
        }

        if let Ok(val) = std::env::var("QUEUE_RETRY_FAILED_ON_REDISCOVERY") {
            config.retry_failed_on_rediscovery = val.to_lowercase() == "true" || val == "1";
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_defaults() {
        let config = QueueConfig::default();
        assert_eq!(config.claim_ttl, Some(Duration::from_secs(1800)));
        assert!(!config.retry_failed_on_rediscovery);
    }

    #[test]
    fn test_builder() {
        let config = QueueConfig::new()
            .with_claim_ttl(None)
            .with_retry_failed_on_rediscovery(true);

        assert!(config.claim_ttl.is_none());
        assert!(config.retry_failed_on_rediscovery);
    }

    #[test]
    fn test_from_env_zero_ttl_disables_reclaim() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let saved_ttl = std::env::var("QUEUE_CLAIM_TTL_SECS").ok();
        let saved_retry = std::env::var("QUEUE_RETRY_FAILED_ON_REDISCOVERY").ok();

        std::env::set_var("QUEUE_CLAIM_TTL_SECS", "0");
        std::env::set_var("QUEUE_RETRY_FAILED_ON_REDISCOVERY", "true");

        let config = QueueConfig::from_env();
        assert!(config.claim_ttl.is_none());
        assert!(config.retry_failed_on_rediscovery);

        std::env::set_var("QUEUE_CLAIM_TTL_SECS", "90");
        assert_eq!(QueueConfig::from_env().claim_ttl, Some(Duration::from_secs(90)));

        for (key, value) in [
            ("QUEUE_CLAIM_TTL_SECS", saved_ttl),
            ("QUEUE_RETRY_FAILED_ON_REDISCOVERY", saved_retry),
        ] {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }
}
