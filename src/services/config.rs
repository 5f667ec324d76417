//! Worker and on-demand trigger configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the ingestion workers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Number of worker loops the binary spawns.
    pub count: usize,

    /// Sleep after an empty claim or a queue error.
    pub poll_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: 2,
            poll_interval: Duration::from_secs(5),
        }
    }
}

impl WorkerConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set worker count.
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count.max(1);
        self
    }

    /// Builder: set poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Creates configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("WORKER_COUNT") {
            if let Ok(count) = val.parse::<usize>() {
                config.count = count.max(1);
            }
        }

        if let Ok(val) = std::env::var("WORKER_POLL_INTERVAL_SECS") {
            if let Ok(secs) = val.parse::<u64>() {
                config.poll_interval = Duration::from_secs(secs.max(1));
            }
        }

        config
    }
}

/// Configuration for synchronous on-demand requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// How long `request` waits for a terminal state. Zero returns right
    /// after enqueueing.
    pub wait_timeout: Duration,

    /// Delay between status checks while waiting.
    pub poll_interval: Duration,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            wait_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl TriggerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set wait timeout.
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Builder: set poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Creates configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("TRIGGER_WAIT_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse::<u64>() {
                config.wait_timeout = Duration::from_secs(secs);
            }
        }

        if let Ok(val) = std::env::var("TRIGGER_POLL_INTERVAL_MS") {
            if let Ok(ms) = val.parse::<u64>() {
                config.poll_interval = Duration::from_millis(ms.max(1));
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn with_env<F: FnOnce()>(vars: &[(&str, &str)], f: F) {
        let _lock = ENV_MUTEX.lock().unwrap();
        let saved: Vec<_> = vars
            .iter()
            .map(|(k, _)| (k.to_string(), std::env::var(k).ok()))
            .collect();
        for (k, v) in vars {
            std::env::set_var(k, v);
        }

        f();

        for (key, value) in saved {
            match value {
                Some(v) => std::env::set_var(&key, v),
                None => std::env::remove_var(&key),
            }
        }
    }

    #[test]
    fn test_worker_config_default() {
        let config = WorkerConfig::default();
        assert_eq!(config.count, 2);
        assert_eq!(config.poll_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_worker_count_never_zero() {
        assert_eq!(WorkerConfig::new().with_count(0).count, 1);
        with_env(&[("WORKER_COUNT", "0")], || {
            assert_eq!(WorkerConfig::from_env().count, 1);
        });
    }

    #[test]
    fn test_worker_config_from_env() {
        with_env(
            &[("WORKER_COUNT", "6"), ("WORKER_POLL_INTERVAL_SECS", "2")],
            || {
                let config = WorkerConfig::from_env();
                assert_eq!(config.count, 6);
                assert_eq!(config.poll_interval, Duration::from_secs(2));
            },
        );
    }

    #[test]
    fn test_trigger_config_from_env() {
        with_env(
            &[
                ("TRIGGER_WAIT_TIMEOUT_SECS", "0"),
                ("TRIGGER_POLL_INTERVAL_MS", "250"),
            ],
            || {
                let config = TriggerConfig::from_env();
                assert!(config.wait_timeout.is_zero());
                assert_eq!(config.poll_interval, Duration::from_millis(250));
            },
        );
    }

    #[test]
    fn test_trigger_config_default() {
        let config = TriggerConfig::default();
        assert_eq!(config.wait_timeout, Duration::from_secs(30));
        assert_eq!(config.poll_interval, Duration::from_millis(500));
    }
}
