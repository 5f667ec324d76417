//! Feed watcher configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::services::ingestion::ConfigError;

/// Configuration for the feed watcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Atom feed of newly published filings.
    pub feed_url: String,

    /// Bulk CIK → ticker JSON map.
    pub ticker_map_url: String,

    /// Delay between polls.
    pub poll_interval: Duration,

    /// Entry ids remembered between polls.
    pub seen_capacity: usize,

    /// Accepted form types; empty accepts every form.
    pub form_types: Vec<String>,

    /// Whether the binary starts the watcher at all.
    pub enabled: bool,

    pub user_agent: String,

    /// Timeout for the feed and ticker map requests.
    pub request_timeout: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            feed_url: "https://www.sec.gov/cgi-bin/browse-edgar?action=getcurrent&type=&company=&dateb=&owner=include&start=0&count=100&output=atom".to_string(),
            ticker_map_url: "https://www.sec.gov/files/company_tickers.json".to_string(),
            poll_interval: Duration::from_secs(60),
            seen_capacity: 10_000,
            form_types: Vec::new(),
            enabled: true,
            user_agent: "filing-ingest/0.1 (ops@example.com)".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl WatcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the feed URL.
    pub fn with_feed_url(mut self, url: impl Into<String>) -> Self {
        self.feed_url = url.into();
        self
    }

    /// Builder: set the ticker map URL.
    pub fn with_ticker_map_url(mut self, url: impl Into<String>) -> Self {
        self.ticker_map_url = url.into();
        self
    }

    /// Builder: set the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Builder: set the seen-set capacity.
    pub fn with_seen_capacity(mut self, capacity: usize) -> Self {
        self.seen_capacity = capacity;
        self
    }

    /// Builder: restrict the accepted form types.
    pub fn with_form_types<I, S>(mut self, forms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.form_types = forms.into_iter().map(Into::into).collect();
        self
    }

    /// Whether entries of `form_type` should be enqueued.
    pub fn accepts_form(&self, form_type: &str) -> bool {
        self.form_types.is_empty()
            || self
                .form_types
                .iter()
                .any(|f| f.eq_ignore_ascii_case(form_type))
    }

    /// Creates configuration from environment variables.
    ///
    /// `FEED_FORM_TYPES` is a comma-separated list (`10-K,10-Q,8-K`).
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("FEED_URL") {
            config.feed_url = val;
        }

        if let Ok(val) = std::env::var("FEED_TICKER_MAP_URL") {
            config.ticker_map_url = val;
        }

        if let Ok(val) = std::env::var("FEED_POLL_INTERVAL_SECS") {
            if let Ok(secs) = val.parse::<u64>() {
                config.poll_interval = Duration::from_secs(secs);
            }
        }

        if let Ok(val) = std::env::var("FEED_SEEN_CAPACITY") {
            if let Ok(cap) = val.parse::<usize>() {
                config.seen_capacity = cap;
            }
        }

        if let Ok(val) = std::env::var("FEED_FORM_TYPES") {
            config.form_types = val
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Ok(val) = std::env::var("FEED_ENABLED") {
            config.enabled = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("FEED_USER_AGENT") {
            config.user_agent = val;
        } else if let Ok(val) = std::env::var("INGESTION_USER_AGENT") {
            config.user_agent = val;
        }

        if let Ok(val) = std::env::var("FEED_REQUEST_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse::<u64>() {
                config.request_timeout = Duration::from_secs(secs);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue("feed poll interval must be positive".into()));
        }
        if self.seen_capacity == 0 {
            return Err(ConfigError::InvalidValue("seen capacity must be at least 1".into()));
        }
        for url in [&self.feed_url, &self.ticker_map_url] {
            if url::Url::parse(url).is_err() {
                return Err(ConfigError::InvalidValue(format!("invalid URL: {}", url)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_accepts_every_form() {
        let config = WatcherConfig::default();
        assert!(config.accepts_form("10-K"));
        assert!(config.accepts_form("SC 13G/A"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_form_allow_list() {
        let config = WatcherConfig::new().with_form_types(["10-K", "8-k"]);
        assert!(config.accepts_form("10-k"));
        assert!(config.accepts_form("8-K"));
        assert!(!config.accepts_form("4"));
    }

    #[test]
    fn test_validation() {
        assert!(WatcherConfig::new().with_seen_capacity(0).validate().is_err());
        assert!(WatcherConfig::new()
            .with_poll_interval(Duration::ZERO)
            .validate()
            .is_err());
        assert!(WatcherConfig::new().with_feed_url("not a url").validate().is_err());
    }

    #[test]
    fn test_from_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let keys = ["FEED_FORM_TYPES", "FEED_POLL_INTERVAL_SECS", "FEED_ENABLED"];
        let saved: Vec<_> = keys.iter().map(|k| (*k, std::env::var(k).ok())).collect();

        std::env::set_var("FEED_FORM_TYPES", " 10-K, 10-Q ,,8-K");
        std::env::set_var("FEED_POLL_INTERVAL_SECS", "15");
        std::env::set_var("FEED_ENABLED", "false");

        let config = WatcherConfig::from_env().unwrap();
        assert_eq!(config.form_types, vec!["10-K", "10-Q", "8-K"]);
        assert_eq!(config.poll_interval, Duration::from_secs(15));
        assert!(!config.enabled);

        for (key, value) in saved {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }
}
