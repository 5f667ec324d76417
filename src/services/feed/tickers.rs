//! CIK → ticker resolution.

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use super::config::WatcherConfig;
use super::title::normalize_cik;

/// Map from zero-padded CIK to upper-case ticker.
pub type TickerMap = HashMap<String, String>;

#[async_trait]
pub trait TickerSource: Send + Sync {
    /// Loads the full map.
    async fn load(&self) -> Result<TickerMap>;
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CikField {
    Number(u64),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct CompanyTicker {
    cik_str: CikField,
    ticker: String,
}

/// Parses the `company_tickers.json` shape:
/// `{"0": {"cik_str": 320193, "ticker": "AAPL", "title": "…"}, …}`.
///
/// Keys are row numbers; when a CIK appears more than once the lowest row
/// wins, matching the listing's own ordering of primary share classes.
pub fn parse_ticker_map(json: &str) -> Result<TickerMap> {
    let rows: HashMap<String, CompanyTicker> =
        serde_json::from_str(json).context("Invalid ticker map JSON")?;

    let mut ordered: Vec<(u64, CompanyTicker)> = rows
        .into_iter()
        .map(|(key, row)| (key.parse().unwrap_or(u64::MAX), row))
        .collect();
    ordered.sort_by_key(|(row, _)| *row);

    let mut map = TickerMap::with_capacity(ordered.len());
    for (_, row) in ordered {
        let raw = match row.cik_str {
            CikField::Number(n) => n.to_string(),
            CikField::Text(s) => s,
        };
        let ticker = row.ticker.trim().to_uppercase();
        if ticker.is_empty() {
            continue;
        }
        if let Some(cik) = normalize_cik(&raw) {
            map.entry(cik).or_insert(ticker);
        }
    }

    Ok(map)
}

/// Ticker map downloaded over HTTP.
pub struct HttpTickerSource {
    client: Client,
    url: String,
}

impl HttpTickerSource {
    pub fn new(config: &WatcherConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build ticker map HTTP client")?;

        Ok(Self {
            client,
            url: config.ticker_map_url.clone(),
        })
    }
}

#[async_trait]
impl TickerSource for HttpTickerSource {
    async fn load(&self) -> Result<TickerMap> {
        debug!("Downloading ticker map from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch ticker map {}", self.url))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Ticker map {} returned {}", self.url, status);
        }

        let body = response.text().await.context("Failed to read ticker map")?;
        let map = parse_ticker_map(&body)?;
        info!("Loaded {} CIK -> ticker mappings", map.len());
        Ok(map)
    }
}

/// Fixed in-memory map.
#[derive(Debug, Clone, Default)]
pub struct StaticTickerSource {
    map: TickerMap,
}

impl StaticTickerSource {
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let map = pairs
            .into_iter()
            .filter_map(|(cik, ticker)| {
                normalize_cik(cik.as_ref()).map(|c| (c, ticker.as_ref().to_uppercase()))
            })
            .collect();
        Self { map }
    }
}

#[async_trait]
impl TickerSource for StaticTickerSource {
    async fn load(&self) -> Result<TickerMap> {
        Ok(self.map.clone())
    }
}
