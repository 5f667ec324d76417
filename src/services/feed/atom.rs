//! Atom feed retrieval and parsing.
//!
//! Entries are read with the same HTML5 parser used for documents. Atom
//! element names are unknown to it, so `<entry>` and its children come out
//! as generic elements; a self-closed non-void element such as
//! `<category/>` may swallow its following siblings, which is why fields are
//! looked up among all descendants of an entry rather than direct children.

use std::sync::OnceLock;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::config::WatcherConfig;

/// One `<entry>` of the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub id: String,
    pub title: String,
    pub updated: Option<DateTime<Utc>>,
    pub link: Option<String>,
}

#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetches the current entries, newest first as published.
    async fn fetch_entries(&self) -> Result<Vec<FeedEntry>>;
}

struct EntrySelectors {
    entry: Selector,
    id: Selector,
    title: Selector,
    updated: Selector,
    link: Selector,
}

fn selectors() -> &'static EntrySelectors {
    static SELECTORS: OnceLock<EntrySelectors> = OnceLock::new();
    SELECTORS.get_or_init(|| EntrySelectors {
        entry: Selector::parse("entry").expect("static entry selector is valid"),
        id: Selector::parse("id").expect("static id selector is valid"),
        title: Selector::parse("title").expect("static title selector is valid"),
        updated: Selector::parse("updated").expect("static updated selector is valid"),
        link: Selector::parse("link[href]").expect("static link selector is valid"),
    })
}

fn first_text(entry: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    let text: String = entry.select(selector).next()?.text().collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Parses every entry of an Atom document. Entries without a title are
/// skipped; a missing id falls back to the link.
pub fn parse_feed(xml: &str) -> Vec<FeedEntry> {
    let document = Html::parse_document(xml);
    let sel = selectors();

    document
        .select(&sel.entry)
        .filter_map(|entry| {
            let title = first_text(&entry, &sel.title)?;
            let link = entry
                .select(&sel.link)
                .next()
                .and_then(|l| l.value().attr("href"))
                .map(|href| href.trim().to_string());
            let updated = first_text(&entry, &sel.updated).and_then(|raw| {
                DateTime::parse_from_rfc3339(&raw)
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc))
            });
            let id = first_text(&entry, &sel.id).or_else(|| link.clone())?;

            Some(FeedEntry {
                id,
                title,
                updated,
                link,
            })
        })
        .collect()
}

/// Feed fetched over HTTP.
pub struct HttpFeedSource {
    client: Client,
    url: String,
}

impl HttpFeedSource {
    pub fn new(config: &WatcherConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build feed HTTP client")?;

        Ok(Self {
            client,
            url: config.feed_url.clone(),
        })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch_entries(&self) -> Result<Vec<FeedEntry>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch feed {}", self.url))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Feed {} returned {}", self.url, status);
        }

        let body = response.text().await.context("Failed to read feed body")?;
        let entries = parse_feed(&body);
        debug!("Feed returned {} entries", entries.len());
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="ISO-8859-1" ?>
<feed xmlns="http://www.w3.org/2005/Atom">
<title>Latest Filings</title>
<link rel="self" href="https://example.test/cgi-bin/browse-edgar?action=getcurrent"/>
<updated>2024-03-01T16:10:00-05:00</updated>
<entry>
<title>10-K - Example Co. (0000123456) (Filer)</title>
<link rel="alternate" type="text/html" href="https://example.test/0000123456/index.htm"/>
<summary type="html"> &lt;b&gt;Filed:&lt;/b&gt; 2024-03-01 </summary>
<updated>2024-03-01T16:05:12-05:00</updated>
<category scheme="https://example.test/" label="form type" term="10-K"/>
<id>urn:tag:example.test,2008:accession-number=0000123456-24-000001</id>
</entry>
<entry>
<title>4 - Smith John (0000999999) (Reporting)</title>
<link rel="alternate" type="text/html" href="https://example.test/0000999999/index.htm"/>
<updated>not a date</updated>
<id>urn:tag:example.test,2008:accession-number=0000999999-24-000002</id>
</entry>
</feed>"#;

    #[test]
    fn test_parse_entries() {
        let entries = parse_feed(FEED);
        assert_eq!(entries.len(), 2);

        let first = &entries[0];
        assert_eq!(first.title, "10-K - Example Co. (0000123456) (Filer)");
        assert_eq!(first.link.as_deref(), Some("https://example.test/0000123456/index.htm"));
        assert_eq!(
            first.id,
            "urn:tag:example.test,2008:accession-number=0000123456-24-000001"
        );
        assert_eq!(
            first.updated,
            Some(
                DateTime::parse_from_rfc3339("2024-03-01T21:05:12Z")
                    .unwrap()
                    .with_timezone(&Utc)
            )
        );
    }

    #[test]
    fn test_bad_timestamp_is_none() {
        let entries = parse_feed(FEED);
        assert!(entries[1].updated.is_none());
    }

    #[test]
    fn test_feed_title_not_taken_as_entry() {
        let entries = parse_feed(FEED);
        assert!(entries.iter().all(|e| e.title != "Latest Filings"));
    }

    #[test]
    fn test_missing_id_falls_back_to_link() {
        let xml = r#"<feed><entry><title>8-K - A (1) (Filer)</title><link href="https://example.test/a"/></entry></feed>"#;
        let entries = parse_feed(xml);
        assert_eq!(entries[0].id, "https://example.test/a");
    }

    #[test]
    fn test_garbage_input() {
        assert!(parse_feed("not xml at all").is_empty());
    }
}
