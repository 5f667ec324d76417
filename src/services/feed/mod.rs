//! Filings feed watcher.
//!
//! Polls an Atom feed of newly published filings, maps each entry's CIK to
//! an internal ticker and enqueues one [`NewEvent`](crate::models::NewEvent)
//! per filing. Entry ids already handled are remembered in a bounded LRU
//! set; the queue's dedupe key remains the authority on duplicates.

pub mod atom;
pub mod config;
pub mod tickers;
pub mod title;
pub mod watcher;

pub use atom::{parse_feed, FeedEntry, FeedSource, HttpFeedSource};
pub use config::WatcherConfig;
pub use tickers::{parse_ticker_map, HttpTickerSource, StaticTickerSource, TickerMap, TickerSource};
pub use title::{normalize_cik, parse_title, ParsedTitle};
pub use watcher::{FeedWatcher, PollStats, WatcherContext};
