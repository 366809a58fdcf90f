//! Per-source fetchers. One adapter per provider, all behind the
//! [`SourceFetcher`] trait; each converts a provider-specific payload into
//! plain-text [`Document`]s. A fetcher's failure is its own: the aggregator
//! turns any `Err` into zero documents plus a logged warning, so one broken
//! provider never takes down the fan-out.

pub mod alpha_vantage;
pub mod benzinga;
pub mod email;
pub mod finnhub;
pub mod fmp;
pub mod marketaux;
pub mod newsapi;
pub mod polygon;
pub mod sec_edgar;

use std::time::Duration;

use anyhow::Result;
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::document::Document;
use crate::registry::Category;

/// Common interface for every provider adapter.
#[async_trait::async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Retrieve up to `limit` items for `symbol`. `limit == 0` must return
    /// an empty list without touching the network.
    async fn fetch(&self, symbol: &str, limit: usize) -> Result<Vec<Document>>;
    fn name(&self) -> &'static str;
    fn category(&self) -> Category;
}

/// Shared HTTP client for all providers; one timeout governs every call.
pub fn build_http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(Into::into)
}

/// Normalize provider text before it becomes a document body: decode HTML
/// entities, strip tags, unify typographic quotes, collapse whitespace, and
/// cap the length so one bloated article cannot dominate the index.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // Length cap: 4000 chars, generous for RAG chunking.
    if out.chars().count() > 4000 {
        out = out.chars().take(4000).collect();
    }

    out
}

/// Reject symbols the providers would choke on; the aggregator treats a
/// violation as a per-symbol failure, not a batch abort.
pub fn validate_symbol(symbol: &str) -> Result<()> {
    let s = symbol.trim();
    anyhow::ensure!(!s.is_empty(), "symbol must be non-empty");
    anyhow::ensure!(
        s.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-'),
        "symbol {s:?} contains unsupported characters"
    );
    Ok(())
}
