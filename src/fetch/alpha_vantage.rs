//! Alpha Vantage `GLOBAL_QUOTE` adapter (category: market).
//!
//! The quote endpoint yields a single snapshot, so this fetcher returns at
//! most one document regardless of the requested limit.

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use serde::Deserialize;

use crate::document::Document;
use crate::fetch::SourceFetcher;
use crate::registry::Category;

const DEFAULT_BASE: &str = "https://www.alphavantage.co";

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "Global Quote")]
    quote: Option<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(rename = "05. price")]
    price: Option<String>,
    #[serde(rename = "09. change")]
    change: Option<String>,
    #[serde(rename = "10. change percent")]
    change_percent: Option<String>,
    #[serde(rename = "06. volume")]
    volume: Option<String>,
    #[serde(rename = "07. latest trading day")]
    trading_day: Option<String>,
}

pub struct AlphaVantageFetcher {
    api_key: String,
    client: reqwest::Client,
    base: String,
}

impl AlphaVantageFetcher {
    pub fn new(api_key: String, client: reqwest::Client) -> Self {
        Self {
            api_key,
            client,
            base: DEFAULT_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    fn render(symbol: &str, envelope: Envelope) -> Vec<Document> {
        let Some(q) = envelope.quote else {
            return Vec::new();
        };
        let Some(price) = q.price.as_deref().filter(|p| !p.is_empty()) else {
            // Alpha Vantage answers rate-limited calls with an empty quote.
            return Vec::new();
        };
        let body = format!(
            "{} traded at {} on {} (change {}, {}; volume {}).",
            symbol,
            price,
            q.trading_day.as_deref().unwrap_or("the latest session"),
            q.change.as_deref().unwrap_or("n/a"),
            q.change_percent.as_deref().unwrap_or("n/a"),
            q.volume.as_deref().unwrap_or("n/a"),
        );
        counter!("fetch_documents_total", "provider" => "ALPHAVANTAGE").increment(1);
        vec![Document::new("ALPHAVANTAGE", symbol, body)]
    }
}

#[async_trait]
impl SourceFetcher for AlphaVantageFetcher {
    async fn fetch(&self, symbol: &str, limit: usize) -> Result<Vec<Document>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let url = format!("{}/query", self.base);
        let envelope: Envelope = self
            .client
            .get(&url)
            .query(&[
                ("function", "GLOBAL_QUOTE".to_string()),
                ("symbol", symbol.to_string()),
                ("apikey", self.api_key.clone()),
            ])
            .send()
            .await
            .context("alpha vantage get")?
            .error_for_status()
            .context("alpha vantage status")?
            .json()
            .await
            .context("alpha vantage json")?;
        Ok(Self::render(symbol, envelope))
    }

    fn name(&self) -> &'static str {
        "ALPHAVANTAGE"
    }

    fn category(&self) -> Category {
        Category::Market
    }
}
