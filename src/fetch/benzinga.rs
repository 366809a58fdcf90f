//! Benzinga analyst-ratings calendar adapter (category: research).
//!
//! Ratings are rendered as prose ("maintains a Buy rating ... price target
//! of $150") so the entity annotator can attach `[RATING:..]` and
//! `[PRICE_TARGET:..]` markers downstream.

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use serde::Deserialize;

use crate::document::Document;
use crate::fetch::{normalize_text, SourceFetcher};
use crate::registry::Category;

const DEFAULT_BASE: &str = "https://api.benzinga.com";

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    ratings: Vec<RatingItem>,
}

#[derive(Debug, Deserialize)]
struct RatingItem {
    analyst: Option<String>,
    #[serde(rename = "rating_current")]
    rating: Option<String>,
    #[serde(rename = "pt_current")]
    price_target: Option<String>,
    date: Option<String>,
}

pub struct BenzingaFetcher {
    token: String,
    client: reqwest::Client,
    base: String,
}

impl BenzingaFetcher {
    pub fn new(token: String, client: reqwest::Client) -> Self {
        Self {
            token,
            client,
            base: DEFAULT_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    fn render(symbol: &str, envelope: Envelope, limit: usize) -> Vec<Document> {
        let mut out = Vec::new();
        for r in envelope.ratings.into_iter().take(limit) {
            let analyst = r.analyst.as_deref().unwrap_or("An analyst");
            let mut body = format!(
                "{} maintains a {} rating on {}",
                analyst,
                r.rating.as_deref().unwrap_or("Hold"),
                symbol,
            );
            if let Some(pt) = r.price_target.as_deref().filter(|p| !p.is_empty()) {
                body.push_str(&format!(" with a price target of ${pt}"));
            }
            if let Some(d) = r.date.as_deref() {
                body.push_str(&format!(" ({d})"));
            }
            let body = normalize_text(&body);
            if body.is_empty() {
                continue;
            }
            out.push(Document::new("BENZINGA", symbol, body).with_confidence(0.9));
        }
        counter!("fetch_documents_total", "provider" => "BENZINGA").increment(out.len() as u64);
        out
    }
}

#[async_trait]
impl SourceFetcher for BenzingaFetcher {
    async fn fetch(&self, symbol: &str, limit: usize) -> Result<Vec<Document>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let url = format!("{}/api/v2.1/calendar/ratings", self.base);
        let envelope: Envelope = self
            .client
            .get(&url)
            .query(&[
                ("parameters[tickers]", symbol.to_string()),
                ("pagesize", limit.to_string()),
                ("token", self.token.clone()),
            ])
            .send()
            .await
            .context("benzinga get")?
            .error_for_status()
            .context("benzinga status")?
            .json()
            .await
            .context("benzinga json")?;
        Ok(Self::render(symbol, envelope, limit))
    }

    fn name(&self) -> &'static str {
        "BENZINGA"
    }

    fn category(&self) -> Category {
        Category::Research
    }
}
