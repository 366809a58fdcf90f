//! Finnhub quarterly earnings-surprise adapter (category: financial).

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use serde::Deserialize;

use crate::document::Document;
use crate::fetch::SourceFetcher;
use crate::registry::Category;

const DEFAULT_BASE: &str = "https://finnhub.io";

#[derive(Debug, Deserialize)]
struct Earnings {
    period: Option<String>,
    actual: Option<f64>,
    estimate: Option<f64>,
    surprise: Option<f64>,
    #[serde(rename = "surprisePercent")]
    surprise_percent: Option<f64>,
}

pub struct FinnhubFetcher {
    token: String,
    client: reqwest::Client,
    base: String,
}

impl FinnhubFetcher {
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

    fn render(symbol: &str, earnings: Vec<Earnings>, limit: usize) -> Vec<Document> {
        let mut out = Vec::new();
        for e in earnings.into_iter().take(limit) {
            let (Some(actual), Some(estimate)) = (e.actual, e.estimate) else {
                continue;
            };
            let mut body = format!(
                "{} earnings for {}: EPS {:.2} vs estimate {:.2}",
                symbol,
                e.period.as_deref().unwrap_or("an undisclosed period"),
                actual,
                estimate,
            );
            if let (Some(s), Some(p)) = (e.surprise, e.surprise_percent) {
                body.push_str(&format!(" (surprise {:+.2}, {:+.2}%)", s, p));
            }
            body.push('.');
            out.push(Document::new("FINNHUB", symbol, body));
        }
        counter!("fetch_documents_total", "provider" => "FINNHUB").increment(out.len() as u64);
        out
    }
}

#[async_trait]
impl SourceFetcher for FinnhubFetcher {
    async fn fetch(&self, symbol: &str, limit: usize) -> Result<Vec<Document>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let url = format!("{}/api/v1/stock/earnings", self.base);
        let earnings: Vec<Earnings> = self
            .client
            .get(&url)
            .query(&[
                ("symbol", symbol.to_string()),
                ("token", self.token.clone()),
            ])
            .send()
            .await
            .context("finnhub get")?
            .error_for_status()
            .context("finnhub status")?
            .json()
            .await
            .context("finnhub json")?;
        Ok(Self::render(symbol, earnings, limit))
    }

    fn name(&self) -> &'static str {
        "FINNHUB"
    }

    fn category(&self) -> Category {
        Category::Financial
    }
}
