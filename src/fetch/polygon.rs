//! Polygon previous-day aggregate adapter (category: market).

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use serde::Deserialize;

use crate::document::Document;
use crate::fetch::SourceFetcher;
use crate::registry::Category;

const DEFAULT_BASE: &str = "https://api.polygon.io";

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    results: Vec<Bar>,
}

#[derive(Debug, Deserialize)]
struct Bar {
    o: Option<f64>,
    h: Option<f64>,
    l: Option<f64>,
    c: Option<f64>,
    v: Option<f64>,
}

pub struct PolygonFetcher {
    api_key: String,
    client: reqwest::Client,
    base: String,
}

impl PolygonFetcher {
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

    fn render(symbol: &str, envelope: Envelope, limit: usize) -> Vec<Document> {
        let mut out = Vec::new();
        for bar in envelope.results.into_iter().take(limit) {
            let (Some(o), Some(h), Some(l), Some(c)) = (bar.o, bar.h, bar.l, bar.c) else {
                continue;
            };
            let body = format!(
                "{} previous session: open {:.2}, high {:.2}, low {:.2}, close {:.2}, volume {:.0}.",
                symbol,
                o,
                h,
                l,
                c,
                bar.v.unwrap_or(0.0),
            );
            out.push(Document::new("POLYGON", symbol, body));
        }
        counter!("fetch_documents_total", "provider" => "POLYGON").increment(out.len() as u64);
        out
    }
}

#[async_trait]
impl SourceFetcher for PolygonFetcher {
    async fn fetch(&self, symbol: &str, limit: usize) -> Result<Vec<Document>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let url = format!("{}/v2/aggs/ticker/{}/prev", self.base, symbol);
        let envelope: Envelope = self
            .client
            .get(&url)
            .query(&[
                ("adjusted", "true".to_string()),
                ("apiKey", self.api_key.clone()),
            ])
            .send()
            .await
            .context("polygon get")?
            .error_for_status()
            .context("polygon status")?
            .json()
            .await
            .context("polygon json")?;
        Ok(Self::render(symbol, envelope, limit))
    }

    fn name(&self) -> &'static str {
        "POLYGON"
    }

    fn category(&self) -> Category {
        Category::Market
    }
}
