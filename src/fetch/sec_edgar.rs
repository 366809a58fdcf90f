//! SEC EDGAR company-filings adapter (category: sec).
//!
//! EDGAR exposes filings as an Atom feed and rejects clients without a
//! descriptive `User-Agent`, so the UA string acts as this provider's
//! credential.

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::document::Document;
use crate::fetch::{normalize_text, SourceFetcher};
use crate::registry::Category;

const DEFAULT_BASE: &str = "https://www.sec.gov";

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    title: Option<String>,
    updated: Option<String>,
    summary: Option<String>,
}

fn parse_rfc3339_date(ts: &str) -> Option<String> {
    OffsetDateTime::parse(ts, &Rfc3339)
        .ok()
        .map(|dt| dt.date().to_string())
}

pub struct SecEdgarFetcher {
    user_agent: String,
    client: reqwest::Client,
    base: String,
}

impl SecEdgarFetcher {
    pub fn new(user_agent: String, client: reqwest::Client) -> Self {
        Self {
            user_agent,
            client,
            base: DEFAULT_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    fn parse_feed(symbol: &str, xml: &str, limit: usize) -> Result<Vec<Document>> {
        let t0 = std::time::Instant::now();
        let feed: Feed = from_str(xml).context("parsing edgar atom feed")?;

        let mut out = Vec::new();
        for entry in feed.entries.into_iter().take(limit) {
            let title = entry.title.as_deref().unwrap_or_default();
            if title.is_empty() {
                continue;
            }
            let filed = entry
                .updated
                .as_deref()
                .and_then(parse_rfc3339_date)
                .unwrap_or_else(|| "an unknown date".to_string());
            let body = normalize_text(&format!(
                "SEC filing for {}: {} filed {}. {}",
                symbol,
                title,
                filed,
                entry.summary.as_deref().unwrap_or_default(),
            ));
            out.push(Document::new("EDGAR", symbol, body));
        }

        histogram!("fetch_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("fetch_documents_total", "provider" => "EDGAR").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl SourceFetcher for SecEdgarFetcher {
    async fn fetch(&self, symbol: &str, limit: usize) -> Result<Vec<Document>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let url = format!("{}/cgi-bin/browse-edgar", self.base);
        let xml = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .query(&[
                ("action", "getcompany".to_string()),
                ("company", symbol.to_string()),
                ("type", "10-K".to_string()),
                ("owner", "include".to_string()),
                ("count", limit.to_string()),
                ("output", "atom".to_string()),
            ])
            .send()
            .await
            .context("edgar get")?
            .error_for_status()
            .context("edgar status")?
            .text()
            .await
            .context("edgar body")?;
        Self::parse_feed(symbol, &xml, limit)
    }

    fn name(&self) -> &'static str {
        "EDGAR"
    }

    fn category(&self) -> Category {
        Category::Sec
    }
}
