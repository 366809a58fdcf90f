//! # Document
//!
//! The unit of ingested text. Every document handed to the knowledge index
//! carries an inline provenance header of the exact form
//!
//! ```text
//! [SOURCE:FMP|SYMBOL:NVDA]
//! <document body text>
//! ```
//!
//! The header is plain text on purpose: it must survive any downstream
//! persistence so that later statistics code can recover provenance by
//! parsing it back out, without a side-channel.

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One unit of ingested text, created by a fetcher and immutable afterward.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Body text; after tagging, starts with the `[SOURCE:..|SYMBOL:..]` header.
    pub text: String,
    /// Provider name, e.g. "FMP", "NEWSAPI".
    pub source: String,
    /// Ticker this document was fetched for, if any.
    pub symbol: Option<String>,
    /// Document-level extraction confidence, if a fetcher assigns one.
    pub confidence: Option<f32>,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn new(source: impl Into<String>, symbol: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            symbol: Some(symbol.into()),
            confidence: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    /// Prefix the source header onto the body. Idempotent: a text already
    /// carrying a header is left unchanged.
    pub fn tag_source(&mut self) {
        if parse_source_marker(&self.text).is_some() {
            return;
        }
        let symbol = self.symbol.as_deref().unwrap_or("UNKNOWN");
        self.text = format!(
            "{}\n{}",
            format_source_marker(&self.source, symbol),
            self.text
        );
    }
}

/// Render the header exactly as downstream tooling expects it.
pub fn format_source_marker(source: &str, symbol: &str) -> String {
    format!(
        "[SOURCE:{}|SYMBOL:{}]",
        source.to_ascii_uppercase(),
        symbol.to_ascii_uppercase()
    )
}

fn source_marker_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r"\[SOURCE:([A-Z0-9_]+)\|SYMBOL:([A-Z0-9.\-]+)\]").unwrap()
    })
}

/// Recover `(source, symbol)` from a tagged text, or `None` when untagged.
pub fn parse_source_marker(text: &str) -> Option<(String, String)> {
    source_marker_re()
        .captures(text)
        .map(|c| (c[1].to_string(), c[2].to_string()))
}
