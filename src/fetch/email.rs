//! Mailbox-directory adapter (category: email).
//!
//! Research emails land in a directory as `.txt`/`.eml` files (exported by
//! whatever mail pipeline feeds the system). This fetcher never touches the
//! network: it scans the directory, keeps messages that mention the symbol,
//! and reads them in filename order so results are reproducible.

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;

use crate::document::Document;
use crate::fetch::{normalize_text, SourceFetcher};
use crate::registry::Category;

pub struct MailboxFetcher {
    dir: PathBuf,
}

impl MailboxFetcher {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn mentions_symbol(text: &str, symbol: &str) -> bool {
        let upper = text.to_ascii_uppercase();
        let sym = symbol.to_ascii_uppercase();
        upper
            .match_indices(&sym)
            .any(|(i, _)| {
                let before = upper[..i].chars().next_back();
                let after = upper[i + sym.len()..].chars().next();
                let boundary = |c: Option<char>| c.map_or(true, |c| !c.is_ascii_alphanumeric());
                boundary(before) && boundary(after)
            })
    }
}

#[async_trait]
impl SourceFetcher for MailboxFetcher {
    async fn fetch(&self, symbol: &str, limit: usize) -> Result<Vec<Document>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.dir)
            .with_context(|| format!("reading mailbox dir {}", self.dir.display()))?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| {
                matches!(
                    p.extension().and_then(|e| e.to_str()),
                    Some("txt") | Some("eml")
                )
            })
            .collect();
        paths.sort();

        let mut out = Vec::new();
        for path in paths {
            if out.len() >= limit {
                break;
            }
            let raw = match std::fs::read_to_string(&path) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(error = ?e, path = %path.display(), "skipping unreadable mail file");
                    continue;
                }
            };
            if !Self::mentions_symbol(&raw, symbol) {
                continue;
            }
            let body = normalize_text(&raw);
            if body.is_empty() {
                continue;
            }
            out.push(Document::new("EMAIL", symbol, body));
        }

        counter!("fetch_documents_total", "provider" => "EMAIL").increment(out.len() as u64);
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "EMAIL"
    }

    fn category(&self) -> Category {
        Category::Email
    }
}
