//! # Entity markers
//!
//! Inline annotations embedded in document text, each carrying its own
//! confidence score:
//!
//! ```text
//! [TICKER:NVDA|confidence:0.95]
//! [RATING:BUY|confidence:0.88]
//! [PRICE_TARGET:150.00|currency:USD|confidence:0.80]
//! ```
//!
//! Two populations of markers coexist in indexed text: high-confidence ones
//! written by our own extractor, and lower-confidence ones the downstream
//! RAG library produces during graph construction. Provenance is modeled as
//! an explicit tag on each marker so query-time filtering can reason about
//! it instead of comparing opaque scores.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Where a marker came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Written by the dedicated high-precision extractor.
    Validated,
    /// Produced by the indexing library's automatic extraction pass.
    Automatic,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Rating {
    Buy,
    Sell,
    Hold,
}

impl Rating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Buy => "BUY",
            Rating::Sell => "SELL",
            Rating::Hold => "HOLD",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "BUY" => Some(Rating::Buy),
            "SELL" => Some(Rating::Sell),
            "HOLD" => Some(Rating::Hold),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    Ticker { symbol: String },
    Rating { rating: Rating },
    PriceTarget { value: f64, currency: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityMarker {
    pub entity: Entity,
    pub provenance: Provenance,
    pub confidence: f32,
}

impl EntityMarker {
    pub fn validated(entity: Entity, confidence: f32) -> Self {
        Self {
            entity,
            provenance: Provenance::Validated,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Render the marker in its inline text form.
    pub fn render(&self) -> String {
        match &self.entity {
            Entity::Ticker { symbol } => {
                format!("[TICKER:{}|confidence:{:.2}]", symbol, self.confidence)
            }
            Entity::Rating { rating } => {
                format!("[RATING:{}|confidence:{:.2}]", rating.as_str(), self.confidence)
            }
            Entity::PriceTarget { value, currency } => format!(
                "[PRICE_TARGET:{:.2}|currency:{}|confidence:{:.2}]",
                value, currency, self.confidence
            ),
        }
    }
}

fn ticker_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\[TICKER:([A-Z0-9.\-]+)\|confidence:([0-9.]+)\]").unwrap())
}

fn rating_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\[RATING:(BUY|SELL|HOLD)\|confidence:([0-9.]+)\]").unwrap())
}

fn price_target_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r"\[PRICE_TARGET:([0-9.]+)\|currency:([A-Z]{3})\|confidence:([0-9.]+)\]")
            .unwrap()
    })
}

/// Parse every entity marker out of a text, in order of appearance.
///
/// The inline format does not carry provenance, so parsed markers are
/// classified against `validation_threshold`: at or above it they are treated
/// as coming from the validated extraction pass, below it as automatic
/// library output. This mirrors the query-time rule the rest of the system
/// applies.
pub fn parse_markers(text: &str, validation_threshold: f32) -> Vec<EntityMarker> {
    let classify = |confidence: f32| {
        if confidence >= validation_threshold {
            Provenance::Validated
        } else {
            Provenance::Automatic
        }
    };

    // Collect (position, marker) so the three kinds interleave in text order.
    let mut found: Vec<(usize, EntityMarker)> = Vec::new();

    for c in ticker_re().captures_iter(text) {
        if let Ok(conf) = c[2].parse::<f32>() {
            found.push((
                c.get(0).unwrap().start(),
                EntityMarker {
                    entity: Entity::Ticker {
                        symbol: c[1].to_string(),
                    },
                    provenance: classify(conf),
                    confidence: conf,
                },
            ));
        }
    }
    for c in rating_re().captures_iter(text) {
        let (Some(rating), Ok(conf)) = (Rating::parse(&c[1]), c[2].parse::<f32>()) else {
            continue;
        };
        found.push((
            c.get(0).unwrap().start(),
            EntityMarker {
                entity: Entity::Rating { rating },
                provenance: classify(conf),
                confidence: conf,
            },
        ));
    }
    for c in price_target_re().captures_iter(text) {
        let (Ok(value), Ok(conf)) = (c[1].parse::<f64>(), c[3].parse::<f32>()) else {
            continue;
        };
        found.push((
            c.get(0).unwrap().start(),
            EntityMarker {
                entity: Entity::PriceTarget {
                    value,
                    currency: c[2].to_string(),
                },
                provenance: classify(conf),
                confidence: conf,
            },
        ));
    }

    found.sort_by_key(|(pos, _)| *pos);
    found.into_iter().map(|(_, m)| m).collect()
}

/// Keep only markers at or above the threshold ("validated" at query time).
pub fn filter_validated(markers: &[EntityMarker], threshold: f32) -> Vec<EntityMarker> {
    markers
        .iter()
        .filter(|m| m.confidence >= threshold)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_parse_round_trip() {
        let m = EntityMarker::validated(
            Entity::PriceTarget {
                value: 150.0,
                currency: "USD".into(),
            },
            0.8,
        );
        assert_eq!(m.render(), "[PRICE_TARGET:150.00|currency:USD|confidence:0.80]");
        let parsed = parse_markers(&m.render(), 0.80);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].entity, m.entity);
        assert_eq!(parsed[0].provenance, Provenance::Validated);
    }

    #[test]
    fn markers_come_back_in_text_order() {
        let text = "x [RATING:BUY|confidence:0.70] y [TICKER:NVDA|confidence:0.95] z";
        let parsed = parse_markers(text, 0.80);
        assert_eq!(parsed.len(), 2);
        assert!(matches!(parsed[0].entity, Entity::Rating { .. }));
        assert!(matches!(parsed[1].entity, Entity::Ticker { .. }));
    }

    #[test]
    fn provenance_classified_by_threshold() {
        let text = "[TICKER:NVDA|confidence:0.95] [TICKER:AMD|confidence:0.50]";
        let parsed = parse_markers(text, 0.80);
        assert_eq!(parsed[0].provenance, Provenance::Validated);
        assert_eq!(parsed[1].provenance, Provenance::Automatic);
    }

    #[test]
    fn threshold_partitioning_keeps_only_high_confidence() {
        let text = "[TICKER:NVDA|confidence:0.95] body [RATING:HOLD|confidence:0.50]";
        let all = parse_markers(text, 0.80);
        let kept = filter_validated(&all, 0.80);
        assert_eq!(kept.len(), 1);
        assert_eq!(
            kept[0].entity,
            Entity::Ticker {
                symbol: "NVDA".into()
            }
        );
    }
}
