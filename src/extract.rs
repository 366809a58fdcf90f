//! # Entity annotation
//!
//! The high-precision extraction pass. Runs over fetched document bodies
//! before indexing and inserts inline markers for the three entity kinds the
//! downstream graph cares most about: tickers, analyst ratings, and price
//! targets. The indexing library later runs its own, noisier extraction; the
//! two populations are told apart by provenance and confidence (see
//! [`crate::markers`]).
//!
//! Annotation is strictly additive: markers are spliced in after the matched
//! span and the original content is never altered or removed.

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::markers::{Entity, EntityMarker, Rating};

const CONF_REQUESTED_SYMBOL: f32 = 0.95;
const CONF_CASHTAG: f32 = 0.85;
const CONF_RATING: f32 = 0.90;
const CONF_RATING_LOOSE: f32 = 0.85;
const CONF_PRICE_TARGET: f32 = 0.90;

fn cashtag_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\$([A-Z]{1,5}(?:\.[A-Z])?)\b").unwrap())
}

fn rating_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    // Precision over recall: the rating word must be attached to "rating".
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(strong buy|buy|sell|hold|overweight|underweight)\s+rating\b").unwrap()
    })
}

fn price_target_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bprice target (?:of |to |at )?\$?([0-9]+(?:\.[0-9]+)?)\b").unwrap()
    })
}

fn rating_for(word: &str) -> (Rating, f32) {
    match word.to_ascii_lowercase().as_str() {
        "buy" | "strong buy" => (Rating::Buy, CONF_RATING),
        "sell" => (Rating::Sell, CONF_RATING),
        "hold" => (Rating::Hold, CONF_RATING),
        "overweight" => (Rating::Buy, CONF_RATING_LOOSE),
        _ => (Rating::Sell, CONF_RATING_LOOSE), // underweight
    }
}

/// Stateless annotator; one instance serves all requests.
#[derive(Debug, Default, Clone)]
pub struct EntityExtractor;

impl EntityExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Annotate `text` for a document fetched for `symbol`. Returns the
    /// marked-up text plus the markers, in order of appearance.
    pub fn annotate(&self, symbol: &str, text: &str) -> (String, Vec<EntityMarker>) {
        // (insertion point, span start, marker)
        let mut hits: Vec<(usize, usize, EntityMarker)> = Vec::new();

        // Bare mentions of the requested symbol.
        let sym = symbol.trim().to_ascii_uppercase();
        if !sym.is_empty() {
            if let Ok(re) = Regex::new(&format!(r"\b{}\b", regex::escape(&sym))) {
                for m in re.find_iter(text) {
                    hits.push((
                        m.end(),
                        m.start(),
                        EntityMarker::validated(
                            Entity::Ticker { symbol: sym.clone() },
                            CONF_REQUESTED_SYMBOL,
                        ),
                    ));
                }
            }
        }

        // Cashtags for any symbol.
        for c in cashtag_re().captures_iter(text) {
            let m = c.get(1).unwrap();
            let confidence = if m.as_str() == sym {
                CONF_REQUESTED_SYMBOL
            } else {
                CONF_CASHTAG
            };
            hits.push((
                m.end(),
                m.start(),
                EntityMarker::validated(
                    Entity::Ticker {
                        symbol: m.as_str().to_string(),
                    },
                    confidence,
                ),
            ));
        }

        for c in rating_re().captures_iter(text) {
            let whole = c.get(0).unwrap();
            let (rating, confidence) = rating_for(&c[1]);
            hits.push((
                whole.end(),
                whole.start(),
                EntityMarker::validated(Entity::Rating { rating }, confidence),
            ));
        }

        for c in price_target_re().captures_iter(text) {
            let whole = c.get(0).unwrap();
            if let Ok(value) = c[1].parse::<f64>() {
                hits.push((
                    whole.end(),
                    whole.start(),
                    EntityMarker::validated(
                        Entity::PriceTarget {
                            value,
                            currency: "USD".to_string(),
                        },
                        CONF_PRICE_TARGET,
                    ),
                ));
            }
        }

        // A cashtag and a bare-symbol rule can hit the same span; keep the
        // higher-confidence marker.
        hits.sort_by(|a, b| {
            a.1.cmp(&b.1)
                .then(b.2.confidence.partial_cmp(&a.2.confidence).unwrap_or(std::cmp::Ordering::Equal))
        });
        hits.dedup_by(|a, b| a.1 == b.1 && a.2.entity == b.2.entity);

        let markers: Vec<EntityMarker> = hits.iter().map(|(_, _, m)| m.clone()).collect();

        // Splice from the rightmost insertion point backwards so earlier
        // offsets stay valid. Spans can nest (a ticker inside a rating
        // phrase), so reverse start order is not reverse insertion order.
        hits.sort_by(|a, b| b.0.cmp(&a.0));
        let mut annotated = text.to_string();
        for (at, _, marker) in &hits {
            annotated.insert_str(*at, &format!(" {}", marker.render()));
        }

        (annotated, markers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::parse_markers;

    #[test]
    fn annotates_requested_symbol_with_high_confidence() {
        let (text, markers) = EntityExtractor::new().annotate("NVDA", "NVDA beats estimates.");
        assert_eq!(text, "NVDA [TICKER:NVDA|confidence:0.95] beats estimates.");
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].confidence, 0.95);
    }

    #[test]
    fn cashtag_of_another_symbol_scores_lower() {
        let (_, markers) = EntityExtractor::new().annotate("NVDA", "Pair trade against $AMD.");
        assert_eq!(markers.len(), 1);
        assert_eq!(
            markers[0].entity,
            Entity::Ticker {
                symbol: "AMD".into()
            }
        );
        assert_eq!(markers[0].confidence, 0.85);
    }

    #[test]
    fn rating_and_price_target_are_annotated() {
        let src = "Morgan maintains a Buy rating on NVDA with a price target of $150";
        let (text, markers) = EntityExtractor::new().annotate("NVDA", src);
        assert!(text.contains("[RATING:BUY|confidence:0.90]"));
        assert!(text.contains("[PRICE_TARGET:150.00|currency:USD|confidence:0.90]"));
        assert_eq!(markers.len(), 3); // ticker + rating + price target
    }

    #[test]
    fn annotation_is_additive_only() {
        let src = "NVDA beats. $AMD lags. Hold rating stands; price target of $120.";
        let (text, _) = EntityExtractor::new().annotate("NVDA", src);
        // Markers out, original text back.
        let mut stripped = text.clone();
        for m in parse_markers(&text, 0.80) {
            stripped = stripped.replace(&format!(" {}", m.render()), "");
        }
        assert_eq!(stripped, src);
    }

    #[test]
    fn nested_spans_keep_both_markers_parseable() {
        // The requested symbol sits inside the rating phrase, so the rating's
        // insertion point lies past the ticker's.
        let src = "Strong BUY rating today";
        let (text, markers) = EntityExtractor::new().annotate("BUY", src);
        assert_eq!(
            text,
            "Strong BUY [TICKER:BUY|confidence:0.95] rating [RATING:BUY|confidence:0.90] today"
        );
        assert_eq!(markers.len(), 2);
        let parsed = parse_markers(&text, 0.80);
        assert_eq!(parsed.len(), 2);
        let mut stripped = text.clone();
        for m in &parsed {
            stripped = stripped.replace(&format!(" {}", m.render()), "");
        }
        assert_eq!(stripped, src);
    }

    #[test]
    fn same_span_is_not_annotated_twice() {
        let (_, markers) = EntityExtractor::new().annotate("NVDA", "Buy $NVDA now");
        let tickers: Vec<_> = markers
            .iter()
            .filter(|m| matches!(m.entity, Entity::Ticker { .. }))
            .collect();
        assert_eq!(tickers.len(), 1);
        assert_eq!(tickers[0].confidence, 0.95);
    }
}
