//! Ranking and reporting of discovered prices
//!
//! Quotes are ranked ascending by trade price with a stable sort, so ties
//! keep the order the engine delivered them in (enumeration order). The
//! ranked list is immutable once built; the best offer is its first element.

use crate::discovery::PriceQuote;
use crate::error::Result;
use serde::Serialize;
use std::collections::HashMap;

/// The final output of a discovery run: quotes sorted ascending by trade
/// price. Constructed only from a non-empty quote list.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryResult {
    quotes: Vec<PriceQuote>,
}

impl DiscoveryResult {
    /// Rank quotes by trade price. `None` for an empty input: zero offers is
    /// a legitimate, reportable outcome, not an error.
    pub fn rank(mut quotes: Vec<PriceQuote>) -> Option<Self> {
        if quotes.is_empty() {
            return None;
        }
        // sort_by is stable; total_cmp keeps the order total even for the
        // degenerate NaN case.
        quotes.sort_by(|a, b| a.trade_price.total_cmp(&b.trade_price));
        Some(Self { quotes })
    }

    /// The lowest-priced quote.
    pub fn best(&self) -> &PriceQuote {
        &self.quotes[0]
    }

    pub fn quotes(&self) -> &[PriceQuote] {
        &self.quotes
    }
}

fn fmt_price(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// One report line. Unknown regions fall back to printing the raw id as the
/// label; label lookup is never fatal.
pub fn format_quote_line(quote: &PriceQuote, labels: &HashMap<String, String>) -> String {
    let label = labels
        .get(&quote.region_id)
        .map(String::as_str)
        .unwrap_or(&quote.region_id);
    format!(
        "{} ({}) {} trade_price={} {} original_price={} discount_price={}",
        quote.region_id,
        label,
        quote.zone_id,
        quote.trade_price,
        quote.currency.as_deref().unwrap_or("-"),
        fmt_price(quote.original_price),
        fmt_price(quote.discount_price),
    )
}

/// Print the ranked list, the best offer, and the count. `None` prints the
/// single no-results line and nothing else.
pub fn print_report(result: Option<&DiscoveryResult>, labels: &HashMap<String, String>) {
    let Some(result) = result else {
        println!("No price results.");
        return;
    };

    println!("Full price list (sorted by trade_price):");
    for quote in result.quotes() {
        println!("{}", format_quote_line(quote, labels));
    }
    println!("Best: {}", format_quote_line(result.best(), labels));
    println!("Checked {} zone prices.", result.quotes().len());
}

/// JSON rendering of the same report, for `--output json`.
pub fn print_json(result: Option<&DiscoveryResult>) -> Result<()> {
    let value = match result {
        Some(r) => serde_json::json!({
            "best": r.best(),
            "quotes": r.quotes(),
            "checked": r.quotes().len(),
        }),
        None => serde_json::json!({
            "best": null,
            "quotes": [],
            "checked": 0,
        }),
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(region: &str, zone: &str, trade: f64) -> PriceQuote {
        PriceQuote {
            region_id: region.to_string(),
            zone_id: zone.to_string(),
            trade_price: trade,
            original_price: None,
            discount_price: None,
            currency: Some("USD".to_string()),
        }
    }

    #[test]
    fn test_rank_empty_is_none() {
        assert!(DiscoveryResult::rank(vec![]).is_none());
    }

    #[test]
    fn test_rank_sorts_ascending() {
        let ranked = DiscoveryResult::rank(vec![
            quote("r1", "z1", 3.0),
            quote("r1", "z2", 1.0),
            quote("r2", "z3", 2.0),
        ])
        .unwrap();

        let prices: Vec<f64> = ranked.quotes().iter().map(|q| q.trade_price).collect();
        assert_eq!(prices, vec![1.0, 2.0, 3.0]);
        assert_eq!(ranked.best().zone_id, "z2");
    }

    #[test]
    fn test_rank_ties_keep_arrival_order() {
        let ranked = DiscoveryResult::rank(vec![
            quote("r1", "first", 1.5),
            quote("r1", "second", 1.5),
            quote("r2", "third", 1.5),
        ])
        .unwrap();

        let zones: Vec<&str> = ranked.quotes().iter().map(|q| q.zone_id.as_str()).collect();
        assert_eq!(zones, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_format_quote_line_with_label() {
        let mut labels = HashMap::new();
        labels.insert("us-east-1".to_string(), "US East".to_string());

        let q = PriceQuote {
            region_id: "us-east-1".to_string(),
            zone_id: "us-east-1a".to_string(),
            trade_price: 1.5,
            original_price: Some(2.5),
            discount_price: Some(1.0),
            currency: Some("USD".to_string()),
        };
        assert_eq!(
            format_quote_line(&q, &labels),
            "us-east-1 (US East) us-east-1a trade_price=1.5 USD original_price=2.5 discount_price=1"
        );
    }

    #[test]
    fn test_format_quote_line_unknown_region_falls_back_to_id() {
        let q = quote("eu-central-1", "eu-central-1a", 0.8);
        let line = format_quote_line(&q, &HashMap::new());
        assert_eq!(
            line,
            "eu-central-1 (eu-central-1) eu-central-1a trade_price=0.8 USD original_price=- discount_price=-"
        );
    }
}
