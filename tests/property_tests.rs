//! Property tests for price ranking

use proptest::prelude::*;
use spotctl::discovery::PriceQuote;
use spotctl::report::DiscoveryResult;

fn quote(index: usize, trade_price: f64) -> PriceQuote {
    PriceQuote {
        region_id: "r1".to_string(),
        zone_id: format!("z-{}", index),
        trade_price,
        original_price: None,
        discount_price: None,
        currency: Some("USD".to_string()),
    }
}

proptest! {
    #[test]
    fn ranked_prices_are_non_decreasing(
        prices in proptest::collection::vec(0.0f64..1000.0, 1..50)
    ) {
        let quotes: Vec<PriceQuote> = prices
            .iter()
            .enumerate()
            .map(|(i, p)| quote(i, *p))
            .collect();

        let ranked = DiscoveryResult::rank(quotes).unwrap();
        let out: Vec<f64> = ranked.quotes().iter().map(|q| q.trade_price).collect();

        for pair in out.windows(2) {
            prop_assert!(pair[0] <= pair[1]);
        }
        prop_assert_eq!(ranked.best().trade_price, out[0]);
    }

    #[test]
    fn ranking_is_a_permutation_of_its_input(
        prices in proptest::collection::vec(0.0f64..100.0, 1..30)
    ) {
        let quotes: Vec<PriceQuote> = prices
            .iter()
            .enumerate()
            .map(|(i, p)| quote(i, *p))
            .collect();

        let ranked = DiscoveryResult::rank(quotes).unwrap();
        let got: Vec<f64> = ranked.quotes().iter().map(|q| q.trade_price).collect();

        let mut expected = prices.clone();
        expected.sort_by(|a, b| a.total_cmp(b));
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn equal_prices_keep_arrival_order(count in 2usize..20) {
        let quotes: Vec<PriceQuote> = (0..count).map(|i| quote(i, 0.42)).collect();

        let ranked = DiscoveryResult::rank(quotes).unwrap();
        let zones: Vec<String> = ranked
            .quotes()
            .iter()
            .map(|q| q.zone_id.clone())
            .collect();
        let expected: Vec<String> = (0..count).map(|i| format!("z-{}", i)).collect();
        prop_assert_eq!(zones, expected);
    }
}
