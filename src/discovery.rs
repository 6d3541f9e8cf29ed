//! Concurrent price discovery pipeline
//!
//! The pipeline runs in two joined stages: every region's zone list is
//! enumerated concurrently, then one price lookup per eligible
//! (region, zone) pair fans out under a semaphore that caps in-flight
//! calls process-wide. Failures are isolated per unit: a region whose
//! enumeration fails, or a zone whose lookup fails, is logged and skipped
//! without disturbing the rest of the run. Nothing here retries; re-running
//! the discovery is the caller's decision.

use crate::config::InstanceSpec;
use crate::error::{first_line, Result, SpotctlError};
use crate::provider::{PriceSource, ZoneDescriptor};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// One successfully priced (region, zone) pair.
///
/// `trade_price` is required: a lookup whose response lacks one produces no
/// quote at all.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceQuote {
    pub region_id: String,
    pub zone_id: String,
    pub trade_price: f64,
    pub original_price: Option<f64>,
    pub discount_price: Option<f64>,
    pub currency: Option<String>,
}

/// Whether a zone can serve the requested instance type.
///
/// A zone that publishes no allow-list (or an empty one) is eligible for
/// everything: absence of data is not proof of exclusion, and querying a
/// possibly-ineligible zone beats missing a possibly-eligible one. With a
/// non-empty list, eligibility is exact membership.
pub fn zone_supports_instance(zone: &ZoneDescriptor, spec: &InstanceSpec) -> bool {
    match zone.available_instance_types.as_deref() {
        None | Some([]) => true,
        Some(types) => types.iter().any(|t| t == &spec.instance_type),
    }
}

/// Eligible zone ids for one region, in the order the API returned them.
pub async fn eligible_zones(
    source: &dyn PriceSource,
    region_id: &str,
    spec: &InstanceSpec,
) -> Result<Vec<String>> {
    let zones = source.list_zones(region_id, spec).await?;
    Ok(zones
        .into_iter()
        .filter(|z| zone_supports_instance(z, spec))
        .map(|z| z.zone_id)
        .collect())
}

/// Price `spec` in every eligible zone of `regions`, at most
/// `max_concurrency` lookups in flight at once.
///
/// Returns the successful quotes in enumeration order; failed regions and
/// zones contribute nothing. Errors only before any task starts (invalid
/// concurrency).
pub async fn discover(
    source: Arc<dyn PriceSource>,
    regions: &[String],
    spec: &InstanceSpec,
    max_concurrency: usize,
) -> Result<Vec<PriceQuote>> {
    if max_concurrency == 0 {
        return Err(SpotctlError::Validation {
            field: "max_concurrency".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    let spec = Arc::new(spec.clone());

    // Stage 1: enumerate every region concurrently. Region count is small
    // and fixed, so this stage is unbounded.
    let enumeration_handles: Vec<_> = regions
        .iter()
        .cloned()
        .map(|region_id| {
            let source = Arc::clone(&source);
            let spec = Arc::clone(&spec);
            tokio::spawn(async move {
                let zones = eligible_zones(source.as_ref(), &region_id, &spec).await;
                (region_id, zones)
            })
        })
        .collect();

    let mut pairs: Vec<(String, String)> = Vec::new();
    for joined in join_all(enumeration_handles).await {
        match joined {
            Ok((region_id, Ok(zones))) => {
                pairs.extend(zones.into_iter().map(|zone_id| (region_id.clone(), zone_id)));
            }
            Ok((region_id, Err(e))) => {
                warn!("Skip zones for {}: {}", region_id, first_line(&e));
            }
            Err(e) => warn!("Zone enumeration task aborted: {}", e),
        }
    }

    // Stage 2: one lookup per pair, gated by the semaphore. The permit is
    // held across the network call and released by drop on every exit path.
    let semaphore = Arc::new(Semaphore::new(max_concurrency));
    let price_handles: Vec<_> = pairs
        .into_iter()
        .map(|(region_id, zone_id)| {
            let source = Arc::clone(&source);
            let spec = Arc::clone(&spec);
            let semaphore = Arc::clone(&semaphore);
            tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    // The semaphore is never closed while lookups run.
                    Err(_) => return None,
                };
                match source.get_price(&region_id, &zone_id, &spec).await {
                    Ok(raw) => match raw.trade_price {
                        Some(trade_price) => Some(PriceQuote {
                            region_id,
                            zone_id,
                            trade_price,
                            original_price: raw.original_price,
                            discount_price: raw.discount_price,
                            currency: raw.currency,
                        }),
                        None => {
                            debug!("Skip {}/{}: response carried no trade price", region_id, zone_id);
                            None
                        }
                    },
                    Err(e) => {
                        warn!("Skip {}/{}: {}", region_id, zone_id, first_line(&e));
                        None
                    }
                }
            })
        })
        .collect();

    // join_all yields results in spawn order, so the returned quotes follow
    // enumeration order regardless of completion order. The reporter's
    // stable sort relies on this for deterministic tie-breaking.
    let mut quotes = Vec::new();
    for joined in join_all(price_handles).await {
        match joined {
            Ok(Some(quote)) => quotes.push(quote),
            Ok(None) => {}
            Err(e) => warn!("Price task aborted: {}", e),
        }
    }
    Ok(quotes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> InstanceSpec {
        crate::config::Config::default().instance
    }

    fn zone(id: &str, types: Option<&[&str]>) -> ZoneDescriptor {
        ZoneDescriptor {
            zone_id: id.to_string(),
            available_instance_types: types
                .map(|ts| ts.iter().map(|t| t.to_string()).collect()),
        }
    }

    #[test]
    fn test_zone_without_allow_list_is_eligible() {
        assert!(zone_supports_instance(&zone("z-a", None), &spec()));
    }

    #[test]
    fn test_zone_with_empty_allow_list_is_eligible() {
        assert!(zone_supports_instance(&zone("z-a", Some(&[])), &spec()));
    }

    #[test]
    fn test_zone_with_matching_allow_list_is_eligible() {
        let z = zone("z-a", Some(&["ecs.g6.large", "ecs.e-c1m1.large"]));
        assert!(zone_supports_instance(&z, &spec()));
    }

    #[test]
    fn test_zone_with_non_matching_allow_list_is_ineligible() {
        let z = zone("z-a", Some(&["ecs.g6.large"]));
        assert!(!zone_supports_instance(&z, &spec()));
    }

    #[test]
    fn test_filter_is_deterministic() {
        let z = zone("z-a", Some(&["ecs.g6.large"]));
        let s = spec();
        let first = zone_supports_instance(&z, &s);
        for _ in 0..10 {
            assert_eq!(zone_supports_instance(&z, &s), first);
        }
    }
}
