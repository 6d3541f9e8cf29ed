//! Provider-agnostic trait for price sources
//!
//! The discovery engine talks to the pricing API only through `PriceSource`,
//! so the engine can be exercised against an in-memory implementation while
//! the CLI wires in the real ECS client from `src/providers/`.

use crate::config::InstanceSpec;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A zone as advertised by the pricing API for one region.
///
/// `available_instance_types` is the zone's instance-type allow-list.
/// `None` means the zone published no list at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneDescriptor {
    pub zone_id: String,
    pub available_instance_types: Option<Vec<String>>,
}

/// A price lookup result as returned by the API, before validation.
///
/// `trade_price` is the final payable price. A response without one carries
/// no usable quote and is dropped by the engine, not surfaced as an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPriceQuote {
    pub trade_price: Option<f64>,
    pub original_price: Option<f64>,
    pub discount_price: Option<f64>,
    pub currency: Option<String>,
}

/// Boundary to the remote pricing API.
///
/// Implementations own their transport concerns (authentication, deadlines,
/// transient-failure retries). Callers treat any returned error as final for
/// the affected region or zone within the current run.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Provider name (e.g., "ecs")
    fn name(&self) -> &'static str;

    /// List the zones of a region that can be priced for `spec`.
    async fn list_zones(&self, region_id: &str, spec: &InstanceSpec)
        -> Result<Vec<ZoneDescriptor>>;

    /// Fetch the current price of `spec` in one (region, zone).
    async fn get_price(
        &self,
        region_id: &str,
        zone_id: &str,
        spec: &InstanceSpec,
    ) -> Result<RawPriceQuote>;
}
