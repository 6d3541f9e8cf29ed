//! spotctl library
//!
//! Core price discovery pipeline for the spotctl CLI: the `PriceSource`
//! boundary, the concurrent discovery engine, and the ranked reporting on
//! top of it, with the ECS OpenAPI client in `providers`.

pub mod config;
pub mod discovery;
pub mod error;
pub mod provider;
pub mod providers;
pub mod report;
pub mod retry;

// Re-export commonly used types
pub use discovery::PriceQuote;
pub use provider::{PriceSource, RawPriceQuote, ZoneDescriptor};
pub use report::DiscoveryResult;
