//! Price source implementations

pub mod credentials;
pub mod ecs;
pub mod signing;

pub use ecs::EcsPriceSource;
