//! Per-tenant admission control.

pub mod bucket;
pub mod registry;

pub use bucket::TokenBucket;
pub use registry::RateLimiterRegistry;
