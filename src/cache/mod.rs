//! Cache Module
//!
//! Provides in-memory caching with TTL expiration and a soft memory budget.

mod entry;
mod estimate;
mod expiry;
mod handle;
mod size;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use estimate::EstimateSize;
pub use expiry::ExpiryQueue;
pub use handle::Cache;
pub use size::{parse_size_literal, GB, KB, MB};
pub use stats::{CacheStats, StatCounters};
pub use store::CacheStore;

// == Public Constants ==
/// Memory budget used when none is configured
pub const DEFAULT_MAX_MEMORY: u64 = 100 * MB;
