//! Mini Cache - An embeddable in-process cache
//!
//! Provides a concurrent key/value cache with per-entry TTL expiry and a
//! soft memory budget.
//!
//! ```ignore
//! use std::time::Duration;
//! use mini_cache::{spawn_expiry_task, Cache};
//!
//! let cache: Cache<String> = Cache::default();
//! let expiry_handle = spawn_expiry_task(cache.clone());
//!
//! cache.set_max_memory("2MB")?;
//! cache.set("session", "abc".to_string(), Some(Duration::from_secs(30)))?;
//! assert!(cache.exists("session"));
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{Cache, CacheStats, EstimateSize};
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::spawn_expiry_task;
