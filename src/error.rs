//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache engine.
///
/// Every variant is a local, recoverable condition. Nothing in the engine
/// panics on these paths.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Budget literal could not be parsed
    #[error("Invalid size literal: {0:?}")]
    InvalidSizeLiteral(String),

    /// Value does not fit in the remaining budget
    #[error("Cache full: {key} needs {size} bytes, {available} available")]
    CacheFull {
        key: String,
        size: u64,
        available: u64,
    },

    /// Key is already present; delete it before setting again
    #[error("Key already exists: {0}")]
    KeyAlreadyExists(String),

    /// Key not found in cache
    #[error("Key not found: {0}")]
    KeyNotFound(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;
