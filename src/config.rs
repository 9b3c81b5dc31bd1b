//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;

use tracing::warn;

use crate::cache::{parse_size_literal, DEFAULT_MAX_MEMORY};
use crate::error::Result;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Memory budget in bytes
    pub max_memory: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_MEMORY` - Memory budget as a size literal such as "64MB"
    ///   (default: 100MB). Invalid literals fall back to the default.
    pub fn from_env() -> Self {
        let max_memory = match env::var("CACHE_MAX_MEMORY") {
            Ok(literal) => parse_size_literal(&literal).unwrap_or_else(|err| {
                warn!(error = %err, "ignoring CACHE_MAX_MEMORY, using default");
                DEFAULT_MAX_MEMORY
            }),
            Err(_) => DEFAULT_MAX_MEMORY,
        };

        Self { max_memory }
    }

    /// Creates a Config with the budget given as a size literal.
    pub fn with_max_memory(literal: &str) -> Result<Self> {
        Ok(Self {
            max_memory: parse_size_literal(literal)?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_memory: DEFAULT_MAX_MEMORY,
        }
    }
}
