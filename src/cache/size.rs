//! Size Literal Module
//!
//! Parses human-readable budget literals such as "100KB" or "2MB" into bytes.

use crate::error::{CacheError, Result};

// == Unit Multipliers ==
pub const KB: u64 = 1024;
pub const MB: u64 = 1024 * KB;
pub const GB: u64 = 1024 * MB;

// == Parse Size Literal ==
/// Converts a size literal into a byte count.
///
/// Accepted forms (unit suffix is case-insensitive, surrounding whitespace is
/// ignored):
/// - `<digits>KB`, `<digits>MB`, `<digits>GB` (1024-based)
/// - `<digits>B` or `<digits>` for raw bytes
///
/// The numeric part must be plain ASCII digits. Signs, decimals, empty
/// magnitudes and values that overflow `u64` are rejected with
/// [`CacheError::InvalidSizeLiteral`].
pub fn parse_size_literal(literal: &str) -> Result<u64> {
    let invalid = || CacheError::InvalidSizeLiteral(literal.to_string());
    let trimmed = literal.trim();

    let (digits, multiplier) = split_unit(trimmed);

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let magnitude: u64 = digits.parse().map_err(|_| invalid())?;
    magnitude.checked_mul(multiplier).ok_or_else(invalid)
}

/// Splits a trimmed literal into its numeric part and unit multiplier.
fn split_unit(literal: &str) -> (&str, u64) {
    let split = literal.len().saturating_sub(2);

    // `get` returns None when the split lands inside a multi-byte char
    if let (Some(digits), Some(unit)) = (literal.get(..split), literal.get(split..)) {
        let multiplier = match unit.to_ascii_uppercase().as_str() {
            "KB" => Some(KB),
            "MB" => Some(MB),
            "GB" => Some(GB),
            _ => None,
        };
        if let Some(multiplier) = multiplier {
            return (digits, multiplier);
        }
    }

    match literal.strip_suffix(['B', 'b']) {
        Some(digits) => (digits, 1),
        None => (literal, 1),
    }
}
