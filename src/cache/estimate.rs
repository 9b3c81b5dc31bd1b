//! Size Estimation Module
//!
//! Heuristic memory footprint of cached values, used only as an admission
//! gate against the memory budget.

use std::mem::size_of;
use std::sync::Arc;

use serde_json::Value;

// == Estimate Size ==
/// Approximate in-memory size of a value, in bytes.
///
/// Estimates count the inline size of the value plus the heap bytes it owns
/// directly. Allocator overhead and spare capacity are ignored, so the figure
/// is a lower bound rather than an exact accounting. Types without an impl
/// can still be cached through `set_sized` with an explicit hint.
pub trait EstimateSize {
    fn estimated_size(&self) -> usize;
}

macro_rules! inline_size {
    ($($ty:ty),* $(,)?) => {
        $(
            impl EstimateSize for $ty {
                fn estimated_size(&self) -> usize {
                    size_of::<$ty>()
                }
            }
        )*
    };
}

inline_size!(
    (), bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64
);

impl EstimateSize for String {
    fn estimated_size(&self) -> usize {
        size_of::<String>() + self.len()
    }
}

impl EstimateSize for &'static str {
    fn estimated_size(&self) -> usize {
        size_of::<&str>() + self.len()
    }
}

impl<T: EstimateSize> EstimateSize for Vec<T> {
    fn estimated_size(&self) -> usize {
        size_of::<Vec<T>>() + self.iter().map(EstimateSize::estimated_size).sum::<usize>()
    }
}

impl<T: EstimateSize> EstimateSize for Box<T> {
    fn estimated_size(&self) -> usize {
        size_of::<Box<T>>() + (**self).estimated_size()
    }
}

impl<T: EstimateSize> EstimateSize for Arc<T> {
    fn estimated_size(&self) -> usize {
        size_of::<Arc<T>>() + (**self).estimated_size()
    }
}

impl<T: EstimateSize> EstimateSize for Option<T> {
    fn estimated_size(&self) -> usize {
        match self {
            // the niche or tag, whichever the layout uses
            Some(inner) => size_of::<Option<T>>() - size_of::<T>() + inner.estimated_size(),
            None => size_of::<Option<T>>(),
        }
    }
}

impl EstimateSize for Value {
    fn estimated_size(&self) -> usize {
        let nested: usize = match self {
            Value::Null | Value::Bool(_) | Value::Number(_) => 0,
            Value::String(s) => s.len(),
            Value::Array(items) => items.iter().map(EstimateSize::estimated_size).sum(),
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| k.estimated_size() + v.estimated_size())
                .sum(),
        };
        size_of::<Value>() + nested
    }
}
