//! Background Tasks Module
//!
//! Contains background tasks that run alongside the cache.
//!
//! # Tasks
//! - TTL Expiry: Removes entries as their deadlines elapse

mod expiry;

pub use expiry::spawn_expiry_task;
