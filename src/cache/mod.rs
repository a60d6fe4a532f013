//! Cache module for market data responses
//!
//! This module provides an in-memory read-through cache with a per-resource TTL.
//! Concurrent misses for the same key are coalesced into a single upstream fetch,
//! and failed fetches are never cached, so the next request retries.

mod coalescing;

pub use coalescing::{CacheError, CachedData, CoalescingCache};
