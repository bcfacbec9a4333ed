//! Approximate membership filters.

pub mod bloom;

pub use bloom::{BloomFilter, FilterStatus, DEFAULT_FALSE_POSITIVE_RATE};
