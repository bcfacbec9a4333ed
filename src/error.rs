//! Error types for the cachewalk library.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: Returned when construction parameters are invalid
//!   (zero capacity, a false-positive rate outside `(0, 1)`, a zero queue
//!   bound).
//! - [`InvariantError`]: Returned by
//!   [`RecencyList::check_invariants`](crate::ds::RecencyList::check_invariants)
//!   when the recency list's links or length disagree.
//!
//! ## Example Usage
//!
//! ```
//! use cachewalk::error::ConfigError;
//! use cachewalk::filter::BloomFilter;
//!
//! let filter: Result<BloomFilter, ConfigError> = BloomFilter::try_with_rate(1_000, 0.01);
//! assert!(filter.is_ok());
//!
//! // Out-of-range rate is caught without panicking
//! let bad = BloomFilter::try_with_rate(1_000, 1.5);
//! assert!(bad.is_err());
//! ```

use std::fmt;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when configuration parameters are invalid.
///
/// Produced by fallible constructors such as
/// [`ConcurrentLruMap::try_new`](crate::policy::concurrent_lru::ConcurrentLruMap::try_new),
/// [`CacheBuilder::try_build`](crate::builder::CacheBuilder::try_build) and
/// [`BloomFilter::try_with_rate`](crate::filter::BloomFilter::try_with_rate).
/// Nothing is constructed (and no walker thread is started) when one is
/// returned.
///
/// # Example
///
/// ```
/// use cachewalk::policy::concurrent_lru::ConcurrentLruMap;
///
/// let err = ConcurrentLruMap::<u64, u64>::try_new(0).unwrap_err();
/// assert!(err.to_string().contains("capacity"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when recency-list invariants are violated.
///
/// Carries a human-readable description of which link or count was wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
