//! Fixed-size Bloom filter.
//!
//! ## Architecture
//!
//! ```text
//!   item ──► k salted hashes ──► k bit positions (mod m)
//!
//!   bits: [AtomicU64; ceil(m / 64)]
//!          ┌────────┬────────┬────────┬─────┐
//!          │ 0101…  │ 1000…  │ 0011…  │  …  │
//!          └────────┴────────┴────────┴─────┘
//! ```
//!
//! Sizing follows the closed form for a target false-positive rate `p`:
//!
//! - probes `k = round(-log2 p)`
//! - size factor `round(-2.0813470035 · ln p)` bits per expected element
//! - `m = capacity · size factor`
//!
//! ## Concurrency
//!
//! Bits only ever go from unset to set, so [`add`](BloomFilter::add) and
//! [`contains`](BloomFilter::contains) take `&self` and may race freely.
//! [`clear`](BloomFilter::clear) takes `&mut self` and therefore cannot
//! overlap either of them.
//!
//! ## Example
//!
//! ```
//! use cachewalk::filter::BloomFilter;
//!
//! let filter = BloomFilter::new(1_000);
//! assert!(filter.add("teststr"));
//! assert!(!filter.add("teststr"));
//! assert!(filter.contains("teststr"));
//! assert_eq!(filter.len(), 1);
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use rustc_hash::FxHasher;

use crate::error::ConfigError;
use crate::traits::MembershipFilter;

/// Target false-positive rate used by [`BloomFilter::new`].
pub const DEFAULT_FALSE_POSITIVE_RATE: f64 = 0.01;

/// Bits per element per unit of `-ln p`.
const SIZE_COEFFICIENT: f64 = 2.0813470035;

const SALT_STEP: u64 = 0x9E37_79B9_7F4A_7C15;

/// Probabilistic set: no false negatives, tunable false positives.
pub struct BloomFilter {
    bits: Vec<AtomicU64>,
    bit_count: usize,
    hash_count: usize,
    size_factor: usize,
    capacity: usize,
    target_rate: f64,
    elements: AtomicUsize,
}

impl BloomFilter {
    /// Creates a filter for `capacity` elements at a 1% false-positive rate.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self::with_rate(capacity, DEFAULT_FALSE_POSITIVE_RATE)
    }

    /// Creates a filter for `capacity` elements at `false_positive_rate`.
    ///
    /// # Panics
    ///
    /// Panics on the inputs [`try_with_rate`](Self::try_with_rate) rejects.
    pub fn with_rate(capacity: usize, false_positive_rate: f64) -> Self {
        match Self::try_with_rate(capacity, false_positive_rate) {
            Ok(filter) => filter,
            Err(e) => panic!("{}", e),
        }
    }

    /// Creates a filter, returning an error on invalid parameters instead of
    /// panicking.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `capacity` is zero, the rate is not inside
    /// `(0, 1)`, the rate is too close to 1 to need any bits or probes, or
    /// the bit array size overflows `usize`.
    pub fn try_with_rate(capacity: usize, false_positive_rate: f64) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::new("capacity must be greater than zero"));
        }
        if !(false_positive_rate > 0.0 && false_positive_rate < 1.0) {
            return Err(ConfigError::new(format!(
                "false positive rate must be in (0, 1), got {}",
                false_positive_rate
            )));
        }

        let size_factor = (-SIZE_COEFFICIENT * false_positive_rate.ln()).round() as usize;
        let hash_count = (-false_positive_rate.log2()).round() as usize;
        if size_factor == 0 || hash_count == 0 {
            return Err(ConfigError::new(format!(
                "false positive rate {} is too high to size a filter",
                false_positive_rate
            )));
        }
        let bit_count = capacity
            .checked_mul(size_factor)
            .ok_or_else(|| ConfigError::new("filter size overflows usize"))?;

        let words = bit_count.div_ceil(64);
        let bits = (0..words).map(|_| AtomicU64::new(0)).collect();

        Ok(Self {
            bits,
            bit_count,
            hash_count,
            size_factor,
            capacity,
            target_rate: false_positive_rate,
            elements: AtomicUsize::new(0),
        })
    }

    /// Records `item`.
    ///
    /// Returns `true` if this call set at least one previously unset bit,
    /// `false` if every probe bit was already set (the item is probably
    /// present already). The element counter only moves on `true`.
    pub fn add<T: Hash + ?Sized>(&self, item: &T) -> bool {
        let mut newly_set = false;
        for probe in 0..self.hash_count {
            let (word, mask) = self.locate(item, probe);
            let previous = self.bits[word].fetch_or(mask, Ordering::Relaxed);
            newly_set |= previous & mask == 0;
        }
        if newly_set {
            self.elements.fetch_add(1, Ordering::Relaxed);
        }
        newly_set
    }

    /// `false` means `item` was never added; `true` means it probably was.
    pub fn contains<T: Hash + ?Sized>(&self, item: &T) -> bool {
        (0..self.hash_count).all(|probe| {
            let (word, mask) = self.locate(item, probe);
            self.bits[word].load(Ordering::Relaxed) & mask != 0
        })
    }

    /// Unsets every bit and zeroes the element counter.
    pub fn clear(&mut self) {
        for word in &mut self.bits {
            *word.get_mut() = 0;
        }
        *self.elements.get_mut() = 0;
    }

    /// `(1 - e^(-k·n/m))^k` for the current element count `n`.
    pub fn current_false_positive_rate(&self) -> f64 {
        let n = self.len();
        if n == 0 {
            return 0.0;
        }
        let k = self.hash_count as f64;
        let fill = 1.0 - (-k * n as f64 / self.bit_count as f64).exp();
        fill.powi(self.hash_count as i32)
    }

    pub fn hash_count(&self) -> usize {
        self.hash_count
    }

    pub fn bit_count(&self) -> usize {
        self.bit_count
    }

    pub fn size_factor(&self) -> usize {
        self.size_factor
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn target_false_positive_rate(&self) -> f64 {
        self.target_rate
    }

    /// Number of successful [`add`](Self::add) calls since the last clear.
    pub fn len(&self) -> usize {
        self.elements.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Point-in-time view of the filter's parameters and fill.
    pub fn status(&self) -> FilterStatus {
        FilterStatus {
            capacity: self.capacity,
            size_factor: self.size_factor,
            hash_count: self.hash_count,
            bit_count: self.bit_count,
            len: self.len(),
            target_false_positive_rate: self.target_rate,
            current_false_positive_rate: self.current_false_positive_rate(),
        }
    }

    #[inline]
    fn locate<T: Hash + ?Sized>(&self, item: &T, probe: usize) -> (usize, u64) {
        let bit = (probe_hash(item, probe) % self.bit_count as u64) as usize;
        (bit / 64, 1u64 << (bit % 64))
    }
}

fn probe_hash<T: Hash + ?Sized>(item: &T, probe: usize) -> u64 {
    let mut hasher = FxHasher::default();
    (probe as u64 + 1).wrapping_mul(SALT_STEP).hash(&mut hasher);
    item.hash(&mut hasher);
    mix64(hasher.finish())
}

// splitmix64 finalizer
#[inline]
fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

impl fmt::Debug for BloomFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BloomFilter")
            .field("capacity", &self.capacity)
            .field("bit_count", &self.bit_count)
            .field("hash_count", &self.hash_count)
            .field("len", &self.len())
            .finish()
    }
}

impl<T: Hash + ?Sized> MembershipFilter<T> for BloomFilter {
    fn insert(&self, item: &T) -> bool {
        self.add(item)
    }

    fn might_contain(&self, item: &T) -> bool {
        self.contains(item)
    }
}

/// Snapshot returned by [`BloomFilter::status`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterStatus {
    pub capacity: usize,
    pub size_factor: usize,
    pub hash_count: usize,
    pub bit_count: usize,
    pub len: usize,
    pub target_false_positive_rate: f64,
    pub current_false_positive_rate: f64,
}

impl fmt::Display for FilterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "bloom filter status")?;
        writeln!(f, "  capacity        = {}", self.capacity)?;
        writeln!(f, "  size factor     = {}", self.size_factor)?;
        writeln!(f, "  hash count      = {}", self.hash_count)?;
        writeln!(f, "  bit count       = {}", self.bit_count)?;
        writeln!(f, "  elements        = {}", self.len)?;
        writeln!(f, "  target fp rate  = {}", self.target_false_positive_rate)?;
        write!(f, "  current fp rate = {:.6}", self.current_false_positive_rate)
    }
}
