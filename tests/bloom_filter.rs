// ==============================================
// BLOOM FILTER TESTS (integration)
// ==============================================
//
// Statistical and multi-threaded properties of BloomFilter that are too
// slow or too noisy for the inline unit tests.

use std::sync::{Arc, Barrier};
use std::thread;

use cachewalk::filter::BloomFilter;
use cachewalk::traits::MembershipFilter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ==============================================
// No False Negatives
// ==============================================

mod no_false_negatives {
    use super::*;

    #[test]
    fn every_added_item_stays_visible() {
        let filter = BloomFilter::new(5_000);
        let mut rng = StdRng::seed_from_u64(7);
        let items: Vec<String> = (0..5_000).map(|_| format!("{}a", rng.gen::<f64>())).collect();

        for (i, item) in items.iter().enumerate() {
            filter.add(item.as_str());
            assert!(filter.contains(item.as_str()));
            // earlier items survive later unrelated adds
            assert!(filter.contains(items[i / 2].as_str()));
        }
        assert!(items.iter().all(|item| filter.contains(item.as_str())));
    }

    #[test]
    fn concurrent_adds_are_all_visible() {
        let filter = Arc::new(BloomFilter::new(8_000));
        let barrier = Arc::new(Barrier::new(4));

        let handles: Vec<_> = (0..4u64)
            .map(|t| {
                let filter = Arc::clone(&filter);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for i in 0..2_000u64 {
                        filter.insert(&(t * 1_000_000 + i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        for t in 0..4u64 {
            for i in 0..2_000u64 {
                assert!(filter.might_contain(&(t * 1_000_000 + i)));
            }
        }
        assert!(filter.len() <= 8_000);
    }
}

// ==============================================
// False Positive Rate
// ==============================================

mod false_positive_rate {
    use super::*;

    fn measured_rate(capacity: usize, rate: f64, seed: u64) -> f64 {
        let filter = BloomFilter::with_rate(capacity, rate);
        let mut rng = StdRng::seed_from_u64(seed);
        for _ in 0..capacity {
            filter.add(&rng.gen::<u64>());
        }

        // fresh random u64s practically never repeat an inserted value
        let samples = 100_000;
        let hits = (0..samples)
            .filter(|_| filter.contains(&rng.gen::<u64>()))
            .count();
        hits as f64 / samples as f64
    }

    #[test]
    fn default_rate_is_respected() {
        let measured = measured_rate(10_000, 0.01, 42);
        assert!(measured < 0.02, "measured fp rate {}", measured);
    }

    #[test]
    fn tighter_rate_is_respected() {
        let measured = measured_rate(10_000, 0.001, 99);
        assert!(measured < 0.003, "measured fp rate {}", measured);
    }

    #[test]
    fn estimate_tracks_target_at_capacity() {
        let filter = BloomFilter::new(10_000);
        for i in 0..10_000u32 {
            filter.add(&i);
        }
        let estimate = filter.current_false_positive_rate();
        assert!(estimate > 0.0 && estimate < 0.02, "estimate {}", estimate);
    }
}

// ==============================================
// Clear
// ==============================================

mod clear {
    use super::*;

    #[test]
    fn clear_forgets_everything() {
        let mut filter = BloomFilter::new(100);
        assert!(filter.add("teststr"));
        assert!(!filter.add("teststr"));
        for i in 0..99u32 {
            filter.add(&i);
        }
        assert!(filter.current_false_positive_rate() > 0.0);

        filter.clear();
        assert!(!filter.contains("teststr"));
        assert!((0..99u32).all(|i| !filter.contains(&i)));
        assert_eq!(filter.current_false_positive_rate(), 0.0);
        assert_eq!(filter.len(), 0);

        // parameters survive
        assert_eq!(filter.capacity(), 100);
        assert_eq!(filter.bit_count(), 1_000);
        assert!(filter.add("teststr"));
    }
}
