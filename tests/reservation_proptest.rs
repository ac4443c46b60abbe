//! Property tests: concurrent reservations partition the index space with no
//! gaps and no overlaps, whatever the mix of batch sizes and thread counts.

use std::thread;

use proptest::collection::vec as prop_vec;
use proptest::prelude::*;

use swell::ConcurrentVec;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Each thread extends with its own batches; afterwards every claimed
    /// range must be disjoint and the ranges together must cover exactly
    /// `[0, total)`.
    #[test]
    fn concurrent_extends_partition_the_index_space(
        batches in prop_vec(prop_vec(1usize..=17, 1..8), 2..5),
    ) {
        let vec = ConcurrentVec::with_capacity(4);
        let mut claims: Vec<Vec<(usize, usize)>> = Vec::new();

        thread::scope(|s| {
            let handles: Vec<_> = batches
                .iter()
                .map(|sizes| {
                    let vec = &vec;
                    s.spawn(move || {
                        let mut ranges = Vec::new();
                        for &n in sizes {
                            let payload = vec![0u8; n];
                            let start = vec.extend_from_slice(&payload).unwrap();
                            ranges.push((start, n));
                        }
                        ranges
                    })
                })
                .collect();
            for handle in handles {
                claims.push(handle.join().unwrap());
            }
        });

        let total: usize = batches.iter().flatten().sum();
        prop_assert_eq!(vec.len(), total);
        prop_assert_eq!(vec.reserved(), total);
        prop_assert!(vec.capacity() >= total);

        let mut covered = vec![0u32; total];
        for (start, n) in claims.into_iter().flatten() {
            for slot in &mut covered[start..start + n] {
                *slot += 1;
            }
        }
        prop_assert!(covered.iter().all(|&c| c == 1), "gap or overlap in {covered:?}");
    }

    /// Pushed values are retrievable at exactly the returned index, across
    /// growth boundaries.
    #[test]
    fn push_index_round_trips(values in prop_vec(any::<u32>(), 0..200)) {
        let vec = ConcurrentVec::with_capacity(2);
        let indices: Vec<usize> = values
            .iter()
            .map(|&v| vec.push(v).unwrap())
            .collect();
        for (&v, &i) in values.iter().zip(&indices) {
            prop_assert_eq!(vec.get(i), Some(v));
        }
        prop_assert_eq!(vec.len(), values.len());
    }
}
