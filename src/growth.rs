//! Capacity growth policy.

use crate::vec::DEFAULT_CAPACITY;

/// Multiplicative capacity growth with a `+1` floor.
///
/// The next capacity is `cap * numerator / denominator` in integer
/// arithmetic, bumped by one whenever rounding makes no progress. The factor
/// is applied repeatedly until the target covers the requested capacity, so a
/// single growth never has to be re-run for the index that triggered it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Growth {
    numerator: usize,
    denominator: usize,
}

impl Growth {
    /// Creates a growth factor of `numerator / denominator`.
    ///
    /// # Panics
    /// Panics if `denominator` is zero or the factor is below one; a
    /// shrinking factor could never cover the requested capacity.
    #[must_use]
    pub const fn factor(numerator: usize, denominator: usize) -> Self {
        assert!(denominator != 0, "growth denominator must be non-zero");
        assert!(
            numerator >= denominator,
            "growth factor must be at least one"
        );
        Self {
            numerator,
            denominator,
        }
    }

    /// Applies the factor once, with the `+1` floor.
    fn step(self, cap: usize) -> usize {
        let scaled = (cap as u128 * self.numerator as u128) / self.denominator as u128;
        let next = usize::try_from(scaled).unwrap_or(usize::MAX);
        if next == cap {
            cap.saturating_add(1)
        } else {
            next
        }
    }

    /// Returns the smallest factor-iterated capacity covering `needed`,
    /// starting from `current` (or the default capacity when `current` is
    /// zero).
    pub(crate) fn target(self, current: usize, needed: usize) -> usize {
        let mut cap = if current == 0 {
            DEFAULT_CAPACITY
        } else {
            current
        };
        while cap < needed {
            cap = self.step(cap);
        }
        cap
    }
}

impl Default for Growth {
    /// The classic three-halves factor.
    fn default() -> Self {
        Self::factor(3, 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_halves_sequence() {
        let g = Growth::default();
        assert_eq!(g.step(8), 12);
        assert_eq!(g.step(12), 18);
        assert_eq!(g.step(18), 27);
        assert_eq!(g.step(27), 40);
    }

    #[test]
    fn floor_guarantees_progress() {
        let g = Growth::default();
        // 1 * 3 / 2 rounds back to 1; the floor forces 2.
        assert_eq!(g.step(1), 2);
        assert_eq!(g.step(2), 3);
        assert_eq!(g.step(3), 4);
    }

    #[test]
    fn identity_factor_still_progresses() {
        let g = Growth::factor(1, 1);
        assert_eq!(g.step(8), 9);
        assert_eq!(g.target(8, 11), 11);
    }

    #[test]
    fn target_iterates_until_covered() {
        let g = Growth::default();
        assert_eq!(g.target(8, 9), 12);
        assert_eq!(g.target(8, 13), 18);
        // 8 -> 12 -> 18 -> 27 -> 40 -> 60 -> 90 -> 135
        assert_eq!(g.target(8, 100), 135);
        // Already sufficient: untouched.
        assert_eq!(g.target(16, 10), 16);
    }

    #[test]
    fn zero_current_starts_from_default() {
        let g = Growth::default();
        assert_eq!(g.target(0, 5), DEFAULT_CAPACITY);
        assert_eq!(g.target(0, 9), 12);
    }

    #[test]
    #[should_panic(expected = "growth factor must be at least one")]
    fn rejects_shrinking_factor() {
        let _ = Growth::factor(1, 2);
    }
}
