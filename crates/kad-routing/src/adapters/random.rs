//! Random Source Adapters

use rand::Rng;

use crate::ports::RandomSource;

/// Fixed random source for deterministic testing.
///
/// Always returns the same value (reduced modulo `max`).
///
/// # Example
///
/// ```rust
/// use kad_routing::adapters::FixedRandomSource;
/// use kad_routing::RandomSource;
///
/// let rng = FixedRandomSource::new(42);
/// assert_eq!(rng.random_usize(100), 42);
/// assert_eq!(rng.random_usize(10), 2);
/// ```
#[derive(Debug, Clone)]
pub struct FixedRandomSource {
    value: usize,
}

impl FixedRandomSource {
    /// Create a fixed random source that always returns the given value.
    pub fn new(value: usize) -> Self {
        Self { value }
    }

    /// Create a random source that returns 0 (first element).
    pub fn first() -> Self {
        Self::new(0)
    }
}

impl RandomSource for FixedRandomSource {
    fn random_usize(&self, max: usize) -> usize {
        if max == 0 {
            0
        } else {
            self.value % max
        }
    }
}

/// Production random source backed by the thread-local `rand` generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandomSource;

impl ThreadRandomSource {
    pub fn new() -> Self {
        Self
    }
}

impl RandomSource for ThreadRandomSource {
    fn random_usize(&self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        rand::thread_rng().gen_range(0..max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_source_wraps_into_range() {
        let rng = FixedRandomSource::new(7);
        assert_eq!(rng.random_usize(3), 1);
        assert_eq!(rng.random_usize(0), 0);
        assert_eq!(FixedRandomSource::first().random_usize(9), 0);
    }

    #[test]
    fn test_thread_source_stays_in_range() {
        let rng = ThreadRandomSource::new();
        for max in 1..50 {
            assert!(rng.random_usize(max) < max);
        }
        assert_eq!(rng.random_usize(0), 0);
    }
}
