//! Explicit random source threaded through every generator call.
//!
//! There is no process-global RNG: each worker owns one `RandomSource`, so a
//! (seed, schema, dialect) triple reproduces the same ASTs and the same
//! rendered text.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Seeded random source with the helpers the generator and oracles use.
#[derive(Debug, Clone)]
pub struct RandomSource {
    seed: u64,
    rng: StdRng,
}

impl RandomSource {
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// The seed this source was created from.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    pub fn boolean(&mut self) -> bool {
        self.rng.gen_bool(0.5)
    }

    /// `true` roughly once in a hundred calls.
    pub fn small_probability(&mut self) -> bool {
        self.rng.gen_ratio(1, 100)
    }

    /// `true` roughly once in ten calls.
    pub fn rather_low_probability(&mut self) -> bool {
        self.rng.gen_ratio(1, 10)
    }

    /// Index in `0..bound`. `bound` must be non-zero.
    pub fn below(&mut self, bound: usize) -> usize {
        self.rng.gen_range(0..bound)
    }

    pub fn int_in(&mut self, low: i64, high_inclusive: i64) -> i64 {
        self.rng.gen_range(low..=high_inclusive)
    }

    pub fn float_in(&mut self, low: f64, high: f64) -> f64 {
        self.rng.gen_range(low..high)
    }

    /// A small count, skewed towards zero (0..=3).
    pub fn small_number(&mut self) -> usize {
        let mut n = 0;
        while n < 3 && self.rng.gen_ratio(1, 2) {
            n += 1;
        }
        n
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.rng)
    }

    /// A non-empty subset of `items` in random order, without replacement.
    /// Empty when `items` is empty.
    pub fn non_empty_subset<T: Clone>(&mut self, items: &[T]) -> Vec<T> {
        if items.is_empty() {
            return Vec::new();
        }
        let size = self.rng.gen_range(1..=items.len());
        self.subset_of_size(items, size)
    }

    /// `size` distinct elements of `items` in random order (clamped to
    /// `items.len()`).
    pub fn subset_of_size<T: Clone>(&mut self, items: &[T], size: usize) -> Vec<T> {
        let mut shuffled = items.to_vec();
        shuffled.shuffle(&mut self.rng);
        shuffled.truncate(size.min(items.len()));
        shuffled
    }

    pub fn bytes(&mut self, len: usize) -> Vec<u8> {
        (0..len).map(|_| self.rng.gen_range(0..=u8::MAX)).collect()
    }
}
