//! Deterministic PRNG for reproducible stress tests.

/// Minimal xorshift64 PRNG.
///
/// Use a fixed seed so concurrent-fill and random-seek tests replay the same
/// access pattern on every run.
pub struct Xorshift64(u64);

impl Xorshift64 {
    /// Seed 0 is replaced by 1; xorshift never leaves the zero state.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    pub fn next_u64(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    /// Returns `usize` in `[min, max)`. `max` must exceed `min`.
    pub fn range_usize(&mut self, min: usize, max: usize) -> usize {
        min + (self.next_u64() % (max - min) as u64) as usize
    }

    /// Random half-open range inside `0..len`, at most `max_len` long and never empty.
    pub fn span(&mut self, len: usize, max_len: usize) -> std::ops::Range<usize> {
        let start = self.range_usize(0, len);
        let span = self.range_usize(1, max_len.min(len - start) + 1);
        start..start + span
    }
}
