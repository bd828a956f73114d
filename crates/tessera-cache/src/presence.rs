#![forbid(unsafe_code)]

//! Per-byte presence tracking.
//!
//! [`PresenceMap`] keeps one bit per byte offset of a resource. Bits are only
//! ever set, never cleared. The map is not synchronized; [`ByteCache`]
//! guards it together with the data buffer.
//!
//! [`ByteCache`]: crate::ByteCache

use std::ops::Range;

/// Fixed-length bit-vector, one bit per byte offset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PresenceMap {
    bits: Vec<u8>,
    len: usize,
}

impl PresenceMap {
    /// Create a map of `len` bits, all clear.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            bits: vec![0; len.div_ceil(8)],
            len,
        }
    }

    /// Number of tracked offsets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether offset `i` is present.
    ///
    /// # Panics
    ///
    /// Panics if `i >= len`.
    #[must_use]
    pub fn get(&self, i: usize) -> bool {
        assert!(i < self.len, "presence index {i} out of range {}", self.len);
        self.bits[i / 8] & (1 << (i % 8)) != 0
    }

    /// Mark offset `i` present. Setting an already-set bit has no effect.
    ///
    /// # Panics
    ///
    /// Panics if `i >= len`.
    pub fn set(&mut self, i: usize) {
        assert!(i < self.len, "presence index {i} out of range {}", self.len);
        self.bits[i / 8] |= 1 << (i % 8);
    }

    /// Mark every offset in `range` present.
    ///
    /// # Panics
    ///
    /// Panics if `range.end > len`.
    pub fn set_range(&mut self, range: Range<usize>) {
        assert!(
            range.end <= self.len,
            "presence range {range:?} out of range {}",
            self.len
        );

        let Range { mut start, end } = range;
        while start < end && start % 8 != 0 {
            self.set(start);
            start += 1;
        }
        while start + 8 <= end {
            self.bits[start / 8] = u8::MAX;
            start += 8;
        }
        while start < end {
            self.set(start);
            start += 1;
        }
    }

    /// Length of the run of bits equal to `present` starting at `start`,
    /// capped at `max` and at the end of the map.
    ///
    /// Returns 0 when `start >= len`.
    #[must_use]
    pub fn run_len(&self, start: usize, max: usize, present: bool) -> usize {
        if start >= self.len {
            return 0;
        }

        let end = start + max.min(self.len - start);
        let full = if present { u8::MAX } else { 0 };

        let mut i = start;
        while i < end {
            if i % 8 == 0 && i + 8 <= end && self.bits[i / 8] == full {
                i += 8;
                continue;
            }
            if self.get(i) != present {
                break;
            }
            i += 1;
        }
        i - start
    }

    /// Number of offsets marked present.
    #[must_use]
    pub fn count_set(&self) -> usize {
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Whether every offset is present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.count_set() == self.len
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::empty(0, 0)]
    #[case::one_bit(1, 1)]
    #[case::exact_byte(8, 1)]
    #[case::spill(9, 2)]
    #[case::many(1_000_001, 125_001)]
    fn backing_storage_is_ceil_len_over_8(#[case] len: usize, #[case] bytes: usize) {
        let map = PresenceMap::new(len);
        assert_eq!(map.bits.len(), bytes);
        assert_eq!(map.len(), len);
    }

    #[test]
    fn set_is_monotonic_and_idempotent() {
        let mut map = PresenceMap::new(20);
        for i in [0, 7, 8, 15, 19] {
            map.set(i);
            assert!(map.get(i));
        }
        map.set(7);
        map.set(7);

        for i in 0..20 {
            assert_eq!(map.get(i), [0, 7, 8, 15, 19].contains(&i), "bit {i}");
        }
        assert_eq!(map.count_set(), 5);
    }

    #[test]
    fn neighbouring_bits_are_independent() {
        // Each bit of a byte maps to its own offset.
        let mut map = PresenceMap::new(16);
        map.set(3);
        assert!(!map.get(2));
        assert!(map.get(3));
        assert!(!map.get(4));
        assert!(!map.get(11));
    }

    #[rstest]
    #[case::unaligned(3..29)]
    #[case::aligned(8..24)]
    #[case::within_byte(2..5)]
    #[case::to_end(5..37)]
    #[case::empty(10..10)]
    fn set_range_marks_exactly_the_range(#[case] range: Range<usize>) {
        let mut map = PresenceMap::new(37);
        map.set_range(range.clone());
        for i in 0..37 {
            assert_eq!(map.get(i), range.contains(&i), "bit {i}");
        }
        assert_eq!(map.count_set(), range.len());
    }

    #[test]
    fn run_len_counts_present_and_absent_runs() {
        let mut map = PresenceMap::new(100);
        map.set_range(10..50);

        assert_eq!(map.run_len(0, 100, false), 10);
        assert_eq!(map.run_len(0, 100, true), 0);
        assert_eq!(map.run_len(10, 100, true), 40);
        assert_eq!(map.run_len(13, 5, true), 5);
        assert_eq!(map.run_len(50, 100, false), 50);
        assert_eq!(map.run_len(99, 100, false), 1);
        assert_eq!(map.run_len(100, 100, false), 0);
    }

    #[test]
    fn run_len_on_fresh_map_is_capped_by_end() {
        let map = PresenceMap::new(1_000);
        assert_eq!(map.run_len(0, 262_144, false), 1_000);
        assert_eq!(map.run_len(990, 262_144, false), 10);
    }

    #[test]
    fn completeness() {
        let mut map = PresenceMap::new(10);
        assert!(!map.is_complete());
        map.set_range(0..10);
        assert!(map.is_complete());
        assert!(PresenceMap::new(0).is_complete());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn get_out_of_range_panics() {
        let map = PresenceMap::new(8);
        let _ = map.get(8);
    }
}
