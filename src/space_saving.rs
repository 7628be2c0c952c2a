// MIT License
//
// Copyright (c) 2026 Raja Lehtihet & Wael El Oraiby
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.
//
//! Space-Saving sketch for approximate heavy hitters.
//!
//! The sketch keeps exactly `K` tracked slots as a pair of parallel arrays
//! forming a min-heap on the weights. An insert scans the key array in SIMD
//! blocks; a hit bumps that slot, a miss overwrites the heap root, which by
//! the heap invariant is the minimum-weight slot. Either way one sift-down
//! restores the heap.
//!
//! Two variants cover the two key shapes:
//! - [`SpaceSaving`] tracks fixed-width arithmetic keys directly,
//! - [`HashedSpaceSaving`] tracks opaque keys through 64-bit fingerprints,
//!   confirming every fingerprint hit by full equality.

use crate::hash::{f32_key_bits, f64_key_bits, fold128, SketchHash};
use crate::simd::ScanWord;

/// Fixed-width keys [`SpaceSaving`] can scan directly.
///
/// Keys are compared by bit pattern, so semantically equal values must map
/// to one canonical pattern; floating-point `-0.0` normalizes to `+0.0`.
pub trait ScanKey: Copy + PartialEq + core::fmt::Debug {
    /// Unsigned word with the same width as the key.
    type Bits: ScanWord;

    /// Canonical representation stored in the sketch.
    fn normalized(self) -> Self;

    /// Bit pattern used for equality scans.
    fn to_scan_bits(self) -> Self::Bits;

    /// Reconstructs a key from a stored bit pattern.
    fn from_scan_bits(bits: Self::Bits) -> Self;

    /// Distinct placeholder for unoccupied slot `index`.
    fn placeholder(index: usize) -> Self;
}

macro_rules! impl_scan_key_int {
    ($($ty:ty => $bits:ty;)*) => {
        $(impl ScanKey for $ty {
            type Bits = $bits;

            #[inline]
            fn normalized(self) -> Self {
                self
            }

            #[inline]
            fn to_scan_bits(self) -> $bits {
                self as $bits
            }

            #[inline]
            fn from_scan_bits(bits: $bits) -> Self {
                bits as $ty
            }

            #[inline]
            fn placeholder(index: usize) -> Self {
                index as $ty
            }
        })*
    };
}

impl_scan_key_int! {
    u16 => u16;
    i16 => u16;
    u32 => u32;
    i32 => u32;
    u64 => u64;
    i64 => u64;
}

impl ScanKey for f32 {
    type Bits = u32;

    #[inline]
    fn normalized(self) -> Self {
        if self == 0.0 {
            0.0
        } else {
            self
        }
    }

    #[inline]
    fn to_scan_bits(self) -> u32 {
        f32_key_bits(self)
    }

    #[inline]
    fn from_scan_bits(bits: u32) -> Self {
        f32::from_bits(bits)
    }

    #[inline]
    fn placeholder(index: usize) -> Self {
        index as f32
    }
}

impl ScanKey for f64 {
    type Bits = u64;

    #[inline]
    fn normalized(self) -> Self {
        if self == 0.0 {
            0.0
        } else {
            self
        }
    }

    #[inline]
    fn to_scan_bits(self) -> u64 {
        f64_key_bits(self)
    }

    #[inline]
    fn from_scan_bits(bits: u64) -> Self {
        f64::from_bits(bits)
    }

    #[inline]
    fn placeholder(index: usize) -> Self {
        index as f64
    }
}

/// Heavy-hitter sketch over fixed-width arithmetic keys.
///
/// `K` is the number of tracked slots and must be a positive multiple of 32
/// (the SIMD scan block granularity), enforced at instantiation. Slots start
/// as the distinct placeholder sequence `0, 1, ..., K-1` with weight zero,
/// so no real key can match more than one slot; a key equal to a
/// placeholder simply claims that slot early and is counted correctly from
/// then on.
///
/// # Example
/// ```rust
/// use fastsketches::space_saving::SpaceSaving;
///
/// let mut sketch: SpaceSaving<u64> = SpaceSaving::new();
/// for _ in 0..10 {
///     sketch.insert(700);
/// }
/// sketch.insert(900);
///
/// let tracked: Vec<_> = sketch.tracked().collect();
/// assert!(tracked.contains(&(700, 10)));
/// assert!(tracked.contains(&(900, 1)));
/// ```
#[derive(Debug)]
pub struct SpaceSaving<T, const K: usize = 96>
where
    T: ScanKey,
{
    /// Tracked key bit patterns, scanned in SIMD blocks.
    values: [T::Bits; K],
    /// Min-heap of per-slot weights (root at 0, children of `i` at
    /// `2i + 1` and `2i + 2`).
    weights: [u64; K],
}

impl<T, const K: usize> SpaceSaving<T, K>
where
    T: ScanKey,
{
    const PARAMS_OK: () = {
        assert!(K > 0, "K must be positive");
        assert!(K % 32 == 0, "K must be a multiple of 32");
    };

    /// Creates an empty sketch.
    pub fn new() -> Self {
        let () = Self::PARAMS_OK;
        Self {
            values: core::array::from_fn(|i| T::placeholder(i).to_scan_bits()),
            weights: [0; K],
        }
    }

    /// Returns the number of tracked slots.
    pub fn capacity(&self) -> usize {
        K
    }

    /// Returns the minimum tracked weight (the heap root).
    pub fn min_weight(&self) -> u64 {
        self.weights[0]
    }

    /// Returns the per-slot weights in heap order.
    pub fn weights(&self) -> &[u64; K] {
        &self.weights
    }

    /// Returns the occupied `(key, weight)` slots in heap order.
    pub fn tracked(&self) -> impl Iterator<Item = (T, u64)> + '_ {
        self.values
            .iter()
            .zip(self.weights.iter())
            .filter(|&(_, &weight)| weight > 0)
            .map(|(&bits, &weight)| (T::from_scan_bits(bits), weight))
    }

    /// Inserts one occurrence of `value`.
    ///
    /// O(K) for the scan plus O(log K) for the heap repair; never allocates.
    pub fn insert(&mut self, value: T) {
        let bits = value.normalized().to_scan_bits();
        let slot = self.find(bits);
        self.weights[slot] += 1;
        self.values[slot] = bits;
        self.sift_down(slot);
    }

    /// Returns the slot holding `bits`, or `0` (the heap root) on a miss.
    fn find(&self, bits: T::Bits) -> usize {
        let mut base = 0;
        while base + <T::Bits as ScanWord>::LANES_LARGE <= K {
            let mask = <T::Bits as ScanWord>::match_mask_large(bits, &self.values[base..]);
            if mask != 0 {
                return base + mask.trailing_zeros() as usize;
            }
            base += <T::Bits as ScanWord>::LANES_LARGE;
        }
        while base + <T::Bits as ScanWord>::LANES_SMALL <= K {
            let mask = <T::Bits as ScanWord>::match_mask_small(bits, &self.values[base..]);
            if mask != 0 {
                return base + mask.trailing_zeros() as usize;
            }
            base += <T::Bits as ScanWord>::LANES_SMALL;
        }
        0
    }

    /// Restores the heap after the weight at `slot` increased, carrying the
    /// key array along.
    fn sift_down(&mut self, slot: usize) {
        let weight = self.weights[slot];
        let bits = self.values[slot];
        let mut parent = slot;
        let mut child = 2 * parent + 1;
        while child < K {
            // Switch to the right child only if it is strictly smaller.
            let right = child + 1;
            if right < K && self.weights[child] > self.weights[right] {
                child = right;
            }
            if weight <= self.weights[child] {
                break;
            }
            self.weights[parent] = self.weights[child];
            self.values[parent] = self.values[child];
            parent = child;
            child = 2 * parent + 1;
        }
        self.weights[parent] = weight;
        self.values[parent] = bits;
    }
}

impl<T, const K: usize> Default for SpaceSaving<T, K>
where
    T: ScanKey,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Heavy-hitter sketch over opaque keys (strings, wide integers, ...).
///
/// Works like [`SpaceSaving`], but the SIMD scan runs over a parallel array
/// of 64-bit fingerprints; every fingerprint hit is confirmed against the
/// stored key before it counts, so fingerprint collisions are handled
/// internally and never surface.
///
/// # Example
/// ```rust
/// use fastsketches::space_saving::HashedSpaceSaving;
///
/// let mut sketch: HashedSpaceSaving<String> = HashedSpaceSaving::new();
/// sketch.insert("cat".to_string());
/// sketch.insert("cat".to_string());
/// sketch.insert("dog".to_string());
///
/// let tracked: Vec<_> = sketch.tracked().map(|(k, w)| (k.clone(), w)).collect();
/// assert!(tracked.contains(&("cat".to_string(), 2)));
/// ```
#[derive(Debug)]
pub struct HashedSpaceSaving<T, const K: usize = 96>
where
    T: Eq + SketchHash + Default,
{
    /// Tracked key fingerprints, scanned in SIMD blocks.
    hashes: [u64; K],
    /// Min-heap of per-slot weights.
    weights: [u64; K],
    /// Tracked keys, consulted to confirm fingerprint hits.
    values: [T; K],
}

impl<T, const K: usize> HashedSpaceSaving<T, K>
where
    T: Eq + SketchHash + Default,
{
    const PARAMS_OK: () = {
        assert!(K > 0, "K must be positive");
        assert!(K % 32 == 0, "K must be a multiple of 32");
    };

    /// Creates an empty sketch; fingerprints start as the distinct sequence
    /// `0, 1, ..., K-1`.
    pub fn new() -> Self {
        let () = Self::PARAMS_OK;
        Self {
            hashes: core::array::from_fn(|i| i as u64),
            weights: [0; K],
            values: core::array::from_fn(|_| T::default()),
        }
    }

    /// Returns the number of tracked slots.
    pub fn capacity(&self) -> usize {
        K
    }

    /// Returns the minimum tracked weight (the heap root).
    pub fn min_weight(&self) -> u64 {
        self.weights[0]
    }

    /// Returns the per-slot weights in heap order.
    pub fn weights(&self) -> &[u64; K] {
        &self.weights
    }

    /// Returns the occupied `(key, weight)` slots in heap order.
    pub fn tracked(&self) -> impl Iterator<Item = (&T, u64)> + '_ {
        self.values
            .iter()
            .zip(self.weights.iter())
            .filter(|&(_, &weight)| weight > 0)
            .map(|(value, &weight)| (value, weight))
    }

    /// Inserts one occurrence of `value`.
    pub fn insert(&mut self, value: T) {
        let hash = value.hash128();
        self.insert_prehashed(value, hash);
    }

    /// Inserts one occurrence of an already-hashed `value`.
    ///
    /// O(K) for the scan plus O(log K) for the heap repair; never allocates.
    pub fn insert_prehashed(&mut self, value: T, hash: u128) {
        let fingerprint = fold128(hash);
        let slot = self.find(&value, fingerprint);
        self.hashes[slot] = fingerprint;
        self.weights[slot] += 1;
        self.values[slot] = value;
        self.sift_down(slot);
    }

    /// Returns the slot holding `value`, or `0` (the heap root) on a miss.
    ///
    /// Every set bit of a block mask is a fingerprint hit that must be
    /// confirmed against the stored key.
    fn find(&self, value: &T, fingerprint: u64) -> usize {
        let mut base = 0;
        while base + <u64 as ScanWord>::LANES_LARGE <= K {
            let mut mask = <u64 as ScanWord>::match_mask_large(fingerprint, &self.hashes[base..]);
            while mask != 0 {
                let candidate = base + mask.trailing_zeros() as usize;
                if self.values[candidate] == *value {
                    return candidate;
                }
                mask &= mask - 1;
            }
            base += <u64 as ScanWord>::LANES_LARGE;
        }
        0
    }

    /// Restores the heap after the weight at `slot` increased, carrying the
    /// fingerprint and key arrays in lockstep.
    fn sift_down(&mut self, slot: usize) {
        let mut parent = slot;
        let mut child = 2 * parent + 1;
        while child < K {
            let right = child + 1;
            if right < K && self.weights[child] > self.weights[right] {
                child = right;
            }
            if self.weights[parent] <= self.weights[child] {
                break;
            }
            self.weights.swap(parent, child);
            self.hashes.swap(parent, child);
            self.values.swap(parent, child);
            parent = child;
            child = 2 * parent + 1;
        }
    }
}

impl<T, const K: usize> Default for HashedSpaceSaving<T, K>
where
    T: Eq + SketchHash + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use proptest::prelude::*;

    use super::{HashedSpaceSaving, SpaceSaving};

    fn assert_heap_property(weights: &[u64]) {
        for i in 1..weights.len() {
            assert!(
                weights[(i - 1) / 2] <= weights[i],
                "heap violated at {i}: parent={} child={}",
                weights[(i - 1) / 2],
                weights[i]
            );
        }
    }

    #[test]
    fn capacity_overflow_keeps_heavy_hitters() {
        let mut sketch: SpaceSaving<u64, 32> = SpaceSaving::new();
        for _ in 0..100 {
            sketch.insert(1);
        }
        for _ in 0..50 {
            sketch.insert(2);
        }
        for value in 3..34_u64 {
            sketch.insert(value);
        }
        for _ in 0..60 {
            sketch.insert(5);
        }

        let tracked: HashMap<u64, u64> = sketch.tracked().collect();
        assert_eq!(tracked.get(&1), Some(&100));
        assert_eq!(tracked.get(&2), Some(&50));
        assert!(tracked.get(&5).is_some_and(|&w| w >= 60));
        assert!(sketch.min_weight() <= 2);
        assert_eq!(sketch.weights().iter().sum::<u64>(), 241);
        assert_heap_property(sketch.weights());
    }

    #[test]
    fn normalization_is_idempotent() {
        use super::ScanKey;

        assert_eq!(
            (-0.0_f64).normalized().to_bits(),
            0.0_f64.normalized().to_bits()
        );
        assert_eq!(
            (-0.0_f32).normalized().normalized().to_bits(),
            (-0.0_f32).normalized().to_bits()
        );
        let value = -3.5_f64;
        assert_eq!(
            value.normalized().normalized().to_bits(),
            value.normalized().to_bits()
        );
        assert_eq!(17_u64.normalized(), 17);
    }

    #[test]
    fn signed_zero_occupies_one_slot() {
        let mut sketch: SpaceSaving<f32, 32> = SpaceSaving::new();
        sketch.insert(0.0);
        sketch.insert(-0.0);
        sketch.insert(0.0);

        let tracked: Vec<(f32, u64)> = sketch.tracked().collect();
        assert_eq!(tracked, vec![(0.0, 3)]);
    }

    #[test]
    fn scans_cover_both_block_sizes() {
        // K = 96 walks one 64-lane block and one 32-lane block per find.
        let mut sketch: SpaceSaving<u32, 96> = SpaceSaving::new();
        for value in 1_000..1_096_u32 {
            sketch.insert(value);
        }
        sketch.insert(1_095);

        let tracked: HashMap<u32, u64> = sketch.tracked().collect();
        assert_eq!(tracked.len(), 96);
        assert_eq!(tracked.get(&1_095), Some(&2));
        assert_heap_property(sketch.weights());
    }

    #[test]
    fn u16_keys_use_the_wide_blocks() {
        let mut sketch: SpaceSaving<u16, 64> = SpaceSaving::new();
        for _ in 0..5 {
            sketch.insert(40_000);
        }
        let tracked: HashMap<u16, u64> = sketch.tracked().collect();
        assert_eq!(tracked.get(&40_000), Some(&5));
    }

    #[test]
    fn items_above_the_frequency_threshold_are_tracked() {
        // Every value with true frequency > n / K must survive the stream.
        let mut sketch: SpaceSaving<u64, 32> = SpaceSaving::new();
        let mut n = 0_u64;
        for round in 0..40_u64 {
            for heavy in 0..4_u64 {
                sketch.insert(heavy);
                n += 1;
            }
            sketch.insert(100 + round);
            n += 1;
        }
        let tracked: HashMap<u64, u64> = sketch.tracked().collect();
        for heavy in 0..4_u64 {
            let freq = 40_u64;
            assert!(freq > n / 32);
            assert!(tracked.contains_key(&heavy), "lost heavy hitter {heavy}");
        }
    }

    #[test]
    fn opaque_keys_disambiguate_fingerprint_hits() {
        let mut sketch: HashedSpaceSaving<String, 32> = HashedSpaceSaving::new();
        for _ in 0..30 {
            sketch.insert("alpha".to_string());
        }
        for _ in 0..20 {
            sketch.insert("beta".to_string());
        }
        for value in 0..40_u32 {
            sketch.insert(format!("noise-{value}"));
        }

        let tracked: HashMap<String, u64> = sketch
            .tracked()
            .map(|(key, weight)| (key.clone(), weight))
            .collect();
        assert_eq!(tracked.get("alpha"), Some(&30));
        assert_eq!(tracked.get("beta"), Some(&20));
        assert_heap_property(sketch.weights());
    }

    #[test]
    fn opaque_prehashed_insert_matches_plain_insert() {
        use crate::hash::SketchHash;

        let mut plain: HashedSpaceSaving<String, 32> = HashedSpaceSaving::new();
        let mut prehashed: HashedSpaceSaving<String, 32> = HashedSpaceSaving::new();
        for value in 0..50_u32 {
            let key = format!("key-{}", value % 7);
            let hash = key.hash128();
            plain.insert(key.clone());
            prehashed.insert_prehashed(key, hash);
        }
        assert_eq!(plain.weights(), prehashed.weights());
    }

    proptest! {
        #[test]
        fn heap_and_dominance_hold_under_random_streams(
            values in proptest::collection::vec(0_u16..50, 1..400)
        ) {
            let mut sketch: SpaceSaving<u16, 32> = SpaceSaving::new();
            let mut truth: HashMap<u16, u64> = HashMap::new();
            for &value in &values {
                sketch.insert(value);
                *truth.entry(value).or_insert(0) += 1;
            }

            assert_heap_property(sketch.weights());
            prop_assert_eq!(
                sketch.weights().iter().sum::<u64>(),
                values.len() as u64
            );

            let min_weight = sketch.min_weight();
            for (value, weight) in sketch.tracked() {
                if let Some(&true_freq) = truth.get(&value) {
                    prop_assert!(weight >= true_freq, "under-counted {value}");
                    prop_assert!(
                        weight <= true_freq + min_weight,
                        "over-counted {value}: weight={weight} true={true_freq} min={min_weight}"
                    );
                }
            }
        }
    }
}
