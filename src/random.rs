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
//! Buffered single-bit randomness source.
//!
//! The KLL compactor consumes one unbiased bit per halving. Drawing a full
//! generator word per bit would waste 63 of its 64 bits, so the source
//! refills a word and shifts bits out of it.

use core::fmt;

use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

/// Source of unbiased single random bits.
///
/// Production sketches seed from operating-system entropy; tests pass a
/// fixed seed so runs are reproducible.
///
/// # Example
/// ```rust
/// use fastsketches::random::RandomBitSource;
///
/// let mut a = RandomBitSource::from_seed(7);
/// let mut b = RandomBitSource::from_seed(7);
/// for _ in 0..128 {
///     assert_eq!(a.next_bit(), b.next_bit());
/// }
/// ```
pub struct RandomBitSource {
    rng: SmallRng,
    buffer: u64,
    remaining: u32,
}

impl RandomBitSource {
    /// Creates a source seeded from operating-system entropy.
    pub fn from_entropy() -> Self {
        Self::with_rng(SmallRng::from_entropy())
    }

    /// Creates a reproducible source from a fixed seed.
    pub fn from_seed(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    fn with_rng(rng: SmallRng) -> Self {
        Self {
            rng,
            buffer: 0,
            remaining: 0,
        }
    }

    /// Returns one random bit as `0` or `1`.
    #[inline]
    pub fn next_bit(&mut self) -> u32 {
        if self.remaining == 0 {
            self.buffer = self.rng.next_u64();
            self.remaining = 64;
        }
        let bit = (self.buffer & 1) as u32;
        self.buffer >>= 1;
        self.remaining -= 1;
        bit
    }
}

impl Default for RandomBitSource {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl fmt::Debug for RandomBitSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomBitSource")
            .field("buffered_bits", &self.remaining)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::RandomBitSource;

    #[test]
    fn seeded_sources_replay_identical_streams() {
        let mut a = RandomBitSource::from_seed(0xfeed);
        let mut b = RandomBitSource::from_seed(0xfeed);
        let bits_a: Vec<u32> = (0..1_000).map(|_| a.next_bit()).collect();
        let bits_b: Vec<u32> = (0..1_000).map(|_| b.next_bit()).collect();
        assert_eq!(bits_a, bits_b);
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = RandomBitSource::from_seed(1);
        let mut b = RandomBitSource::from_seed(2);
        let bits_a: Vec<u32> = (0..256).map(|_| a.next_bit()).collect();
        let bits_b: Vec<u32> = (0..256).map(|_| b.next_bit()).collect();
        assert_ne!(bits_a, bits_b);
    }

    #[test]
    fn bits_are_binary_and_roughly_balanced() {
        let mut source = RandomBitSource::from_seed(42);
        let mut ones = 0_u32;
        for _ in 0..10_000 {
            let bit = source.next_bit();
            assert!(bit == 0 || bit == 1);
            ones += bit;
        }
        // 10 sigma around the mean of a fair coin.
        assert!((4_500..=5_500).contains(&ones), "ones={ones}");
    }
}
