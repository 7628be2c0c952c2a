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
//! Division-free reduction of a word to `[0, p)`.
//!
//! `fastrange(word, p) = (word * p) >> bits(word)`, a fair interval map with
//! bias at most `p / 2^bits(word)`. The sketches use it wherever a hash must
//! be reduced to a range that is not a compile-time power of two.

/// Maps a 32-bit word to `[0, p)`.
#[inline]
pub fn fastrange32(word: u32, p: u32) -> u32 {
    ((u64::from(word) * u64::from(p)) >> 32) as u32
}

/// Maps a 64-bit word to `[0, p)`.
#[inline]
pub fn fastrange64(word: u64, p: u64) -> u64 {
    ((u128::from(word) * u128::from(p)) >> 64) as u64
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn boundary_words_map_to_range_edges() {
        assert_eq!(fastrange32(0, 1000), 0);
        assert_eq!(fastrange32(u32::MAX, 1000), 999);
        assert_eq!(fastrange64(0, 1000), 0);
        assert_eq!(fastrange64(u64::MAX, 1000), 999);
    }

    #[test]
    fn midpoint_word_maps_to_midpoint() {
        assert_eq!(fastrange64(1_u64 << 63, 10), 5);
        assert_eq!(fastrange32(1_u32 << 31, 10), 5);
    }

    proptest! {
        #[test]
        fn result_is_always_in_range(word: u64, p in 1_u64..=u64::MAX) {
            prop_assert!(fastrange64(word, p) < p);
        }

        #[test]
        fn result_is_monotone_in_word(a: u32, b: u32, p in 1_u32..=u32::MAX) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(fastrange32(lo, p) <= fastrange32(hi, p));
        }
    }
}
