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
//! Block equality scans: one broadcast key against a block of keys.
//!
//! Each scan returns a 64-bit mask whose bit `i` is set iff `keys[i]` equals
//! the needle. On x86-64 with AVX2 enabled at compile time the masks are
//! assembled from 256-bit compares; elsewhere a scalar loop produces the
//! exact same mask. Sketch output never depends on which path runs, only
//! throughput does.

/// Key widths the block scanners understand.
///
/// Blocks come in two sizes so a scan over `K` keys (with `K` a multiple of
/// 32) can run mostly on the large block and finish with the small one.
pub trait ScanWord: Copy + Eq + core::fmt::Debug {
    /// Lanes per large block.
    const LANES_LARGE: usize;
    /// Lanes per small block.
    const LANES_SMALL: usize;

    /// Mask of lanes in `keys[..LANES_LARGE]` equal to `needle`.
    fn match_mask_large(needle: Self, keys: &[Self]) -> u64;

    /// Mask of lanes in `keys[..LANES_SMALL]` equal to `needle`.
    fn match_mask_small(needle: Self, keys: &[Self]) -> u64;
}

#[cfg(any(
    test,
    not(all(target_arch = "x86_64", target_feature = "avx2"))
))]
fn scalar_match_mask<T: Copy + Eq>(needle: T, keys: &[T], lanes: usize) -> u64 {
    let mut mask = 0_u64;
    for (i, &key) in keys[..lanes].iter().enumerate() {
        if key == needle {
            mask |= 1 << i;
        }
    }
    mask
}

#[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
mod avx2 {
    use core::arch::x86_64::*;

    /// Mask from the most significant bit of each 32-bit lane.
    #[inline]
    unsafe fn movemask_epi32(x: __m256i) -> u64 {
        _mm256_movemask_ps(_mm256_castsi256_ps(x)) as u32 as u64
    }

    /// Mask from the most significant bit of each 64-bit lane.
    #[inline]
    unsafe fn movemask_epi64(x: __m256i) -> u64 {
        _mm256_movemask_pd(_mm256_castsi256_pd(x)) as u32 as u64
    }

    /// Compares one 16-bit key with 64 keys.
    #[target_feature(enable = "avx2")]
    pub unsafe fn match64_u16(needle: u16, keys: *const u16) -> u64 {
        let v = _mm256_set1_epi16(needle as i16);
        let x1 = _mm256_cmpeq_epi16(_mm256_loadu_si256(keys as *const __m256i), v);
        let x2 = _mm256_cmpeq_epi16(_mm256_loadu_si256(keys.add(16) as *const __m256i), v);
        let x3 = _mm256_cmpeq_epi16(_mm256_loadu_si256(keys.add(32) as *const __m256i), v);
        let x4 = _mm256_cmpeq_epi16(_mm256_loadu_si256(keys.add(48) as *const __m256i), v);
        // Pack 16-bit compare results down to bytes; the pack interleaves
        // 128-bit halves, so a 64-bit lane permute restores lane order
        // before the byte movemask.
        let x12 = _mm256_permute4x64_epi64::<0b1101_1000>(_mm256_packs_epi16(x1, x2));
        let x34 = _mm256_permute4x64_epi64::<0b1101_1000>(_mm256_packs_epi16(x3, x4));
        let lo = _mm256_movemask_epi8(x12) as u32 as u64;
        let hi = _mm256_movemask_epi8(x34) as u32 as u64;
        lo | (hi << 32)
    }

    /// Compares one 16-bit key with 32 keys.
    #[target_feature(enable = "avx2")]
    pub unsafe fn match32_u16(needle: u16, keys: *const u16) -> u64 {
        let v = _mm256_set1_epi16(needle as i16);
        let x1 = _mm256_cmpeq_epi16(_mm256_loadu_si256(keys as *const __m256i), v);
        let x2 = _mm256_cmpeq_epi16(_mm256_loadu_si256(keys.add(16) as *const __m256i), v);
        let x12 = _mm256_permute4x64_epi64::<0b1101_1000>(_mm256_packs_epi16(x1, x2));
        _mm256_movemask_epi8(x12) as u32 as u64
    }

    /// Compares one 32-bit key with 64 keys.
    #[target_feature(enable = "avx2")]
    pub unsafe fn match64_u32(needle: u32, keys: *const u32) -> u64 {
        let v = _mm256_set1_epi32(needle as i32);
        let mut mask = 0_u64;
        for chunk in 0..8 {
            let x = _mm256_cmpeq_epi32(
                _mm256_loadu_si256(keys.add(chunk * 8) as *const __m256i),
                v,
            );
            mask |= movemask_epi32(x) << (chunk * 8);
        }
        mask
    }

    /// Compares one 32-bit key with 32 keys.
    #[target_feature(enable = "avx2")]
    pub unsafe fn match32_u32(needle: u32, keys: *const u32) -> u64 {
        let v = _mm256_set1_epi32(needle as i32);
        let mut mask = 0_u64;
        for chunk in 0..4 {
            let x = _mm256_cmpeq_epi32(
                _mm256_loadu_si256(keys.add(chunk * 8) as *const __m256i),
                v,
            );
            mask |= movemask_epi32(x) << (chunk * 8);
        }
        mask
    }

    /// Compares one 64-bit key with 32 keys.
    #[target_feature(enable = "avx2")]
    pub unsafe fn match32_u64(needle: u64, keys: *const u64) -> u64 {
        let v = _mm256_set1_epi64x(needle as i64);
        let mut mask = 0_u64;
        for chunk in 0..8 {
            let x = _mm256_cmpeq_epi64(
                _mm256_loadu_si256(keys.add(chunk * 4) as *const __m256i),
                v,
            );
            mask |= movemask_epi64(x) << (chunk * 4);
        }
        mask
    }
}

impl ScanWord for u16 {
    const LANES_LARGE: usize = 64;
    const LANES_SMALL: usize = 32;

    #[inline]
    fn match_mask_large(needle: Self, keys: &[Self]) -> u64 {
        debug_assert!(keys.len() >= Self::LANES_LARGE);
        #[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
        unsafe {
            avx2::match64_u16(needle, keys.as_ptr())
        }
        #[cfg(not(all(target_arch = "x86_64", target_feature = "avx2")))]
        scalar_match_mask(needle, keys, Self::LANES_LARGE)
    }

    #[inline]
    fn match_mask_small(needle: Self, keys: &[Self]) -> u64 {
        debug_assert!(keys.len() >= Self::LANES_SMALL);
        #[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
        unsafe {
            avx2::match32_u16(needle, keys.as_ptr())
        }
        #[cfg(not(all(target_arch = "x86_64", target_feature = "avx2")))]
        scalar_match_mask(needle, keys, Self::LANES_SMALL)
    }
}

impl ScanWord for u32 {
    const LANES_LARGE: usize = 64;
    const LANES_SMALL: usize = 32;

    #[inline]
    fn match_mask_large(needle: Self, keys: &[Self]) -> u64 {
        debug_assert!(keys.len() >= Self::LANES_LARGE);
        #[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
        unsafe {
            avx2::match64_u32(needle, keys.as_ptr())
        }
        #[cfg(not(all(target_arch = "x86_64", target_feature = "avx2")))]
        scalar_match_mask(needle, keys, Self::LANES_LARGE)
    }

    #[inline]
    fn match_mask_small(needle: Self, keys: &[Self]) -> u64 {
        debug_assert!(keys.len() >= Self::LANES_SMALL);
        #[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
        unsafe {
            avx2::match32_u32(needle, keys.as_ptr())
        }
        #[cfg(not(all(target_arch = "x86_64", target_feature = "avx2")))]
        scalar_match_mask(needle, keys, Self::LANES_SMALL)
    }
}

impl ScanWord for u64 {
    const LANES_LARGE: usize = 32;
    const LANES_SMALL: usize = 32;

    #[inline]
    fn match_mask_large(needle: Self, keys: &[Self]) -> u64 {
        debug_assert!(keys.len() >= Self::LANES_LARGE);
        #[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
        unsafe {
            avx2::match32_u64(needle, keys.as_ptr())
        }
        #[cfg(not(all(target_arch = "x86_64", target_feature = "avx2")))]
        scalar_match_mask(needle, keys, Self::LANES_LARGE)
    }

    #[inline]
    fn match_mask_small(needle: Self, keys: &[Self]) -> u64 {
        Self::match_mask_large(needle, keys)
    }
}
