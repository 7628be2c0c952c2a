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
//! 128-bit MurmurHash3 (x64 variant) over bytes and fixed-width keys.
//!
//! Every keyed sketch in the crate routes through this hash. The fixed-width
//! paths produce bit-identical output to the byte routine applied to the
//! little-endian encoding of the key, while letting the compiler drop the
//! block loop and the tail switch entirely.

/// Canonical seed used when no seed is supplied.
pub const DEFAULT_SEED: u64 = 9001;

const C1: u64 = 0x87c3_7b91_1142_53d5;
const C2: u64 = 0x4cf5_ad43_2745_937f;

/// Finalization mix, forces all bits of a hash block to avalanche.
#[inline]
fn fmix64(mut k: u64) -> u64 {
    k ^= k >> 33;
    k = k.wrapping_mul(0xff51_afd7_ed55_8ccd);
    k ^= k >> 33;
    k = k.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    k ^= k >> 33;
    k
}

#[inline]
fn read_u64_le(bytes: &[u8], offset: usize) -> u64 {
    let mut word = [0_u8; 8];
    word.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(word)
}

/// Hashes an arbitrary byte slice.
pub fn hash_bytes(data: &[u8], seed: u64) -> u128 {
    let len = data.len();
    let mut h1 = seed;
    let mut h2 = seed;

    let nblocks = len >> 4;
    for block in 0..nblocks {
        let mut k1 = read_u64_le(data, block * 16);
        let mut k2 = read_u64_le(data, block * 16 + 8);

        k1 = k1.wrapping_mul(C1).rotate_left(31).wrapping_mul(C2);
        h1 ^= k1;
        h1 = h1.rotate_left(27).wrapping_add(h2);
        h1 = h1.wrapping_mul(5).wrapping_add(0x52dc_e729);

        k2 = k2.wrapping_mul(C2).rotate_left(33).wrapping_mul(C1);
        h2 ^= k2;
        h2 = h2.rotate_left(31).wrapping_add(h1);
        h2 = h2.wrapping_mul(5).wrapping_add(0x3849_5ab5);
    }

    let tail = &data[nblocks * 16..];
    if tail.len() > 8 {
        let mut k2 = 0_u64;
        for i in (8..tail.len()).rev() {
            k2 ^= u64::from(tail[i]) << (8 * (i - 8));
        }
        k2 = k2.wrapping_mul(C2).rotate_left(33).wrapping_mul(C1);
        h2 ^= k2;
    }
    if !tail.is_empty() {
        let mut k1 = 0_u64;
        for i in (0..tail.len().min(8)).rev() {
            k1 ^= u64::from(tail[i]) << (8 * i);
        }
        k1 = k1.wrapping_mul(C1).rotate_left(31).wrapping_mul(C2);
        h1 ^= k1;
    }

    finalize(h1, h2, len as u64)
}

/// Shared unrolled path for keys of at most 8 bytes.
///
/// Equivalent to [`hash_bytes`] on the `len`-byte little-endian encoding of
/// `key`: the block loop vanishes and the whole tail collapses into one
/// `k1` round.
#[inline]
fn hash_word(key: u64, len: u64, seed: u64) -> u128 {
    let mut h1 = seed;
    let h2 = seed;

    let k1 = key.wrapping_mul(C1).rotate_left(31).wrapping_mul(C2);
    h1 ^= k1;

    finalize(h1, h2, len)
}

/// Hashes a 1-byte key.
#[inline]
pub fn hash_u8(key: u8, seed: u64) -> u128 {
    hash_word(u64::from(key), 1, seed)
}

/// Hashes a 2-byte key.
#[inline]
pub fn hash_u16(key: u16, seed: u64) -> u128 {
    hash_word(u64::from(key), 2, seed)
}

/// Hashes a 4-byte key.
#[inline]
pub fn hash_u32(key: u32, seed: u64) -> u128 {
    hash_word(u64::from(key), 4, seed)
}

/// Hashes an 8-byte key.
#[inline]
pub fn hash_u64(key: u64, seed: u64) -> u128 {
    hash_word(key, 8, seed)
}

/// Hashes a 16-byte key as a single body block with no tail.
#[inline]
pub fn hash_u128(key: u128, seed: u64) -> u128 {
    let mut h1 = seed;
    let mut h2 = seed;

    let mut k1 = key as u64;
    let mut k2 = (key >> 64) as u64;

    k1 = k1.wrapping_mul(C1).rotate_left(31).wrapping_mul(C2);
    h1 ^= k1;
    h1 = h1.rotate_left(27).wrapping_add(h2);
    h1 = h1.wrapping_mul(5).wrapping_add(0x52dc_e729);

    k2 = k2.wrapping_mul(C2).rotate_left(33).wrapping_mul(C1);
    h2 ^= k2;
    h2 = h2.rotate_left(31).wrapping_add(h1);
    h2 = h2.wrapping_mul(5).wrapping_add(0x3849_5ab5);

    finalize(h1, h2, 16)
}

#[inline]
fn finalize(mut h1: u64, mut h2: u64, len: u64) -> u128 {
    h1 ^= len;
    h2 ^= len;

    h1 = h1.wrapping_add(h2);
    h2 = h2.wrapping_add(h1);

    h1 = fmix64(h1);
    h2 = fmix64(h2);

    h1 = h1.wrapping_add(h2);
    h2 = h2.wrapping_add(h1);

    u128::from(h1) | (u128::from(h2) << 64)
}

/// Folds a 128-bit hash into a 64-bit fingerprint.
#[inline]
pub fn fold128(hash: u128) -> u64 {
    (hash ^ (hash >> 64)) as u64
}

/// Bit pattern an `f32` key is hashed under.
///
/// `+0.0` and `-0.0` compare equal but differ in their sign bit; both map to
/// the all-zero pattern. Every other value keeps its raw bits.
#[inline]
pub fn f32_key_bits(value: f32) -> u32 {
    let bits = value.to_bits();
    if bits & (i32::MAX as u32) == 0 {
        0
    } else {
        bits
    }
}

/// Bit pattern an `f64` key is hashed under. See [`f32_key_bits`].
#[inline]
pub fn f64_key_bits(value: f64) -> u64 {
    let bits = value.to_bits();
    if bits & (i64::MAX as u64) == 0 {
        0
    } else {
        bits
    }
}

/// Types the sketches can hash.
///
/// Integers and floats take the unrolled fixed-width paths; byte-like types
/// take the general byte routine.
pub trait SketchHash {
    /// Hashes `self` with an explicit seed.
    fn hash128_seeded(&self, seed: u64) -> u128;

    /// Hashes `self` with the canonical seed [`DEFAULT_SEED`].
    fn hash128(&self) -> u128 {
        self.hash128_seeded(DEFAULT_SEED)
    }
}

macro_rules! impl_sketch_hash_word {
    ($($ty:ty => $via:ty, $f:ident;)*) => {
        $(impl SketchHash for $ty {
            #[inline]
            fn hash128_seeded(&self, seed: u64) -> u128 {
                $f(*self as $via, seed)
            }
        })*
    };
}

impl_sketch_hash_word! {
    u8 => u8, hash_u8;
    i8 => u8, hash_u8;
    u16 => u16, hash_u16;
    i16 => u16, hash_u16;
    u32 => u32, hash_u32;
    i32 => u32, hash_u32;
    u64 => u64, hash_u64;
    i64 => u64, hash_u64;
    u128 => u128, hash_u128;
    i128 => u128, hash_u128;
}

impl SketchHash for f32 {
    #[inline]
    fn hash128_seeded(&self, seed: u64) -> u128 {
        hash_u32(f32_key_bits(*self), seed)
    }
}

impl SketchHash for f64 {
    #[inline]
    fn hash128_seeded(&self, seed: u64) -> u128 {
        hash_u64(f64_key_bits(*self), seed)
    }
}

impl SketchHash for [u8] {
    #[inline]
    fn hash128_seeded(&self, seed: u64) -> u128 {
        hash_bytes(self, seed)
    }
}

impl SketchHash for Vec<u8> {
    #[inline]
    fn hash128_seeded(&self, seed: u64) -> u128 {
        hash_bytes(self, seed)
    }
}

impl SketchHash for str {
    #[inline]
    fn hash128_seeded(&self, seed: u64) -> u128 {
        hash_bytes(self.as_bytes(), seed)
    }
}

impl SketchHash for String {
    #[inline]
    fn hash128_seeded(&self, seed: u64) -> u128 {
        hash_bytes(self.as_bytes(), seed)
    }
}

impl<T: SketchHash + ?Sized> SketchHash for &T {
    #[inline]
    fn hash128_seeded(&self, seed: u64) -> u128 {
        (**self).hash128_seeded(seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_routine_matches_reference_vectors() {
        assert_eq!(
            hash_bytes(b"hello", DEFAULT_SEED),
            0xc3001500_fe032ef2_21b77bd4_a835c1aa
        );
        assert_eq!(
            hash_bytes(b"", DEFAULT_SEED),
            0x609736b2_52406b94_1e70a322_66491bb9
        );
        // One full body block plus a 4-byte tail.
        assert_eq!(
            hash_bytes(b"abcdefghijklmnopqrst", DEFAULT_SEED),
            0xdaa556bc_b18138ba_63f6ba61_e81e8f16
        );
    }

    #[test]
    fn fixed_width_paths_match_reference_vectors() {
        assert_eq!(
            hash_u16(42, DEFAULT_SEED),
            0xd7e3f842_f2e09005_ae9792d5_34b76f5d
        );
        assert_eq!(
            hash_u32(42, DEFAULT_SEED),
            0x6391911d_5ca6de6c_24a0d2ca_e0516700
        );
        assert_eq!(
            hash_u64(42, DEFAULT_SEED),
            0x9bb539f8_2513297f_908033af_cdd0bc1a
        );
        assert_eq!(
            hash_u128(42, DEFAULT_SEED),
            0x46aebdd6_c23e0137_d2cb6d99_6bdde583
        );
    }

    #[test]
    fn fixed_width_paths_match_byte_routine() {
        let seed = 0xdead_beef;
        assert_eq!(hash_u8(0x5a, seed), hash_bytes(&0x5a_u8.to_le_bytes(), seed));
        assert_eq!(
            hash_u16(0x1234, seed),
            hash_bytes(&0x1234_u16.to_le_bytes(), seed)
        );
        assert_eq!(
            hash_u32(0xdead_beef, seed),
            hash_bytes(&0xdead_beef_u32.to_le_bytes(), seed)
        );
        assert_eq!(
            hash_u64(0x0123_4567_89ab_cdef, seed),
            hash_bytes(&0x0123_4567_89ab_cdef_u64.to_le_bytes(), seed)
        );
        assert_eq!(
            hash_u128(0xfeed_face_cafe_beef_0123_4567_89ab_cdef, seed),
            hash_bytes(
                &0xfeed_face_cafe_beef_0123_4567_89ab_cdef_u128.to_le_bytes(),
                seed
            )
        );
    }

    #[test]
    fn hashing_is_deterministic() {
        assert_eq!("streaming".hash128(), "streaming".hash128());
        assert_eq!(7_u64.hash128_seeded(11), 7_u64.hash128_seeded(11));
        assert_ne!(7_u64.hash128_seeded(11), 7_u64.hash128_seeded(12));
    }

    #[test]
    fn signed_keys_hash_like_their_unsigned_bits() {
        assert_eq!((-1_i64).hash128(), u64::MAX.hash128());
        assert_eq!((-5_i16).hash128(), (-5_i16 as u16).hash128());
    }

    #[test]
    fn float_zeros_collapse() {
        assert_eq!((-0.0_f64).hash128(), 0.0_f64.hash128());
        assert_eq!((-0.0_f32).hash128(), 0.0_f32.hash128());
        // Sign still matters away from zero.
        assert_ne!((-1.0_f64).hash128(), 1.0_f64.hash128());
    }

    #[test]
    fn fold_mixes_both_halves() {
        let hash = hash_bytes(b"fold", DEFAULT_SEED);
        assert_eq!(fold128(hash), (hash as u64) ^ ((hash >> 64) as u64));
    }
}
