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
//! Streaming summary sketches for one-pass approximate analytics.
//!
//! The crate currently exposes:
//! - [`count_sketch::CountSketch`] for unbiased point-frequency estimation.
//! - [`space_saving::SpaceSaving`] and [`space_saving::HashedSpaceSaving`]
//!   for approximate heavy hitters over a fixed number of tracked slots.
//! - [`kll::KllSketch`] for approximate quantiles via randomized compaction.
//!
//! Shared primitives live in their own modules:
//! - [`hash`] for the 128-bit MurmurHash3 every keyed sketch routes through,
//! - [`fastrange`] for division-free range reduction,
//! - [`simd`] for block equality scans returning lane bitmasks,
//! - [`random`] for a buffered single-bit randomness source.
//!
//! All sketches are single-threaded state machines: they own their storage
//! exclusively, never perform I/O, and never allocate on the insert path
//! (the KLL sketch allocates its full backing store once, at construction).

use thiserror::Error;

pub mod count_sketch;
pub mod fastrange;
pub mod hash;
pub mod kll;
pub mod random;
pub mod simd;
pub mod space_saving;

pub use count_sketch::CountSketch;
pub use kll::KllSketch;
pub use space_saving::{HashedSpaceSaving, SpaceSaving};

/// Errors returned by sketch constructors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SketchError {
    /// Returned when a constructor receives an invalid argument.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),
}
