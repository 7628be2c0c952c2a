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
//! KLL sketch (Karnin-Lang-Liberty) for approximate quantile estimation.
//!
//! Items live in a single backing buffer allocated once, at construction,
//! for the worst case of 60 levels. Only a suffix of the buffer is in use;
//! level zero inserts walk leftward through it, so an insert is a pointer
//! decrement plus a write. When the suffix runs out, the lowest over-full
//! level is compacted: sorted, randomly halved into the level above, and
//! the levels below are shifted right to hand the freed slots back to level
//! zero. All compaction movement is rightward, which is what makes the
//! single up-front allocation sufficient.

use core::cmp::Ordering;
use core::fmt;
use core::mem::MaybeUninit;
use core::ptr;
use core::slice;

use crate::random::RandomBitSource;
use crate::SketchError;

/// Default accuracy parameter.
pub const DEFAULT_K: u16 = 200;
/// Smallest accepted `k`, equal to the minimum level width.
pub const MIN_K: u16 = 8;
/// Largest accepted `k`.
pub const MAX_K: u16 = u16::MAX;

/// Minimum population a level is allowed to be capped at.
const MIN_LEVEL_WIDTH: u16 = 8;
/// 60 levels are enough to index at least 2^60 inserted items.
const MAX_NUM_LEVELS: usize = 60;

/// Ordering hook for [`KllSketch`].
pub trait Comparator<T> {
    /// Returns `true` when `a` sorts strictly before `b`.
    fn less(&self, a: &T, b: &T) -> bool;
}

/// Natural ascending order through `PartialOrd`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LessThan;

impl<T: PartialOrd> Comparator<T> for LessThan {
    #[inline]
    fn less(&self, a: &T, b: &T) -> bool {
        a < b
    }
}

/// Approximate quantile sketch with a randomized compactor hierarchy.
///
/// The sketch only ingests; rank and quantile reads are left to a separate
/// reader layer working from [`KllSketch::level_items`], where a level-`l`
/// item carries weight `2^l`.
///
/// The sketch owns its storage exclusively and is not clonable; a parallel
/// ingest partitions the stream across independent instances.
///
/// # Example
/// ```rust
/// use fastsketches::kll::KllSketch;
///
/// let mut sketch: KllSketch<u64> = KllSketch::new(200).unwrap();
/// for value in 0..10_000_u64 {
///     sketch.insert(value);
/// }
/// assert_eq!(sketch.n(), 10_000);
/// assert!(sketch.num_levels() > 1);
/// ```
pub struct KllSketch<T, C = LessThan> {
    comparator: C,
    random_bit: RandomBitSource,
    k: u16,
    num_levels: usize,
    is_level_zero_sorted: bool,
    n: u64,
    max_capacity: usize,
    /// Storage index where the in-use suffix begins; widens leftward as top
    /// levels are added.
    view_start: usize,
    /// Level boundaries, indices into the in-use suffix. The slice for
    /// level `l` is `[levels[l], levels[l + 1])`.
    levels: Vec<u32>,
    /// Capacity by depth below the top level, precomputed once.
    level_capacities: [u16; MAX_NUM_LEVELS],
    /// Raw slots; only `[view_start + levels[0], view_start +
    /// levels[num_levels])` holds live items.
    storage: Box<[MaybeUninit<T>]>,
}

impl<T, C> KllSketch<T, C>
where
    C: Comparator<T>,
{
    /// Creates a sketch with accuracy parameter `k` and the default
    /// comparator.
    ///
    /// # Errors
    /// Returns [`SketchError::InvalidParameter`] when `k < 8`.
    pub fn new(k: u16) -> Result<Self, SketchError>
    where
        C: Default,
    {
        Self::with_comparator(k, C::default())
    }

    /// Creates a sketch with an explicit comparator.
    ///
    /// # Errors
    /// Returns [`SketchError::InvalidParameter`] when `k < 8`.
    pub fn with_comparator(k: u16, comparator: C) -> Result<Self, SketchError> {
        Self::with_bit_source(k, comparator, RandomBitSource::from_entropy())
    }

    /// Creates a sketch with an explicit comparator and randomness source,
    /// making compactions reproducible.
    ///
    /// # Errors
    /// Returns [`SketchError::InvalidParameter`] when `k < 8`.
    pub fn with_bit_source(
        k: u16,
        comparator: C,
        random_bit: RandomBitSource,
    ) -> Result<Self, SketchError> {
        if k < MIN_K {
            return Err(SketchError::InvalidParameter("k must be at least 8"));
        }

        let level_capacities = compute_level_capacities(k);
        let max_capacity: usize = level_capacities.iter().map(|&cap| usize::from(cap)).sum();
        let mut levels = vec![0_u32; MAX_NUM_LEVELS + 2];
        levels[0] = u32::from(k);
        levels[1] = u32::from(k);

        Ok(Self {
            comparator,
            random_bit,
            k,
            num_levels: 1,
            is_level_zero_sorted: false,
            n: 0,
            max_capacity,
            view_start: max_capacity - usize::from(k),
            levels,
            level_capacities,
            storage: Box::new_uninit_slice(max_capacity),
        })
    }

    /// Inserts one item.
    ///
    /// Values that do not compare equal to themselves (floating-point NaN)
    /// are silently dropped and do not advance `n`. A panicking comparator
    /// or `Drop` impl can leak retained items but never double-drops them.
    pub fn insert(&mut self, value: T)
    where
        T: PartialEq,
    {
        // NaN is the only value that is not equal to itself.
        #[allow(clippy::eq_op)]
        if value != value {
            return;
        }
        if self.levels[0] == 0 {
            self.compress_while_updating();
        }
        self.n += 1;
        self.is_level_zero_sorted = false;
        self.levels[0] -= 1;
        let slot = self.view_start + self.levels[0] as usize;
        self.storage[slot].write(value);
    }
}

impl<T, C> KllSketch<T, C> {
    /// Returns the accuracy parameter.
    pub fn k(&self) -> u16 {
        self.k
    }

    /// Returns the number of items ever inserted.
    pub fn n(&self) -> u64 {
        self.n
    }

    /// Returns `true` when no item has been inserted.
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Returns the number of occupied levels.
    pub fn num_levels(&self) -> usize {
        self.num_levels
    }

    /// Returns whether level zero is currently sorted.
    pub fn is_level_zero_sorted(&self) -> bool {
        self.is_level_zero_sorted
    }

    /// Returns the level boundary table, `num_levels + 1` entries.
    pub fn levels(&self) -> &[u32] {
        &self.levels[..=self.num_levels]
    }

    /// Returns the number of items currently retained.
    pub fn retained(&self) -> usize {
        (self.levels[self.num_levels] - self.levels[0]) as usize
    }

    /// Returns the size of the backing buffer in items.
    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    /// Returns the items of one level. Levels above zero are sorted
    /// ascending under the comparator; a level-`level` item carries weight
    /// `2^level`.
    ///
    /// # Panics
    /// Panics when `level >= num_levels()`.
    pub fn level_items(&self, level: usize) -> &[T] {
        assert!(level < self.num_levels, "level out of range");
        let begin = self.view_start + self.levels[level] as usize;
        let end = self.view_start + self.levels[level + 1] as usize;
        unsafe { slice::from_raw_parts(self.storage.as_ptr().add(begin) as *const T, end - begin) }
    }

    /// Capacity of the level at `height` under the current level count.
    pub fn capacity_of_level(&self, height: usize) -> u16 {
        let depth = self.num_levels - height - 1;
        self.level_capacities[depth]
    }
}

impl<T, C> KllSketch<T, C>
where
    C: Comparator<T>,
{
    /// Lowest level whose population reached its capacity.
    ///
    /// Only called when the suffix is exhausted, in which case the occupied
    /// region equals the summed capacity of the current levels and some
    /// level must be full.
    fn find_level_to_compact(&self) -> usize {
        let mut level = 0;
        loop {
            debug_assert!(level < self.num_levels);
            let population = self.levels[level + 1] - self.levels[level];
            if population >= u32::from(self.capacity_of_level(level)) {
                return level;
            }
            level += 1;
        }
    }

    /// Compacts the lowest full level to make room for level zero.
    fn compress_while_updating(&mut self) {
        let level = self.find_level_to_compact();
        // Adding the top level first matters: it widens the suffix and
        // shifts every boundary before they are read below.
        if level == self.num_levels - 1 {
            self.add_empty_top_level();
        }

        let raw_beg = self.levels[level] as usize;
        let raw_lim = self.levels[level + 1] as usize;
        let pop_above = self.levels[level + 2] as usize - raw_lim;
        let raw_pop = raw_lim - raw_beg;
        let odd_pop = raw_pop % 2 == 1;
        let adj_beg = if odd_pop { raw_beg + 1 } else { raw_beg };
        let adj_pop = if odd_pop { raw_pop - 1 } else { raw_pop };
        let half_adj_pop = adj_pop / 2;

        let buf = unsafe { (self.storage.as_mut_ptr() as *mut T).add(self.view_start) };

        // Level zero is the only level allowed to be unsorted; sort exactly
        // the window about to compact (the odd leftover stays put).
        if level == 0 && !self.is_level_zero_sorted {
            let window = unsafe { slice::from_raw_parts_mut(buf.add(adj_beg), adj_pop) };
            let comparator = &self.comparator;
            window.sort_unstable_by(|a, b| {
                if comparator.less(a, b) {
                    Ordering::Less
                } else if comparator.less(b, a) {
                    Ordering::Greater
                } else {
                    Ordering::Equal
                }
            });
        }

        let offset = self.random_bit.next_bit() as usize;
        unsafe {
            if pop_above == 0 {
                halve_up(buf, adj_beg, adj_pop, offset);
            } else {
                halve_down(buf, adj_beg, adj_pop, offset);
                merge_sorted_runs(
                    &self.comparator,
                    buf,
                    adj_beg,
                    half_adj_pop,
                    raw_lim,
                    pop_above,
                    adj_beg + half_adj_pop,
                );
            }
        }

        self.levels[level + 1] -= half_adj_pop as u32;
        if odd_pop {
            // The level keeps one item: the leftover moves next to the new
            // boundary.
            self.levels[level] = self.levels[level + 1] - 1;
            let dst = self.levels[level] as usize;
            if dst != raw_beg {
                unsafe { ptr::copy_nonoverlapping(buf.add(raw_beg), buf.add(dst), 1) };
            }
        } else {
            self.levels[level] = self.levels[level + 1];
        }

        // Shift the levels below rightward so the freed slots surface at
        // the left edge for level zero.
        if level > 0 {
            let bottom = self.levels[0] as usize;
            let amount = raw_beg - bottom;
            unsafe { ptr::copy(buf.add(bottom), buf.add(bottom + half_adj_pop), amount) };
            for lower in 0..level {
                self.levels[lower] += half_adj_pop as u32;
            }
        }
    }

    /// Widens the in-use suffix leftward by one empty top level.
    ///
    /// No item moves; every existing boundary shifts by the new level's
    /// capacity because boundaries index into the suffix.
    fn add_empty_top_level(&mut self) {
        let current_total = self.levels[self.num_levels];
        let delta = u32::from(self.level_capacities[self.num_levels]);
        let new_total = current_total + delta;

        self.view_start = self.max_capacity - new_total as usize;
        for i in 0..=self.num_levels {
            self.levels[i] += delta;
        }
        self.num_levels += 1;
        self.levels[self.num_levels] = new_total;
    }
}

impl<T, C> Drop for KllSketch<T, C> {
    fn drop(&mut self) {
        if !core::mem::needs_drop::<T>() {
            return;
        }
        let begin = self.view_start + self.levels[0] as usize;
        let end = self.view_start + self.levels[self.num_levels] as usize;
        for slot in &mut self.storage[begin..end] {
            unsafe { slot.assume_init_drop() };
        }
    }
}

impl<T, C> fmt::Debug for KllSketch<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let retained = (self.levels[self.num_levels] - self.levels[0]) as usize;
        f.debug_struct("KllSketch")
            .field("k", &self.k)
            .field("n", &self.n)
            .field("num_levels", &self.num_levels)
            .field("retained", &retained)
            .finish_non_exhaustive()
    }
}

/// Keeps every second item of the even-sized window `buf[start..start +
/// len)` at parity `offset`, packing survivors into the lower half.
/// Discarded items are dropped in place; afterwards only `[start, start +
/// len / 2)` is live.
unsafe fn halve_down<T>(buf: *mut T, start: usize, len: usize, offset: usize) {
    let half = len / 2;
    for i in 0..half {
        let keep = start + 2 * i + offset;
        let toss = start + 2 * i + 1 - offset;
        ptr::drop_in_place(buf.add(toss));
        let dst = start + i;
        if keep != dst {
            ptr::copy_nonoverlapping(buf.add(keep), buf.add(dst), 1);
        }
    }
}

/// Mirror of [`halve_down`] packing survivors into the upper half;
/// afterwards only `[start + len / 2, start + len)` is live.
unsafe fn halve_up<T>(buf: *mut T, start: usize, len: usize, offset: usize) {
    let top = start + len - 1;
    for i in (start + len / 2..=top).rev() {
        let keep = 2 * i - top - offset;
        let toss = if offset == 0 { keep - 1 } else { keep + 1 };
        ptr::drop_in_place(buf.add(toss));
        if keep != i {
            ptr::copy_nonoverlapping(buf.add(keep), buf.add(i), 1);
        }
    }
}

/// Stable two-pointer merge of two sorted runs of the same buffer into
/// `buf[start_c..start_c + len_a + len_b)`.
///
/// The destination may overlap the runs from the left: the write cursor
/// never overtakes an unconsumed source slot because each write consumes
/// exactly one source item.
unsafe fn merge_sorted_runs<T, C: Comparator<T>>(
    comparator: &C,
    buf: *mut T,
    start_a: usize,
    len_a: usize,
    start_b: usize,
    len_b: usize,
    start_c: usize,
) {
    let lim_a = start_a + len_a;
    let lim_b = start_b + len_b;
    let lim_c = start_c + len_a + len_b;

    let mut a = start_a;
    let mut b = start_b;
    for c in start_c..lim_c {
        let take_a = if a == lim_a {
            false
        } else if b == lim_b {
            true
        } else {
            comparator.less(&*buf.add(a), &*buf.add(b))
        };
        let src = if take_a {
            a += 1;
            a - 1
        } else {
            b += 1;
            b - 1
        };
        if src != c {
            ptr::copy_nonoverlapping(buf.add(src), buf.add(c), 1);
        }
    }
}

/// Precomputes the capacity of a level at every depth below the top.
///
/// The first contiguous decreasing run of `max(8, cap_aux(k, depth))` is
/// stored; once a depth hits the floor, every deeper entry stays there.
fn compute_level_capacities(k: u16) -> [u16; MAX_NUM_LEVELS] {
    let mut capacities = [MIN_LEVEL_WIDTH; MAX_NUM_LEVELS];
    for depth in 0..MAX_NUM_LEVELS {
        capacities[depth] = int_cap_aux(k, depth as u32).max(MIN_LEVEL_WIDTH);
        if capacities[depth] == MIN_LEVEL_WIDTH {
            break;
        }
    }
    capacities
}

/// `floor((2k * (2/3)^depth + 1) / 2)`, split into two phases past depth 30
/// so the shifted numerator stays inside `u64`.
fn int_cap_aux(k: u16, depth: u32) -> u16 {
    if depth <= 30 {
        return int_cap_aux_aux(k, depth);
    }
    let half = depth / 2;
    let rest = depth - half;
    let partial = int_cap_aux_aux(k, half);
    int_cap_aux_aux(partial, rest)
}

fn int_cap_aux_aux(k: u16, depth: u32) -> u16 {
    // Pre-multiplied by two so the trailing shift rounds to nearest.
    let two_k = u64::from(k) << 1;
    let scaled = (two_k << depth) / 3_u64.pow(depth);
    ((scaled + 1) >> 1) as u16
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{compute_level_capacities, int_cap_aux, KllSketch, LessThan};
    use crate::random::RandomBitSource;

    fn seeded<T: PartialEq + PartialOrd>(k: u16, seed: u64) -> KllSketch<T> {
        KllSketch::with_bit_source(k, LessThan, RandomBitSource::from_seed(seed))
            .expect("valid k")
    }

    fn weighted_cardinality<T: PartialEq>(sketch: &KllSketch<T>) -> u64 {
        (0..sketch.num_levels())
            .map(|level| (sketch.level_items(level).len() as u64) << level)
            .sum()
    }

    fn assert_structure<T: PartialEq + PartialOrd + core::fmt::Debug>(sketch: &KllSketch<T>) {
        let levels = sketch.levels();
        for pair in levels.windows(2) {
            assert!(pair[0] <= pair[1], "levels not monotone: {levels:?}");
        }
        assert!(sketch.retained() <= sketch.max_capacity());
        assert!(sketch.num_levels() <= 60);
        for level in 1..sketch.num_levels() {
            let items = sketch.level_items(level);
            for pair in items.windows(2) {
                assert!(pair[0] <= pair[1], "level {level} unsorted");
            }
        }
    }

    fn estimated_rank(sketch: &KllSketch<u64>, value: u64) -> u64 {
        (0..sketch.num_levels())
            .map(|level| {
                let weight = 1_u64 << level;
                sketch.level_items(level).iter().filter(|&&item| item < value).count() as u64
                    * weight
            })
            .sum()
    }

    #[test]
    fn constructor_validates_k() {
        assert!(KllSketch::<u64>::new(7).is_err());
        assert!(KllSketch::<u64>::new(8).is_ok());
        assert!(KllSketch::<u64>::new(200).is_ok());
        assert!(KllSketch::<u64>::new(u16::MAX).is_ok());
    }

    #[test]
    fn level_capacity_table_matches_the_formula() {
        let capacities = compute_level_capacities(200);
        assert_eq!(&capacities[..8], &[200, 133, 89, 59, 40, 26, 18, 12]);
        assert!(capacities[8..].iter().all(|&cap| cap == 8));
        // Deep depths evaluate in two phases without overflowing.
        assert!(int_cap_aux(u16::MAX, 59) < 8);
    }

    #[test]
    fn backing_buffer_is_sized_for_sixty_levels() {
        let sketch: KllSketch<u64> = seeded(200, 1);
        assert_eq!(sketch.max_capacity(), 993);
        assert_eq!(sketch.retained(), 0);
        assert!(sketch.is_empty());
    }

    #[test]
    fn first_compaction_promotes_one_parity_class() {
        let mut sketch: KllSketch<u64> = seeded(8, 3);
        for value in 0..9_u64 {
            sketch.insert(value);
        }

        assert_eq!(sketch.n(), 9);
        assert_eq!(sketch.num_levels(), 2);
        assert_eq!(sketch.level_items(0), &[8]);
        let promoted = sketch.level_items(1);
        assert!(
            promoted == [0, 2, 4, 6].as_slice() || promoted == [1, 3, 5, 7].as_slice(),
            "promoted={promoted:?}"
        );
    }

    #[test]
    fn monotone_stream_keeps_structure_and_rank_accuracy() {
        let mut sketch: KllSketch<u64> = seeded(200, 0x5eed);
        for value in 0..100_000_u64 {
            sketch.insert(value);
        }

        assert_eq!(sketch.n(), 100_000);
        assert!(sketch.num_levels() >= 3);
        assert_structure(&sketch);
        assert_eq!(weighted_cardinality(&sketch), 100_000);

        let rank = estimated_rank(&sketch, 50_000) as i64;
        assert!((rank - 50_000).abs() < 5_000, "rank={rank}");
    }

    #[test]
    fn nan_values_are_dropped() {
        let mut sketch: KllSketch<f64> = seeded(200, 9);
        for value in [1.0, f64::NAN, 2.0, f64::NAN, 3.0] {
            sketch.insert(value);
        }

        assert_eq!(sketch.n(), 3);
        let mut retained: Vec<f64> = (0..sketch.num_levels())
            .flat_map(|level| sketch.level_items(level).iter().copied())
            .collect();
        retained.sort_by(f64::total_cmp);
        assert_eq!(retained, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn non_copy_items_survive_compaction() {
        let mut sketch: KllSketch<String> = KllSketch::with_bit_source(
            8,
            LessThan,
            RandomBitSource::from_seed(77),
        )
        .expect("valid k");
        for value in 0..500_u32 {
            sketch.insert(format!("item-{value:04}"));
        }

        assert_eq!(sketch.n(), 500);
        assert_structure(&sketch);
        assert_eq!(weighted_cardinality(&sketch), 500);
    }

    #[test]
    fn reversed_and_shuffled_streams_conserve_weight() {
        let mut sketch: KllSketch<u64> = seeded(16, 21);
        for value in (0..5_000_u64).rev() {
            sketch.insert(value);
        }
        assert_structure(&sketch);
        assert_eq!(weighted_cardinality(&sketch), 5_000);

        let mut sketch: KllSketch<u64> = seeded(16, 22);
        for value in 0..5_000_u64 {
            // Cheap deterministic shuffle.
            sketch.insert(value.wrapping_mul(0x9e37_79b9_7f4a_7c15) >> 11);
        }
        assert_structure(&sketch);
        assert_eq!(weighted_cardinality(&sketch), 5_000);
    }

    proptest! {
        #[test]
        fn random_streams_preserve_invariants(
            values in proptest::collection::vec(any::<u64>(), 1..2_000),
            seed: u64,
        ) {
            let mut sketch: KllSketch<u64> = seeded(8, seed);
            for &value in &values {
                sketch.insert(value);
            }
            prop_assert_eq!(sketch.n(), values.len() as u64);
            assert_structure(&sketch);
            prop_assert_eq!(weighted_cardinality(&sketch), values.len() as u64);
        }
    }
}
