/*!

Sparse Counter (§4.5, SC): a bounded updated-index list wrapping any
[`Incrementable`] vector, letting callers iterate only the handful of slots
actually touched instead of scanning the whole backing vector — until the
touched set grows past `capacity`, at which point the counter gives up on
sparse tracking ("exceeded") and falls back to a full scan for the rest of
its lifetime (or until `clear`).

No single teacher file matches this 1:1; the "wrapper vector with a side
counter kept in sync on every mutating op" shape follows `CountingBitmap`
(`src/bitmap.rs`, bitmap + `number_of_ones`). The allocation-free iteration
API reuses the teacher's `lender` idiom from `src/utils/file.rs`'s
`LineLender`, generalized from `&str` lines to `(usize, u64)` pairs.

*/

use crate::bits::{Incrementable, Vector, VectorCore, VectorMut};
use lender::{Lender, Lending};
use mem_dbg::{MemDbg, MemSize};

/// A counter vector `V` plus bounded updated-index tracking.
#[derive(Clone, Debug, MemDbg, MemSize)]
pub struct SparseCounter<V> {
    vector: V,
    updated: Option<Vec<usize>>,
    capacity: usize,
    exceeded: bool,
    sparse_enabled: bool,
    structure_key: u64,
    content_key: Option<u64>,
    /// Optional cap on any single slot's tracked count (`maxCountsTracked`,
    /// §6). `None` means unlimited.
    max_counts_tracked: Option<u64>,
    /// Sticky once a slot has hit `max_counts_tracked` and further `inc`
    /// calls against it were silently dropped (Ambiguity (a), §9).
    saturated: bool,
}

impl<V: VectorCore> SparseCounter<V> {
    /// Wraps `vector` with sparse tracking bounded to `fraction * vector.len()`
    /// updated slots. `fraction <= 0.0` permanently disables sparse tracking
    /// (the counter behaves as always-exceeded). `structure_key` identifies
    /// the field configuration this counter was built for (see §4.6, CP).
    /// `max_counts_tracked` optionally caps any single slot's stored count
    /// (`None` = unlimited).
    pub fn new(vector: V, fraction: f64, structure_key: u64, max_counts_tracked: Option<u64>) -> Self {
        let n = vector.len();
        let capacity = if fraction > 0.0 {
            (fraction * n as f64).floor() as usize
        } else {
            0
        };
        let sparse_enabled = fraction > 0.0 && capacity > 0;
        Self {
            vector,
            updated: sparse_enabled.then(|| Vec::with_capacity(capacity)),
            capacity,
            exceeded: !sparse_enabled,
            sparse_enabled,
            structure_key,
            content_key: None,
            max_counts_tracked,
            saturated: false,
        }
    }

    pub fn structure_key(&self) -> u64 {
        self.structure_key
    }

    pub fn content_key(&self) -> Option<u64> {
        self.content_key
    }

    pub fn set_content_key(&mut self, key: Option<u64>) {
        self.content_key = key;
    }

    /// True once the updated-index list has hit `capacity` and tracking has
    /// fallen back to a full scan. Sticky until the next `clear`.
    pub fn is_exceeded(&self) -> bool {
        self.exceeded
    }

    /// True once some slot has hit `max_counts_tracked` and a subsequent
    /// `inc` against it was silently capped instead of applied. Sticky until
    /// the next `clear`. Unrelated to [`SparseCounter::is_exceeded`], which
    /// tracks the updated-index list's own capacity, not per-slot counts.
    pub fn is_saturated(&self) -> bool {
        self.saturated
    }

    pub fn len(&self) -> usize {
        self.vector.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vector.len() == 0
    }

    pub fn inner(&self) -> &V {
        &self.vector
    }

    pub fn into_inner(self) -> V {
        self.vector
    }
}

impl<V: Vector> SparseCounter<V> {
    pub fn get(&self, i: usize) -> u64 {
        self.vector.get(i)
    }

    /// Calls `callback(index, count)` for every slot with `count >= min_count`
    /// in `[from, to)`. Returns `true` if the call had to fall back to a full
    /// scan over `[from, to)` (i.e. the counter had already exceeded its
    /// sparse-tracking capacity), `false` if it served from the updated-index
    /// list.
    pub fn iterate(
        &self,
        from: usize,
        to: usize,
        min_count: u64,
        mut callback: impl FnMut(usize, u64),
    ) -> bool {
        if !self.exceeded {
            if let Some(updated) = &self.updated {
                for &i in updated {
                    if i >= from && i < to {
                        let c = self.vector.get(i);
                        if c >= min_count {
                            callback(i, c);
                        }
                    }
                }
            }
            false
        } else {
            for i in from..to {
                let c = self.vector.get(i);
                if c >= min_count {
                    callback(i, c);
                }
            }
            true
        }
    }

    /// Allocation-free variant of [`SparseCounter::iterate`] as a
    /// [`lender::Lender`], for callers that want to drive iteration
    /// themselves instead of handing over a closure.
    pub fn lend_iter(&self, from: usize, to: usize, min_count: u64) -> SparseLend<'_, V> {
        SparseLend {
            sc: self,
            from,
            to,
            min_count,
            cursor: 0,
        }
    }
}

impl<V: VectorMut> SparseCounter<V> {
    /// Zeroes every touched slot and resets the updated-index list. A
    /// permanently sparse-disabled counter (`fraction <= 0.0` at
    /// construction) stays exceeded after clearing.
    pub fn clear(&mut self) {
        if !self.exceeded {
            if let Some(updated) = self.updated.as_mut() {
                for &i in updated.iter() {
                    self.vector.set(i, 0);
                }
                updated.clear();
            }
        } else {
            self.vector.clear();
            if let Some(updated) = self.updated.as_mut() {
                updated.clear();
            }
            if self.sparse_enabled {
                self.exceeded = false;
            }
        }
        self.saturated = false;
    }
}

impl<V: Incrementable> SparseCounter<V> {
    /// Increments slot `i`, tracking it in the updated-index list until that
    /// list reaches capacity. If `max_counts_tracked` is set and `i` has
    /// already reached it, the increment is silently dropped and
    /// [`SparseCounter::is_saturated`] becomes (and stays) true.
    pub fn inc(&mut self, i: usize) {
        if let Some(cap) = self.max_counts_tracked {
            if self.vector.get(i) >= cap {
                self.saturated = true;
                return;
            }
        }
        if self.exceeded {
            self.vector.inc(i);
            return;
        }
        let was_zero = self.vector.get(i) == 0;
        self.vector.inc(i);
        if was_zero {
            let updated = self.updated.as_mut().expect("sparse tracking is enabled");
            if updated.len() < self.capacity {
                updated.push(i);
            } else {
                self.exceeded = true;
                self.updated = None;
            }
        }
    }
}

/// A [`Lender`] over the `(index, count)` pairs of a [`SparseCounter`] in
/// `[from, to)` with `count >= min_count`, without allocating a result
/// vector.
pub struct SparseLend<'a, V> {
    sc: &'a SparseCounter<V>,
    from: usize,
    to: usize,
    min_count: u64,
    cursor: usize,
}

impl<'lend, 'a, V: Vector> Lending<'lend> for SparseLend<'a, V> {
    type Lend = (usize, u64);
}

impl<'a, V: Vector> Lender for SparseLend<'a, V> {
    fn next(&mut self) -> Option<lender::Lend<'_, Self>> {
        loop {
            if self.sc.exceeded {
                if self.cursor >= self.to {
                    return None;
                }
                let i = self.cursor.max(self.from);
                self.cursor = i + 1;
                if i >= self.to {
                    return None;
                }
                let c = self.sc.vector.get(i);
                if c >= self.min_count {
                    return Some((i, c));
                }
            } else {
                let updated = self.sc.updated.as_ref()?;
                if self.cursor >= updated.len() {
                    return None;
                }
                let i = updated[self.cursor];
                self.cursor += 1;
                if i < self.from || i >= self.to {
                    continue;
                }
                let c = self.sc.vector.get(i);
                if c >= self.min_count {
                    return Some((i, c));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::PackedVec;

    #[test]
    fn sparse_tracking_matches_full_scan_until_exceeded() {
        let vector = PackedVec::new(1000, 16).unwrap();
        let mut sc = SparseCounter::new(vector, 0.01, 1, None); // capacity = 10
        for i in [5, 5, 5, 20, 900] {
            sc.inc(i);
        }
        assert!(!sc.is_exceeded());
        let mut seen = Vec::new();
        let fell_back = sc.iterate(0, 1000, 1, |i, c| seen.push((i, c)));
        assert!(!fell_back);
        seen.sort();
        assert_eq!(seen, vec![(5, 3), (20, 1), (900, 1)]);
    }

    #[test]
    fn exceeding_capacity_falls_back_to_full_scan() {
        let vector = PackedVec::new(100, 8).unwrap();
        let mut sc = SparseCounter::new(vector, 0.05, 1, None); // capacity = 5
        for i in 0..10 {
            sc.inc(i);
        }
        assert!(sc.is_exceeded());
        let mut seen = Vec::new();
        let fell_back = sc.iterate(0, 100, 1, |i, c| seen.push((i, c)));
        assert!(fell_back);
        assert_eq!(seen.len(), 10);
    }

    #[test]
    fn fraction_zero_is_always_exceeded() {
        let vector = PackedVec::new(100, 8).unwrap();
        let mut sc = SparseCounter::new(vector, 0.0, 1, None);
        assert!(sc.is_exceeded());
        sc.inc(1);
        sc.clear();
        assert!(sc.is_exceeded());
    }

    #[test]
    fn clear_resets_exceeded_when_sparse_enabled() {
        let vector = PackedVec::new(100, 8).unwrap();
        let mut sc = SparseCounter::new(vector, 0.05, 1, None);
        for i in 0..10 {
            sc.inc(i);
        }
        assert!(sc.is_exceeded());
        sc.clear();
        assert!(!sc.is_exceeded());
        for i in 0..100 {
            assert_eq!(sc.get(i), 0);
        }
    }

    #[test]
    fn lend_iter_matches_callback_iterate() {
        let vector = PackedVec::new(50, 8).unwrap();
        let mut sc = SparseCounter::new(vector, 1.0, 1, None);
        for i in [1, 2, 3, 2, 1] {
            sc.inc(i);
        }
        let mut via_callback = Vec::new();
        sc.iterate(0, 50, 1, |i, c| via_callback.push((i, c)));

        let mut via_lender = Vec::new();
        let mut lend = sc.lend_iter(0, 50, 1);
        while let Some((i, c)) = lend.next() {
            via_lender.push((i, c));
        }
        assert_eq!(via_callback, via_lender);
    }

    #[test]
    fn max_counts_tracked_caps_and_sets_saturated() {
        let vector = PackedVec::new(100, 8).unwrap();
        let mut sc = SparseCounter::new(vector, 0.5, 1, Some(3));
        for _ in 0..5 {
            sc.inc(7);
        }
        assert_eq!(sc.get(7), 3);
        assert!(sc.is_saturated());
        // unrelated slots are unaffected by the cap
        sc.inc(8);
        assert_eq!(sc.get(8), 1);

        sc.clear();
        assert!(!sc.is_saturated());
        assert_eq!(sc.get(7), 0);
    }
}
