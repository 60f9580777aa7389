/*!

B-Heap top-K (§4.8, BH): a bounded min-heap retaining the `K` largest
offered values, laid out as a cache-line-aware tree of fixed-size
mini-heaps rather than one flat array.

The source implementation this spec distills from has a known cross-level
compare bug (§9, Ambiguity (b)); per the spec's own instruction, this is
reimplemented fresh from the algorithmic description rather than ported,
and checked against the literal end-to-end scenarios in §8 plus an added
churn test for the "drop silently when full and not better than the
current minimum" case.

## Layout

Mini-heaps hold `mh_size = 2^e - 1` elements each (a complete binary tree of
`e` levels), stored with one wasted slot per block for 1-based addressing.
Elements are addressed by the *logical* 1-based index `g` they would have
in one giant flat binary heap (`parent(g) = g/2`, `children = 2g, 2g+1`);
`decompose(g)` maps that logical index to `(mini_heap, local_slot)` by
peeling off `e` bits of `g`'s binary path at a time, so sift-up/sift-down
need no special-casing at mini-heap boundaries — the physical layout is an
indirection underneath the same textbook heap algorithm.
*/

/// A bounded min-heap of `u64` keys, retaining the `max_size` largest
/// offered values.
#[derive(Clone, Debug)]
pub struct BHeap {
    storage: Vec<u64>,
    e: u32,
    mh_size: u64,
    children_per_mh: u64,
    block_stride: usize,
    max_size: usize,
    size: usize,
}

impl BHeap {
    /// `max_size` is the K in top-K. `e` controls the mini-heap size
    /// (`2^e - 1` elements per block); `e` in `2..=6` covers the
    /// cache-line-sized blocks the spec has in mind (e.g. `e = 4` gives
    /// 15-element, 16-slot blocks).
    pub fn new(max_size: usize, e: u32) -> Self {
        assert!((1..=6).contains(&e), "e must be in 1..=6, got {e}");
        assert!(max_size > 0, "max_size must be > 0");
        let mh_size = (1u64 << e) - 1;
        let children_per_mh = 1u64 << e;
        let block_stride = (mh_size + 1) as usize;

        let mut max_mh = 0u64;
        for g in 1..=max_size as u64 {
            let (mh, _) = Self::decompose(g, e);
            max_mh = max_mh.max(mh);
        }
        let num_blocks = (max_mh + 1) as usize;

        Self {
            storage: vec![0u64; num_blocks * block_stride],
            e,
            mh_size,
            children_per_mh,
            block_stride,
            max_size,
            size: 0,
        }
    }

    /// Packs a `(count, ordinal)` pair into a single `u64` key so ties
    /// compare by count first. Convenience for callers implementing
    /// `TopKSink` over `(count, ordinal)` facet hits.
    pub fn pack(count: u32, ordinal: u32) -> u64 {
        ((count as u64) << 32) | ordinal as u64
    }

    pub fn unpack(key: u64) -> (u32, u32) {
        ((key >> 32) as u32, key as u32)
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn is_full(&self) -> bool {
        self.size == self.max_size
    }

    pub fn peek_min(&self) -> Option<u64> {
        (self.size > 0).then(|| self.value(1))
    }

    /// Offers `v`. If the heap isn't full yet, `v` is always kept. If it is
    /// full, `v` is kept only if it's strictly greater than the current
    /// minimum (replacing it); otherwise it's dropped silently. Returns
    /// `true` if `v` was kept.
    pub fn insert(&mut self, v: u64) -> bool {
        if self.size < self.max_size {
            self.size += 1;
            let g = self.size as u64;
            self.set_value(g, v);
            self.sift_up(g);
            true
        } else {
            match self.peek_min() {
                Some(root) if v > root => {
                    self.set_value(1, v);
                    self.sift_down(1);
                    true
                }
                _ => false,
            }
        }
    }

    /// Removes and returns the current minimum, or `None` if empty.
    pub fn pop(&mut self) -> Option<u64> {
        if self.size == 0 {
            return None;
        }
        let min = self.value(1);
        let last_g = self.size as u64;
        if last_g == 1 {
            self.size = 0;
            return Some(min);
        }
        let last_val = self.value(last_g);
        self.size -= 1;
        self.set_value(1, last_val);
        self.sift_down(1);
        Some(min)
    }

    /// Drains the heap in ascending order.
    pub fn drain_sorted(&mut self) -> Vec<u64> {
        let mut out = Vec::with_capacity(self.size);
        while let Some(v) = self.pop() {
            out.push(v);
        }
        out
    }

    /// Drains the heap in ascending order into a [`crate::collab::TopKSink`],
    /// unpacking each key back into its `(count, ordinal)` pair via
    /// [`BHeap::unpack`] rather than handing the caller a packed key.
    pub fn drain_into(&mut self, sink: &mut impl crate::collab::TopKSink) {
        while let Some(key) = self.pop() {
            let (count, ord) = Self::unpack(key);
            sink.offer(count as u64, ord);
        }
    }

    fn decompose(g: u64, e: u32) -> (u64, u64) {
        let bitlen = 64 - g.leading_zeros() as u64;
        let mut remaining_branch_bits = bitlen - 1;
        let mut mh = 0u64;
        while remaining_branch_bits >= e as u64 {
            let shift = remaining_branch_bits - e as u64;
            let chunk = (g >> shift) & ((1u64 << e) - 1);
            mh = mh * (1u64 << e) + chunk + 1;
            remaining_branch_bits -= e as u64;
        }
        let local_depth = remaining_branch_bits;
        let low_mask = (1u64 << local_depth) - 1;
        let loc = (1u64 << local_depth) | (g & low_mask);
        (mh, loc)
    }

    fn phys(&self, g: u64) -> usize {
        let (mh, loc) = Self::decompose(g, self.e);
        mh as usize * self.block_stride + loc as usize
    }

    fn value(&self, g: u64) -> u64 {
        self.storage[self.phys(g)]
    }

    fn set_value(&mut self, g: u64, v: u64) {
        let p = self.phys(g);
        self.storage[p] = v;
    }

    fn swap(&mut self, a: u64, b: u64) {
        let pa = self.phys(a);
        let pb = self.phys(b);
        self.storage.swap(pa, pb);
    }

    fn sift_up(&mut self, mut g: u64) {
        while g > 1 {
            let p = g / 2;
            if self.value(g) < self.value(p) {
                self.swap(g, p);
                g = p;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut g: u64) {
        loop {
            let l = 2 * g;
            let r = 2 * g + 1;
            let mut smallest = g;
            if l <= self.size as u64 && self.value(l) < self.value(smallest) {
                smallest = l;
            }
            if r <= self.size as u64 && self.value(r) < self.value(smallest) {
                smallest = r;
            }
            if smallest == g {
                break;
            }
            self.swap(g, smallest);
            g = smallest;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_exact_capacity_ascending_pop() {
        let mut h = BHeap::new(3, 2);
        for v in [100, 99, 101] {
            h.insert(v);
        }
        assert_eq!(h.drain_sorted(), vec![99, 100, 101]);
    }

    #[test]
    fn scenario_exact_capacity_four() {
        let mut h = BHeap::new(4, 2);
        for v in [100, 99, 101, 102] {
            h.insert(v);
        }
        assert_eq!(h.drain_sorted(), vec![99, 100, 101, 102]);
    }

    #[test]
    fn scenario_pop_then_insert_then_drain() {
        let mut h = BHeap::new(5, 2);
        for v in [2, 4, 1, 3, 5] {
            h.insert(v);
        }
        let mut out = vec![h.pop().unwrap()];
        h.insert(6);
        out.extend(h.drain_sorted());
        assert_eq!(out, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn full_heap_drops_values_not_better_than_min() {
        let mut h = BHeap::new(3, 2);
        for v in [10, 20, 30] {
            h.insert(v);
        }
        assert!(!h.insert(5));
        assert!(!h.insert(10));
        assert_eq!(h.drain_sorted(), vec![10, 20, 30]);
    }

    #[test]
    fn randomized_matches_sorted_suffix() {
        use rand::{rngs::SmallRng, Rng, SeedableRng};
        let mut rng = SmallRng::seed_from_u64(99);
        for &(k, e) in &[(7usize, 2u32), (17, 3), (50, 4), (200, 5)] {
            let values: Vec<u64> = (0..5000).map(|_| rng.gen_range(0..1_000_000)).collect();
            let mut h = BHeap::new(k, e);
            for &v in &values {
                h.insert(v);
            }
            let mut expected = values.clone();
            expected.sort_unstable();
            let expected_top_k = &expected[expected.len() - k..];
            assert_eq!(h.drain_sorted(), expected_top_k, "k={k} e={e}");
        }
    }

    #[test]
    fn drain_into_matches_drain_sorted() {
        let mut h = BHeap::new(3, 2);
        for v in [BHeap::pack(10, 1), BHeap::pack(30, 2), BHeap::pack(20, 3)] {
            h.insert(v);
        }
        let mut via_sink = Vec::new();
        h.drain_into(&mut |count: u64, ord: u32| via_sink.push((count, ord)));
        assert_eq!(via_sink, vec![(10, 1), (20, 3), (30, 2)]);
    }

    #[test]
    fn pack_unpack_roundtrip() {
        let key = BHeap::pack(42, 7);
        assert_eq!(BHeap::unpack(key), (42, 7));
    }
}
