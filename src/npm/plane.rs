/*!

The three overflow-link strategies a single plane can use (§4.4's "three
interchangeable overflow representations"): `Split` (separate bitmap with a
coarse cumulative-count cache), `SplitRank` (separate bitmap with the full
[`RankBitset`] two-level cache), and `Shift` (overflow bit interleaved as the
low bit of each packed value).

*/

use crate::bits::{mask, PackedVec, RankBitset, Vector, VectorCore, VectorMut};
use crate::layout::PlaneDescriptor;
use mem_dbg::{MemDbg, MemSize};

/// Which overflow representation a plane uses. `SplitRank` is the default
/// recommended by the spec when the ~12% extra rank-cache space is
/// affordable; `Split` trades some rank-query cost for a coarser, smaller
/// cache; `Shift` trades no extra words at all but must rebuild values on
/// `clear`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PlaneVariant {
    Split,
    #[default]
    SplitRank,
    Shift,
}

/// Coarse cumulative-set-bit cache for the `Split` overflow representation:
/// a cache entry every `bucket` bits plus a linear scan within the bucket.
#[derive(Clone, Debug, MemDbg, MemSize)]
struct BucketOverflow {
    bits: Vec<u64>,
    len: usize,
    bucket: usize,
    cache: Vec<u64>,
    total: u64,
    built: bool,
}

impl BucketOverflow {
    fn new(len: usize, bucket: usize) -> Self {
        Self {
            bits: vec![0u64; len.div_ceil(64).max(1)],
            len,
            bucket,
            cache: Vec::new(),
            total: 0,
            built: false,
        }
    }

    fn get(&self, i: usize) -> bool {
        (self.bits[i / 64] >> (i % 64)) & 1 != 0
    }

    fn set(&mut self, i: usize) {
        self.bits[i / 64] |= 1u64 << (i % 64);
        self.built = false;
    }

    fn build(&mut self) {
        let num_buckets = self.len.div_ceil(self.bucket).max(1);
        self.cache = Vec::with_capacity(num_buckets + 1);
        let mut cum = 0u64;
        for b in 0..num_buckets {
            self.cache.push(cum);
            let start = b * self.bucket;
            let end = (start + self.bucket).min(self.len);
            for i in start..end {
                if self.get(i) {
                    cum += 1;
                }
            }
        }
        self.total = cum;
        self.built = true;
    }

    fn rank(&self, i: usize) -> usize {
        debug_assert!(self.built);
        let bucket_idx = i / self.bucket;
        let start = bucket_idx * self.bucket;
        let base = self.cache[bucket_idx] as usize;
        let local = (start..i).filter(|&j| self.get(j)).count();
        base + local
    }

    fn count_ones(&self) -> usize {
        debug_assert!(self.built);
        self.total as usize
    }
}

/// Bucketed cumulative overflow-count cache for the `Shift` variant,
/// mirroring [`BucketOverflow`]'s algorithm but reading the overflow bit out
/// of the interleaved LSB of a `Shift` plane's own `values` instead of a
/// separate bitset.
#[derive(Clone, Debug, MemDbg, MemSize)]
struct ShiftOverflow {
    bucket: usize,
    cache: Vec<u64>,
    total: u64,
    built: bool,
}

impl ShiftOverflow {
    fn new(bucket: usize) -> Self {
        Self {
            bucket,
            cache: Vec::new(),
            total: 0,
            built: false,
        }
    }

    fn build(&mut self, values: &PackedVec) {
        let len = values.len();
        let num_buckets = len.div_ceil(self.bucket).max(1);
        self.cache = Vec::with_capacity(num_buckets + 1);
        let mut cum = 0u64;
        for b in 0..num_buckets {
            self.cache.push(cum);
            let start = b * self.bucket;
            let end = (start + self.bucket).min(len);
            for i in start..end {
                if values.get(i) & 1 != 0 {
                    cum += 1;
                }
            }
        }
        self.total = cum;
        self.built = true;
    }

    fn rank(&self, values: &PackedVec, pos: usize) -> usize {
        debug_assert!(self.built);
        let bucket_idx = pos / self.bucket;
        let start = bucket_idx * self.bucket;
        let base = self.cache[bucket_idx] as usize;
        let local = (start..pos).filter(|&i| values.get(i) & 1 != 0).count();
        base + local
    }

    fn count_ones(&self) -> usize {
        debug_assert!(self.built);
        self.total as usize
    }
}

/// A single plane of an [`crate::npm::NPlaneMutable`].
#[derive(Clone, Debug, MemDbg, MemSize)]
pub enum Plane {
    Split {
        values: PackedVec,
        overflow: BucketOverflow,
        has_overflow: bool,
    },
    SplitRank {
        values: PackedVec,
        overflow: RankBitset,
        has_overflow: bool,
    },
    Shift {
        /// Stores `value << 1 | overflow_bit` when `has_overflow`, else the
        /// bare value.
        values: PackedVec,
        has_overflow: bool,
        overflow: ShiftOverflow,
    },
}

impl Plane {
    pub(super) fn new(variant: PlaneVariant, desc: &PlaneDescriptor) -> anyhow::Result<Self> {
        let n = desc.slot_count;
        Ok(match variant {
            PlaneVariant::Split => Plane::Split {
                values: PackedVec::new(n, desc.value_bits)?,
                overflow: BucketOverflow::new(n, desc.overflow_bucket),
                has_overflow: desc.has_overflow,
            },
            PlaneVariant::SplitRank => Plane::SplitRank {
                values: PackedVec::new(n, desc.value_bits)?,
                overflow: RankBitset::new(n.max(1)),
                has_overflow: desc.has_overflow,
            },
            PlaneVariant::Shift => {
                let width = if desc.has_overflow {
                    desc.value_bits + 1
                } else {
                    desc.value_bits
                };
                Plane::Shift {
                    values: PackedVec::new(n, width)?,
                    has_overflow: desc.has_overflow,
                    overflow: ShiftOverflow::new(desc.overflow_bucket),
                }
            }
        })
    }

    pub fn slot_count(&self) -> usize {
        match self {
            Plane::Split { values, .. } => values.len(),
            Plane::SplitRank { values, .. } => values.len(),
            Plane::Shift { values, .. } => values.len(),
        }
    }

    pub fn has_overflow(&self) -> bool {
        match self {
            Plane::Split { has_overflow, .. } => *has_overflow,
            Plane::SplitRank { has_overflow, .. } => *has_overflow,
            Plane::Shift { has_overflow, .. } => *has_overflow,
        }
    }

    /// Logical value width (excludes the interleaved overflow bit in the
    /// `Shift` variant).
    pub fn value_bits(&self) -> usize {
        match self {
            Plane::Split { values, .. } => values.bit_width(),
            Plane::SplitRank { values, .. } => values.bit_width(),
            Plane::Shift {
                values,
                has_overflow,
                ..
            } => {
                if *has_overflow {
                    values.bit_width() - 1
                } else {
                    values.bit_width()
                }
            }
        }
    }

    /// Logical (masked) value stored at `pos`.
    pub fn get(&self, pos: usize) -> u64 {
        match self {
            Plane::Split { values, .. } | Plane::SplitRank { values, .. } => values.get(pos),
            Plane::Shift {
                values,
                has_overflow,
                ..
            } => {
                if *has_overflow {
                    values.get(pos) >> 1
                } else {
                    values.get(pos)
                }
            }
        }
    }

    pub fn set(&mut self, pos: usize, v: u64) {
        match self {
            Plane::Split { values, .. } | Plane::SplitRank { values, .. } => values.set(pos, v),
            Plane::Shift {
                values,
                has_overflow,
                ..
            } => {
                if *has_overflow {
                    let ov = values.get(pos) & 1;
                    values.set(pos, (v << 1) | ov);
                } else {
                    values.set(pos, v);
                }
            }
        }
    }

    /// Increments the logical value at `pos`, wrapping modulo `2^value_bits`.
    /// Returns `true` if the stored value wrapped back to zero (a cascade
    /// into the next plane is required).
    pub fn inc(&mut self, pos: usize) -> bool {
        let b = self.value_bits();
        let old = self.get(pos);
        let new = old.wrapping_add(1) & mask(b);
        self.set(pos, new);
        new == 0
    }

    /// Marks `pos` as overflowing into the next plane. Only valid during
    /// construction, before `build_overflow_rank`.
    pub fn set_overflow_bit(&mut self, pos: usize) {
        match self {
            Plane::Split { overflow, .. } => overflow.set(pos),
            Plane::SplitRank { overflow, .. } => overflow.set(pos),
            Plane::Shift { values, .. } => {
                let v = values.get(pos);
                values.set(pos, v | 1);
            }
        }
    }

    pub fn overflow_bit(&self, pos: usize) -> bool {
        match self {
            Plane::Split { overflow, .. } => overflow.get(pos),
            Plane::SplitRank { overflow, .. } => overflow.get(pos),
            Plane::Shift { values, .. } => values.get(pos) & 1 != 0,
        }
    }

    /// Finalizes the overflow rank cache. For `Shift` this builds the same
    /// bucketed cumulative-count cache `Split` uses, reading the overflow
    /// bit out of `values`'s interleaved LSB instead of a side bitset.
    pub fn build_overflow_rank(&mut self) {
        match self {
            Plane::Split { overflow, .. } => overflow.build(),
            Plane::SplitRank { overflow, .. } => overflow.build(),
            Plane::Shift { values, overflow, .. } => overflow.build(values),
        }
    }

    /// Number of slots in the *next* plane, i.e. the number of overflow
    /// bits set here. Requires `build_overflow_rank` to have been called.
    pub fn overflow_count(&self) -> usize {
        match self {
            Plane::Split { overflow, .. } => overflow.count_ones(),
            Plane::SplitRank { overflow, .. } => overflow.count_ones() as usize,
            Plane::Shift { overflow, .. } => overflow.count_ones(),
        }
    }

    /// Number of overflow bits set in `[0, pos)`. Requires
    /// `build_overflow_rank` to have been called.
    pub fn rank(&self, pos: usize) -> usize {
        match self {
            Plane::Split { overflow, .. } => overflow.rank(pos),
            Plane::SplitRank { overflow, .. } => overflow.rank(pos) as usize,
            Plane::Shift { values, overflow, .. } => overflow.rank(values, pos),
        }
    }

    /// Resets every value to zero. Preserves the overflow structure, which
    /// depends only on the shape of `M` and does not change on `clear`.
    pub fn clear(&mut self) {
        match self {
            Plane::Split { values, .. } | Plane::SplitRank { values, .. } => values.clear(),
            Plane::Shift {
                values,
                has_overflow,
                ..
            } => {
                if *has_overflow {
                    // can't blanket-zero the backing words: the low bit of
                    // each slot is the overflow flag and must survive.
                    for i in 0..values.len() {
                        let ov = values.get(i) & 1;
                        values.set(i, ov);
                    }
                } else {
                    values.clear();
                }
            }
        }
    }
}
