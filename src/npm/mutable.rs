use crate::bits::{bits_required, mask, Incrementable, Vector, VectorCore, VectorMut};
use crate::layout::{self, PlaneDescriptor};
use crate::npm::plane::{Plane, PlaneVariant};
use dsi_progress_logger::*;
use mem_dbg::{MemDbg, MemSize};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Construction-time knobs for [`NPlaneMutable::new`].
#[derive(Clone, Copy, Debug)]
pub struct NpmOptions {
    pub variant: PlaneVariant,
    pub max_planes: usize,
    pub collapse_fraction: f64,
    pub overflow_bucket: usize,
}

impl Default for NpmOptions {
    fn default() -> Self {
        Self {
            variant: PlaneVariant::SplitRank,
            max_planes: 8,
            collapse_fraction: 0.01,
            overflow_bucket: 64,
        }
    }
}

/// A counter vector decomposed into bit planes, each holding only the
/// slots whose declared maximum needs that plane (§4.4, NPM).
#[derive(Clone, Debug, MemDbg, MemSize)]
pub struct NPlaneMutable {
    planes: Vec<Plane>,
    descriptors: Vec<PlaneDescriptor>,
    len: usize,
}

impl NPlaneMutable {
    /// Builds a fresh, all-zero counter vector sized by `maxima`:
    /// `maxima[i]` is the largest value counter `i` will ever need to hold.
    pub fn new(maxima: &[u64], options: NpmOptions) -> anyhow::Result<Self> {
        let n = maxima.len();
        let histogram = build_histogram(maxima);
        let descriptors = layout::plan(
            n,
            &histogram,
            options.overflow_bucket,
            options.max_planes,
            options.collapse_fraction,
        )?;

        let mut planes = descriptors
            .iter()
            .map(|d| Plane::new(options.variant, d))
            .collect::<anyhow::Result<Vec<_>>>()?;

        populate_overflow(&mut planes, &descriptors, maxima);

        for p in planes.iter_mut() {
            if p.has_overflow() {
                p.build_overflow_rank();
            }
        }

        Ok(Self {
            planes,
            descriptors,
            len: n,
        })
    }

    pub fn plane_descriptors(&self) -> &[PlaneDescriptor] {
        &self.descriptors
    }

    pub fn num_planes(&self) -> usize {
        self.planes.len()
    }
}

/// Builds `histogram[k]` = number of slots whose maximum needs exactly
/// `k + 1` bits, for `k` in `0..64`. Slots whose maximum is `0` (never
/// incremented) contribute to no bucket: they live purely in plane 0's
/// always-zero storage.
///
/// Above [`PARALLEL_HISTOGRAM_THRESHOLD`] slots, chunks are histogrammed
/// independently in parallel and reduced, mirroring the teacher's
/// `BitMap::count_ones`-style `par_iter().map(...).sum()` pattern
/// (`src/bitmap.rs`).
const PARALLEL_HISTOGRAM_THRESHOLD: usize = 1 << 20;

#[cfg(feature = "rayon")]
fn build_histogram(maxima: &[u64]) -> [usize; 64] {
    if maxima.len() < PARALLEL_HISTOGRAM_THRESHOLD {
        return build_histogram_seq(maxima);
    }
    maxima
        .par_chunks(1 << 16)
        .map(build_histogram_seq)
        .reduce(
            || [0usize; 64],
            |mut acc, part| {
                for k in 0..64 {
                    acc[k] += part[k];
                }
                acc
            },
        )
}

#[cfg(not(feature = "rayon"))]
fn build_histogram(maxima: &[u64]) -> [usize; 64] {
    build_histogram_seq(maxima)
}

fn build_histogram_seq(maxima: &[u64]) -> [usize; 64] {
    let mut histogram = [0usize; 64];
    for &m in maxima {
        let b = bits_required(m);
        if b > 0 {
            histogram[(b - 1) as usize] += 1;
        }
    }
    histogram
}

/// Single forward pass over `M` assigning each slot its overflow bit (if
/// any) in every plane it participates in, and its position within the
/// next plane. Because slots are visited in increasing index order, the
/// position a slot gets in plane `p + 1` is exactly the number of slots
/// before it (in plane `p`'s index order) that also overflow — which is
/// precisely what `rank` on the built overflow structure will report later,
/// so no rank queries are needed during construction at all.
fn populate_overflow(planes: &mut [Plane], descriptors: &[PlaneDescriptor], maxima: &[u64]) {
    let mut next_pos = vec![0usize; planes.len()];
    let mut pl = ProgressLogger::default();
    pl.display_memory(true).item_name("slot");
    pl.start("populating NPM overflow bitmaps");

    for (i, &m) in maxima.iter().enumerate() {
        let bits_needed = bits_required(m) as usize;
        let mut pos = i;
        for p in 0..planes.len() {
            if !planes[p].has_overflow() {
                break;
            }
            let c_p = descriptors[p].cumulative_max_bit;
            if bits_needed > c_p {
                planes[p].set_overflow_bit(pos);
                let here = next_pos[p];
                next_pos[p] += 1;
                pos = here;
            } else {
                break;
            }
        }
        if i % 1_000_000 == 0 {
            pl.update_with_count(1_000_000.min(maxima.len() - i));
        }
    }
    pl.done();
}

impl VectorCore for NPlaneMutable {
    fn len(&self) -> usize {
        self.len
    }

    fn bit_width(&self) -> usize {
        self.descriptors.last().map(|d| d.cumulative_max_bit).unwrap_or(0)
    }
}

impl Vector for NPlaneMutable {
    fn get(&self, i: usize) -> u64 {
        debug_assert!(i < self.len);
        let mut value = self.planes[0].get(i);
        let mut shift = self.planes[0].value_bits() as u32;
        let mut pos = i;
        for p in 1..self.planes.len() {
            let prev = &self.planes[p - 1];
            if !prev.has_overflow() || !prev.overflow_bit(pos) {
                return value;
            }
            pos = prev.rank(pos);
            let cur = &self.planes[p];
            if shift < 64 {
                value |= cur.get(pos) << shift;
            }
            shift += cur.value_bits() as u32;
        }
        value
    }
}

impl VectorMut for NPlaneMutable {
    fn set(&mut self, i: usize, mut v: u64) {
        debug_assert!(i < self.len);
        let mut pos = i;
        for p in 0..self.planes.len() {
            let bp = self.planes[p].value_bits();
            self.planes[p].set(pos, v & mask(bp));
            v = if bp >= 64 { 0 } else { v >> bp };
            if !self.planes[p].has_overflow() || !self.planes[p].overflow_bit(pos) {
                break;
            }
            pos = self.planes[p].rank(pos);
        }
    }

    fn clear(&mut self) {
        for p in self.planes.iter_mut() {
            p.clear();
        }
    }
}

impl Incrementable for NPlaneMutable {
    /// Cascades the increment through only as many planes as actually
    /// overflow, instead of re-reading and rewriting the full logical
    /// value. A counter that never exceeds plane 0's width costs exactly
    /// one plane touch regardless of how many planes the vector has.
    fn inc(&mut self, i: usize) {
        debug_assert!(i < self.len);
        let mut pos = i;
        for p in 0..self.planes.len() {
            let wrapped = self.planes[p].inc(pos);
            if !wrapped {
                return;
            }
            if !self.planes[p].has_overflow() {
                return;
            }
            pos = self.planes[p].rank(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::SmallRng, Rng, SeedableRng};

    fn roundtrip_for(variant: PlaneVariant) {
        let mut rng = SmallRng::seed_from_u64(7);
        let n = 500;
        let maxima: Vec<u64> = (0..n).map(|_| rng.gen_range(0u64..=300)).collect();
        let options = NpmOptions {
            variant,
            max_planes: 6,
            collapse_fraction: 0.02,
            overflow_bucket: 16,
        };
        let mut npm = NPlaneMutable::new(&maxima, options).unwrap();

        let mut shadow = vec![0u64; n];
        for _ in 0..5000 {
            let i = rng.gen_range(0..n);
            if shadow[i] < maxima[i] {
                npm.inc(i);
                shadow[i] += 1;
            }
        }
        for i in 0..n {
            assert_eq!(npm.get(i), shadow[i], "variant={variant:?} i={i}");
        }

        npm.clear();
        for i in 0..n {
            assert_eq!(npm.get(i), 0);
        }

        npm.set(3, maxima[3].min(7));
        assert_eq!(npm.get(3), maxima[3].min(7));
    }

    #[test]
    fn roundtrip_split() {
        roundtrip_for(PlaneVariant::Split);
    }

    #[test]
    fn roundtrip_split_rank() {
        roundtrip_for(PlaneVariant::SplitRank);
    }

    #[test]
    fn roundtrip_shift() {
        roundtrip_for(PlaneVariant::Shift);
    }

    #[test]
    fn all_zero_maxima_never_need_more_than_plane_zero() {
        let maxima = vec![0u64; 50];
        let npm = NPlaneMutable::new(&maxima, NpmOptions::default()).unwrap();
        for i in 0..50 {
            assert_eq!(npm.get(i), 0);
        }
    }

    #[test]
    fn single_counter() {
        let maxima = vec![1_000_000u64];
        let mut npm = NPlaneMutable::new(&maxima, NpmOptions::default()).unwrap();
        for _ in 0..12345 {
            npm.inc(0);
        }
        assert_eq!(npm.get(0), 12345);
    }
}
