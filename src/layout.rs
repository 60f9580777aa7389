/*!

Layout Planner (§4.3, LP): turns a bit-width histogram of the maxima vector
`M` into a sequence of [`PlaneDescriptor`]s describing the bit-plane split a
[`crate::npm::NPlaneMutable`] should use.

No teacher file implements this directly (the teacher's Elias-Fano split is
a fixed two-level scheme); this is a small greedy state machine in the style
of `EliasFanoBuilder::new`'s threshold arithmetic, with the construction
parameters validated the same way (`anyhow::ensure!`).

## Plane 0 is special

Every other plane `p >= 1` only holds values for the slots that overflowed
out of plane `p - 1` (so its slot count is `Z[c_{p-1} + 1]`, the histogram
cumulative at the bit just past what planes `0..p` already cover). Plane 0
has no such predecessor to rank against: `NPlaneMutable::get` indexes it
directly by the global counter index, so its slot count is always `n`
regardless of how many of those `n` counters ever need a single bit. This
is an explicit resolution of what would otherwise be a contradiction between
the histogram-driven general rule and the direct-indexing get/set/inc
algorithms in §4.4 — recorded in `DESIGN.md`.
*/

/// One plane's shape, as emitted by [`plan`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, mem_dbg::MemDbg, mem_dbg::MemSize)]
pub struct PlaneDescriptor {
    /// Number of value bits this plane stores per occupied slot.
    pub value_bits: usize,
    /// Number of slots in this plane's backing vector.
    pub slot_count: usize,
    /// Whether this plane carries an overflow bit/rank structure pointing
    /// at the next plane (false only for the last plane).
    pub has_overflow: bool,
    /// Overflow bucket size in bits, only meaningful for the `Split`
    /// variant's coarse cumulative-count cache.
    pub overflow_bucket: usize,
    /// Sum of `value_bits` across this plane and all before it.
    pub cumulative_max_bit: usize,
}

/// Greedily emits plane descriptors from a bit-width histogram.
///
/// `histogram[k]` is the number of slots whose maximum needs exactly `k + 1`
/// bits (`k` in `0..64`). `n` is the total slot count. `overflow_bucket` is
/// forwarded into every descriptor unchanged (only the `Split` variant
/// consumes it). `max_planes` must be `>= 2`; `collapse_fraction` should lie
/// in `(0.0, 1.0]`.
pub fn plan(
    n: usize,
    histogram: &[usize; 64],
    overflow_bucket: usize,
    max_planes: usize,
    collapse_fraction: f64,
) -> anyhow::Result<Vec<PlaneDescriptor>> {
    anyhow::ensure!(max_planes >= 2, "max_planes must be >= 2, got {max_planes}");
    anyhow::ensure!(
        collapse_fraction > 0.0 && collapse_fraction <= 1.0,
        "collapse_fraction must be in (0.0, 1.0], got {collapse_fraction}"
    );
    anyhow::ensure!(overflow_bucket > 0, "overflow_bucket must be > 0");

    // z[k] = number of slots whose maximum requires bit k or higher, for
    // k in 1..=64. z[65] is a zero sentinel so the suffix sum can run
    // uniformly down to k == 64.
    let mut z = [0usize; 66];
    for k in (1..=64).rev() {
        z[k] = z[k + 1] + histogram[k - 1];
    }

    let mut planes = Vec::new();
    let mut k = 1usize; // next bit (1-indexed) this plane will start covering
    let mut cumulative = 0usize;

    loop {
        let z_k = z[k];
        let would_be_capped = planes.len() + 1 == max_planes;
        let collapses = if n > 0 {
            (z_k as f64) / (n as f64) <= collapse_fraction
        } else {
            true
        };

        let (width, is_last) = if would_be_capped || collapses {
            (65 - k, true)
        } else {
            let mut delta = 1usize;
            while k + delta <= 64 && (z[k + delta] as f64) >= (z_k as f64) / 2.0 {
                delta += 1;
            }
            (delta, k + delta > 64)
        };

        let slot_count = if planes.is_empty() { n } else { z_k };
        cumulative += width;
        planes.push(PlaneDescriptor {
            value_bits: width,
            slot_count,
            has_overflow: !is_last,
            overflow_bucket,
            cumulative_max_bit: cumulative,
        });

        if is_last {
            break;
        }
        k += width;
    }

    Ok(planes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_plane_when_all_maxima_are_small() {
        let mut hist = [0usize; 64];
        hist[2] = 1000; // all slots need exactly 3 bits
        let planes = plan(1000, &hist, 64, 4, 0.01).unwrap();
        assert_eq!(planes.len(), 1);
        assert_eq!(planes[0].slot_count, 1000);
        assert!(!planes[0].has_overflow);
    }

    #[test]
    fn max_planes_caps_the_plane_count() {
        let mut hist = [0usize; 64];
        // spread evenly across every bit width so nothing collapses early
        for h in hist.iter_mut() {
            *h = 100;
        }
        let planes = plan(6400, &hist, 64, 3, 0.0001).unwrap();
        assert!(planes.len() <= 3);
        assert!(!planes.last().unwrap().has_overflow);
    }

    #[test]
    fn plane_zero_always_covers_every_slot() {
        let mut hist = [0usize; 64];
        hist[0] = 5; // five slots need only 1 bit
        hist[10] = 3; // three slots need 11 bits
        let planes = plan(8, &hist, 64, 8, 0.01).unwrap();
        assert_eq!(planes[0].slot_count, 8);
    }

    #[test]
    fn zero_slots_degenerates_to_one_empty_plane() {
        let hist = [0usize; 64];
        let planes = plan(0, &hist, 64, 8, 0.01).unwrap();
        assert_eq!(planes.len(), 1);
        assert_eq!(planes[0].slot_count, 0);
    }

    #[test]
    fn rejects_bad_configuration() {
        let hist = [0usize; 64];
        assert!(plan(10, &hist, 64, 1, 0.5).is_err());
        assert!(plan(10, &hist, 64, 4, 0.0).is_err());
        assert!(plan(10, &hist, 64, 4, 1.5).is_err());
        assert!(plan(10, &hist, 0, 4, 0.5).is_err());
    }
}
