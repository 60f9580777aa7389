/*!

The concrete vector a pooled counter wraps: either a flat [`PackedVec`] (for
small, low-cardinality fields where a single fixed width is cheaper than
the bookkeeping of multiple planes) or a full [`NPlaneMutable`].

*/

use crate::bits::{Incrementable, Vector, VectorCore, VectorMut};
use crate::npm::{NPlaneMutable, NpmOptions, PlaneVariant};
use mem_dbg::{MemDbg, MemSize};

#[derive(Clone, Debug, MemDbg, MemSize)]
pub enum Backing {
    Packed(crate::bits::PackedVec),
    NPlane(NPlaneMutable),
}

impl Backing {
    /// Picks NPM over plain packed per §4.6: NPM when `config.packed` is set
    /// and either the widest maximum fits within `config.packed_limit` bits
    /// or it overflows a 32-bit field entirely; plain packed otherwise.
    pub fn build(maxima: &[u64], config: &crate::config::CounterConfig) -> anyhow::Result<Self> {
        const INT_MAX: u64 = i32::MAX as u64;
        let max_for_any = maxima.iter().copied().max().unwrap_or(0);
        let max_bits = crate::bits::bits_required(max_for_any) as usize;
        let use_npm = config.packed
            && (max_bits as u32 <= config.packed_limit || max_for_any > INT_MAX);
        if use_npm {
            let options = NpmOptions {
                variant: config.plane_variant,
                max_planes: config.max_planes,
                collapse_fraction: config.collapse_fraction,
                overflow_bucket: config.overflow_bucket,
            };
            Ok(Backing::NPlane(NPlaneMutable::new(maxima, options)?))
        } else {
            Ok(Backing::Packed(crate::bits::PackedVec::new(
                maxima.len(),
                max_bits,
            )?))
        }
    }

    /// `SplitRank`-specific convenience used by tests and the benchmark
    /// binary to force the NPM path regardless of field size.
    pub fn build_with_variant(
        maxima: &[u64],
        config: &crate::config::CounterConfig,
        variant: PlaneVariant,
    ) -> anyhow::Result<Self> {
        let options = NpmOptions {
            variant,
            max_planes: config.max_planes,
            collapse_fraction: config.collapse_fraction,
            overflow_bucket: config.overflow_bucket,
        };
        Ok(Backing::NPlane(NPlaneMutable::new(maxima, options)?))
    }
}

impl VectorCore for Backing {
    fn len(&self) -> usize {
        match self {
            Backing::Packed(v) => v.len(),
            Backing::NPlane(v) => v.len(),
        }
    }

    fn bit_width(&self) -> usize {
        match self {
            Backing::Packed(v) => v.bit_width(),
            Backing::NPlane(v) => v.bit_width(),
        }
    }
}

impl Vector for Backing {
    fn get(&self, i: usize) -> u64 {
        match self {
            Backing::Packed(v) => v.get(i),
            Backing::NPlane(v) => v.get(i),
        }
    }
}

impl VectorMut for Backing {
    fn set(&mut self, i: usize, v: u64) {
        match self {
            Backing::Packed(b) => b.set(i, v),
            Backing::NPlane(b) => b.set(i, v),
        }
    }

    fn clear(&mut self) {
        match self {
            Backing::Packed(b) => b.clear(),
            Backing::NPlane(b) => b.clear(),
        }
    }
}

impl Incrementable for Backing {
    fn inc(&mut self, i: usize) {
        match self {
            Backing::Packed(b) => b.inc(i),
            Backing::NPlane(b) => b.inc(i),
        }
    }
}
