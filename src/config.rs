/*!

Configuration model (§6): a typed, validated bundle of the tunables spread
across the Layout Planner, NPM, Sparse Counter, Sparseness Estimator and
Counter Pool.

Grounded on `EliasFanoBuilder::new`'s construction-time validation
(`src/dict/elias_fano.rs`): `anyhow::ensure!` on bad parameters rather than
a separate error enum, matching the teacher's error-handling style
throughout.

*/

use crate::npm::PlaneVariant;
use anyhow::Result;

/// Construction parameters for one field's counter structures, mirroring
/// the §6 config table one-to-one.
#[derive(Clone, Copy, Debug)]
pub struct CounterConfig {
    /// Overflow representation NPM planes use (§4.4).
    pub plane_variant: PlaneVariant,
    /// Hard cap on the number of planes the Layout Planner may emit.
    pub max_planes: usize,
    /// Stop splitting further once a candidate plane's population falls to
    /// this fraction of the first plane's, in `(0.0, 1.0]`.
    pub collapse_fraction: f64,
    /// Bit-bucket size for the `Split`/`Shift` overflow representations'
    /// coarse cumulative-count caches.
    pub overflow_bucket: usize,

    /// Master switch for sparse (updated-index-tracked) counter storage.
    /// When `false`, counters always go straight to a full dense scan and
    /// the Sparseness Estimator is never consulted.
    pub sparse: bool,
    /// Fields with fewer than this many distinct values never bother with
    /// sparse tracking.
    pub min_tags: u64,
    /// Fraction of a field's unique values used as the bound on the Sparse
    /// Counter's updated-index list, and as the Sparseness Estimator's
    /// threshold fraction (§4.7).
    pub fraction: f64,
    /// Sparseness Estimator cut-off multiplier (§4.7).
    pub cut_off: f64,

    /// Whether a packed (non-NPM) backing vector is allowed at all (§4.6).
    pub packed: bool,
    /// Max bits-per-slot a packed vector may use before NPM is preferred,
    /// when `packed` is set (§4.6).
    pub packed_limit: u32,
    /// Optional cap on any single slot's tracked count (`None` = unlimited).
    pub max_counts_tracked: Option<u64>,

    /// Target number of idle counters the pool tries to keep on hand.
    pub pool_size: usize,
    /// Minimum number of `EMPTY` counters the janitor tries to maintain.
    pub pool_min_empty: usize,
    /// Number of background threads the pool's janitor uses to clear
    /// `DIRTY` counters; `0` clears inline on the releasing thread instead
    /// of spawning any background work.
    pub cleaning_threads: usize,

    /// Mini-heap block size exponent for the top-K B-Heap (§4.8);
    /// `2^top_k_e - 1` elements per block.
    pub top_k_e: u32,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            plane_variant: PlaneVariant::SplitRank,
            max_planes: 8,
            collapse_fraction: 0.01,
            overflow_bucket: 64,
            sparse: true,
            min_tags: 10_000,
            fraction: 0.08,
            cut_off: 0.90,
            packed: true,
            packed_limit: 24,
            max_counts_tracked: None,
            pool_size: 2,
            pool_min_empty: 1,
            cleaning_threads: 1,
            top_k_e: 4,
        }
    }
}

impl CounterConfig {
    /// Builds a config directly from a field's cardinality, picking
    /// reasonable defaults for everything else. Mirrors the constructors
    /// sux-rs's builders expose for the common case alongside the
    /// fully-specified one.
    pub fn from_fields(unique_values: u64) -> Self {
        let mut cfg = Self::default();
        // Small fields rarely benefit from more than a couple of planes or
        // from sparse tracking at all.
        if unique_values < 64 {
            cfg.max_planes = 2;
            cfg.sparse = false;
        }
        cfg
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.max_planes >= 2, "max_planes must be >= 2");
        anyhow::ensure!(
            self.collapse_fraction > 0.0 && self.collapse_fraction <= 1.0,
            "collapse_fraction must be in (0.0, 1.0]"
        );
        anyhow::ensure!(self.overflow_bucket > 0, "overflow_bucket must be > 0");
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.fraction),
            "fraction must be in [0.0, 1.0]"
        );
        anyhow::ensure!(self.cut_off > 0.0, "cut_off must be > 0.0");
        anyhow::ensure!(
            self.packed_limit > 0 && self.packed_limit <= 63,
            "packed_limit must be in 1..=63"
        );
        anyhow::ensure!(self.pool_size > 0, "pool_size must be > 0");
        anyhow::ensure!(
            self.pool_min_empty <= self.pool_size,
            "pool_min_empty must be <= pool_size"
        );
        anyhow::ensure!(
            (1..=6).contains(&self.top_k_e),
            "top_k_e must be in 1..=6"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        CounterConfig::default().validate().unwrap();
    }

    #[test]
    fn small_field_disables_sparse_tracking() {
        let cfg = CounterConfig::from_fields(10);
        assert!(!cfg.sparse);
        assert_eq!(cfg.max_planes, 2);
    }

    #[test]
    fn rejects_bad_collapse_fraction() {
        let mut cfg = CounterConfig::default();
        cfg.collapse_fraction = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_bad_top_k_e() {
        let mut cfg = CounterConfig::default();
        cfg.top_k_e = 0;
        assert!(cfg.validate().is_err());
        cfg.top_k_e = 10;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_pool_min_empty_above_pool_size() {
        let mut cfg = CounterConfig::default();
        cfg.pool_size = 1;
        cfg.pool_min_empty = 2;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_bad_packed_limit() {
        let mut cfg = CounterConfig::default();
        cfg.packed_limit = 0;
        assert!(cfg.validate().is_err());
    }
}
