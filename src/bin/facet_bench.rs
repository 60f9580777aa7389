//! Diagnostic CLI: builds an `NPlaneMutable` for a synthetic long-tailed
//! maxima vector and reports plane layout and memory usage. Mirrors the
//! teacher's own small `cli`-gated utility binaries.

use clap::Parser;
use facetcore::bits::VectorCore;
use facetcore::npm::{NPlaneMutable, NpmOptions, PlaneVariant};
use mem_dbg::{DbgFlags, MemDbg};
use rand::{rngs::SmallRng, Rng, SeedableRng};

#[derive(Parser, Debug)]
#[command(about = "Build a synthetic NPlaneMutable and report its layout")]
struct Args {
    /// Number of counters.
    #[arg(long, default_value_t = 1_000_000)]
    num_counters: usize,

    /// Overflow representation to use.
    #[arg(long, value_enum, default_value = "split-rank")]
    variant: VariantArg,

    /// Maximum number of planes the layout planner may emit.
    #[arg(long, default_value_t = 8)]
    max_planes: usize,

    /// Fraction of the first plane's population at which a candidate plane
    /// is folded into the last one instead of split further.
    #[arg(long, default_value_t = 0.01)]
    collapse_fraction: f64,

    /// Seed for the synthetic maxima distribution.
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum VariantArg {
    Split,
    SplitRank,
    Shift,
}

impl From<VariantArg> for PlaneVariant {
    fn from(v: VariantArg) -> Self {
        match v {
            VariantArg::Split => PlaneVariant::Split,
            VariantArg::SplitRank => PlaneVariant::SplitRank,
            VariantArg::Shift => PlaneVariant::Shift,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut rng = SmallRng::seed_from_u64(args.seed);
    let maxima: Vec<u64> = (0..args.num_counters)
        .map(|_| {
            if rng.gen_bool(0.99) {
                rng.gen_range(0..16)
            } else {
                rng.gen_range(16..1_000_000)
            }
        })
        .collect();

    let options = NpmOptions {
        variant: args.variant.into(),
        max_planes: args.max_planes,
        collapse_fraction: args.collapse_fraction,
        overflow_bucket: 64,
    };
    let npm = NPlaneMutable::new(&maxima, options)?;

    println!("counters: {}", npm.len());
    println!("planes: {}", npm.num_planes());
    for (idx, desc) in npm.plane_descriptors().iter().enumerate() {
        println!(
            "  plane {idx}: value_bits={} slot_count={} has_overflow={} cumulative_max_bit={}",
            desc.value_bits, desc.slot_count, desc.has_overflow, desc.cumulative_max_bit
        );
    }
    npm.mem_dbg(DbgFlags::default())?;

    Ok(())
}
