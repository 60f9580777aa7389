/*!

Janitor: the Counter Pool's background worker (§4.6, §5). Dirty counters
(released but not yet cleared) are handed off here so `release` never blocks
the calling query thread on a potentially large `clear()`.

Grounded on `other_examples/.../cesso__search-pool.rs`'s thread-scope-based
executor idiom for "shared pool, spawn-and-forget tasks", adapted to use
the teacher's own optional `rayon` dependency as the executor instead of
`std::thread::scope` (this crate has no per-query thread lifetime to scope
against — the pool and its janitor outlive any single query).
*/

use crate::collab::Executor;
use log::trace;
use std::sync::Arc;

#[cfg(feature = "rayon")]
use log::warn;
#[cfg(feature = "rayon")]
use std::sync::atomic::{AtomicUsize, Ordering};

/// Caps how much background clearing work is in flight at once, so a burst
/// of releases can't queue unbounded work against the shared thread pool
/// (§5: "bounded background work, never unbounded queueing").
const MAX_IN_FLIGHT: usize = 256;

#[cfg(feature = "rayon")]
enum Backend {
    /// `cleaningThreads == 0`: no thread pool at all, every task runs inline
    /// on the calling (releasing) thread.
    Inline,
    Pool {
        pool: rayon::ThreadPool,
        in_flight: Arc<AtomicUsize>,
    },
}

#[cfg(feature = "rayon")]
pub struct Janitor {
    backend: Backend,
}

#[cfg(feature = "rayon")]
impl Janitor {
    /// `num_threads == 0` disables the background thread pool entirely;
    /// `spawn` then clears inline on the releasing thread instead.
    pub fn new(num_threads: usize) -> anyhow::Result<Self> {
        if num_threads == 0 {
            return Ok(Self {
                backend: Backend::Inline,
            });
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("facetcore-janitor-{i}"))
            .build()?;
        Ok(Self {
            backend: Backend::Pool {
                pool,
                in_flight: Arc::new(AtomicUsize::new(0)),
            },
        })
    }

    /// One janitor per host process generation is the common case: size it
    /// off the available parallelism the way the teacher's own benches do.
    pub fn default_sized() -> anyhow::Result<Self> {
        Self::new(num_cpus::get().max(1))
    }
}

#[cfg(feature = "rayon")]
impl Executor for Janitor {
    fn submit(&self, task: Box<dyn FnOnce() + Send>) {
        let (pool, in_flight) = match &self.backend {
            Backend::Inline => {
                task();
                return;
            }
            Backend::Pool { pool, in_flight } => (pool, in_flight),
        };
        if in_flight.load(Ordering::Relaxed) >= MAX_IN_FLIGHT {
            warn!("janitor backlog full, clearing inline instead of queueing");
            task();
            return;
        }
        in_flight.fetch_add(1, Ordering::Relaxed);
        let in_flight = Arc::clone(in_flight);
        pool.spawn(move || {
            task();
            in_flight.fetch_sub(1, Ordering::Relaxed);
        });
    }
}

/// Runs every task inline on the calling thread. Used when the `rayon`
/// feature is disabled, or by hosts that want deterministic single-threaded
/// behavior (e.g. under `slow_tests`).
#[cfg(not(feature = "rayon"))]
pub struct Janitor;

#[cfg(not(feature = "rayon"))]
impl Janitor {
    pub fn new(_num_threads: usize) -> anyhow::Result<Self> {
        Ok(Self)
    }

    pub fn default_sized() -> anyhow::Result<Self> {
        Ok(Self)
    }
}

#[cfg(not(feature = "rayon"))]
impl Executor for Janitor {
    fn submit(&self, task: Box<dyn FnOnce() + Send>) {
        task();
    }
}

/// Shares one [`Janitor`] across every [`crate::pool::CounterPool`] in an
/// index generation, rather than spinning up a thread pool per field.
pub struct PoolRegistry {
    janitor: Arc<dyn Executor>,
}

impl PoolRegistry {
    pub fn new(janitor: Janitor) -> Self {
        Self {
            janitor: Arc::new(janitor),
        }
    }

    pub fn janitor(&self) -> Arc<dyn Executor> {
        trace!("handing out shared janitor handle");
        Arc::clone(&self.janitor)
    }
}
