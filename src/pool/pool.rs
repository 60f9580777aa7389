/*!

Counter Pool (§4.6, CP): a per-field pool of recyclable counters, so a burst
of concurrent facet requests against the same field reuses already-sized
`SparseCounter<Backing>` instances instead of allocating and laying out a
fresh `NPlaneMutable` per request.

Grounded on `other_examples/.../harborgrid.../buffer_pool-common.rs`'s
`BufferFrame` pin/unpin state machine and mutex-guarded queue, which is the
same shape: a fixed set of reusable slots, each either free, checked out, or
needing cleanup before reuse — generalized here to a literal FIFO queue of
`EMPTY`/`FILLED(token)`/`DIRTY` entries (checked-out counters simply aren't
in the queue at all) per §4.6's own wording.

*/

use crate::collab::{Executor, MaximaProvider};
use crate::config::CounterConfig;
use crate::estimator::should_use_sparse;
use crate::pool::backing::Backing;
use crate::sparse::SparseCounter;
use log::{debug, trace};
use mem_dbg::{MemSize, SizeFlags};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Proof that a counter was filled for a particular `(structure_key,
/// content_key)` pair, letting a caller skip re-zeroing a counter it knows
/// is already populated for its use case (distributed two-phase faceting).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token {
    pub structure_key: u64,
    pub content_key: u64,
}

/// State of one slot in the pool's queue (§4.6: "State: queue `pool`,
/// counters labelled EMPTY / FILLED(token) / DIRTY").
enum Entry {
    /// Ready to be handed out as-is, already zeroed.
    Empty(SparseCounter<Backing>),
    /// Holds the results of a completed query, tagged with the token the
    /// releasing caller supplied; a later `acquire` presenting the same
    /// token gets this counter back without re-zeroing it.
    Filled(SparseCounter<Backing>, Token),
    /// Returned by a caller without a cache token; needs `clear()` before
    /// it can be handed out as EMPTY again.
    Dirty(SparseCounter<Backing>),
}

impl Entry {
    fn is_empty(&self) -> bool {
        matches!(self, Entry::Empty(_))
    }

    fn is_dirty(&self) -> bool {
        matches!(self, Entry::Dirty(_))
    }

    fn is_filled(&self) -> bool {
        matches!(self, Entry::Filled(..))
    }

    fn mem_size(&self) -> usize {
        match self {
            Entry::Empty(c) => c.mem_size(SizeFlags::default()),
            Entry::Filled(c, _) => c.mem_size(SizeFlags::default()),
            Entry::Dirty(c) => c.mem_size(SizeFlags::default()),
        }
    }
}

struct Inner {
    /// FIFO queue; new releases go to the back, eviction/cleaning favors the
    /// front (oldest first), matching §4.6's "evict the oldest entry".
    entries: VecDeque<Entry>,
    structure_key: u64,
}

/// Per-request parameters beyond the maxima vector, mirroring §4.6's
/// `sparseKeys` bundle.
#[derive(Clone, Copy, Debug, Default)]
pub struct AcquireRequest {
    /// Opaque key identifying the current field layout; see
    /// [`MaximaProvider::structure_key`].
    pub structure_key: u64,
    /// Estimated number of documents this request will touch, fed to the
    /// Sparseness Estimator (§4.7).
    pub hit_count: u64,
    /// Total documents in this index generation, fed to the Sparseness
    /// Estimator.
    pub max_doc: u64,
    /// Number of concurrent facet requests sharing this field's pool.
    pub ref_count: u64,
    /// If present, a previously filled counter tagged with this value is
    /// preferred over any EMPTY/DIRTY slot (distributed two-phase faceting).
    pub cache_token: Option<u64>,
}

/// Diagnostics summary returned by [`CounterPool::memory_report`] (§9).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolMemoryReport {
    /// Bytes used by every counter currently idle in the pool (EMPTY,
    /// FILLED or DIRTY), including `SparseCounter`'s own bookkeeping.
    pub pooled_bytes: usize,
    /// Number of counters currently idle in the pool.
    pub pooled_count: usize,
}

/// Per-field pool of recyclable [`SparseCounter<Backing>`] instances.
pub struct CounterPool {
    inner: Arc<Mutex<Inner>>,
    config: CounterConfig,
    janitor: Arc<dyn Executor>,
}

impl CounterPool {
    pub fn new(config: CounterConfig, structure_key: u64, janitor: Arc<dyn Executor>) -> Self {
        config.validate().expect("invalid CounterConfig");
        Self {
            inner: Arc::new(Mutex::new(Inner {
                entries: VecDeque::new(),
                structure_key,
            })),
            config,
            janitor,
        }
    }

    /// Hands out a counter sized for `maxima`, per §4.6's candidate-selection
    /// priority: (a) FILLED whose token matches `request.cache_token`
    /// (served as-is, cache hit), (b) EMPTY (served as-is), (c) DIRTY
    /// (cleared inline), (d) any FILLED with the wrong token (cleared
    /// inline), else a freshly built counter.
    pub fn acquire(
        &self,
        maxima: &[u64],
        request: AcquireRequest,
    ) -> anyhow::Result<SparseCounter<Backing>> {
        let structure_key = request.structure_key;
        let mut inner = self.inner.lock().unwrap();
        if inner.structure_key != structure_key {
            debug!(
                "pool structure key changed ({} -> {}), discarding {} stale slots",
                inner.structure_key,
                structure_key,
                inner.entries.len()
            );
            inner.entries.clear();
            inner.structure_key = structure_key;
        }

        if let Some(content_key) = request.cache_token {
            let wanted = Token {
                structure_key,
                content_key,
            };
            if let Some(pos) = inner
                .entries
                .iter()
                .position(|e| matches!(e, Entry::Filled(_, t) if *t == wanted))
            {
                let Some(Entry::Filled(counter, _)) = inner.entries.remove(pos) else {
                    unreachable!()
                };
                trace!("pool cache hit for token {content_key}");
                return Ok(counter);
            }
        }

        if let Some(pos) = inner.entries.iter().position(Entry::is_empty) {
            let Some(Entry::Empty(counter)) = inner.entries.remove(pos) else {
                unreachable!()
            };
            return Ok(counter);
        }

        if let Some(pos) = inner.entries.iter().position(Entry::is_dirty) {
            let Some(Entry::Dirty(mut counter)) = inner.entries.remove(pos) else {
                unreachable!()
            };
            counter.clear();
            return Ok(counter);
        }

        if let Some(pos) = inner.entries.iter().position(Entry::is_filled) {
            let Some(Entry::Filled(mut counter, _)) = inner.entries.remove(pos) else {
                unreachable!()
            };
            counter.clear();
            counter.set_content_key(None);
            return Ok(counter);
        }

        // Nothing recyclable: release the lock before doing real work.
        drop(inner);

        let sparse_fraction = if self.config.sparse
            && should_use_sparse(
                request.hit_count,
                request.max_doc,
                request.ref_count.max(1),
                maxima.len() as u64,
                self.config.fraction,
                self.config.cut_off,
                self.config.min_tags,
            ) {
            self.config.fraction
        } else {
            0.0
        };

        let backing = Backing::build(maxima, &self.config)?;
        let counter = SparseCounter::new(
            backing,
            sparse_fraction,
            structure_key,
            self.config.max_counts_tracked,
        );
        Ok(counter)
    }

    /// Returns `counter` to the pool. If `content_key` is `Some`, the
    /// counter is enqueued FILLED and tagged with that token (a later
    /// `acquire` with the same token gets it back uncleared); otherwise it
    /// is enqueued DIRTY and the janitor is asked to clear it. A counter
    /// whose structure key is already stale is dropped instead of enqueued.
    pub fn release(&self, mut counter: SparseCounter<Backing>, content_key: Option<u64>) {
        let structure_key = counter.structure_key();
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.structure_key != structure_key {
                return;
            }
            let entry = match content_key {
                Some(content_key) => {
                    counter.set_content_key(Some(content_key));
                    Entry::Filled(
                        counter,
                        Token {
                            structure_key,
                            content_key,
                        },
                    )
                }
                None => {
                    counter.set_content_key(None);
                    Entry::Dirty(counter)
                }
            };
            inner.entries.push_back(entry);
        }

        let inner = Arc::clone(&self.inner);
        let config = self.config;
        self.janitor.submit(Box::new(move || {
            Self::run_janitor(&inner, structure_key, &config);
        }));
    }

    /// Bounded janitor pass (§4.6): at most one eviction and one
    /// DIRTY->EMPTY cleaning per invocation.
    fn run_janitor(inner: &Arc<Mutex<Inner>>, structure_key: u64, config: &CounterConfig) {
        {
            let mut guard = inner.lock().unwrap();
            if guard.structure_key != structure_key {
                return;
            }
            if guard.entries.len() > config.pool_size {
                let count_empty = guard.entries.iter().filter(|e| e.is_empty()).count();
                let prefer_empty = count_empty >= config.pool_min_empty;
                let pos = if prefer_empty {
                    guard
                        .entries
                        .iter()
                        .position(Entry::is_empty)
                        .or_else(|| guard.entries.iter().position(|e| !e.is_empty()))
                } else {
                    guard
                        .entries
                        .iter()
                        .position(|e| !e.is_empty())
                        .or_else(|| guard.entries.iter().position(Entry::is_empty))
                };
                if let Some(pos) = pos {
                    guard.entries.remove(pos);
                    debug!(
                        "janitor evicted one pool entry ({} remaining, cap {})",
                        guard.entries.len(),
                        config.pool_size
                    );
                }
            }
        }

        let to_clean = {
            let mut guard = inner.lock().unwrap();
            if guard.structure_key != structure_key {
                return;
            }
            let count_empty = guard.entries.iter().filter(|e| e.is_empty()).count();
            if count_empty >= config.pool_min_empty {
                return;
            }
            let Some(pos) = guard.entries.iter().position(Entry::is_dirty) else {
                return;
            };
            let Some(Entry::Dirty(counter)) = guard.entries.remove(pos) else {
                unreachable!()
            };
            counter
        };

        let mut counter = to_clean;
        counter.clear();

        let mut guard = inner.lock().unwrap();
        if guard.structure_key != structure_key {
            return;
        }
        trace!("janitor cleaned one dirty counter back to empty");
        guard.entries.push_back(Entry::Empty(counter));
    }

    /// Diagnostics: bytes and counter count currently sitting idle in the
    /// pool, for a host's own admin/metrics surface (§9; this crate exposes
    /// no metrics wire format itself).
    pub fn memory_report(&self) -> PoolMemoryReport {
        let inner = self.inner.lock().unwrap();
        let pooled_bytes = inner.entries.iter().map(Entry::mem_size).sum();
        PoolMemoryReport {
            pooled_bytes,
            pooled_count: inner.entries.len(),
        }
    }

    pub fn config(&self) -> &CounterConfig {
        &self.config
    }
}

/// Convenience wrapper pairing a [`CounterPool`] with a [`MaximaProvider`]
/// so callers don't have to thread maxima through every `acquire` call by
/// hand.
pub struct FieldPool<P: MaximaProvider> {
    pool: CounterPool,
    provider: P,
}

impl<P: MaximaProvider> FieldPool<P> {
    pub fn new(config: CounterConfig, provider: P, janitor: Arc<dyn Executor>) -> Self {
        let structure_key = provider.structure_key();
        Self {
            pool: CounterPool::new(config, structure_key, janitor),
            provider,
        }
    }

    pub fn acquire(&self, request: AcquireRequest) -> anyhow::Result<SparseCounter<Backing>> {
        let maxima = self.provider.maxima();
        self.pool.acquire(
            &maxima,
            AcquireRequest {
                structure_key: self.provider.structure_key(),
                ..request
            },
        )
    }

    pub fn release(&self, counter: SparseCounter<Backing>, content_key: Option<u64>) {
        self.pool.release(counter, content_key)
    }

    pub fn memory_report(&self) -> PoolMemoryReport {
        self.pool.memory_report()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::{Incrementable, Vector};
    use crate::pool::janitor::Janitor;

    fn janitor() -> Arc<dyn Executor> {
        Arc::new(Janitor::new(1).unwrap())
    }

    fn request(structure_key: u64) -> AcquireRequest {
        AcquireRequest {
            structure_key,
            hit_count: 0,
            max_doc: 1,
            ref_count: 1,
            cache_token: None,
        }
    }

    #[test]
    fn acquire_builds_fresh_when_empty() {
        let pool = CounterPool::new(CounterConfig::default(), 1, janitor());
        let maxima = vec![10u64; 20];
        let counter = pool.acquire(&maxima, request(1)).unwrap();
        assert_eq!(counter.len(), 20);
    }

    #[test]
    fn release_dirty_then_acquire_gets_a_clean_counter() {
        let pool = CounterPool::new(CounterConfig::default(), 1, janitor());
        let maxima = vec![10u64; 20];
        let mut counter = pool.acquire(&maxima, request(1)).unwrap();
        counter.inc(0);
        pool.release(counter, None);

        // Whether the janitor already ran or this acquire finds the slot
        // still DIRTY and clears it inline, the caller must never observe
        // stale data from the previous query.
        let reused = pool.acquire(&maxima, request(1)).unwrap();
        assert_eq!(reused.get(0), 0);
    }

    #[test]
    fn structure_key_change_discards_stale_slots() {
        let pool = CounterPool::new(CounterConfig::default(), 1, janitor());
        let maxima = vec![10u64; 20];
        let counter = pool.acquire(&maxima, request(1)).unwrap();
        pool.release(counter, None);

        let fresh = pool.acquire(&maxima, request(2)).unwrap();
        assert_eq!(fresh.get(0), 0);
    }

    /// §8 scenario 6, "Pool token reuse": with `poolSize=2`,
    /// `cleaningThreads=0`, acquire a counter, fill it, tag it with a cache
    /// token on release, then a second acquire with the same structure key
    /// and token must get that exact filled counter back uncleared.
    #[test]
    fn pool_token_reuse() {
        let mut config = CounterConfig::default();
        config.pool_size = 2;
        config.pool_min_empty = 1;
        config.cleaning_threads = 0;
        let janitor: Arc<dyn Executor> = Arc::new(Janitor::new(0).unwrap());
        let pool = CounterPool::new(config, 1, janitor);
        let maxima = vec![10u64; 20];

        let mut counter = pool.acquire(&maxima, request(1)).unwrap();
        counter.inc(3);
        pool.release(counter, Some(42));

        let mut req = request(1);
        req.cache_token = Some(42);
        let reused = pool.acquire(&maxima, req).unwrap();
        assert_eq!(reused.get(3), 1);
    }

    #[test]
    fn wrong_token_falls_back_to_next_priority_candidate() {
        let config = CounterConfig::default();
        let pool = CounterPool::new(config, 1, janitor());
        let maxima = vec![10u64; 20];

        let mut counter = pool.acquire(&maxima, request(1)).unwrap();
        counter.inc(3);
        pool.release(counter, Some(42));

        let mut req = request(1);
        req.cache_token = Some(99);
        let other = pool.acquire(&maxima, req).unwrap();
        // No FILLED(99) exists, so the FILLED(42) slot was taken as
        // candidate (d) and must have been cleared before return.
        assert_eq!(other.get(3), 0);
    }

    #[test]
    fn janitor_evicts_down_to_pool_size() {
        let mut config = CounterConfig::default();
        config.pool_size = 1;
        config.pool_min_empty = 1;
        config.cleaning_threads = 0;
        let janitor: Arc<dyn Executor> = Arc::new(Janitor::new(0).unwrap());
        let pool = CounterPool::new(config, 1, janitor);
        let maxima = vec![10u64; 20];

        let a = pool.acquire(&maxima, request(1)).unwrap();
        let b = pool.acquire(&maxima, request(1)).unwrap();
        pool.release(a, None);
        pool.release(b, None);

        // pool_size == 1: the janitor (running inline since
        // cleaning_threads == 0) must have evicted one of the two releases.
        assert_eq!(pool.memory_report().pooled_count, 1);
    }
}
