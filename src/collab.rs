/*!

External interfaces (§6): the collaborator traits a host application
implements to plug this crate into a running index — ordinal resolution,
per-field maxima, top-K result delivery, and a background-work executor for
the Counter Pool's janitor.

Grounded on the teacher's habit of splitting capability into small,
independently-composable traits per collaborator (`Select`, `SelectHinted`,
`SelectZero`, `Rank` in `src/rank_sel/*`) rather than one large interface.

*/

use anyhow::Result;

/// Resolves documents to the ordinals they hold for a single field.
///
/// A host's inverted index typically already has this mapping (e.g. a
/// postings list per term); this crate never builds or owns one itself.
/// Iteration is doc-at-a-time, then ordinal-at-a-time within a doc, so a
/// host can stream both without materializing either list.
pub trait OrdinalProducer {
    /// Advances to (and returns) the next matching document, or `None` once
    /// exhausted.
    fn next_doc(&mut self) -> Option<u32>;

    /// Every ordinal `doc` holds in this field.
    fn ords(&mut self, doc: u32) -> impl Iterator<Item = u32>;
}

/// Supplies the per-counter maxima vector (`M`) a [`crate::npm::NPlaneMutable`]
/// is sized from, and the `maxDoc` used by the Sparseness Estimator.
pub trait MaximaProvider {
    /// Number of distinct ordinals this field currently has.
    fn size(&self) -> usize;

    /// Upper bound ordinal `i` may ever reach (e.g. its document frequency).
    fn get(&self, i: usize) -> u64;

    /// Total number of documents in the index generation this pool serves.
    fn max_doc(&self) -> u64;

    /// Opaque key identifying the current field layout (ordinal count,
    /// maxima shape). Counters built against a stale key must not be
    /// recycled into a pool expecting a new one (see §4.6, CP).
    fn structure_key(&self) -> u64;

    /// Collects every maximum into a contiguous `Vec`, for callers (like
    /// [`crate::pool::FieldPool`]) that need a slice to hand to
    /// `Backing::build` rather than random-accessing one ordinal at a time.
    fn maxima(&self) -> Vec<u64> {
        (0..self.size()).map(|i| self.get(i)).collect()
    }
}

/// Receives the ranked results of a top-K facet query.
pub trait TopKSink {
    /// Offers one surviving `(count, ordinal)` pair, in ascending count
    /// order (as drained from a [`crate::topk::BHeap`]).
    fn offer(&mut self, count: u64, ord: u32);
}

/// A blanket `TopKSink` for any closure, so simple callers don't need to
/// define a type just to collect results.
impl<F: FnMut(u64, u32)> TopKSink for F {
    fn offer(&mut self, count: u64, ord: u32) {
        self(count, ord)
    }
}

/// Runs background work for the Counter Pool's janitor (§4.6, §5). The
/// `rayon`-backed [`crate::pool::Janitor`] is the default implementation;
/// hosts that already run their own thread pool can implement this trait
/// directly instead of paying for a second one.
///
/// Deliberately `Box<dyn FnOnce() + Send>` rather than `impl FnOnce() + Send
/// + 'static` in argument position: the latter isn't dyn-compatible, and
/// every janitor/pool in this crate is shared as `Arc<dyn Executor>` so one
/// executor can back every field's pool in an index generation.
pub trait Executor: Send + Sync {
    /// Schedules `task` to run in the background. Implementations must not
    /// block the caller; if no capacity is available the task may run
    /// inline or be dropped (bounded-work janitors are expected to do the
    /// latter rather than unbounded-queue the former, see §5).
    fn submit(&self, task: Box<dyn FnOnce() + Send>);
}

/// Validates a set of collaborator-supplied parameters that must hold for
/// the rest of the pipeline to make sense (non-goal: this crate never
/// second-guesses index contents, only its own construction parameters).
pub fn validate_maxima(maxima: &[u64], unique_values: u64) -> Result<()> {
    anyhow::ensure!(
        maxima.len() as u64 == unique_values,
        "maxima vector has {} entries but OrdinalProducer reports {} unique values",
        maxima.len(),
        unique_values
    );
    Ok(())
}
