/*!

Sparseness Estimator (§4.7, SE): a pure predicate deciding whether a field's
counters should use sparse (updated-index-tracked) storage or go straight
to dense.

No teacher file is grounded on directly; this is a small free function in
the style of the teacher's other pure math helpers (`DivCeilUnchecked`,
the `select64`-adjacent bit-twiddling functions), not a type.

*/

/// Returns `true` if a field with these characteristics should use sparse
/// counter tracking rather than dense.
///
/// `hit_count` / `max_doc` estimates the fraction of documents actually
/// touched by the current query; multiplying by `ref_count` (how many
/// concurrent facet requests share this pool) and comparing against
/// `fraction * unique_values * cut_off` approximates whether the expected
/// number of distinct counters touched stays well under the field's
/// cardinality.
///
/// Fields with fewer than `min_tags` distinct values never bother with
/// sparse tracking: the dense vector is already tiny.
pub fn should_use_sparse(
    hit_count: u64,
    max_doc: u64,
    ref_count: u64,
    unique_values: u64,
    fraction: f64,
    cut_off: f64,
    min_tags: u64,
) -> bool {
    if unique_values < min_tags {
        return false;
    }
    if max_doc == 0 {
        return false;
    }
    let expected_touched = (hit_count as f64 * ref_count as f64) / max_doc as f64;
    let threshold = fraction * unique_values as f64 * cut_off;
    expected_touched < threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_min_tags_never_sparse() {
        assert!(!should_use_sparse(10, 1000, 1, 3, 0.5, 1.0, 8));
    }

    #[test]
    fn small_hit_fraction_prefers_sparse() {
        assert!(should_use_sparse(5, 1_000_000, 1, 10_000, 0.5, 1.0, 8));
    }

    #[test]
    fn large_hit_fraction_prefers_dense() {
        assert!(!should_use_sparse(900_000, 1_000_000, 1, 10_000, 0.01, 1.0, 8));
    }

    #[test]
    fn zero_max_doc_is_never_sparse() {
        assert!(!should_use_sparse(0, 0, 1, 10_000, 0.5, 1.0, 8));
    }
}
