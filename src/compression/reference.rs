//! Reference-cell selection for delta coding.
//!
//! Biologically related cells express strongly overlapping gene sets, so a
//! cell can often be stored as a small delta against an earlier, similar
//! cell. Similarity is Jaccard over the gene-index sets; candidates are drawn
//! from a sliding window of the most recently encoded rows.

use crate::matrix::SparseRow;
use rayon::prelude::*;

/// Minimum Jaccard similarity for a candidate to be usable as a reference.
pub const MIN_SIMILARITY: f64 = 0.1;

/// How many of the most recent rows are scanned as reference candidates.
pub const REFERENCE_WINDOW: usize = 256;

/// Jaccard similarity of two sorted gene-index sets.
///
/// Both empty counts as identical (1.0); exactly one empty as disjoint (0.0).
pub fn jaccard_similarity(a: &[u32], b: &[u32]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    // Both sides are strictly ascending, so a merge walk counts the
    // intersection without building sets.
    let mut intersection = 0usize;
    let (mut i, mut j) = (0usize, 0usize);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                intersection += 1;
                i += 1;
                j += 1;
            }
        }
    }

    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Find the best reference for `target` among the rows encoded before it.
///
/// `pool` holds every earlier row in index order; only the trailing
/// [`REFERENCE_WINDOW`] entries are scanned. Returns the winning row's index
/// into `pool`, or -1 when no candidate clears [`MIN_SIMILARITY`]. Ties go to
/// the earliest candidate.
pub fn find_best_reference(target: &SparseRow, pool: &[SparseRow]) -> i32 {
    if pool.is_empty() {
        return -1;
    }
    let start = pool.len().saturating_sub(REFERENCE_WINDOW);
    let window = &pool[start..];

    let similarities: Vec<f64> = window
        .par_iter()
        .map(|candidate| jaccard_similarity(&target.indices, &candidate.indices))
        .collect();

    // Serial argmax with strict comparison: deterministic, earliest wins ties.
    let mut best_similarity = MIN_SIMILARITY;
    let mut best_index = -1i32;
    for (offset, &similarity) in similarities.iter().enumerate() {
        if similarity > best_similarity {
            best_similarity = similarity;
            best_index = (start + offset) as i32;
        }
    }
    best_index
}
