//! Sparse bag-of-words vectors and their dense counterparts.

use ndarray::{Array1, ArrayView1};
use std::collections::HashSet;

use crate::error::{AtError, Result};

pub type TermId = usize;

/// A document as `(term_id, count)` pairs.
pub type BowDocument = Vec<(TermId, f64)>;

/// Expand a sparse vector into a dense array of `length` entries.
///
/// Ids at or beyond `length` are dropped.
pub fn sparse2full(doc: &[(usize, f64)], length: usize) -> Array1<f64> {
    let mut dense = Array1::zeros(length);
    for &(id, value) in doc {
        if id < length {
            dense[id] += value;
        }
    }
    dense
}

/// Keep the entries of `dense` whose magnitude is strictly above `eps`.
pub fn full2sparse(dense: ArrayView1<f64>, eps: f64) -> Vec<(usize, f64)> {
    dense
        .iter()
        .enumerate()
        .filter(|(_, v)| v.abs() > eps)
        .map(|(i, &v)| (i, v))
        .collect()
}

/// Check that `doc` is a proper bag of words over `num_terms` terms.
pub fn validate_document(doc_idx: usize, doc: &[(usize, f64)], num_terms: usize) -> Result<()> {
    let mut seen = HashSet::with_capacity(doc.len());
    for &(id, count) in doc {
        if id >= num_terms {
            return Err(AtError::InvalidDocument {
                doc: doc_idx,
                reason: format!("term id {id} >= vocabulary size {num_terms}"),
            });
        }
        if !count.is_finite() || count <= 0.0 {
            return Err(AtError::InvalidDocument {
                doc: doc_idx,
                reason: format!("count {count} for term {id} is not positive"),
            });
        }
        if !seen.insert(id) {
            return Err(AtError::InvalidDocument {
                doc: doc_idx,
                reason: format!("term id {id} appears twice"),
            });
        }
    }
    Ok(())
}

/// Largest term id referenced by `corpus`, plus one.
pub fn implied_num_terms(corpus: &[BowDocument]) -> usize {
    corpus
        .iter()
        .flat_map(|doc| doc.iter().map(|&(id, _)| id + 1))
        .max()
        .unwrap_or(0)
}
