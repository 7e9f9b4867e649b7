//! Variational E-step.
//!
//! A chunk of documents is processed in sweeps. Each sweep uses the current
//! gamma of every author in the chunk to compute the per-word topic
//! responsibilities `phi`, splits each document's expected topic counts
//! equally among its authors, and then refreshes the authors' gamma rows from
//! everything they accumulated. Sweeps stop when the mean absolute gamma
//! change falls below the threshold or after the iteration cap.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use std::collections::HashMap;

use crate::authors::AuthorIndex;
use crate::math;
use crate::sparse::BowDocument;
use crate::state::InferenceState;

#[derive(Debug, Clone, Copy)]
pub struct EStepLimits {
    pub iterations: usize,
    pub gamma_threshold: f64,
}

/// Result of one E-step over a chunk.
#[derive(Debug, Clone)]
pub struct EStepOutput {
    /// Expected topic-term counts of the chunk, `num_topics x num_terms`.
    pub sstats: Array2<f64>,
    /// Author ids touched by the chunk, ascending.
    pub authors: Vec<usize>,
    pub sweeps: usize,
    pub converged: bool,
}

/// Average of the authors' `expElogtheta` rows.
fn mean_theta(exp_elogtheta: &Array2<f64>, rows: &[usize]) -> Array1<f64> {
    let mut avg = Array1::zeros(exp_elogtheta.ncols());
    for &r in rows {
        avg += &exp_elogtheta.row(r);
    }
    if !rows.is_empty() {
        avg /= rows.len() as f64;
    }
    avg
}

/// Normalized `theta ⊙ expElogbeta[:, w]`, or `None` when the normalizer
/// vanishes.
fn word_phi(
    theta: ArrayView1<f64>,
    exp_elogbeta: ArrayView2<f64>,
    term: usize,
) -> Option<Array1<f64>> {
    let mut phi = &theta * &exp_elogbeta.column(term);
    let norm = phi.sum();
    if norm > 0.0 && norm.is_finite() {
        phi /= norm;
        Some(phi)
    } else {
        None
    }
}

/// Expected topic counts `sum_w c_w phi_w` of one document.
pub fn document_topic_stats(
    theta: ArrayView1<f64>,
    exp_elogbeta: ArrayView2<f64>,
    doc: &[(usize, f64)],
) -> Array1<f64> {
    let mut stats = Array1::zeros(theta.len());
    for &(term, count) in doc {
        if let Some(phi) = word_phi(theta, exp_elogbeta, term) {
            stats.scaled_add(count, &phi);
        }
    }
    stats
}

/// Run the E-step over `chunk`, whose first document has global index
/// `first_doc`. Gamma rows of the chunk's authors are updated in `state`.
pub fn e_step(
    state: &mut InferenceState,
    exp_elogbeta: ArrayView2<f64>,
    index: &AuthorIndex,
    chunk: &[BowDocument],
    first_doc: usize,
    rhot: f64,
    limits: EStepLimits,
) -> EStepOutput {
    let num_topics = state.num_topics();

    // local row of every author in the chunk, and their document counts here
    let mut authors: Vec<usize> = (0..chunk.len())
        .flat_map(|i| index.authors_of(first_doc + i).iter().copied())
        .collect();
    authors.sort_unstable();
    authors.dedup();
    let local: HashMap<usize, usize> = authors.iter().enumerate().map(|(r, &a)| (a, r)).collect();
    let doc_rows: Vec<Vec<usize>> = (0..chunk.len())
        .map(|i| index.authors_of(first_doc + i).iter().map(|a| local[a]).collect())
        .collect();
    let mut in_chunk = vec![0usize; authors.len()];
    for rows in &doc_rows {
        for &r in rows {
            in_chunk[r] += 1;
        }
    }
    let scale: Vec<f64> = authors
        .iter()
        .zip(&in_chunk)
        .map(|(&a, &n)| {
            if n == 0 {
                0.0
            } else {
                index.docs_of(a).len().max(n) as f64 / n as f64
            }
        })
        .collect();

    let gamma_start = state.gamma_rows(&authors);
    let mut gamma = gamma_start.clone();
    let mut sweeps = 0;
    let mut converged = authors.is_empty();

    while !converged && sweeps < limits.iterations {
        sweeps += 1;
        let exp_elogtheta = math::exp_dirichlet_expectation_rows(gamma.view());

        let mut totals = Array2::<f64>::zeros((authors.len(), num_topics));
        for (doc, rows) in chunk.iter().zip(&doc_rows) {
            if rows.is_empty() {
                continue;
            }
            let theta = mean_theta(&exp_elogtheta, rows);
            let stats = document_topic_stats(theta.view(), exp_elogbeta, doc);
            let share = stats / rows.len() as f64;
            for &r in rows {
                let mut total = totals.row_mut(r);
                total += &share;
            }
        }

        let mut next = Array2::<f64>::zeros(gamma.dim());
        for (r, mut row) in next.axis_iter_mut(Axis(0)).enumerate() {
            let target = &state.alpha + &(&totals.row(r) * scale[r]);
            row.assign(&(&gamma_start.row(r) * (1.0 - rhot) + &(target * rhot)));
        }

        let change = math::mean_abs_change(next.view(), gamma.view());
        gamma = next;
        if change < limits.gamma_threshold {
            converged = true;
        }
    }

    state.set_gamma_rows(&authors, gamma.view());

    // sufficient statistics under the final gamma
    let exp_elogtheta = math::exp_dirichlet_expectation_rows(gamma.view());
    let mut sstats = Array2::<f64>::zeros(exp_elogbeta.dim());
    for (doc, rows) in chunk.iter().zip(&doc_rows) {
        if rows.is_empty() {
            continue;
        }
        let theta = mean_theta(&exp_elogtheta, rows);
        for &(term, count) in doc {
            if let Some(phi) = word_phi(theta.view(), exp_elogbeta, term) {
                let mut column = sstats.column_mut(term);
                column.scaled_add(count, &phi);
            }
        }
    }

    log::debug!(
        "E-step over {} documents, {} authors: {} sweeps, converged: {}",
        chunk.len(),
        authors.len(),
        sweeps,
        converged
    );

    EStepOutput {
        sstats,
        authors,
        sweeps,
        converged,
    }
}
