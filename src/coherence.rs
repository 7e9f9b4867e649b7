//! UMass topic coherence.
//!
//! For the top terms `w_1..w_n` of a topic (most probable first) the score is
//! the mean over pairs `j < i` of `log((D(w_i, w_j)/D + eps) / (D(w_j)/D))`,
//! where `D(..)` counts documents containing the terms. Higher is better.

use std::collections::{HashMap, HashSet};

use crate::sparse::BowDocument;

const EPSILON: f64 = 1e-12;

/// Document frequencies of single terms and term pairs, restricted to the
/// terms of interest.
struct CoOccurrence {
    num_docs: f64,
    single: HashMap<usize, f64>,
    pairs: HashMap<(usize, usize), f64>,
}

impl CoOccurrence {
    fn count(corpus: &[BowDocument], terms: &HashSet<usize>) -> Self {
        let mut single = HashMap::new();
        let mut pairs = HashMap::new();
        for doc in corpus {
            let mut present: Vec<usize> = doc
                .iter()
                .filter(|(id, count)| *count > 0.0 && terms.contains(id))
                .map(|&(id, _)| id)
                .collect();
            present.sort_unstable();
            present.dedup();
            for (i, &a) in present.iter().enumerate() {
                *single.entry(a).or_insert(0.0) += 1.0;
                for &b in &present[i + 1..] {
                    *pairs.entry((a, b)).or_insert(0.0) += 1.0;
                }
            }
        }
        Self {
            num_docs: corpus.len() as f64,
            single,
            pairs,
        }
    }

    fn docs_with(&self, term: usize) -> f64 {
        self.single.get(&term).copied().unwrap_or(0.0)
    }

    fn docs_with_both(&self, a: usize, b: usize) -> f64 {
        let key = if a < b { (a, b) } else { (b, a) };
        self.pairs.get(&key).copied().unwrap_or(0.0)
    }
}

/// UMass coherence of every topic in `topics` (each a ranked list of term
/// ids) against `corpus`. Pairs whose conditioning term never occurs are
/// skipped; a topic with no usable pair scores 0.
pub fn umass(topics: &[Vec<usize>], corpus: &[BowDocument]) -> Vec<f64> {
    let terms: HashSet<usize> = topics.iter().flatten().copied().collect();
    let counts = CoOccurrence::count(corpus, &terms);
    if counts.num_docs == 0.0 {
        return vec![0.0; topics.len()];
    }

    topics
        .iter()
        .map(|top| {
            let mut total = 0.0;
            let mut pairs = 0usize;
            for (i, &w_prime) in top.iter().enumerate().skip(1) {
                for &w_star in &top[..i] {
                    let d_star = counts.docs_with(w_star);
                    if d_star == 0.0 {
                        continue;
                    }
                    let joint = counts.docs_with_both(w_prime, w_star) / counts.num_docs;
                    total += ((joint + EPSILON) / (d_star / counts.num_docs)).ln();
                    pairs += 1;
                }
            }
            if pairs > 0 {
                total / pairs as f64
            } else {
                0.0
            }
        })
        .collect()
}
