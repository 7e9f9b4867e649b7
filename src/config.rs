use serde::{Deserialize, Serialize};

use crate::prior::Prior;

/// Author-topic model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Number of topics
    pub num_topics: usize,
    /// Vocabulary size, when no vocabulary is attached
    pub num_terms: Option<usize>,
    /// Documents per E-step/M-step round
    pub chunksize: usize,
    /// Passes over the corpus per `update` call
    pub passes: usize,
    /// Cap on E-step sweeps per chunk
    pub iterations: usize,
    /// Mean absolute gamma change below which a chunk has converged
    pub gamma_threshold: f64,
    /// Learning-rate exponent
    pub decay: f64,
    /// Learning-rate offset, downweights early updates
    pub offset: f64,
    /// Prior over topics
    pub alpha: Prior,
    /// Prior over terms
    pub eta: Prior,
    /// Log the perplexity estimate every this many chunks (0 disables)
    pub eval_every: usize,
    /// Default cutoff for query results
    pub minimum_probability: f64,
    /// Concentration of the Gamma draws that seed sstats and new gamma rows
    pub init_concentration: f64,
    /// Random seed for reproducibility
    pub random_seed: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            num_topics: 100,
            num_terms: None,
            chunksize: 2000,
            passes: 1,
            iterations: 100,
            gamma_threshold: 1e-6,
            decay: 0.5,
            offset: 1.0,
            alpha: Prior::Symmetric,
            eta: Prior::Symmetric,
            eval_every: 0,
            minimum_probability: 0.01,
            init_concentration: 100.0,
            random_seed: None,
        }
    }
}

impl ModelConfig {
    /// Create a new configuration with specified number of topics
    pub fn new(num_topics: usize) -> Self {
        Self {
            num_topics,
            ..Default::default()
        }
    }

    pub fn num_terms(mut self, n: usize) -> Self {
        self.num_terms = Some(n);
        self
    }

    pub fn chunksize(mut self, n: usize) -> Self {
        self.chunksize = n;
        self
    }

    pub fn passes(mut self, n: usize) -> Self {
        self.passes = n;
        self
    }

    pub fn iterations(mut self, n: usize) -> Self {
        self.iterations = n;
        self
    }

    pub fn gamma_threshold(mut self, threshold: f64) -> Self {
        self.gamma_threshold = threshold;
        self
    }

    pub fn decay(mut self, decay: f64) -> Self {
        self.decay = decay;
        self
    }

    pub fn offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    /// Set alpha (author-topic prior)
    pub fn alpha(mut self, alpha: impl Into<Prior>) -> Self {
        self.alpha = alpha.into();
        self
    }

    /// Set eta (topic-term prior)
    pub fn eta(mut self, eta: impl Into<Prior>) -> Self {
        self.eta = eta.into();
        self
    }

    pub fn eval_every(mut self, n: usize) -> Self {
        self.eval_every = n;
        self
    }

    pub fn minimum_probability(mut self, p: f64) -> Self {
        self.minimum_probability = p;
        self
    }

    pub fn init_concentration(mut self, c: f64) -> Self {
        self.init_concentration = c;
        self
    }

    /// Set random seed
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }
}
