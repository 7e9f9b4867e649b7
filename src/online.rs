//! Online M-step: learning-rate schedule, blending of chunk statistics into
//! the global state, and re-estimation of auto priors.

use ndarray::{Array1, ArrayView2, Axis};

use crate::error::Result;
use crate::math;
use crate::prior::EtaValues;
use crate::state::InferenceState;

/// Learning-rate schedule `rho = (offset + pass + num_updates / chunksize)^(-decay)`.
///
/// `pass` is the index of the pass within the current update call; it is
/// never stored, so a finished update leaves `rho` a function of
/// `num_updates` alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LearningRate {
    pub offset: f64,
    pub decay: f64,
    pub chunksize: usize,
}

impl LearningRate {
    pub fn rho(&self, num_updates: u64) -> f64 {
        self.rho_in_pass(0, num_updates)
    }

    pub fn rho_in_pass(&self, pass: usize, num_updates: u64) -> f64 {
        let t = num_updates as f64 / self.chunksize.max(1) as f64;
        (self.offset + pass as f64 + t).powf(-self.decay)
    }
}

/// Which priors are re-estimated after each chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutoPriors {
    pub alpha: bool,
    pub eta: bool,
}

/// Blend the chunk statistics into the state. Documents are counted in
/// `num_updates` only on the first pass over them.
pub fn m_step(
    state: &mut InferenceState,
    rhot: f64,
    chunk_sstats: ArrayView2<f64>,
    chunk_docs: usize,
    auto: AutoPriors,
    extra_pass: bool,
) -> Result<()> {
    state.blend(rhot, chunk_sstats, chunk_docs)?;
    if !extra_pass {
        state.num_updates += chunk_docs as u64;
    }

    if auto.alpha {
        update_alpha(state, rhot);
    }
    if auto.eta {
        update_eta(state, rhot);
    }
    Ok(())
}

/// Newton step on alpha from the expected log topic proportions of every
/// known author.
pub fn update_alpha(state: &mut InferenceState, rho: f64) -> bool {
    let gamma = state.gamma.view();
    let n = gamma.nrows();
    if n == 0 {
        return false;
    }
    let logphat: Array1<f64> = math::dirichlet_expectation_rows(gamma)
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(state.num_topics()));

    match math::update_dir_prior(state.alpha.view(), n as f64, logphat.view(), rho) {
        Some(alpha) => {
            log::debug!("optimized alpha {:?}", alpha.as_slice());
            state.alpha = alpha;
            true
        }
        None => {
            log::warn!("updated alpha not positive, keeping the previous value");
            false
        }
    }
}

/// Newton step on a per-term eta from the expected log term probabilities of
/// every topic. A per-topic eta matrix is never re-estimated.
pub fn update_eta(state: &mut InferenceState, rho: f64) -> bool {
    let current = match &state.eta {
        EtaValues::Terms(v) => v.clone(),
        EtaValues::TopicTerms(_) => return false,
    };
    let n = state.num_topics() as f64;
    let elogbeta = state.get_elogbeta();
    let logphat = match elogbeta.mean_axis(Axis(0)) {
        Some(v) => v,
        None => return false,
    };

    match math::update_dir_prior(current.view(), n, logphat.view(), rho) {
        Some(eta) => {
            log::debug!("optimized eta, mean {:.6}", eta.mean().unwrap_or(0.0));
            state.eta = EtaValues::Terms(eta);
            true
        }
        None => {
            log::warn!("updated eta not positive, keeping the previous value");
            false
        }
    }
}
