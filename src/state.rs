//! Persistent variational state of the model.

use ndarray::{s, Array1, Array2, ArrayView2, Axis};
use rand::Rng;
use rand_distr::{Distribution, Gamma};

use crate::error::{AtError, Result};
use crate::math;
use crate::prior::EtaValues;
use crate::store::ArrayStore;

/// Draw a `rows x cols` matrix from `Gamma(concentration, 1/concentration)`:
/// positive values with mean 1 and variance `1/concentration`.
pub fn random_gamma_matrix<R: Rng + ?Sized>(
    rng: &mut R,
    concentration: f64,
    rows: usize,
    cols: usize,
) -> Result<Array2<f64>> {
    let gamma = Gamma::new(concentration, 1.0 / concentration)
        .map_err(|e| AtError::InvalidValue(format!("init_concentration {concentration}: {e}")))?;
    Ok(Array2::from_shape_simple_fn((rows, cols), || gamma.sample(rng)))
}

#[derive(Debug, Clone)]
pub struct InferenceState {
    pub alpha: Array1<f64>,
    pub eta: EtaValues,
    pub sstats: ArrayStore, // num_topics x num_terms
    pub gamma: ArrayStore,  // num_authors x num_topics
    pub num_updates: u64,   // documents consumed by M-steps
    pub numdocs: u64,       // distinct documents ingested
}

impl InferenceState {
    pub fn new(alpha: Array1<f64>, eta: EtaValues, sstats: Array2<f64>) -> Self {
        let num_topics = alpha.len();
        Self {
            alpha,
            eta,
            sstats: sstats.into(),
            gamma: Array2::zeros((0, num_topics)).into(),
            num_updates: 0,
            numdocs: 0,
        }
    }

    pub fn num_topics(&self) -> usize {
        self.alpha.len()
    }

    pub fn num_terms(&self) -> usize {
        self.sstats.shape().1
    }

    pub fn num_authors(&self) -> usize {
        self.gamma.shape().0
    }

    /// Append gamma rows for newly seen authors.
    pub fn extend_gamma(&mut self, rows: ArrayView2<f64>) -> Result<()> {
        if rows.ncols() != self.num_topics() {
            return Err(AtError::shape(
                "gamma rows",
                &[rows.nrows(), self.num_topics()],
                rows.shape(),
            ));
        }
        self.gamma.to_mut().append(Axis(0), rows).map_err(|e| {
            AtError::InvalidValue(format!("cannot extend gamma: {e}"))
        })
    }

    /// `sstats <- (1 - rhot) * sstats + rhot * scale * new_sstats`, where
    /// `scale` rescales a batch of `batch_docs` documents to the corpus size.
    pub fn blend(
        &mut self,
        rhot: f64,
        new_sstats: ArrayView2<f64>,
        batch_docs: usize,
    ) -> Result<()> {
        if new_sstats.dim() != self.sstats.shape() {
            return Err(AtError::shape(
                "sstats",
                &[self.num_topics(), self.num_terms()],
                new_sstats.shape(),
            ));
        }
        let scale = if self.numdocs == 0 || batch_docs == 0 {
            1.0
        } else {
            self.numdocs as f64 / batch_docs as f64
        };
        let sstats = self.sstats.to_mut();
        sstats.zip_mut_with(&new_sstats, |old, &new| {
            *old = (1.0 - rhot) * *old + rhot * scale * new;
        });
        Ok(())
    }

    /// `eta + sstats`, one row per topic.
    pub fn get_lambda(&self) -> Array2<f64> {
        let mut lambda = self.sstats.view().to_owned();
        for (k, mut row) in lambda.axis_iter_mut(Axis(0)).enumerate() {
            row += &self.eta.row(k);
        }
        lambda
    }

    pub fn get_elogbeta(&self) -> Array2<f64> {
        math::dirichlet_expectation_rows(self.get_lambda().view())
    }

    pub fn get_exp_elogbeta(&self) -> Array2<f64> {
        self.get_elogbeta().mapv_into(f64::exp)
    }

    /// Gamma rows for `authors`, in the given order.
    pub fn gamma_rows(&self, authors: &[usize]) -> Array2<f64> {
        self.gamma.view().select(Axis(0), authors)
    }

    pub fn set_gamma_rows(&mut self, authors: &[usize], rows: ArrayView2<f64>) {
        let gamma = self.gamma.to_mut();
        for (i, &a) in authors.iter().enumerate() {
            gamma.slice_mut(s![a, ..]).assign(&rows.row(i));
        }
    }
}
