//! Dirichlet hyperparameters `alpha` (over topics) and `eta` (over terms).
//!
//! A [`Prior`] is what the caller asks for; it is resolved once, at model
//! construction, into a concrete array plus an `auto` flag. Everything past
//! construction only sees the resolved form.

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{AtError, Result};

/// Requested form of a Dirichlet prior.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Prior {
    /// `1/num_topics` for alpha, `1/num_terms` for eta. Also the default.
    #[default]
    Symmetric,
    /// `1/(k + sqrt(num_topics))`, normalized. Alpha only.
    Asymmetric,
    /// Symmetric seed, re-estimated after every chunk.
    Auto,
    Scalar(f64),
    Vector(Vec<f64>),
    Matrix(Array2<f64>),
}

impl FromStr for Prior {
    type Err = AtError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "symmetric" => Ok(Prior::Symmetric),
            "asymmetric" => Ok(Prior::Asymmetric),
            "auto" => Ok(Prior::Auto),
            other => Err(AtError::InvalidValue(format!(
                "unknown prior keyword {other:?} (expected \"symmetric\", \"asymmetric\" or \"auto\")"
            ))),
        }
    }
}

impl From<f64> for Prior {
    fn from(v: f64) -> Self {
        Prior::Scalar(v)
    }
}

impl From<Vec<f64>> for Prior {
    fn from(v: Vec<f64>) -> Self {
        Prior::Vector(v)
    }
}

impl From<Array1<f64>> for Prior {
    fn from(v: Array1<f64>) -> Self {
        Prior::Vector(v.to_vec())
    }
}

impl From<Array2<f64>> for Prior {
    fn from(v: Array2<f64>) -> Self {
        Prior::Matrix(v)
    }
}

/// Resolved eta: one row shared by every topic, or one row per topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EtaValues {
    Terms(Array1<f64>),
    TopicTerms(Array2<f64>),
}

impl EtaValues {
    /// Prior row used for topic `topic`.
    pub fn row(&self, topic: usize) -> ArrayView1<'_, f64> {
        match self {
            EtaValues::Terms(v) => v.view(),
            EtaValues::TopicTerms(m) => m.row(topic),
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            EtaValues::Terms(v) => v.shape(),
            EtaValues::TopicTerms(m) => m.shape(),
        }
    }

    pub fn as_terms(&self) -> Option<&Array1<f64>> {
        match self {
            EtaValues::Terms(v) => Some(v),
            EtaValues::TopicTerms(_) => None,
        }
    }
}

fn check_entries(name: &str, values: &[f64]) -> Result<()> {
    match values.iter().find(|v| !v.is_finite() || **v < 0.0) {
        Some(bad) => Err(AtError::InvalidValue(format!(
            "{name} entries must be finite and nonnegative, got {bad}"
        ))),
        None => Ok(()),
    }
}

/// Resolve `alpha` to a `(num_topics,)` array and its auto flag.
pub fn init_alpha(prior: &Prior, num_topics: usize) -> Result<(Array1<f64>, bool)> {
    let symmetric = || Array1::from_elem(num_topics, 1.0 / num_topics as f64);
    let resolved = match prior {
        Prior::Symmetric => (symmetric(), false),
        Prior::Auto => (symmetric(), true),
        Prior::Asymmetric => {
            let sqrt_k = (num_topics as f64).sqrt();
            let raw = Array1::from_shape_fn(num_topics, |k| 1.0 / (k as f64 + sqrt_k));
            let total = raw.sum();
            (raw / total, false)
        }
        Prior::Scalar(v) => {
            check_entries("alpha", &[*v])?;
            (Array1::from_elem(num_topics, *v), false)
        }
        Prior::Vector(v) => {
            if v.len() != num_topics {
                return Err(AtError::shape("alpha", &[num_topics], &[v.len()]));
            }
            check_entries("alpha", v)?;
            (Array1::from_vec(v.clone()), false)
        }
        Prior::Matrix(m) => {
            return Err(AtError::shape("alpha", &[num_topics], m.shape()));
        }
    };
    Ok(resolved)
}

/// Resolve `eta` to a `(num_terms,)` or `(num_topics, num_terms)` array and
/// its auto flag.
pub fn init_eta(prior: &Prior, num_topics: usize, num_terms: usize) -> Result<(EtaValues, bool)> {
    let symmetric = || EtaValues::Terms(Array1::from_elem(num_terms, 1.0 / num_terms as f64));
    let resolved = match prior {
        Prior::Symmetric => (symmetric(), false),
        Prior::Auto => (symmetric(), true),
        Prior::Asymmetric => {
            return Err(AtError::InvalidValue(
                "\"asymmetric\" is not a valid prior for eta".to_string(),
            ));
        }
        Prior::Scalar(v) => {
            check_entries("eta", &[*v])?;
            (EtaValues::Terms(Array1::from_elem(num_terms, *v)), false)
        }
        Prior::Vector(v) => {
            if v.len() != num_terms {
                return Err(AtError::shape("eta", &[num_terms], &[v.len()]));
            }
            check_entries("eta", v)?;
            (EtaValues::Terms(Array1::from_vec(v.clone())), false)
        }
        Prior::Matrix(m) => {
            if m.shape() != [num_topics, num_terms] {
                return Err(AtError::shape("eta", &[num_topics, num_terms], m.shape()));
            }
            check_entries("eta", &m.iter().copied().collect::<Vec<_>>())?;
            (EtaValues::TopicTerms(m.clone()), false)
        }
    };
    Ok(resolved)
}
