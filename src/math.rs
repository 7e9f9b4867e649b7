//! Special functions and Dirichlet helpers shared by the E- and M-steps.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, Zip};
use statrs::function::gamma;

#[inline]
pub fn digamma(x: f64) -> f64 {
    gamma::digamma(x)
}

#[inline]
pub fn ln_gamma(x: f64) -> f64 {
    gamma::ln_gamma(x)
}

/// First derivative of the digamma function, for `x > 0`.
///
/// Shifts the argument up with the recurrence `ψ'(x) = ψ'(x+1) + 1/x²` and
/// finishes with the asymptotic expansion.
pub fn trigamma(x: f64) -> f64 {
    if !(x > 0.0) {
        return f64::NAN;
    }
    let mut x = x;
    let mut acc = 0.0;
    while x < 10.0 {
        acc += 1.0 / (x * x);
        x += 1.0;
    }
    let x2 = 1.0 / (x * x);
    // 1/x + 1/2x² + 1/6x³ - 1/30x⁵ + 1/42x⁷ - 1/30x⁹
    let tail = x2 * (1.0 / 6.0 - x2 * (1.0 / 30.0 - x2 * (1.0 / 42.0 - x2 / 30.0)));
    acc + 1.0 / x + x2 / 2.0 + tail / x
}

/// E[log θ] for θ ~ Dir(alpha).
pub fn dirichlet_expectation(alpha: ArrayView1<f64>) -> Array1<f64> {
    let psi_sum = digamma(alpha.sum());
    alpha.mapv(|a| digamma(a) - psi_sum)
}

/// Row-wise [`dirichlet_expectation`].
pub fn dirichlet_expectation_rows(alpha: ArrayView2<f64>) -> Array2<f64> {
    let mut out = alpha.mapv(digamma);
    for (mut row, src) in out.axis_iter_mut(Axis(0)).zip(alpha.axis_iter(Axis(0))) {
        let psi_sum = digamma(src.sum());
        row -= psi_sum;
    }
    out
}

pub fn exp_dirichlet_expectation(alpha: ArrayView1<f64>) -> Array1<f64> {
    dirichlet_expectation(alpha).mapv_into(f64::exp)
}

pub fn exp_dirichlet_expectation_rows(alpha: ArrayView2<f64>) -> Array2<f64> {
    dirichlet_expectation_rows(alpha).mapv_into(f64::exp)
}

/// Mean absolute difference between two equally shaped matrices.
pub fn mean_abs_change(a: ArrayView2<f64>, b: ArrayView2<f64>) -> f64 {
    if a.is_empty() {
        return 0.0;
    }
    let mut total = 0.0;
    Zip::from(a).and(b).for_each(|x, y| total += (x - y).abs());
    total / a.len() as f64
}

/// One Newton step on the Dirichlet prior `prior`, given the mean expected
/// log-probabilities `logphat` over `n` observations.
///
/// The Hessian is diagonal plus a rank-one term, so the step is solved in
/// linear time (Minka, "Estimating a Dirichlet distribution"). Returns `None`
/// when the damped step would leave the positive orthant; the caller keeps the
/// old prior in that case.
pub fn update_dir_prior(
    prior: ArrayView1<f64>,
    n: f64,
    logphat: ArrayView1<f64>,
    rho: f64,
) -> Option<Array1<f64>> {
    let psi_sum = digamma(prior.sum());
    let gradf = Zip::from(prior)
        .and(logphat)
        .map_collect(|&p, &lp| n * (psi_sum - digamma(p) + lp));
    let c = n * trigamma(prior.sum());
    let q = prior.mapv(|p| -n * trigamma(p));

    let b = (&gradf / &q).sum() / (1.0 / c + q.mapv(|v| 1.0 / v).sum());
    let dprior = (&gradf - b) / &q * -1.0;

    let updated = &prior + &(dprior * rho);
    if updated.iter().all(|&v| v > 0.0 && v.is_finite()) {
        Some(updated)
    } else {
        None
    }
}
