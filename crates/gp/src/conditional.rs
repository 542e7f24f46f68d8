//! Gaussian conditionals of the latent functions given inducing variables.
//!
//! Given inducing inputs `Z`, inducing values `u = f(Z)` described by a mean `q_mu`
//! (or latent values) and an optional square root `q_sqrt` of their covariance,
//! the functions here compute the predictive distribution of `f(X)`:
//!
//! ```text
//! Lm = chol(Kmm),  W = Lm^-1 Kmn
//! A = W when whitened, A = Lm^-T W otherwise
//! mean = A^T q_mu
//! cov  = Knn - W^T W + (L^T A)^T (L^T A)
//! ```
//! where `L` is the lower triangular `q_sqrt` of a given output.

use crate::errors::{GpError, Result};
use crate::kernels::Kernel;
use crate::utils::{cholesky_with_nugget, solve_lower, solve_lower_t, sum_squares_axis0, tril};
use linfa::Float;
use ndarray::{Array2, Array3, ArrayBase, ArrayView2, Axis, Data, Ix2};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Square root of the covariance of the inducing values, one factor per output
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(serialize = "F: Serialize", deserialize = "F: Deserialize<'de>"))
)]
pub enum QSqrt<F: Float> {
    /// Diagonal factors stored column-wise (M, P)
    Diag(Array2<F>),
    /// Lower triangular factors (P, M, M), upper parts are ignored
    Full(Array3<F>),
}

impl<F: Float> QSqrt<F> {
    /// Identity factors for `m` inducing values and `p` outputs
    pub fn identity(m: usize, p: usize, diag: bool) -> Self {
        if diag {
            QSqrt::Diag(Array2::ones((m, p)))
        } else {
            let mut full = Array3::zeros((p, m, m));
            for mut l in full.outer_iter_mut() {
                l.diag_mut().fill(F::one());
            }
            QSqrt::Full(full)
        }
    }

    /// Whether factors are diagonal
    pub fn is_diag(&self) -> bool {
        matches!(self, QSqrt::Diag(_))
    }

    /// Check factors shape against `m` inducing values and `p` outputs
    pub fn check_shape(&self, m: usize, p: usize) -> Result<()> {
        let ok = match self {
            QSqrt::Diag(d) => d.dim() == (m, p),
            QSqrt::Full(l) => l.dim() == (p, m, m),
        };
        if ok {
            Ok(())
        } else {
            let (got, expected) = match self {
                QSqrt::Diag(d) => (format!("{:?}", d.dim()), format!("({m}, {p})")),
                QSqrt::Full(l) => (format!("{:?}", l.dim()), format!("({p}, {m}, {m})")),
            };
            Err(GpError::DimensionError(format!(
                "q_sqrt should be {expected}, got {got}"
            )))
        }
    }

    /// Lower triangular factor of output `p`
    pub(crate) fn lower(&self, p: usize) -> Array2<F> {
        match self {
            QSqrt::Diag(d) => Array2::from_diag(&d.column(p)),
            QSqrt::Full(l) => tril(&l.index_axis(Axis(0), p)),
        }
    }

    /// `L^T A` for output `p`
    fn lt_dot(&self, p: usize, a: &Array2<F>) -> Array2<F> {
        match self {
            QSqrt::Diag(d) => a * &d.column(p).insert_axis(Axis(1)),
            QSqrt::Full(l) => tril(&l.index_axis(Axis(0), p)).t().dot(a),
        }
    }
}

/// Projections `(W, A)` of `x` on inducing inputs `z`, both (M, n).
///
/// `W = Lm^-1 Kmn` gives the prior term `Knm Kmm^-1 Kmn = W^T W`, `A` maps the
/// inducing values to `f(x)`.
fn projection<F: Float, K: Kernel<F>>(
    kernel: &K,
    z: &ArrayBase<impl Data<Elem = F>, Ix2>,
    x: &ArrayView2<F>,
    white: bool,
    nugget: F,
) -> Result<(Array2<F>, Array2<F>)> {
    let lm = cholesky_with_nugget(&kernel.k(z), nugget)?;
    let kmn = kernel.k_cross(z, x);
    let a_white = solve_lower(&lm, &kmn)?;
    let a = if white {
        a_white.clone()
    } else {
        solve_lower_t(&lm, &a_white)?
    };
    Ok((a_white, a))
}

/// Conditional mean (n, P) and marginal variance (n, P) of `f(x)`
pub(crate) fn conditional<F: Float, K: Kernel<F>>(
    kernel: &K,
    z: &ArrayBase<impl Data<Elem = F>, Ix2>,
    x: &ArrayView2<F>,
    f: &Array2<F>,
    q_sqrt: Option<&QSqrt<F>>,
    white: bool,
    nugget: F,
) -> Result<(Array2<F>, Array2<F>)> {
    let (a_white, a) = projection(kernel, z, x, white, nugget)?;
    let mean = a.t().dot(f);
    let base = kernel.k_diag(x) - sum_squares_axis0(&a_white);
    let mut var = Array2::zeros((x.nrows(), f.ncols()));
    for (p, mut var_p) in var.columns_mut().into_iter().enumerate() {
        var_p.assign(&base);
        if let Some(q_sqrt) = q_sqrt {
            var_p += &sum_squares_axis0(&q_sqrt.lt_dot(p, &a));
        }
    }
    Ok((mean, var))
}

/// Conditional mean (n, P) and full covariance (P, n, n) of `f(x)`
pub(crate) fn conditional_full_cov<F: Float, K: Kernel<F>>(
    kernel: &K,
    z: &ArrayBase<impl Data<Elem = F>, Ix2>,
    x: &ArrayView2<F>,
    f: &Array2<F>,
    q_sqrt: Option<&QSqrt<F>>,
    white: bool,
    nugget: F,
) -> Result<(Array2<F>, Array3<F>)> {
    let (a_white, a) = projection(kernel, z, x, white, nugget)?;
    let mean = a.t().dot(f);
    let base = kernel.k(x) - a_white.t().dot(&a_white);
    let n = x.nrows();
    let mut cov = Array3::zeros((f.ncols(), n, n));
    for (p, mut cov_p) in cov.outer_iter_mut().enumerate() {
        cov_p.assign(&base);
        if let Some(q_sqrt) = q_sqrt {
            let lta = q_sqrt.lt_dot(p, &a);
            cov_p += &lta.t().dot(&lta);
        }
    }
    Ok((mean, cov))
}

/// KL divergence `KL[q(u) || p(u)]` summed over outputs, with `q(u) = N(q_mu, L L^T)`
/// and `p(u) = N(0, I)` when whitened, `N(0, Kmm)` otherwise.
pub(crate) fn gauss_kl<F: Float>(
    q_mu: &Array2<F>,
    q_sqrt: &QSqrt<F>,
    kmm_chol: Option<&Array2<F>>,
) -> Result<F> {
    let (m, n_out) = q_mu.dim();
    let two = F::cast(2.);
    let mut kl = F::zero();
    for p in 0..n_out {
        let l = q_sqrt.lower(p);
        let mu = q_mu.column(p).insert_axis(Axis(1)).to_owned();
        let log_det_s = two * l.diag().mapv(|v| v.abs().ln()).sum();
        let (trace, mahalanobis, log_det_k) = match kmm_chol {
            None => (
                l.mapv(|v| v * v).sum(),
                mu.mapv(|v| v * v).sum(),
                F::zero(),
            ),
            Some(lk) => {
                let lk_inv_l = solve_lower(lk, &l)?;
                let lk_inv_mu = solve_lower(lk, &mu)?;
                (
                    lk_inv_l.mapv(|v| v * v).sum(),
                    lk_inv_mu.mapv(|v| v * v).sum(),
                    two * lk.diag().mapv(|v| v.ln()).sum(),
                )
            }
        };
        kl += F::cast(0.5) * (trace + mahalanobis - F::cast(m) + log_det_k - log_det_s);
    }
    Ok(kl)
}
