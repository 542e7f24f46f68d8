//! Variational Gaussian process models.
//!
//! Both models approximate the posterior of the inducing values `u` with a
//! Gaussian `q(u) = N(q_mu, q_sqrt q_sqrt^T)` and predict through the
//! Gaussian conditional of `f` given `u` (see `conditional`):
//!
//! * [`SparseVariationalGaussianProcess`] (SVGP, Hensman et al. 2013) uses `M`
//!   inducing points, optionally whitened, with full or diagonal `q_sqrt`,
//! * [`VariationalGaussianProcess`] (VGP) places one inducing point on each
//!   training input, always whitened.
//!
//! Variational parameters start at the prior (`q_mu = 0`, `q_sqrt = I`)
//! and are set by the caller, no ELBO maximization happens here.

use crate::conditional::{conditional, conditional_full_cov, gauss_kl, QSqrt};
use crate::errors::{GpError, Result};
use crate::hyperparameters::Hyperparameter;
use crate::kernels::Kernel;
use crate::likelihoods::Gaussian;
use crate::predictor::{GpPredictor, SamplingMethod};
use crate::sparse_algorithm::resolve_inducings;
use crate::sparse_parameters::Inducings;
use crate::utils::{check_ncols, check_training_data, cholesky_with_nugget};
use crate::variational_parameters::{SvgpParams, SvgpValidParams, VgpParams, VgpValidParams};
use linfa::prelude::{DatasetBase, Fit, Float};
use log::debug;
use ndarray::{Array2, Array3, ArrayBase, ArrayView2, Data, Ix2};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Check `q_mu` is a (m, p) matrix
fn check_q_mu<F: Float>(q_mu: &Array2<F>, m: usize, p: usize) -> Result<()> {
    if q_mu.dim() != (m, p) {
        return Err(GpError::DimensionError(format!(
            "q_mu should be ({m}, {p}), got {:?}",
            q_mu.dim()
        )));
    }
    Ok(())
}

/// Stochastic variational GP (SVGP)
///
/// # Example
///
/// ```rust
/// use gaussbox_gp::{SparseVariationalGaussianProcess, Inducings, GpPredictor, kernels::Matern52};
/// use linfa::prelude::*;
/// use ndarray::{array, Array2};
///
/// let xt = Array2::from_shape_fn((20, 1), |(i, _)| i as f64 / 4.);
/// let yt = xt.mapv(f64::cos);
///
/// let mut svgp = SparseVariationalGaussianProcess::params(
///         Matern52::default(),
///         Inducings::Located(array![[0.], [2.], [4.]]),
///     )
///     .whiten(false)
///     .q_diag(true)
///     .fit(&Dataset::new(xt, yt))
///     .expect("SVGP built");
/// svgp.set_q_mu(array![[1.], [0.], [-1.]]).expect("valid q_mu");
///
/// let (mean, cov) = svgp.predict_f_full_cov(&array![[1.], [3.]].view()).expect("SVGP prediction");
/// assert_eq!(cov.dim(), (1, 2, 2));
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(
        serialize = "F: Serialize, K: Serialize",
        deserialize = "F: Deserialize<'de>, K: Deserialize<'de>"
    ))
)]
pub struct SparseVariationalGaussianProcess<F: Float, K: Kernel<F>> {
    /// Parameters used to build this model
    params: SvgpValidParams<F, K>,
    /// Inducing points (M, nx)
    inducings: Array2<F>,
    /// Variational mean (M, P)
    q_mu: Array2<F>,
    /// Variational covariance square root
    q_sqrt: QSqrt<F>,
}

impl<F: Float, K: Kernel<F>> fmt::Display for SparseVariationalGaussianProcess<F, K> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "SVGP(kernel={}, likelihood={}, inducings={}, whiten={}, q_diag={})",
            self.params.gp_params.kernel,
            self.params.gp_params.likelihood,
            self.inducings.nrows(),
            self.params.whiten,
            self.q_sqrt.is_diag()
        )
    }
}

impl<F: Float, K: Kernel<F>> SparseVariationalGaussianProcess<F, K> {
    /// SVGP parameters contructor
    pub fn params(kernel: K, inducings: Inducings<F>) -> SvgpParams<F, K> {
        SvgpParams::new(kernel, inducings)
    }

    /// Kernel
    pub fn kernel(&self) -> &K {
        &self.params.gp_params.kernel
    }

    /// Mutable kernel
    pub fn kernel_mut(&mut self) -> &mut K {
        &mut self.params.gp_params.kernel
    }

    /// Inducing points
    pub fn inducings(&self) -> &Array2<F> {
        &self.inducings
    }

    /// Whether inducing values are whitened
    pub fn whiten(&self) -> bool {
        self.params.whiten
    }

    /// Variational mean (M, P)
    pub fn q_mu(&self) -> &Array2<F> {
        &self.q_mu
    }

    /// Variational covariance square root
    pub fn q_sqrt(&self) -> &QSqrt<F> {
        &self.q_sqrt
    }

    /// Set the variational mean, a (M, P) matrix
    pub fn set_q_mu(&mut self, q_mu: Array2<F>) -> Result<()> {
        check_q_mu(&q_mu, self.q_mu.nrows(), self.q_mu.ncols())?;
        self.q_mu = q_mu;
        Ok(())
    }

    /// Set the variational covariance square root, (M, P) diagonal or (P, M, M) full factors
    pub fn set_q_sqrt(&mut self, q_sqrt: QSqrt<F>) -> Result<()> {
        q_sqrt.check_shape(self.q_mu.nrows(), self.q_mu.ncols())?;
        self.q_sqrt = q_sqrt;
        Ok(())
    }

    /// KL divergence between the variational distribution and the prior of inducing values
    pub fn prior_kl(&self) -> Result<F> {
        if self.params.whiten {
            gauss_kl(&self.q_mu, &self.q_sqrt, None)
        } else {
            let kernel = &self.params.gp_params.kernel;
            let lk = cholesky_with_nugget(&kernel.k(&self.inducings), self.params.gp_params.nugget)?;
            gauss_kl(&self.q_mu, &self.q_sqrt, Some(&lk))
        }
    }

    /// Evidence lower bound on the given data, without minibatch scaling
    pub fn elbo(&self, x: &ArrayView2<F>, y: &ArrayView2<F>) -> Result<F> {
        let (mean, var) = self.predict_f(x)?;
        if y.dim() != mean.dim() {
            return Err(GpError::DimensionError(format!(
                "targets should be {:?}, got {:?}",
                mean.dim(),
                y.dim()
            )));
        }
        let ve = self
            .params
            .gp_params
            .likelihood
            .variational_expectations(&mean, &var, y);
        Ok(ve.sum() - self.prior_kl()?)
    }
}

impl<F: Float, K: Kernel<F>> GpPredictor<F> for SparseVariationalGaussianProcess<F, K> {
    fn input_dim(&self) -> usize {
        self.inducings.ncols()
    }

    fn output_dim(&self) -> usize {
        self.q_mu.ncols()
    }

    fn predict_f(&self, x: &ArrayView2<F>) -> Result<(Array2<F>, Array2<F>)> {
        check_ncols("x", x, self.inducings.ncols())?;
        conditional(
            &self.params.gp_params.kernel,
            &self.inducings,
            x,
            &self.q_mu,
            Some(&self.q_sqrt),
            self.params.whiten,
            self.params.gp_params.nugget,
        )
    }

    fn predict_f_full_cov(&self, x: &ArrayView2<F>) -> Result<(Array2<F>, Array3<F>)> {
        check_ncols("x", x, self.inducings.ncols())?;
        conditional_full_cov(
            &self.params.gp_params.kernel,
            &self.inducings,
            x,
            &self.q_mu,
            Some(&self.q_sqrt),
            self.params.whiten,
            self.params.gp_params.nugget,
        )
    }

    fn likelihood(&self) -> &Gaussian<F> {
        &self.params.gp_params.likelihood
    }

    fn likelihood_mut(&mut self) -> &mut Gaussian<F> {
        &mut self.params.gp_params.likelihood
    }

    fn parameters(&self) -> Vec<(String, &Hyperparameter<F>)> {
        self.params.gp_params.named_parameters()
    }

    fn parameters_mut(&mut self) -> Vec<(String, &mut Hyperparameter<F>)> {
        self.params.gp_params.named_parameters_mut()
    }

    fn nugget(&self) -> F {
        self.params.gp_params.nugget
    }

    fn seed(&self) -> Option<u64> {
        self.params.gp_params.seed
    }

    fn sampling_method(&self) -> SamplingMethod {
        self.params.gp_params.sampling_method
    }
}

impl<F: Float, K: Kernel<F>, D: Data<Elem = F>>
    Fit<ArrayBase<D, Ix2>, ArrayBase<D, Ix2>, GpError> for SvgpValidParams<F, K>
{
    type Object = SparseVariationalGaussianProcess<F, K>;

    /// Build the SVGP at its prior: training inputs only serve to pick
    /// inducing points and targets to set the number of outputs.
    fn fit(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, ArrayBase<D, Ix2>>,
    ) -> Result<Self::Object> {
        let x = dataset.records();
        let y = dataset.targets();
        check_training_data(x, y)?;
        self.gp_params.kernel.check_input_dim(x.ncols())?;
        let inducings = resolve_inducings(&self.z, &x.view(), self.gp_params.seed)?;
        let (m, p) = (inducings.nrows(), y.ncols());
        debug!(
            "SVGP built with {m} inducing points, {p} outputs (whiten={}, q_diag={})",
            self.whiten, self.q_diag
        );
        Ok(SparseVariationalGaussianProcess {
            params: self.clone(),
            inducings,
            q_mu: Array2::zeros((m, p)),
            q_sqrt: QSqrt::identity(m, p, self.q_diag),
        })
    }
}

/// Variational GP (VGP) with whitened inducing values on the training inputs
///
/// The variational covariance square root is full: `(P, N, N)`.
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(
        serialize = "F: Serialize, K: Serialize",
        deserialize = "F: Deserialize<'de>, K: Deserialize<'de>"
    ))
)]
pub struct VariationalGaussianProcess<F: Float, K: Kernel<F>> {
    /// Parameters used to build this model
    params: VgpValidParams<F, K>,
    /// Training inputs
    xt: Array2<F>,
    /// Training outputs
    yt: Array2<F>,
    /// Variational mean (N, P)
    q_mu: Array2<F>,
    /// Variational covariance square root (P, N, N)
    q_sqrt: QSqrt<F>,
}

impl<F: Float, K: Kernel<F>> fmt::Display for VariationalGaussianProcess<F, K> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "VGP(kernel={}, likelihood={})",
            self.params.gp_params.kernel, self.params.gp_params.likelihood
        )
    }
}

impl<F: Float, K: Kernel<F>> VariationalGaussianProcess<F, K> {
    /// VGP parameters contructor
    pub fn params(kernel: K) -> VgpParams<F, K> {
        VgpParams::new(kernel)
    }

    /// Kernel
    pub fn kernel(&self) -> &K {
        &self.params.gp_params.kernel
    }

    /// Mutable kernel
    pub fn kernel_mut(&mut self) -> &mut K {
        &mut self.params.gp_params.kernel
    }

    /// Training data (inputs, outputs)
    pub fn training_data(&self) -> (&Array2<F>, &Array2<F>) {
        (&self.xt, &self.yt)
    }

    /// Variational mean (N, P)
    pub fn q_mu(&self) -> &Array2<F> {
        &self.q_mu
    }

    /// Variational covariance square root
    pub fn q_sqrt(&self) -> &QSqrt<F> {
        &self.q_sqrt
    }

    /// Set the variational mean, a (N, P) matrix
    pub fn set_q_mu(&mut self, q_mu: Array2<F>) -> Result<()> {
        check_q_mu(&q_mu, self.yt.nrows(), self.yt.ncols())?;
        self.q_mu = q_mu;
        Ok(())
    }

    /// Set the variational covariance square root
    pub fn set_q_sqrt(&mut self, q_sqrt: QSqrt<F>) -> Result<()> {
        q_sqrt.check_shape(self.yt.nrows(), self.yt.ncols())?;
        self.q_sqrt = q_sqrt;
        Ok(())
    }

    /// KL divergence between the variational distribution and the whitened prior
    pub fn prior_kl(&self) -> Result<F> {
        gauss_kl(&self.q_mu, &self.q_sqrt, None)
    }

    /// Evidence lower bound on the training data
    pub fn elbo(&self) -> Result<F> {
        let (mean, var) = self.predict_f(&self.xt.view())?;
        let ve = self
            .params
            .gp_params
            .likelihood
            .variational_expectations(&mean, &var, &self.yt);
        Ok(ve.sum() - self.prior_kl()?)
    }
}

impl<F: Float, K: Kernel<F>> GpPredictor<F> for VariationalGaussianProcess<F, K> {
    fn input_dim(&self) -> usize {
        self.xt.ncols()
    }

    fn output_dim(&self) -> usize {
        self.yt.ncols()
    }

    fn predict_f(&self, x: &ArrayView2<F>) -> Result<(Array2<F>, Array2<F>)> {
        check_ncols("x", x, self.xt.ncols())?;
        conditional(
            &self.params.gp_params.kernel,
            &self.xt,
            x,
            &self.q_mu,
            Some(&self.q_sqrt),
            true,
            self.params.gp_params.nugget,
        )
    }

    fn predict_f_full_cov(&self, x: &ArrayView2<F>) -> Result<(Array2<F>, Array3<F>)> {
        check_ncols("x", x, self.xt.ncols())?;
        conditional_full_cov(
            &self.params.gp_params.kernel,
            &self.xt,
            x,
            &self.q_mu,
            Some(&self.q_sqrt),
            true,
            self.params.gp_params.nugget,
        )
    }

    fn likelihood(&self) -> &Gaussian<F> {
        &self.params.gp_params.likelihood
    }

    fn likelihood_mut(&mut self) -> &mut Gaussian<F> {
        &mut self.params.gp_params.likelihood
    }

    fn parameters(&self) -> Vec<(String, &Hyperparameter<F>)> {
        self.params.gp_params.named_parameters()
    }

    fn parameters_mut(&mut self) -> Vec<(String, &mut Hyperparameter<F>)> {
        self.params.gp_params.named_parameters_mut()
    }

    fn nugget(&self) -> F {
        self.params.gp_params.nugget
    }

    fn seed(&self) -> Option<u64> {
        self.params.gp_params.seed
    }

    fn sampling_method(&self) -> SamplingMethod {
        self.params.gp_params.sampling_method
    }
}

impl<F: Float, K: Kernel<F>, D: Data<Elem = F>>
    Fit<ArrayBase<D, Ix2>, ArrayBase<D, Ix2>, GpError> for VgpValidParams<F, K>
{
    type Object = VariationalGaussianProcess<F, K>;

    /// Build the VGP at its prior on the training dataset.
    fn fit(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, ArrayBase<D, Ix2>>,
    ) -> Result<Self::Object> {
        let x = dataset.records();
        let y = dataset.targets();
        check_training_data(x, y)?;
        self.gp_params.kernel.check_input_dim(x.ncols())?;
        let (n, p) = y.dim();
        debug!("VGP built on {n} points, {p} outputs");
        Ok(VariationalGaussianProcess {
            params: self.clone(),
            xt: x.to_owned(),
            yt: y.to_owned(),
            q_mu: Array2::zeros((n, p)),
            q_sqrt: QSqrt::identity(n, p, false),
        })
    }
}
