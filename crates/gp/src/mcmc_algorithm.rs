//! Gaussian process models with sampled latent values.
//!
//! Latent functions are parameterized by whitened values `V ~ N(0, I)`:
//! `f(X) = L V` with `L = chol(K(X, X))` for [`MonteCarloGaussianProcess`] (GPMC),
//! and `u = f(Z) = Lm V` at inducing points for [`SparseMonteCarloGaussianProcess`] (SGPMC).
//! A sampler would move `V` and the hyperparameters along a chain; predictions
//! here are made for the current state, set with `set_latent`.

use crate::conditional::{conditional, conditional_full_cov};
use crate::errors::{GpError, Result};
use crate::hyperparameters::Hyperparameter;
use crate::kernels::Kernel;
use crate::likelihoods::{gaussian_log_density, Gaussian};
use crate::mcmc_parameters::{GpmcParams, GpmcValidParams, SgpmcParams, SgpmcValidParams};
use crate::predictor::{GpPredictor, SamplingMethod};
use crate::sparse_algorithm::resolve_inducings;
use crate::sparse_parameters::Inducings;
use crate::utils::{check_ncols, check_training_data, cholesky_with_nugget};
use linfa::prelude::{DatasetBase, Fit, Float};
use log::debug;
use ndarray::{Array2, Array3, ArrayBase, ArrayView2, Data, Ix2};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Check latent values are a (m, p) matrix
fn check_latent<F: Float>(v: &Array2<F>, m: usize, p: usize) -> Result<()> {
    if v.dim() != (m, p) {
        return Err(GpError::DimensionError(format!(
            "latent values should be ({m}, {p}), got {:?}",
            v.dim()
        )));
    }
    Ok(())
}

/// `sum log N(v | 0, 1)`
fn log_prior_density<F: Float>(v: &Array2<F>) -> F {
    let zeros = Array2::zeros(v.raw_dim());
    let ones = Array2::ones(v.raw_dim());
    gaussian_log_density(&zeros, &ones, v).sum()
}

/// Monte-Carlo GP (GPMC) with whitened latent values on the training inputs
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(
        serialize = "F: Serialize, K: Serialize",
        deserialize = "F: Deserialize<'de>, K: Deserialize<'de>"
    ))
)]
pub struct MonteCarloGaussianProcess<F: Float, K: Kernel<F>> {
    /// Parameters used to build this model
    params: GpmcValidParams<F, K>,
    /// Training inputs
    xt: Array2<F>,
    /// Training outputs
    yt: Array2<F>,
    /// Whitened latent values (N, P)
    v: Array2<F>,
}

impl<F: Float, K: Kernel<F>> fmt::Display for MonteCarloGaussianProcess<F, K> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "GPMC(kernel={}, likelihood={})",
            self.params.gp_params.kernel, self.params.gp_params.likelihood
        )
    }
}

impl<F: Float, K: Kernel<F>> MonteCarloGaussianProcess<F, K> {
    /// GPMC parameters contructor
    pub fn params(kernel: K) -> GpmcParams<F, K> {
        GpmcParams::new(kernel)
    }

    /// Kernel
    pub fn kernel(&self) -> &K {
        &self.params.gp_params.kernel
    }

    /// Mutable kernel
    pub fn kernel_mut(&mut self) -> &mut K {
        &mut self.params.gp_params.kernel
    }

    /// Whitened latent values (N, P)
    pub fn latent(&self) -> &Array2<F> {
        &self.v
    }

    /// Set whitened latent values, a (N, P) matrix
    pub fn set_latent(&mut self, v: Array2<F>) -> Result<()> {
        check_latent(&v, self.yt.nrows(), self.yt.ncols())?;
        self.v = v;
        Ok(())
    }

    /// Latent function values at the training inputs `F = L V`
    pub fn latent_function(&self) -> Result<Array2<F>> {
        let kernel = &self.params.gp_params.kernel;
        let l = cholesky_with_nugget(&kernel.k(&self.xt), self.params.gp_params.nugget)?;
        Ok(l.dot(&self.v))
    }

    /// Unnormalized log posterior density of the current latent values
    ///
    /// `log p(Y | F = L V) + log p(V)`
    pub fn log_posterior_density(&self) -> Result<F> {
        let f = self.latent_function()?;
        let log_lik = self
            .params
            .gp_params
            .likelihood
            .predict_log_density(&f, &Array2::zeros(f.raw_dim()), &self.yt)
            .sum();
        Ok(log_lik + log_prior_density(&self.v))
    }
}

impl<F: Float, K: Kernel<F>> GpPredictor<F> for MonteCarloGaussianProcess<F, K> {
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
            &self.v,
            None,
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
            &self.v,
            None,
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
    Fit<ArrayBase<D, Ix2>, ArrayBase<D, Ix2>, GpError> for GpmcValidParams<F, K>
{
    type Object = MonteCarloGaussianProcess<F, K>;

    /// Build the GPMC with latent values at the prior mean.
    fn fit(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, ArrayBase<D, Ix2>>,
    ) -> Result<Self::Object> {
        let x = dataset.records();
        let y = dataset.targets();
        check_training_data(x, y)?;
        self.gp_params.kernel.check_input_dim(x.ncols())?;
        debug!("GPMC built on {} points, {} outputs", x.nrows(), y.ncols());
        Ok(MonteCarloGaussianProcess {
            params: self.clone(),
            xt: x.to_owned(),
            yt: y.to_owned(),
            v: Array2::zeros(y.raw_dim()),
        })
    }
}

/// Sparse Monte-Carlo GP (SGPMC) with whitened latent values at inducing points
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(
        serialize = "F: Serialize, K: Serialize",
        deserialize = "F: Deserialize<'de>, K: Deserialize<'de>"
    ))
)]
pub struct SparseMonteCarloGaussianProcess<F: Float, K: Kernel<F>> {
    /// Parameters used to build this model
    params: SgpmcValidParams<F, K>,
    /// Training inputs
    xt: Array2<F>,
    /// Training outputs
    yt: Array2<F>,
    /// Inducing points (M, nx)
    inducings: Array2<F>,
    /// Whitened latent values (M, P)
    v: Array2<F>,
}

impl<F: Float, K: Kernel<F>> fmt::Display for SparseMonteCarloGaussianProcess<F, K> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "SGPMC(kernel={}, likelihood={}, inducings={})",
            self.params.gp_params.kernel,
            self.params.gp_params.likelihood,
            self.inducings.nrows()
        )
    }
}

impl<F: Float, K: Kernel<F>> SparseMonteCarloGaussianProcess<F, K> {
    /// SGPMC parameters contructor
    pub fn params(kernel: K, inducings: Inducings<F>) -> SgpmcParams<F, K> {
        SgpmcParams::new(kernel, inducings)
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

    /// Whitened latent values (M, P)
    pub fn latent(&self) -> &Array2<F> {
        &self.v
    }

    /// Set whitened latent values, a (M, P) matrix
    pub fn set_latent(&mut self, v: Array2<F>) -> Result<()> {
        check_latent(&v, self.inducings.nrows(), self.yt.ncols())?;
        self.v = v;
        Ok(())
    }

    /// Unnormalized log posterior density of the current latent values
    ///
    /// `E_{p(f | V)}[log p(Y | f)] + log p(V)`
    pub fn log_posterior_density(&self) -> Result<F> {
        let (mean, var) = self.predict_f(&self.xt.view())?;
        let ve = self
            .params
            .gp_params
            .likelihood
            .variational_expectations(&mean, &var, &self.yt)
            .sum();
        Ok(ve + log_prior_density(&self.v))
    }
}

impl<F: Float, K: Kernel<F>> GpPredictor<F> for SparseMonteCarloGaussianProcess<F, K> {
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
            &self.inducings,
            x,
            &self.v,
            None,
            true,
            self.params.gp_params.nugget,
        )
    }

    fn predict_f_full_cov(&self, x: &ArrayView2<F>) -> Result<(Array2<F>, Array3<F>)> {
        check_ncols("x", x, self.xt.ncols())?;
        conditional_full_cov(
            &self.params.gp_params.kernel,
            &self.inducings,
            x,
            &self.v,
            None,
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
    Fit<ArrayBase<D, Ix2>, ArrayBase<D, Ix2>, GpError> for SgpmcValidParams<F, K>
{
    type Object = SparseMonteCarloGaussianProcess<F, K>;

    /// Build the SGPMC with latent values at the prior mean.
    fn fit(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, ArrayBase<D, Ix2>>,
    ) -> Result<Self::Object> {
        let x = dataset.records();
        let y = dataset.targets();
        check_training_data(x, y)?;
        self.gp_params.kernel.check_input_dim(x.ncols())?;
        let inducings = resolve_inducings(&self.z, &x.view(), self.gp_params.seed)?;
        debug!(
            "SGPMC built on {} points with {} inducing points",
            x.nrows(),
            inducings.nrows()
        );
        let v = Array2::zeros((inducings.nrows(), y.ncols()));
        Ok(SparseMonteCarloGaussianProcess {
            params: self.clone(),
            xt: x.to_owned(),
            yt: y.to_owned(),
            inducings,
            v,
        })
    }
}
