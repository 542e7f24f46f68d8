use crate::errors::{GpError, Result};
use crate::kernels::Kernel;
use crate::likelihoods::Gaussian;
use crate::parameters::GpValidParams;
use crate::predictor::SamplingMethod;
use crate::sparse_parameters::Inducings;
use linfa::{Float, ParamGuard};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// A set of validated SVGP parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(
        serialize = "F: Serialize, K: Serialize",
        deserialize = "F: Deserialize<'de>, K: Deserialize<'de>"
    ))
)]
pub struct SvgpValidParams<F: Float, K: Kernel<F>> {
    /// gp
    pub(crate) gp_params: GpValidParams<F, K>,
    /// Inducing points
    pub(crate) z: Inducings<F>,
    /// Whether inducing values are whitened by the prior Cholesky factor
    pub(crate) whiten: bool,
    /// Whether the variational covariance is diagonal
    pub(crate) q_diag: bool,
}

impl<F: Float, K: Kernel<F>> SvgpValidParams<F, K> {
    /// Get kernel k(x, x')
    pub fn kernel(&self) -> &K {
        &self.gp_params.kernel
    }

    /// Get likelihood
    pub fn likelihood(&self) -> &Gaussian<F> {
        &self.gp_params.likelihood
    }

    /// Get nugget
    pub fn nugget(&self) -> F {
        self.gp_params.nugget
    }

    /// Get inducing points
    pub fn inducings(&self) -> &Inducings<F> {
        &self.z
    }

    /// Get whiten flag
    pub fn whiten(&self) -> bool {
        self.whiten
    }

    /// Get diagonal variational covariance flag
    pub fn q_diag(&self) -> bool {
        self.q_diag
    }
}

#[derive(Clone, Debug)]
/// The set of hyperparameters that can be specified for the execution of
/// the [SVGP algorithm](struct.SparseVariationalGaussianProcess.html).
pub struct SvgpParams<F: Float, K: Kernel<F>>(SvgpValidParams<F, K>);

impl<F: Float, K: Kernel<F>> SvgpParams<F, K> {
    /// A constructor for SVGP parameters given a kernel and inducing points
    ///
    /// Inducing values are whitened and their covariance is full by default.
    pub fn new(kernel: K, inducings: Inducings<F>) -> SvgpParams<F, K> {
        Self(SvgpValidParams {
            gp_params: GpValidParams::new(kernel),
            z: inducings,
            whiten: true,
            q_diag: false,
        })
    }

    /// Set kernel.
    pub fn kernel(mut self, kernel: K) -> Self {
        self.0.gp_params.kernel = kernel;
        self
    }

    /// Set likelihood.
    pub fn likelihood(mut self, likelihood: Gaussian<F>) -> Self {
        self.0.gp_params.likelihood = likelihood;
        self
    }

    /// Set nugget value.
    pub fn nugget(mut self, nugget: F) -> Self {
        self.0.gp_params.nugget = nugget;
        self
    }

    /// Set whitening of inducing values
    pub fn whiten(mut self, whiten: bool) -> Self {
        self.0.whiten = whiten;
        self
    }

    /// Use a diagonal variational covariance
    pub fn q_diag(mut self, q_diag: bool) -> Self {
        self.0.q_diag = q_diag;
        self
    }

    /// Set the random generator seed
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.0.gp_params.seed = seed;
        self
    }

    /// Set the sampling method
    pub fn sampling_method(mut self, method: SamplingMethod) -> Self {
        self.0.gp_params.sampling_method = method;
        self
    }
}

impl<F: Float, K: Kernel<F>> ParamGuard for SvgpParams<F, K> {
    type Checked = SvgpValidParams<F, K>;
    type Error = GpError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        self.0.gp_params.check_nugget()?;
        self.0.z.check()?;
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

/// A set of validated VGP parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(
        serialize = "F: Serialize, K: Serialize",
        deserialize = "F: Deserialize<'de>, K: Deserialize<'de>"
    ))
)]
pub struct VgpValidParams<F: Float, K: Kernel<F>> {
    /// gp
    pub(crate) gp_params: GpValidParams<F, K>,
}

impl<F: Float, K: Kernel<F>> VgpValidParams<F, K> {
    /// Get kernel k(x, x')
    pub fn kernel(&self) -> &K {
        &self.gp_params.kernel
    }

    /// Get likelihood
    pub fn likelihood(&self) -> &Gaussian<F> {
        &self.gp_params.likelihood
    }

    /// Get nugget
    pub fn nugget(&self) -> F {
        self.gp_params.nugget
    }
}

#[derive(Clone, Debug)]
/// The set of hyperparameters that can be specified for the execution of
/// the [VGP algorithm](struct.VariationalGaussianProcess.html).
pub struct VgpParams<F: Float, K: Kernel<F>>(VgpValidParams<F, K>);

impl<F: Float, K: Kernel<F>> VgpParams<F, K> {
    /// A constructor for VGP parameters given a kernel
    pub fn new(kernel: K) -> VgpParams<F, K> {
        Self(VgpValidParams {
            gp_params: GpValidParams::new(kernel),
        })
    }

    /// Set likelihood.
    pub fn likelihood(mut self, likelihood: Gaussian<F>) -> Self {
        self.0.gp_params.likelihood = likelihood;
        self
    }

    /// Set nugget value.
    pub fn nugget(mut self, nugget: F) -> Self {
        self.0.gp_params.nugget = nugget;
        self
    }

    /// Set the random generator seed
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.0.gp_params.seed = seed;
        self
    }

    /// Set the sampling method
    pub fn sampling_method(mut self, method: SamplingMethod) -> Self {
        self.0.gp_params.sampling_method = method;
        self
    }
}

impl<F: Float, K: Kernel<F>> ParamGuard for VgpParams<F, K> {
    type Checked = VgpValidParams<F, K>;
    type Error = GpError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        self.0.gp_params.check_nugget()?;
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
