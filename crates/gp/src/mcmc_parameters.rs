use crate::errors::{GpError, Result};
use crate::kernels::Kernel;
use crate::likelihoods::Gaussian;
use crate::parameters::GpValidParams;
use crate::predictor::SamplingMethod;
use crate::sparse_parameters::Inducings;
use linfa::{Float, ParamGuard};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// A set of validated GPMC parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(
        serialize = "F: Serialize, K: Serialize",
        deserialize = "F: Deserialize<'de>, K: Deserialize<'de>"
    ))
)]
pub struct GpmcValidParams<F: Float, K: Kernel<F>> {
    /// gp
    pub(crate) gp_params: GpValidParams<F, K>,
}

impl<F: Float, K: Kernel<F>> GpmcValidParams<F, K> {
    /// Get kernel k(x, x')
    pub fn kernel(&self) -> &K {
        &self.gp_params.kernel
    }

    /// Get likelihood
    pub fn likelihood(&self) -> &Gaussian<F> {
        &self.gp_params.likelihood
    }
}

#[derive(Clone, Debug)]
/// The set of hyperparameters that can be specified for the execution of
/// the [GPMC algorithm](struct.MonteCarloGaussianProcess.html).
pub struct GpmcParams<F: Float, K: Kernel<F>>(GpmcValidParams<F, K>);

impl<F: Float, K: Kernel<F>> GpmcParams<F, K> {
    /// A constructor for GPMC parameters given a kernel
    pub fn new(kernel: K) -> GpmcParams<F, K> {
        Self(GpmcValidParams {
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

impl<F: Float, K: Kernel<F>> ParamGuard for GpmcParams<F, K> {
    type Checked = GpmcValidParams<F, K>;
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

/// A set of validated SGPMC parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(
        serialize = "F: Serialize, K: Serialize",
        deserialize = "F: Deserialize<'de>, K: Deserialize<'de>"
    ))
)]
pub struct SgpmcValidParams<F: Float, K: Kernel<F>> {
    /// gp
    pub(crate) gp_params: GpValidParams<F, K>,
    /// Inducing points
    pub(crate) z: Inducings<F>,
}

impl<F: Float, K: Kernel<F>> SgpmcValidParams<F, K> {
    /// Get kernel k(x, x')
    pub fn kernel(&self) -> &K {
        &self.gp_params.kernel
    }

    /// Get likelihood
    pub fn likelihood(&self) -> &Gaussian<F> {
        &self.gp_params.likelihood
    }

    /// Get inducing points
    pub fn inducings(&self) -> &Inducings<F> {
        &self.z
    }
}

#[derive(Clone, Debug)]
/// The set of hyperparameters that can be specified for the execution of
/// the [SGPMC algorithm](struct.SparseMonteCarloGaussianProcess.html).
pub struct SgpmcParams<F: Float, K: Kernel<F>>(SgpmcValidParams<F, K>);

impl<F: Float, K: Kernel<F>> SgpmcParams<F, K> {
    /// A constructor for SGPMC parameters given a kernel and inducing points
    pub fn new(kernel: K, inducings: Inducings<F>) -> SgpmcParams<F, K> {
        Self(SgpmcValidParams {
            gp_params: GpValidParams::new(kernel),
            z: inducings,
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

impl<F: Float, K: Kernel<F>> ParamGuard for SgpmcParams<F, K> {
    type Checked = SgpmcValidParams<F, K>;
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
