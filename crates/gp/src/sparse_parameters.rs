use crate::errors::{GpError, Result};
use crate::kernels::Kernel;
use crate::likelihoods::Gaussian;
use crate::parameters::GpValidParams;
use crate::predictor::SamplingMethod;
use linfa::{Float, ParamGuard};
use ndarray::Array2;
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Inducing points specification
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
#[non_exhaustive]
pub enum Inducings<F: Float> {
    /// `usize` points are selected randomly in the training dataset
    Randomized(usize),
    /// Points are given as a (npoints, nx) matrix
    Located(Array2<F>),
}

impl<F: Float> Inducings<F> {
    /// Reject empty specifications
    pub(crate) fn check(&self) -> Result<()> {
        match self {
            Inducings::Randomized(0) => Err(GpError::InvalidValueError(
                "number of inducing points should be positive".to_string(),
            )),
            Inducings::Located(z) if z.nrows() == 0 => Err(GpError::MissingInducings(
                "inducing points matrix is empty".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// SGP algorithm method specification
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum SparseMethod {
    #[default]
    /// Fully Independent Training Conditional method
    Fitc,
    /// Variational Free Energy method (SGPR)
    Vfe,
}

/// A set of validated SGP parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(
        serialize = "F: Serialize, K: Serialize",
        deserialize = "F: Deserialize<'de>, K: Deserialize<'de>"
    ))
)]
pub struct SgpValidParams<F: Float, K: Kernel<F>> {
    /// gp
    pub(crate) gp_params: GpValidParams<F, K>,
    /// Inducing points
    pub(crate) z: Inducings<F>,
    /// Method
    pub(crate) method: SparseMethod,
}

impl<F: Float, K: Kernel<F>> SgpValidParams<F, K> {
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

    /// Get used sparse method
    pub fn method(&self) -> SparseMethod {
        self.method
    }

    /// Get inducing points
    pub fn inducings(&self) -> &Inducings<F> {
        &self.z
    }

    /// Get seed
    pub fn seed(&self) -> Option<&u64> {
        self.gp_params.seed.as_ref()
    }
}

#[derive(Clone, Debug)]
/// The set of hyperparameters that can be specified for the execution of
/// the [SGP algorithm](struct.SparseGaussianProcess.html).
pub struct SgpParams<F: Float, K: Kernel<F>>(SgpValidParams<F, K>);

impl<F: Float, K: Kernel<F>> SgpParams<F, K> {
    /// A constructor for SGP parameters given a kernel and inducing points
    pub fn new(kernel: K, inducings: Inducings<F>) -> SgpParams<F, K> {
        Self(SgpValidParams {
            gp_params: GpValidParams::new(kernel),
            z: inducings,
            method: SparseMethod::default(),
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
    ///
    /// Nugget is used to improve numerical stability
    pub fn nugget(mut self, nugget: F) -> Self {
        self.0.gp_params.nugget = nugget;
        self
    }

    /// Specify the sparse method
    pub fn sparse_method(mut self, method: SparseMethod) -> Self {
        self.0.method = method;
        self
    }

    /// Specify nz inducing points as (nz, x_dim) matrix.
    pub fn inducings(mut self, z: Array2<F>) -> Self {
        self.0.z = Inducings::Located(z);
        self
    }

    /// Specify nz number of inducing points which will be picked randomly in the input training dataset.
    pub fn n_inducings(mut self, nz: usize) -> Self {
        self.0.z = Inducings::Randomized(nz);
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

impl<F: Float, K: Kernel<F>> From<SgpValidParams<F, K>> for SgpParams<F, K> {
    fn from(valid: SgpValidParams<F, K>) -> Self {
        SgpParams(valid)
    }
}

impl<F: Float, K: Kernel<F>> ParamGuard for SgpParams<F, K> {
    type Checked = SgpValidParams<F, K>;
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
