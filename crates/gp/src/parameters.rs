use crate::errors::{GpError, Result};
use crate::hyperparameters::Hyperparameter;
use crate::kernels::Kernel;
use crate::likelihoods::Gaussian;
use crate::predictor::SamplingMethod;
use linfa::{Float, ParamGuard};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Default jitter added to covariance matrices before factorization
pub const GP_DEFAULT_NUGGET: f64 = 1e-6;

/// A set of validated GP parameters.
///
/// Shared by every model variant: sparse, variational and Monte-Carlo
/// parameter sets embed it.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(
        serialize = "F: Serialize, K: Serialize",
        deserialize = "F: Deserialize<'de>, K: Deserialize<'de>"
    ))
)]
pub struct GpValidParams<F: Float, K: Kernel<F>> {
    /// Prior covariance function k(x, x')
    pub(crate) kernel: K,
    /// Observation model
    pub(crate) likelihood: Gaussian<F>,
    /// Parameter to improve numerical stability
    pub(crate) nugget: F,
    /// Random generator seed used to pick inducing points and draw samples
    pub(crate) seed: Option<u64>,
    /// Factorization used when sampling
    pub(crate) sampling_method: SamplingMethod,
}

impl<F: Float, K: Kernel<F> + Default> Default for GpValidParams<F, K> {
    fn default() -> GpValidParams<F, K> {
        GpValidParams::new(K::default())
    }
}

impl<F: Float, K: Kernel<F>> GpValidParams<F, K> {
    pub(crate) fn new(kernel: K) -> GpValidParams<F, K> {
        GpValidParams {
            kernel,
            likelihood: Gaussian::default(),
            nugget: F::cast(GP_DEFAULT_NUGGET),
            seed: None,
            sampling_method: SamplingMethod::default(),
        }
    }

    /// Get kernel k(x, x')
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Get likelihood
    pub fn likelihood(&self) -> &Gaussian<F> {
        &self.likelihood
    }

    /// Get nugget
    pub fn nugget(&self) -> F {
        self.nugget
    }

    /// Get seed
    pub fn seed(&self) -> Option<&u64> {
        self.seed.as_ref()
    }

    /// Get sampling method
    pub fn sampling_method(&self) -> SamplingMethod {
        self.sampling_method
    }

    /// Kernel and likelihood hyperparameters by dotted name
    pub(crate) fn named_parameters(&self) -> Vec<(String, &Hyperparameter<F>)> {
        let mut params: Vec<_> = self
            .kernel
            .parameters()
            .into_iter()
            .map(|(name, p)| (format!("kernel.{name}"), p))
            .collect();
        params.push((
            "likelihood.variance".to_string(),
            self.likelihood.variance(),
        ));
        params
    }

    /// Mutable kernel and likelihood hyperparameters by dotted name
    pub(crate) fn named_parameters_mut(&mut self) -> Vec<(String, &mut Hyperparameter<F>)> {
        let mut params: Vec<_> = self
            .kernel
            .parameters_mut()
            .into_iter()
            .map(|(name, p)| (format!("kernel.{name}"), p))
            .collect();
        params.push((
            "likelihood.variance".to_string(),
            self.likelihood.variance_mut(),
        ));
        params
    }

    pub(crate) fn check_nugget(&self) -> Result<()> {
        if self.nugget <= F::zero() || !self.nugget.is_finite() {
            return Err(GpError::InvalidValueError(format!(
                "nugget should be positive, got {}",
                self.nugget
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
/// The set of hyperparameters that can be specified for the execution of
/// the [GP algorithm](struct.GaussianProcess.html).
pub struct GpParams<F: Float, K: Kernel<F>>(GpValidParams<F, K>);

impl<F: Float, K: Kernel<F>> GpParams<F, K> {
    /// A constructor for GP parameters given a kernel
    pub fn new(kernel: K) -> GpParams<F, K> {
        Self(GpValidParams::new(kernel))
    }

    /// A constructor for GP parameters from validated parameters
    pub fn new_from_valid(params: &GpValidParams<F, K>) -> Self {
        Self(params.clone())
    }

    /// Set kernel.
    pub fn kernel(mut self, kernel: K) -> Self {
        self.0.kernel = kernel;
        self
    }

    /// Set likelihood.
    pub fn likelihood(mut self, likelihood: Gaussian<F>) -> Self {
        self.0.likelihood = likelihood;
        self
    }

    /// Set nugget.
    ///
    /// Nugget is used to improve numerical stability
    pub fn nugget(mut self, nugget: F) -> Self {
        self.0.nugget = nugget;
        self
    }

    /// Set the random generator seed
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.0.seed = seed;
        self
    }

    /// Set the sampling method
    pub fn sampling_method(mut self, method: SamplingMethod) -> Self {
        self.0.sampling_method = method;
        self
    }
}

impl<F: Float, K: Kernel<F>> From<GpValidParams<F, K>> for GpParams<F, K> {
    fn from(valid: GpValidParams<F, K>) -> Self {
        GpParams(valid)
    }
}

impl<F: Float, K: Kernel<F>> ParamGuard for GpParams<F, K> {
    type Checked = GpValidParams<F, K>;
    type Error = GpError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        self.0.check_nugget()?;
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::Matern32;

    #[test]
    fn test_defaults() {
        let params = GpParams::new(Matern32::<f64>::default()).check().unwrap();
        assert_eq!(params.nugget(), 1e-6);
        assert_eq!(params.likelihood().variance().scalar_value(), 1.);
        assert_eq!(params.seed(), None);
        assert_eq!(params.sampling_method(), SamplingMethod::Cholesky);
    }

    #[test]
    fn test_invalid_nugget() {
        for nugget in [0., -1e-6, f64::INFINITY] {
            let params = GpParams::new(Matern32::<f64>::default()).nugget(nugget);
            assert!(matches!(
                params.check_ref(),
                Err(GpError::InvalidValueError(_))
            ));
        }
    }
}
