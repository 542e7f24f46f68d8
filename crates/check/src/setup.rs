//! Model factory: builds any GP variant behind a [`GpPredictor`] trait object.
use crate::errors::{HarnessError, Result};
use gaussbox_gp::kernels::{
    AbsoluteExponentialCorr, CorrelationModel, Kernel, Matern32Corr, Matern52Corr,
    SquaredExponentialCorr, Stationary, White,
};
use gaussbox_gp::{
    Gaussian, GaussianProcess, GpPredictor, Inducings, MonteCarloGaussianProcess,
    SparseGaussianProcess, SparseMethod, SparseMonteCarloGaussianProcess,
    SparseVariationalGaussianProcess, VariationalGaussianProcess,
};
use linfa::prelude::{Dataset, Fit};
use log::debug;
use ndarray::{array, Array2};
use std::fmt;

/// GP model variants
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelKind {
    /// Exact regression
    Gpr,
    /// Sparse regression, Titsias variational bound
    Sgpr,
    /// Sparse regression, fully independent training conditional
    Fitc,
    /// Sparse variational GP
    Svgp,
    /// Variational GP
    Vgp,
    /// Monte-Carlo GP
    Gpmc,
    /// Sparse Monte-Carlo GP
    Sgpmc,
}

impl ModelKind {
    /// Whether the variant needs inducing points to be built
    pub fn requires_inducings(&self) -> bool {
        matches!(
            self,
            ModelKind::Sgpr | ModelKind::Fitc | ModelKind::Svgp | ModelKind::Sgpmc
        )
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ModelKind::Gpr => "GPR",
            ModelKind::Sgpr => "SGPR",
            ModelKind::Fitc => "FITC",
            ModelKind::Svgp => "SVGP",
            ModelKind::Vgp => "VGP",
            ModelKind::Gpmc => "GPMC",
            ModelKind::Sgpmc => "SGPMC",
        };
        write!(f, "{name}")
    }
}

/// Correlation models of the stationary kernel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Correlation {
    /// Squared exponential
    SquaredExponential,
    /// Absolute exponential
    AbsoluteExponential,
    /// Matern 3/2
    Matern32,
    /// Matern 5/2
    Matern52,
}

/// Kernel choice: a stationary kernel, optionally plus a white noise kernel
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KernelSpec {
    /// Correlation model
    pub correlation: Correlation,
    /// Stationary kernel variance
    pub variance: f64,
    /// Isotropic inverse length scale
    pub theta: f64,
    /// White noise variance, no white kernel when `None`
    pub white: Option<f64>,
}

impl KernelSpec {
    /// Unit variance, unit length scale kernel with the given correlation model
    pub fn new(correlation: Correlation) -> Self {
        KernelSpec {
            correlation,
            variance: 1.,
            theta: 1.,
            white: None,
        }
    }

    /// Add a white noise kernel
    pub fn with_white(mut self, variance: f64) -> Self {
        self.white = Some(variance);
        self
    }
}

impl Default for KernelSpec {
    fn default() -> Self {
        KernelSpec::new(Correlation::Matern32)
    }
}

impl fmt::Display for KernelSpec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self.correlation)?;
        if let Some(noise) = self.white {
            write!(f, "+White({noise})")?;
        }
        Ok(())
    }
}

/// Configuration of one model under check
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModelSetup {
    /// Variant
    pub kind: ModelKind,
    /// Kernel
    pub kernel: KernelSpec,
    /// Gaussian likelihood variance
    pub likelihood_variance: f64,
    /// SVGP whitening, model default when `None`
    pub whiten: Option<bool>,
    /// SVGP diagonal variational covariance, model default when `None`
    pub q_diag: Option<bool>,
}

impl ModelSetup {
    /// Variant with a Matern 3/2 kernel and unit likelihood variance
    pub fn new(kind: ModelKind) -> Self {
        ModelSetup {
            kind,
            kernel: KernelSpec::default(),
            likelihood_variance: 1.,
            whiten: None,
            q_diag: None,
        }
    }

    /// Set kernel
    pub fn kernel(mut self, kernel: KernelSpec) -> Self {
        self.kernel = kernel;
        self
    }

    /// Set likelihood variance
    pub fn likelihood_variance(mut self, variance: f64) -> Self {
        self.likelihood_variance = variance;
        self
    }

    /// Set SVGP whitening and diagonal covariance flags
    pub fn variational(mut self, whiten: bool, q_diag: bool) -> Self {
        self.whiten = Some(whiten);
        self.q_diag = Some(q_diag);
        self
    }

    /// Build the model from training data `x` (N, D), `y` (N, P)
    /// and inducing points `z` (M, D).
    ///
    /// GPR, VGP and GPMC ignore `z`, other variants fail without it.
    pub fn build(
        &self,
        x: &Array2<f64>,
        y: &Array2<f64>,
        z: Option<&Array2<f64>>,
    ) -> Result<Box<dyn GpPredictor<f64>>> {
        if self.kind.requires_inducings() && z.is_none() {
            return Err(HarnessError::MissingInducings(self.kind));
        }
        debug!("Build {self} on {:?} training inputs", x.dim());
        match self.kernel.correlation {
            Correlation::SquaredExponential => {
                self.build_stationary::<SquaredExponentialCorr>(x, y, z)
            }
            Correlation::AbsoluteExponential => {
                self.build_stationary::<AbsoluteExponentialCorr>(x, y, z)
            }
            Correlation::Matern32 => self.build_stationary::<Matern32Corr>(x, y, z),
            Correlation::Matern52 => self.build_stationary::<Matern52Corr>(x, y, z),
        }
    }

    fn build_stationary<Corr: CorrelationModel<f64> + 'static>(
        &self,
        x: &Array2<f64>,
        y: &Array2<f64>,
        z: Option<&Array2<f64>>,
    ) -> Result<Box<dyn GpPredictor<f64>>> {
        let kernel =
            Stationary::<f64, Corr>::new(self.kernel.variance, array![self.kernel.theta])?;
        match self.kernel.white {
            Some(noise) => self.build_with(kernel + White::new(noise)?, x, y, z),
            None => self.build_with(kernel, x, y, z),
        }
    }

    fn build_with<K: Kernel<f64> + 'static>(
        &self,
        kernel: K,
        x: &Array2<f64>,
        y: &Array2<f64>,
        z: Option<&Array2<f64>>,
    ) -> Result<Box<dyn GpPredictor<f64>>> {
        let dataset = Dataset::new(x.to_owned(), y.to_owned());
        let likelihood = Gaussian::new(self.likelihood_variance)?;
        let inducings = || {
            z.map(|z| Inducings::Located(z.to_owned()))
                .ok_or(HarnessError::MissingInducings(self.kind))
        };
        let model: Box<dyn GpPredictor<f64>> = match self.kind {
            ModelKind::Gpr => Box::new(
                GaussianProcess::params(kernel)
                    .likelihood(likelihood)
                    .fit(&dataset)?,
            ),
            ModelKind::Sgpr => Box::new(
                SparseGaussianProcess::params(kernel, inducings()?)
                    .likelihood(likelihood)
                    .sparse_method(SparseMethod::Vfe)
                    .fit(&dataset)?,
            ),
            ModelKind::Fitc => Box::new(
                SparseGaussianProcess::params(kernel, inducings()?)
                    .likelihood(likelihood)
                    .sparse_method(SparseMethod::Fitc)
                    .fit(&dataset)?,
            ),
            ModelKind::Svgp => {
                let mut params = SparseVariationalGaussianProcess::params(kernel, inducings()?)
                    .likelihood(likelihood);
                if let Some(whiten) = self.whiten {
                    params = params.whiten(whiten);
                }
                if let Some(q_diag) = self.q_diag {
                    params = params.q_diag(q_diag);
                }
                Box::new(params.fit(&dataset)?)
            }
            ModelKind::Vgp => Box::new(
                VariationalGaussianProcess::params(kernel)
                    .likelihood(likelihood)
                    .fit(&dataset)?,
            ),
            ModelKind::Gpmc => Box::new(
                MonteCarloGaussianProcess::params(kernel)
                    .likelihood(likelihood)
                    .fit(&dataset)?,
            ),
            ModelKind::Sgpmc => Box::new(
                SparseMonteCarloGaussianProcess::params(kernel, inducings()?)
                    .likelihood(likelihood)
                    .fit(&dataset)?,
            ),
        };
        Ok(model)
    }
}

impl fmt::Display for ModelSetup {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}[{}", self.kind, self.kernel)?;
        if let (Some(whiten), Some(q_diag)) = (self.whiten, self.q_diag) {
            write!(f, ", whiten={whiten}, q_diag={q_diag}")?;
        }
        if self.likelihood_variance != 1. {
            write!(f, ", noise={}", self.likelihood_variance)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let setup = ModelSetup::new(ModelKind::Svgp).variational(false, true);
        assert_eq!(
            setup.to_string(),
            "SVGP[Matern32, whiten=false, q_diag=true]"
        );
        let setup = ModelSetup::new(ModelKind::Gpr)
            .kernel(KernelSpec::new(Correlation::Matern32).with_white(1.))
            .likelihood_variance(0.2);
        assert_eq!(setup.to_string(), "GPR[Matern32+White(1), noise=0.2]");
    }

    #[test]
    fn test_requires_inducings() {
        let x = Array2::zeros((3, 2));
        let y = Array2::zeros((3, 1));
        for kind in [
            ModelKind::Sgpr,
            ModelKind::Fitc,
            ModelKind::Svgp,
            ModelKind::Sgpmc,
        ] {
            let res = ModelSetup::new(kind).build(&x, &y, None);
            assert!(matches!(res, Err(HarnessError::MissingInducings(k)) if k == kind));
        }
    }

    #[test]
    fn test_build_dims() {
        let x = array![[0., 0.], [1., 0.], [0., 1.]];
        let y = array![[1., 0.], [0., 1.], [1., 1.]];
        for kind in [ModelKind::Gpr, ModelKind::Vgp, ModelKind::Gpmc] {
            let model = ModelSetup::new(kind).build(&x, &y, None).unwrap();
            assert_eq!((model.input_dim(), model.output_dim()), (2, 2));
        }
    }
}
