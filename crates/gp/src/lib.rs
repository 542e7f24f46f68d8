//! This library implements [Gaussian Process](https://en.wikipedia.org/wiki/Gaussian_process) models
//! sharing a common predictive interface ([GpPredictor]) on top of a Gaussian likelihood.
//!
//! Available models:
//! * GPR: exact regression, [GaussianProcess] parameterized by [GpParams],
//! * SGPR and FITC: sparse regression with inducing points, [SparseGaussianProcess]
//!   parameterized by [SgpParams] and a [SparseMethod],
//! * SVGP: sparse variational model with a free variational distribution `q(u) = N(q_mu, q_sqrt q_sqrt^T)`
//!   over inducing values, [SparseVariationalGaussianProcess] parameterized by [SvgpParams],
//! * VGP: variational model over all training points, [VariationalGaussianProcess]
//!   parameterized by [VgpParams],
//! * GPMC and SGPMC: models with whitened latent values `V` set by a sampler,
//!   [MonteCarloGaussianProcess] and [SparseMonteCarloGaussianProcess].
//!
//! Sparse methods address limitations of exact GPs when the number of training points is large:
//! complexity goes from O(N^3) in processing time and O(N^2) in memory to O(N.M^2) and O(NM)
//! where M < N is the number of inducing points.
//!
//! Every model predicts latent function values (`predict_f`), observations (`predict_y`),
//! with either marginal variances or full covariances, evaluates the log predictive density
//! of observations and draws joint samples of the latent function.
//! Predictions always reflect the current value of the hyperparameters which can be
//! modified in place after fitting (see [GpPredictor::parameters_mut]).
//!
//! ```
//! use gaussbox_gp::{kernels::Matern32, GaussianProcess, GpPredictor};
//! use linfa::prelude::*;
//! use ndarray::array;
//!
//! let xt = array![[0.0], [1.0], [2.0], [3.0], [4.0]];
//! let yt = array![[0.0], [1.0], [1.5], [0.9], [1.0]];
//! let gp = GaussianProcess::<f64, _>::params(Matern32::default())
//!     .fit(&Dataset::new(xt, yt))
//!     .expect("GP fitted");
//! let (mean, var) = gp.predict_y(&array![[2.5]].view()).expect("GP prediction");
//! assert_eq!(mean.dim(), (1, 1));
//! assert!(var[[0, 0]] > 1.0);
//! ```
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod algorithm;
mod conditional;
mod errors;
mod hyperparameters;
pub mod kernels;
mod likelihoods;
mod mcmc_algorithm;
mod mcmc_parameters;
mod parameters;
mod predictor;
mod sparse_algorithm;
mod sparse_parameters;
mod utils;
mod variational_algorithm;
mod variational_parameters;

pub use algorithm::GaussianProcess;
pub use conditional::QSqrt;
pub use errors::*;
pub use hyperparameters::Hyperparameter;
pub use likelihoods::{gaussian_log_density, Gaussian};
pub use mcmc_algorithm::*;
pub use mcmc_parameters::*;
pub use parameters::*;
pub use predictor::{GpPredictor, SamplingMethod};
pub use sparse_algorithm::SparseGaussianProcess;
pub use sparse_parameters::*;
pub use variational_algorithm::*;
pub use variational_parameters::*;
