//! Prediction interface shared by every GP model variant.
//!
//! A model only has to provide the latent posterior through [`GpPredictor::predict_f`]
//! and [`GpPredictor::predict_f_full_cov`]: observation predictions, log densities and
//! posterior samples are derived from them and from the model Gaussian likelihood.
//!
//! Every prediction is computed from the current hyperparameter values, so a
//! hyperparameter assigned through [`GpPredictor::parameters_mut`] or
//! [`GpPredictor::likelihood_mut`] is taken into account by the next call.

use crate::errors::{GpError, Result};
use crate::hyperparameters::Hyperparameter;
use crate::likelihoods::Gaussian;
use crate::utils::cholesky_with_nugget;
use linfa::Float;
use linfa_linalg::eigh::*;
use log::debug;
use ndarray::{s, Array2, Array3, ArrayView2, Axis};
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use rand_xoshiro::Xoshiro256Plus;
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Factorization used to draw correlated samples from a covariance matrix
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum SamplingMethod {
    /// Cholesky factor of the covariance (with nugget)
    #[default]
    Cholesky,
    /// Eigen decomposition, small or negative eigenvalues are clipped to zero
    EigenValues,
}

/// Predictive inference on a fitted GP model
///
/// Inputs are `(n, nx)` matrices and outputs are laid out as:
/// * mean and marginal variance: `(n, P)`,
/// * full covariance: `(P, n, n)`, one matrix per output,
/// * samples: `(S, n, P)`,
/// * log density: `(n, P)`.
pub trait GpPredictor<F: Float>: fmt::Display + Send + Sync {
    /// Number of input components
    fn input_dim(&self) -> usize;

    /// Number of outputs `P`
    fn output_dim(&self) -> usize;

    /// Posterior mean and marginal variance of the latent functions at `x`
    fn predict_f(&self, x: &ArrayView2<F>) -> Result<(Array2<F>, Array2<F>)>;

    /// Posterior mean and full covariance of the latent functions at `x`
    fn predict_f_full_cov(&self, x: &ArrayView2<F>) -> Result<(Array2<F>, Array3<F>)>;

    /// Observation model
    fn likelihood(&self) -> &Gaussian<F>;

    /// Mutable observation model
    fn likelihood_mut(&mut self) -> &mut Gaussian<F>;

    /// Hyperparameters by dotted name (`kernel.variance`, `likelihood.variance`...)
    fn parameters(&self) -> Vec<(String, &Hyperparameter<F>)>;

    /// Mutable hyperparameters by dotted name
    fn parameters_mut(&mut self) -> Vec<(String, &mut Hyperparameter<F>)>;

    /// Jitter added to covariance matrices before factorization
    fn nugget(&self) -> F;

    /// Seed used by [`GpPredictor::predict_f_samples_seeded`]
    fn seed(&self) -> Option<u64> {
        None
    }

    /// Factorization used to draw samples
    fn sampling_method(&self) -> SamplingMethod {
        SamplingMethod::default()
    }

    /// Hyperparameters an optimizer would be allowed to change
    fn trainable_parameters(&self) -> Vec<(String, &Hyperparameter<F>)> {
        self.parameters()
            .into_iter()
            .filter(|(_, p)| p.is_trainable())
            .collect()
    }

    /// Posterior mean and marginal variance of the observations at `x`
    fn predict_y(&self, x: &ArrayView2<F>) -> Result<(Array2<F>, Array2<F>)> {
        let (mean, var) = self.predict_f(x)?;
        Ok(self.likelihood().predict_mean_and_var(&mean, &var))
    }

    /// Posterior mean and full covariance of the observations at `x`
    fn predict_y_full_cov(&self, x: &ArrayView2<F>) -> Result<(Array2<F>, Array3<F>)> {
        let (mean, mut cov) = self.predict_f_full_cov(x)?;
        let noise = self.likelihood().variance().scalar_value();
        for mut cov_p in cov.outer_iter_mut() {
            cov_p.diag_mut().mapv_inplace(|v| v + noise);
        }
        Ok((mean, cov))
    }

    /// Log predictive density of observations `y` at `x`, elementwise `(n, P)`
    fn predict_log_density(&self, x: &ArrayView2<F>, y: &ArrayView2<F>) -> Result<Array2<F>> {
        if y.dim() != (x.nrows(), self.output_dim()) {
            return Err(GpError::DimensionError(format!(
                "targets should be ({}, {}), got {:?}",
                x.nrows(),
                self.output_dim(),
                y.dim()
            )));
        }
        let (mean, var) = self.predict_f(x)?;
        Ok(self.likelihood().predict_log_density(&mean, &var, y))
    }

    /// Draw `n_samples` functions from the latent posterior at `x`
    /// using the given random generator
    fn predict_f_samples(
        &self,
        x: &ArrayView2<F>,
        n_samples: usize,
        rng: &mut Xoshiro256Plus,
    ) -> Result<Array3<F>> {
        let (mean, cov) = self.predict_f_full_cov(x)?;
        sample(
            &mean,
            &cov,
            n_samples,
            self.sampling_method(),
            self.nugget(),
            rng,
        )
    }

    /// Draw `n_samples` functions from the latent posterior at `x`
    /// with a generator seeded from the model seed (from entropy when no seed is set)
    fn predict_f_samples_seeded(&self, x: &ArrayView2<F>, n_samples: usize) -> Result<Array3<F>> {
        let mut rng = match self.seed() {
            Some(seed) => Xoshiro256Plus::seed_from_u64(seed),
            None => Xoshiro256Plus::from_entropy(),
        };
        self.predict_f_samples(x, n_samples, &mut rng)
    }
}

/// Draw `n_samples` realizations of `P` independent gaussian vectors
/// given their means `(n, P)` and covariances `(P, n, n)`.
///
/// Returns samples as `(n_samples, n, P)`.
/// The eigen decomposition is more robust than cholesky when covariance
/// matrices get ill-conditioned as the number of points increases.
pub(crate) fn sample<F: Float>(
    mean: &Array2<F>,
    cov: &Array3<F>,
    n_samples: usize,
    method: SamplingMethod,
    nugget: F,
    rng: &mut Xoshiro256Plus,
) -> Result<Array3<F>> {
    let (n, n_out) = mean.dim();
    debug!("Sampling {n_samples} trajectories at {n} points for {n_out} outputs ({method:?})");
    let mut samples = Array3::zeros((n_samples, n, n_out));
    for (p, cov_p) in cov.outer_iter().enumerate() {
        let c = match method {
            SamplingMethod::Cholesky => cholesky_with_nugget(&cov_p, nugget)?,
            SamplingMethod::EigenValues => {
                let (v, w) = cov_p.to_owned().eigh_into()?;
                let v = v.mapv(|x| {
                    // We lower bound the float value at 1e-9
                    if x < F::cast(1e-9) {
                        return F::zero();
                    }
                    x.sqrt()
                });
                w.dot(&Array2::from_diag(&v))
            }
        };
        let ary = Array2::<f64>::random_using((n, n_samples), StandardNormal, &mut *rng)
            .mapv(|v| F::cast(v));
        let draws = c.dot(&ary) + &mean.column(p).insert_axis(Axis(1));
        samples.slice_mut(s![.., .., p]).assign(&draws.t());
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array1};

    #[test]
    fn test_sample_statistics() {
        let mean = array![[1., -1.], [2., 0.]];
        let cov_p = array![[1., 0.5], [0.5, 2.]];
        let cov = ndarray::stack(Axis(0), &[cov_p.view(), cov_p.view()]).unwrap();
        for method in [SamplingMethod::Cholesky, SamplingMethod::EigenValues] {
            let mut rng = Xoshiro256Plus::seed_from_u64(42);
            let samples = sample(&mean, &cov, 20000, method, 1e-10, &mut rng).unwrap();
            assert_eq!(samples.dim(), (20000, 2, 2));
            let empirical_mean = samples.mean_axis(Axis(0)).unwrap();
            assert_abs_diff_eq!(empirical_mean, mean, epsilon = 5e-2);
            let centered: Array1<f64> = &samples.slice(s![.., 0, 1]) - mean[[0, 1]];
            let var = centered.mapv(|v| v * v).mean().unwrap();
            assert_abs_diff_eq!(var, 1., epsilon = 5e-2);
        }
    }

    #[test]
    fn test_sample_determinism() {
        let mean = array![[0.], [0.], [0.]];
        let cov = Array3::from_shape_fn((1, 3, 3), |(_, i, j)| if i == j { 1. } else { 0.2 });
        let a = sample(
            &mean,
            &cov,
            4,
            SamplingMethod::Cholesky,
            1e-10,
            &mut Xoshiro256Plus::seed_from_u64(0),
        )
        .unwrap();
        let b = sample(
            &mean,
            &cov,
            4,
            SamplingMethod::Cholesky,
            1e-10,
            &mut Xoshiro256Plus::seed_from_u64(0),
        )
        .unwrap();
        assert_eq!(a, b);
    }
}
