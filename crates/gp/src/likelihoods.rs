//! Observation models linking latent function values to targets.
use crate::hyperparameters::Hyperparameter;
use linfa::Float;
use ndarray::{array, Array2, ArrayBase, Data, Ix2, Zip};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Gaussian likelihood `y = f + e` with `e ~ N(0, variance)`
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(serialize = "F: Serialize", deserialize = "F: Deserialize<'de>"))
)]
pub struct Gaussian<F: Float> {
    variance: Hyperparameter<F>,
}

impl<F: Float> Default for Gaussian<F> {
    fn default() -> Self {
        Gaussian {
            variance: Hyperparameter::constant(array![F::one()]),
        }
    }
}

impl<F: Float> Gaussian<F> {
    /// Gaussian likelihood with given noise `variance`
    pub fn new(variance: F) -> crate::Result<Self> {
        Ok(Gaussian {
            variance: Hyperparameter::try_scalar(variance)?,
        })
    }

    /// Noise variance
    pub fn variance(&self) -> &Hyperparameter<F> {
        &self.variance
    }

    /// Mutable noise variance
    pub fn variance_mut(&mut self) -> &mut Hyperparameter<F> {
        &mut self.variance
    }

    /// Predictive mean and variance of `y` given the ones of `f`
    pub fn predict_mean_and_var(
        &self,
        mean_f: &ArrayBase<impl Data<Elem = F>, Ix2>,
        var_f: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> (Array2<F>, Array2<F>) {
        let noise = self.variance.scalar_value();
        (mean_f.to_owned(), var_f.mapv(|v| v + noise))
    }

    /// Log density of `y` under `N(mean_f, var_f + variance)`, elementwise
    pub fn predict_log_density(
        &self,
        mean_f: &ArrayBase<impl Data<Elem = F>, Ix2>,
        var_f: &ArrayBase<impl Data<Elem = F>, Ix2>,
        y: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Array2<F> {
        let (mean_y, var_y) = self.predict_mean_and_var(mean_f, var_f);
        gaussian_log_density(&mean_y, &var_y, y)
    }

    /// Expected log density `E_q[log p(y | f)]` with `q(f) = N(mean_f, var_f)`, elementwise
    pub fn variational_expectations(
        &self,
        mean_f: &ArrayBase<impl Data<Elem = F>, Ix2>,
        var_f: &ArrayBase<impl Data<Elem = F>, Ix2>,
        y: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Array2<F> {
        let noise = self.variance.scalar_value();
        let half = F::cast(0.5);
        let cst = -half * (F::cast(2.) * F::cast(std::f64::consts::PI)).ln() - half * noise.ln();
        let mut res = Array2::zeros(mean_f.raw_dim());
        Zip::from(&mut res)
            .and(mean_f)
            .and(var_f)
            .and(y)
            .for_each(|r, &m, &v, &yv| {
                *r = cst - half * ((yv - m) * (yv - m) + v) / noise;
            });
        res
    }
}

impl<F: Float> fmt::Display for Gaussian<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Gaussian(variance={})", self.variance)
    }
}

/// Elementwise `log N(y | mean, var)`
pub fn gaussian_log_density<F: Float>(
    mean: &ArrayBase<impl Data<Elem = F>, Ix2>,
    var: &ArrayBase<impl Data<Elem = F>, Ix2>,
    y: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Array2<F> {
    let half = F::cast(0.5);
    let log_2pi = (F::cast(2.) * F::cast(std::f64::consts::PI)).ln();
    let mut res = Array2::zeros(mean.raw_dim());
    Zip::from(&mut res)
        .and(mean)
        .and(var)
        .and(y)
        .for_each(|r, &m, &v, &yv| {
            *r = -half * log_2pi - half * v.ln() - half * (m - yv) * (m - yv) / v;
        });
    res
}
