use crate::errors::{GpError, Result};
use crate::hyperparameters::Hyperparameter;
use crate::kernels::Kernel;
use crate::likelihoods::Gaussian;
use crate::parameters::{GpParams, GpValidParams};
use crate::predictor::{GpPredictor, SamplingMethod};
use crate::utils::{
    check_ncols, check_training_data, cholesky_with_nugget, solve_lower, sum_squares_axis0,
};
use linfa::prelude::{DatasetBase, Fit, Float};
use log::debug;
use ndarray::{Array1, Array2, Array3, ArrayBase, ArrayView2, Data, Ix2};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Exact Gaussian process regression (GPR) with a Gaussian likelihood
///
/// Each of the `P` outputs is an independent realization of a zero mean
/// Gaussian process with covariance `k(x, x')`, observed with noise:
///
/// `y_p(x) = f_p(x) + e`,  `f_p ~ GP(0, k)`,  `e ~ N(0, sigma^2)`
///
/// Predictions condition `f` on the training data in closed form:
///
/// ```text
/// L = chol(Kxx + sigma^2 I),  A = L^-1 Kxs
/// mean = A^T L^-1 Y,  cov = Kss - A^T A
/// ```
///
/// # Example
///
/// ```rust
/// use gaussbox_gp::{GaussianProcess, GpPredictor, kernels::{Matern32, White}};
/// use linfa::prelude::*;
/// use ndarray::array;
///
/// let xt = array![[0.0], [1.0], [2.0], [3.0], [4.0]];
/// let yt = array![[0.0], [1.0], [1.5], [0.9], [1.0]];
///
/// let gp = GaussianProcess::params(Matern32::default() + White::default())
///     .fit(&Dataset::new(xt, yt))
///     .expect("GP fitted");
///
/// let xtest = array![[0.5], [2.5]];
/// let (mean_f, var_f) = gp.predict_f(&xtest.view()).expect("GP prediction");
/// let (mean_y, var_y) = gp.predict_y(&xtest.view()).expect("GP prediction");
/// assert_eq!(mean_f, mean_y);
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
pub struct GaussianProcess<F: Float, K: Kernel<F>> {
    /// Parameters used to fit this model
    params: GpValidParams<F, K>,
    /// Training inputs
    xt: Array2<F>,
    /// Training outputs
    yt: Array2<F>,
}

impl<F: Float, K: Kernel<F>> fmt::Display for GaussianProcess<F, K> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "GPR(kernel={}, likelihood={})",
            self.params.kernel, self.params.likelihood
        )
    }
}

impl<F: Float, K: Kernel<F>> GaussianProcess<F, K> {
    /// Gp parameters contructor
    pub fn params(kernel: K) -> GpParams<F, K> {
        GpParams::new(kernel)
    }

    /// Kernel
    pub fn kernel(&self) -> &K {
        &self.params.kernel
    }

    /// Mutable kernel
    pub fn kernel_mut(&mut self) -> &mut K {
        &mut self.params.kernel
    }

    /// Training data (inputs, outputs)
    pub fn training_data(&self) -> (&Array2<F>, &Array2<F>) {
        (&self.xt, &self.yt)
    }

    /// Cholesky factor of `Kxx + sigma^2 I`
    fn factorize(&self) -> Result<Array2<F>> {
        let noise = self.params.likelihood.variance().scalar_value();
        let mut kxx = self.params.kernel.k(&self.xt);
        kxx.diag_mut().mapv_inplace(|v| v + noise);
        cholesky_with_nugget(&kxx, self.params.nugget)
    }

    /// `A = L^-1 Kxs` and mean at `x`
    fn project(&self, l: &Array2<F>, x: &ArrayView2<F>) -> Result<(Array2<F>, Array2<F>)> {
        check_ncols("x", x, self.xt.ncols())?;
        let kxs = self.params.kernel.k_cross(&self.xt, x);
        let a = solve_lower(l, &kxs)?;
        let v = solve_lower(l, &self.yt)?;
        let mean = a.t().dot(&v);
        Ok((a, mean))
    }

    /// Log marginal likelihood of the training outputs
    ///
    /// `sum_p -1/2 y_p^T (Kxx + sigma^2 I)^-1 y_p - 1/2 log|Kxx + sigma^2 I| - n/2 log(2 pi)`
    pub fn log_marginal_likelihood(&self) -> Result<F> {
        let l = self.factorize()?;
        let v = solve_lower(&l, &self.yt)?;
        let (n, n_out) = self.yt.dim();
        let half = F::cast(0.5);
        let log_det = l.diag().mapv(|v| v.ln()).sum();
        let log_2pi = (F::cast(2.) * F::cast(std::f64::consts::PI)).ln();
        let quad = v.mapv(|v| v * v).sum();
        Ok(-half * quad - F::cast(n_out) * (log_det + half * F::cast(n) * log_2pi))
    }
}

impl<F: Float, K: Kernel<F>> GpPredictor<F> for GaussianProcess<F, K> {
    fn input_dim(&self) -> usize {
        self.xt.ncols()
    }

    fn output_dim(&self) -> usize {
        self.yt.ncols()
    }

    fn predict_f(&self, x: &ArrayView2<F>) -> Result<(Array2<F>, Array2<F>)> {
        let l = self.factorize()?;
        let (a, mean) = self.project(&l, x)?;
        let var = self.params.kernel.k_diag(x) - sum_squares_axis0(&a);
        Ok((mean, repeat_var(&var, self.output_dim())))
    }

    fn predict_f_full_cov(&self, x: &ArrayView2<F>) -> Result<(Array2<F>, Array3<F>)> {
        let l = self.factorize()?;
        let (a, mean) = self.project(&l, x)?;
        let cov = self.params.kernel.k(x) - a.t().dot(&a);
        Ok((mean, repeat_cov(&cov, self.output_dim())))
    }

    fn likelihood(&self) -> &Gaussian<F> {
        &self.params.likelihood
    }

    fn likelihood_mut(&mut self) -> &mut Gaussian<F> {
        &mut self.params.likelihood
    }

    fn parameters(&self) -> Vec<(String, &Hyperparameter<F>)> {
        self.params.named_parameters()
    }

    fn parameters_mut(&mut self) -> Vec<(String, &mut Hyperparameter<F>)> {
        self.params.named_parameters_mut()
    }

    fn nugget(&self) -> F {
        self.params.nugget
    }

    fn seed(&self) -> Option<u64> {
        self.params.seed
    }

    fn sampling_method(&self) -> SamplingMethod {
        self.params.sampling_method
    }
}

/// The same `(n,)` variance for each of the `n_out` outputs
pub(crate) fn repeat_var<F: Float>(var: &Array1<F>, n_out: usize) -> Array2<F> {
    Array2::from_shape_fn((var.len(), n_out), |(i, _)| var[i])
}

/// The same `(n, n)` covariance for each of the `n_out` outputs
pub(crate) fn repeat_cov<F: Float>(cov: &Array2<F>, n_out: usize) -> Array3<F> {
    let (n, m) = cov.dim();
    let mut res = Array3::zeros((n_out, n, m));
    for mut res_p in res.outer_iter_mut() {
        res_p.assign(cov);
    }
    res
}

impl<F: Float, K: Kernel<F>, D: Data<Elem = F>>
    Fit<ArrayBase<D, Ix2>, ArrayBase<D, Ix2>, GpError> for GpValidParams<F, K>
{
    type Object = GaussianProcess<F, K>;

    /// Condition the GP prior on the training dataset.
    ///
    /// No hyperparameter is optimized: the model predicts with the
    /// kernel and likelihood values it holds.
    fn fit(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, ArrayBase<D, Ix2>>,
    ) -> Result<Self::Object> {
        let x = dataset.records();
        let y = dataset.targets();
        check_training_data(x, y)?;
        self.kernel.check_input_dim(x.ncols())?;
        debug!(
            "GPR fitted on {} points (nx={}, ny={}) with {}",
            x.nrows(),
            x.ncols(),
            y.ncols(),
            self.kernel
        );
        Ok(GaussianProcess {
            params: self.clone(),
            xt: x.to_owned(),
            yt: y.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::{Matern32, Matern52, SquaredExponential, White};
    use approx::assert_abs_diff_eq;
    use linfa::prelude::Dataset;
    use ndarray::{array, Axis};
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand_distr::StandardNormal;
    use ndarray_rand::RandomExt;
    use paste::paste;
    use rand_xoshiro::Xoshiro256Plus;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn xsinx(x: &Array2<f64>) -> Array2<f64> {
        (x - 3.5) * ((x - 3.5) / std::f64::consts::PI).mapv(|v| v.sin())
    }

    #[test]
    fn test_gpr_noiseless_interpolation() {
        let xt = array![[0.0], [2.0], [3.0], [4.0], [5.0], [6.0], [8.0]];
        let yt = xsinx(&xt);
        let gp = GaussianProcess::params(SquaredExponential::new(1., array![0.8]).unwrap())
            .likelihood(Gaussian::new(1e-8).unwrap())
            .nugget(1e-10)
            .fit(&Dataset::new(xt.clone(), yt.clone()))
            .expect("GP fit error");
        let (mean, var) = gp.predict_f(&xt.view()).unwrap();
        assert_abs_diff_eq!(mean, yt, epsilon = 1e-4);
        assert_abs_diff_eq!(var, Array2::zeros((7, 1)), epsilon = 1e-4);
    }

    #[test]
    fn test_gpr_noise_relation() {
        let xt = array![[0.0], [1.0], [2.0], [3.0], [4.0]];
        let yt = array![[0.0, 1.], [1.0, 0.], [1.5, 0.], [0.9, 2.], [1.0, 1.]];
        let gp = GaussianProcess::params(Matern32::default() + White::default())
            .fit(&Dataset::new(xt, yt))
            .expect("GP fit error");
        let xtest = array![[0.5], [2.5], [10.]];
        let (mean_f, var_f) = gp.predict_f(&xtest.view()).unwrap();
        let (mean_y, var_y) = gp.predict_y(&xtest.view()).unwrap();
        assert_eq!(mean_f, mean_y);
        assert_abs_diff_eq!(var_f, &var_y - 1., epsilon = 1e-12);
        // far from the data the posterior is the prior: Matern32 plus White variances
        assert_abs_diff_eq!(var_f.row(2), array![2., 2.], epsilon = 1e-6);
    }

    #[test]
    fn test_gpr_log_marginal_likelihood() {
        // single point: log N(y | 0, k + sigma^2)
        let gp = GaussianProcess::params(Matern52::new(2., array![1.]).unwrap())
            .likelihood(Gaussian::new(0.5).unwrap())
            .nugget(1e-12)
            .fit(&Dataset::new(array![[0.3]], array![[1.2]]))
            .unwrap();
        let expected =
            -0.5 * (2. * std::f64::consts::PI).ln() - 0.5 * 2.5f64.ln() - 0.5 * 1.44 / 2.5;
        assert_abs_diff_eq!(gp.log_marginal_likelihood().unwrap(), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_gpr_bad_inputs() {
        let gp = GaussianProcess::params(Matern32::<f64>::default())
            .fit(&Dataset::new(array![[0., 1.], [1., 2.]], array![[1.], [2.]]))
            .unwrap();
        assert!(matches!(
            gp.predict_f(&array![[1.]].view()),
            Err(GpError::DimensionError(_))
        ));
        let res = GaussianProcess::params(Matern32::new(1., array![1., 1., 1.]).unwrap())
            .fit(&Dataset::new(array![[0., 1.], [1., 2.]], array![[1.], [2.]]));
        assert!(matches!(res, Err(GpError::DimensionError(_))));
    }

    #[test]
    fn test_gpr_recomputes_after_assign() {
        let xt = array![[0.0], [1.0], [2.0]];
        let yt = array![[0.0], [1.0], [0.5]];
        let mut gp = GaussianProcess::params(Matern32::<f64>::default())
            .fit(&Dataset::new(xt, yt))
            .unwrap();
        let x = array![[0.5]];
        let (_, var_before) = gp.predict_y(&x.view()).unwrap();
        gp.likelihood_mut().variance_mut().assign(0.2).unwrap();
        gp.likelihood_mut().variance_mut().set_trainable(false);
        let (_, var_after) = gp.predict_y(&x.view()).unwrap();
        assert!(var_after[[0, 0]] < var_before[[0, 0]]);
        let (_, var_f) = gp.predict_f(&x.view()).unwrap();
        assert_abs_diff_eq!(var_after, var_f + 0.2, epsilon = 1e-12);
        let trainable: Vec<String> = gp
            .trainable_parameters()
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(trainable, vec!["kernel.variance", "kernel.theta"]);
    }

    #[test]
    fn test_gpr_observation_full_cov() {
        init();
        let xt = array![[0.0], [1.0], [2.0], [3.0]];
        let yt = array![[0.0, 1.], [1.0, 0.5], [0.2, 0.], [-0.5, 1.]];
        let gp = GaussianProcess::params(Matern52::default())
            .likelihood(Gaussian::new(0.3).unwrap())
            .fit(&Dataset::new(xt, yt))
            .unwrap();
        let x = array![[0.5], [1.5], [7.]];
        let (mean, var) = gp.predict_y(&x.view()).unwrap();
        let (mean_full, cov) = gp.predict_y_full_cov(&x.view()).unwrap();
        assert_eq!(cov.dim(), (2, 3, 3));
        assert_abs_diff_eq!(mean, mean_full, epsilon = 1e-12);
        let (_, cov_f) = gp.predict_f_full_cov(&x.view()).unwrap();
        for p in 0..2 {
            let diag: Array1<f64> = cov.index_axis(Axis(0), p).diag().to_owned();
            assert_abs_diff_eq!(diag, var.column(p), epsilon = 1e-10);
            // noise only enters the diagonal
            let off = &cov.index_axis(Axis(0), p) - &cov_f.index_axis(Axis(0), p);
            assert_abs_diff_eq!(off, Array2::<f64>::eye(3) * 0.3, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_gpr_seeded_samples() {
        init();
        let xt = array![[0.0], [1.0], [2.0]];
        let yt = array![[0.0], [1.0], [0.5]];
        let build = |seed| {
            GaussianProcess::params(Matern32::<f64>::default())
                .seed(seed)
                .fit(&Dataset::new(xt.clone(), yt.clone()))
                .unwrap()
        };
        let x = array![[0.5], [1.5], [3.]];
        let gp = build(Some(42));
        let a = gp.predict_f_samples_seeded(&x.view(), 6).unwrap();
        let b = gp.predict_f_samples_seeded(&x.view(), 6).unwrap();
        assert_eq!(a.dim(), (6, 3, 1));
        assert_eq!(a, b);
        let same = build(Some(42)).predict_f_samples_seeded(&x.view(), 6).unwrap();
        assert_eq!(a, same);
        let other = build(Some(7)).predict_f_samples_seeded(&x.view(), 6).unwrap();
        assert_ne!(a, other);
        // seeded draws follow the explicit generator path
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let explicit = gp.predict_f_samples(&x.view(), 6, &mut rng).unwrap();
        assert_eq!(a, explicit);
    }

    macro_rules! test_gpr_full_cov {
        ($kernel:ident) => {
            paste! {
                #[test]
                fn [<test_gpr_ $kernel:snake _full_cov>]() {
                    init();
                    let mut rng = Xoshiro256Plus::seed_from_u64(0);
                    let xt = Array2::<f64>::random_using((20, 3), StandardNormal, &mut rng);
                    let yt = Array2::<f64>::random_using((20, 2), StandardNormal, &mut rng);
                    let gp = GaussianProcess::params($kernel::default())
                        .fit(&Dataset::new(xt, yt))
                        .unwrap();
                    let x = Array2::<f64>::random_using((30, 3), StandardNormal, &mut rng);
                    let (mean, var) = gp.predict_f(&x.view()).unwrap();
                    let (mean_full, cov) = gp.predict_f_full_cov(&x.view()).unwrap();
                    assert_eq!(cov.dim(), (2, 30, 30));
                    assert_abs_diff_eq!(mean, mean_full, epsilon = 1e-12);
                    for p in 0..2 {
                        let diag: Array1<f64> = cov.index_axis(Axis(0), p).diag().to_owned();
                        assert_abs_diff_eq!(diag, var.column(p), epsilon = 1e-10);
                    }
                    let samples = gp.predict_f_samples(&x.view(), 5, &mut rng).unwrap();
                    assert_eq!(samples.dim(), (5, 30, 2));
                }
            }
        };
    }

    test_gpr_full_cov!(SquaredExponential);
    test_gpr_full_cov!(Matern32);
    test_gpr_full_cov!(Matern52);
}
