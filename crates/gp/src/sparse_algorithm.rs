use crate::algorithm::{repeat_cov, repeat_var};
use crate::errors::{GpError, Result};
use crate::hyperparameters::Hyperparameter;
use crate::kernels::Kernel;
use crate::likelihoods::Gaussian;
use crate::predictor::{GpPredictor, SamplingMethod};
use crate::sparse_parameters::{Inducings, SgpParams, SgpValidParams, SparseMethod};
use crate::utils::{
    check_ncols, check_training_data, cholesky_with_nugget, solve_lower, sum_squares_axis0,
};
use linfa::prelude::{DatasetBase, Fit, Float};
use log::debug;
use ndarray::{Array1, Array2, Array3, ArrayBase, ArrayView2, Axis, Data, Ix2, Zip};
use ndarray_rand::rand::seq::SliceRandom;
use ndarray_rand::rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sparse Gaussian process regression with inducing points
///
/// The `M` inducing points `Z` summarize the `N` training points so that
/// predictions cost `O(N M^2)` instead of `O(N^3)`. Two approximations
/// are available through [`SparseMethod`]:
///
/// * `Vfe`: the variational free energy posterior of Titsias (2009), known as SGPR,
/// * `Fitc`: the fully independent training conditional approximation
///   of Snelson and Ghahramani (2006).
///
/// When `Z` equals the training inputs, both approximations recover the
/// exact [`GaussianProcess`](crate::GaussianProcess) posterior.
///
/// # Example
///
/// ```rust
/// use gaussbox_gp::{SparseGaussianProcess, SparseMethod, Inducings, GpPredictor, kernels::SquaredExponential};
/// use linfa::prelude::*;
/// use ndarray::{array, Array2};
///
/// let xt = Array2::from_shape_fn((50, 1), |(i, _)| i as f64 / 10.);
/// let yt = xt.mapv(f64::sin);
/// let z = array![[0.], [1.], [2.], [3.], [4.]];
///
/// let sgp = SparseGaussianProcess::params(SquaredExponential::default(), Inducings::Located(z))
///     .sparse_method(SparseMethod::Vfe)
///     .fit(&Dataset::new(xt, yt))
///     .expect("SGP fitted");
///
/// let (mean, var) = sgp.predict_f(&array![[0.5], [2.5]].view()).expect("SGP prediction");
/// assert_eq!(mean.dim(), (2, 1));
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
pub struct SparseGaussianProcess<F: Float, K: Kernel<F>> {
    /// Parameters used to fit this model
    params: SgpValidParams<F, K>,
    /// Training inputs
    xt: Array2<F>,
    /// Training outputs
    yt: Array2<F>,
    /// Inducing points
    inducings: Array2<F>,
}

/// Terms shared by predictions and log likelihood
struct SparseTerms<F: Float> {
    /// Cholesky factor of Kuu
    luu: Array2<F>,
    /// Cholesky factor of the M x M inner matrix
    lb: Array2<F>,
    /// Projected targets (M, P)
    c: Array2<F>,
    /// Vfe: `Kdiag / sigma^2` summed minus `tr(A A^T)`; Fitc: `log(nu)` summed
    trace_or_logdet: F,
    /// Vfe: `err^2 / sigma^2` summed; Fitc: `err^2 / nu` summed
    quad: F,
}

impl<F: Float, K: Kernel<F>> fmt::Display for SparseGaussianProcess<F, K> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self.params.method {
            SparseMethod::Vfe => "SGPR",
            SparseMethod::Fitc => "FITC",
        };
        write!(
            f,
            "{}(kernel={}, likelihood={}, inducings={})",
            name,
            self.params.gp_params.kernel,
            self.params.gp_params.likelihood,
            self.inducings.nrows()
        )
    }
}

impl<F: Float, K: Kernel<F>> SparseGaussianProcess<F, K> {
    /// Sparse GP parameters contructor
    pub fn params(kernel: K, inducings: Inducings<F>) -> SgpParams<F, K> {
        SgpParams::new(kernel, inducings)
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

    /// Sparse approximation method
    pub fn method(&self) -> SparseMethod {
        self.params.method
    }

    fn noise(&self) -> F {
        self.params.gp_params.likelihood.variance().scalar_value()
    }

    fn luu(&self) -> Result<Array2<F>> {
        let kernel = &self.params.gp_params.kernel;
        cholesky_with_nugget(&kernel.k(&self.inducings), self.params.gp_params.nugget)
    }

    fn terms(&self) -> Result<SparseTerms<F>> {
        match self.params.method {
            SparseMethod::Vfe => self.vfe_terms(),
            SparseMethod::Fitc => self.fitc_terms(),
        }
    }

    fn vfe_terms(&self) -> Result<SparseTerms<F>> {
        let kernel = &self.params.gp_params.kernel;
        let sigma2 = self.noise();
        let sigma = sigma2.sqrt();
        let luu = self.luu()?;
        let kuf = kernel.k_cross(&self.inducings, &self.xt);
        let a = solve_lower(&luu, &kuf)?.mapv(|v| v / sigma);
        let mut b = a.dot(&a.t());
        b.diag_mut().mapv_inplace(|v| v + F::one());
        let lb = cholesky_with_nugget(&b, F::zero())?;
        let c = solve_lower(&lb, &a.dot(&self.yt))?.mapv(|v| v / sigma);
        let trace = kernel.k_diag(&self.xt).sum() / sigma2 - a.mapv(|v| v * v).sum();
        let quad = self.yt.mapv(|v| v * v).sum() / sigma2;
        Ok(SparseTerms {
            luu,
            lb,
            c,
            trace_or_logdet: trace,
            quad,
        })
    }

    fn fitc_terms(&self) -> Result<SparseTerms<F>> {
        let kernel = &self.params.gp_params.kernel;
        let luu = self.luu()?;
        let kuf = kernel.k_cross(&self.inducings, &self.xt);
        let v = solve_lower(&luu, &kuf)?;
        let nu: Array1<F> =
            kernel.k_diag(&self.xt) - sum_squares_axis0(&v) + self.noise();
        let v_nu = &v / &nu;
        let mut b = v_nu.dot(&v.t());
        b.diag_mut().mapv_inplace(|v| v + F::one());
        let lb = cholesky_with_nugget(&b, F::zero())?;
        let beta = &self.yt / &nu.view().insert_axis(Axis(1));
        let gamma = solve_lower(&lb, &v.dot(&beta))?;
        let log_nu = nu.mapv(|v| v.ln()).sum();
        let mut quad = F::zero();
        Zip::from(self.yt.rows()).and(&nu).for_each(|y_i, nu_i| {
            quad += y_i.mapv(|v| v * v).sum() / *nu_i;
        });
        Ok(SparseTerms {
            luu,
            lb,
            c: gamma,
            trace_or_logdet: log_nu,
            quad,
        })
    }

    /// `w = Luu^-1 Kus`, `t = LB^-1 w` and mean at `x`
    fn project(
        &self,
        terms: &SparseTerms<F>,
        x: &ArrayView2<F>,
    ) -> Result<(Array2<F>, Array2<F>, Array2<F>)> {
        check_ncols("x", x, self.xt.ncols())?;
        let kus = self.params.gp_params.kernel.k_cross(&self.inducings, x);
        let w = solve_lower(&terms.luu, &kus)?;
        let t = solve_lower(&terms.lb, &w)?;
        let mean = t.t().dot(&terms.c);
        Ok((w, t, mean))
    }

    /// Log likelihood of the training outputs
    ///
    /// For `Vfe` this is the evidence lower bound of Titsias (2009),
    /// for `Fitc` the log marginal likelihood of the approximate model.
    pub fn log_likelihood(&self) -> Result<F> {
        let terms = self.terms()?;
        let (n, n_out) = self.yt.dim();
        let (n, n_out) = (F::cast(n), F::cast(n_out));
        let half = F::cast(0.5);
        let log_2pi = (F::cast(2.) * F::cast(std::f64::consts::PI)).ln();
        let log_det_lb = terms.lb.diag().mapv(|v| v.ln()).sum();
        let c2 = terms.c.mapv(|v| v * v).sum();
        let res = match self.params.method {
            SparseMethod::Vfe => {
                let sigma2 = self.noise();
                -half * n * n_out * log_2pi - n_out * log_det_lb - half * n * n_out * sigma2.ln()
                    - half * terms.quad
                    + half * c2
                    - half * n_out * terms.trace_or_logdet
            }
            SparseMethod::Fitc => {
                -half * terms.quad + half * c2
                    - n_out * (half * terms.trace_or_logdet + log_det_lb)
                    - half * n * n_out * log_2pi
            }
        };
        Ok(res)
    }
}

impl<F: Float, K: Kernel<F>> GpPredictor<F> for SparseGaussianProcess<F, K> {
    fn input_dim(&self) -> usize {
        self.xt.ncols()
    }

    fn output_dim(&self) -> usize {
        self.yt.ncols()
    }

    fn predict_f(&self, x: &ArrayView2<F>) -> Result<(Array2<F>, Array2<F>)> {
        let terms = self.terms()?;
        let (w, t, mean) = self.project(&terms, x)?;
        let var = self.params.gp_params.kernel.k_diag(x) - sum_squares_axis0(&w)
            + sum_squares_axis0(&t);
        Ok((mean, repeat_var(&var, self.output_dim())))
    }

    fn predict_f_full_cov(&self, x: &ArrayView2<F>) -> Result<(Array2<F>, Array3<F>)> {
        let terms = self.terms()?;
        let (w, t, mean) = self.project(&terms, x)?;
        let cov = self.params.gp_params.kernel.k(x) - w.t().dot(&w) + t.t().dot(&t);
        Ok((mean, repeat_cov(&cov, self.output_dim())))
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
    Fit<ArrayBase<D, Ix2>, ArrayBase<D, Ix2>, GpError> for SgpValidParams<F, K>
{
    type Object = SparseGaussianProcess<F, K>;

    /// Condition the sparse GP on the training dataset.
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
            "Sparse GP ({:?}) fitted on {} points with {} inducing points",
            self.method,
            x.nrows(),
            inducings.nrows()
        );
        Ok(SparseGaussianProcess {
            params: self.clone(),
            xt: x.to_owned(),
            yt: y.to_owned(),
            inducings,
        })
    }
}

/// Inducing points matrix from its specification, checked against training inputs `xt`
pub(crate) fn resolve_inducings<F: Float>(
    z: &Inducings<F>,
    xt: &ArrayView2<F>,
    seed: Option<u64>,
) -> Result<Array2<F>> {
    z.check()?;
    let z = match z {
        Inducings::Randomized(n) => {
            let mut rng = match seed {
                Some(seed) => Xoshiro256Plus::seed_from_u64(seed),
                None => Xoshiro256Plus::from_entropy(),
            };
            make_inducings(*n, xt, &mut rng)
        }
        Inducings::Located(z) => z.to_owned(),
    };
    check_ncols("inducing points", &z, xt.ncols())?;
    Ok(z)
}

/// Pick `n_inducing` rows of `xt` at random (all rows when `n_inducing` exceeds them)
fn make_inducings<F: Float>(
    n_inducing: usize,
    xt: &ArrayView2<F>,
    rng: &mut Xoshiro256Plus,
) -> Array2<F> {
    let mut indices = (0..xt.nrows()).collect::<Vec<_>>();
    indices.shuffle(rng);
    let n = n_inducing.min(xt.nrows());
    let mut z = Array2::zeros((n, xt.ncols()));
    let idx = indices[..n].to_vec();
    Zip::from(z.rows_mut())
        .and(&Array1::from_vec(idx))
        .for_each(|mut zi, i| zi.assign(&xt.row(*i)));
    z
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::{Matern32, SquaredExponential, White};
    use crate::GaussianProcess;
    use approx::assert_abs_diff_eq;
    use linfa::prelude::Dataset;
    use ndarray::array;
    use ndarray_rand::rand_distr::{StandardNormal, Uniform};
    use ndarray_rand::RandomExt;
    use paste::paste;

    fn training_data() -> (Array2<f64>, Array2<f64>) {
        let mut rng = Xoshiro256Plus::seed_from_u64(0);
        let xt = Array2::random_using((15, 2), Uniform::new(-2., 2.), &mut rng);
        let yt = xt.map_axis(Axis(1), |x| (x[0] * 2f64).sin() + x[1]).insert_axis(Axis(1))
            + Array2::<f64>::random_using((15, 1), StandardNormal, &mut rng) * 0.1;
        (xt, yt)
    }

    macro_rules! test_recover_gpr {
        ($method:ident) => {
            paste! {
                #[test]
                fn [<test_ $method:lower _with_training_inducings_is_gpr>]() {
                    let (xt, yt) = training_data();
                    let kernel = Matern32::new(1.2, array![0.8, 1.5]).unwrap();
                    let likelihood = Gaussian::new(0.05).unwrap();
                    let gp = GaussianProcess::params(kernel.clone())
                        .likelihood(likelihood.clone())
                        .nugget(1e-10)
                        .fit(&Dataset::new(xt.clone(), yt.clone()))
                        .unwrap();
                    let sgp = SparseGaussianProcess::params(kernel, Inducings::Located(xt.clone()))
                        .likelihood(likelihood)
                        .nugget(1e-10)
                        .sparse_method(SparseMethod::$method)
                        .fit(&Dataset::new(xt, yt))
                        .unwrap();
                    let x = array![[0.1, 0.2], [1.5, -1.], [-3., 0.]];
                    let (m1, v1) = gp.predict_f(&x.view()).unwrap();
                    let (m2, v2) = sgp.predict_f(&x.view()).unwrap();
                    assert_abs_diff_eq!(m1, m2, epsilon = 1e-6);
                    assert_abs_diff_eq!(v1, v2, epsilon = 1e-6);
                    assert_abs_diff_eq!(
                        gp.log_marginal_likelihood().unwrap(),
                        sgp.log_likelihood().unwrap(),
                        epsilon = 1e-5
                    );
                }
            }
        };
    }

    test_recover_gpr!(Vfe);
    test_recover_gpr!(Fitc);

    #[test]
    fn test_vfe_bound_below_gpr_evidence() {
        let (xt, yt) = training_data();
        let kernel = SquaredExponential::new(1., array![1.]).unwrap();
        let gp = GaussianProcess::params(kernel.clone())
            .fit(&Dataset::new(xt.clone(), yt.clone()))
            .unwrap();
        let sgp = SparseGaussianProcess::params(kernel, Inducings::Randomized(4))
            .sparse_method(SparseMethod::Vfe)
            .seed(Some(42))
            .fit(&Dataset::new(xt, yt))
            .unwrap();
        assert_eq!(sgp.inducings().dim(), (4, 2));
        assert!(sgp.log_likelihood().unwrap() <= gp.log_marginal_likelihood().unwrap());
    }

    #[test]
    fn test_sparse_full_cov_matches_var() {
        let (xt, yt) = training_data();
        let z = xt.slice(ndarray::s![..5, ..]).to_owned();
        for method in [SparseMethod::Vfe, SparseMethod::Fitc] {
            let sgp = SparseGaussianProcess::params(
                Matern32::default() + White::new(0.01).unwrap(),
                Inducings::Located(z.clone()),
            )
            .sparse_method(method)
            .fit(&Dataset::new(xt.clone(), yt.clone()))
            .unwrap();
            let x = array![[0., 0.], [0.5, 0.5], [1., -1.]];
            let (mean, var) = sgp.predict_f(&x.view()).unwrap();
            let (mean_full, cov) = sgp.predict_f_full_cov(&x.view()).unwrap();
            assert_abs_diff_eq!(mean, mean_full, epsilon = 1e-12);
            assert_abs_diff_eq!(
                cov.index_axis(Axis(0), 0).diag().to_owned(),
                var.column(0),
                epsilon = 1e-10
            );
        }
    }

    #[test]
    fn test_bad_inducings() {
        let (xt, yt) = training_data();
        let res = SparseGaussianProcess::params(
            Matern32::default(),
            Inducings::Located(array![[0.], [1.]]),
        )
        .fit(&Dataset::new(xt, yt));
        assert!(matches!(res, Err(GpError::DimensionError(_))));
    }

    #[test]
    fn test_make_inducings() {
        let xt = Array2::from_shape_fn((10, 2), |(i, j)| (i * 2 + j) as f64);
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let z = make_inducings(3, &xt.view(), &mut rng);
        assert_eq!(z.dim(), (3, 2));
        for row in z.rows() {
            assert!(xt.rows().into_iter().any(|r| r == row));
        }
        let z = make_inducings(20, &xt.view(), &mut rng);
        assert_eq!(z.dim(), (10, 2));
    }
}
