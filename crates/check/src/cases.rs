//! Check cases and the tables of model setups they run on.
//!
//! Each runner builds one model, queries its predictions and asserts
//! one property. [`run_table`] applies a runner to every setup of a table,
//! on data drawn in order from a single seeded generator.
use crate::checks::{
    check_allclose, check_diag_matches, check_shape, gaussian_log_density, Tolerance,
};
use crate::data::{Dims, Problem, RandomData};
use crate::errors::{HarnessError, Result};
use crate::setup::{Correlation, KernelSpec, ModelKind, ModelSetup};
use gaussbox_gp::kernels::{Kernel, Matern32};
use gaussbox_gp::{GpError, GpPredictor, Inducings, QSqrt, SparseVariationalGaussianProcess};
use linfa::prelude::{Dataset, Fit};
use linfa_linalg::cholesky::Cholesky;
use log::info;
use ndarray::{arr1, Array3, Axis};
use rand_xoshiro::Xoshiro256Plus;

/// Problem sizes of the gaussian likelihood checks
pub const GAUSSIAN_DIMS: Dims = Dims {
    input_dim: 2,
    output_dim: 1,
    n_train: 100,
    n_test: 10,
    n_inducings: 0,
    n_samples: 0,
};

/// Problem sizes of the full covariance checks
pub const FULL_COV_DIMS: Dims = Dims {
    input_dim: 3,
    output_dim: 2,
    n_train: 20,
    n_test: 30,
    n_inducings: 5,
    n_samples: 5,
};

/// Tolerance between diagonal of full covariances and marginal variances
pub const DIAG_TOL: f64 = 1e-10;

/// GPR with a Matern 3/2 plus unit white noise kernel
pub fn gaussian_setup() -> ModelSetup {
    ModelSetup::new(ModelKind::Gpr).kernel(KernelSpec::new(Correlation::Matern32).with_white(1.))
}

/// Every variant with a Matern 3/2 kernel, SVGP with each whiten/q_diag combination
pub fn model_setups() -> Vec<ModelSetup> {
    vec![
        ModelSetup::new(ModelKind::Gpr),
        ModelSetup::new(ModelKind::Svgp).variational(false, true),
        ModelSetup::new(ModelKind::Svgp).variational(true, false),
        ModelSetup::new(ModelKind::Svgp).variational(true, true),
        ModelSetup::new(ModelKind::Svgp).variational(false, false),
        ModelSetup::new(ModelKind::Sgpr),
        ModelSetup::new(ModelKind::Fitc),
        ModelSetup::new(ModelKind::Vgp),
        ModelSetup::new(ModelKind::Gpmc),
        ModelSetup::new(ModelKind::Sgpmc),
    ]
}

/// Predictive means of `f` and `y` are equal, `var_y = var_f + σ²`
pub fn check_mean_and_variance(setup: &ModelSetup, problem: &Problem) -> Result<()> {
    let model = build(setup, problem)?;
    let xtest = problem.xtest.view();
    let (mean_f, var_f) = model.predict_f(&xtest)?;
    let (mean_y, var_y) = model.predict_y(&xtest)?;
    let noise = model.likelihood().variance().scalar_value();
    check_allclose("mean", &mean_f, &mean_y, Tolerance::default())?;
    check_allclose(
        "variance",
        &var_f,
        &var_y.mapv(|v| v - noise),
        Tolerance::default(),
    )?;
    Ok(())
}

/// Log density equals the gaussian density of `predict_y` at the test targets
pub fn check_log_density(setup: &ModelSetup, problem: &Problem) -> Result<()> {
    let model = build(setup, problem)?;
    let xtest = problem.xtest.view();
    let (mean_y, var_y) = model.predict_y(&xtest)?;
    let log_density = model.predict_log_density(&xtest, &problem.ytest.view())?;
    let expected = gaussian_log_density(&mean_y, &var_y, &problem.ytest);
    check_allclose("log density", &log_density, &expected, Tolerance::default())?;
    Ok(())
}

/// Predictions keep working and follow a likelihood variance assigned
/// after construction and frozen
pub fn check_recompute(setup: &ModelSetup, problem: &Problem) -> Result<()> {
    let mut model = build(setup, problem)?;
    let xtest = problem.xtest.view();
    let ytest = problem.ytest.view();
    let (mean_f, var_f) = model.predict_f(&xtest)?;
    model.predict_y(&xtest)?;
    model.predict_log_density(&xtest, &ytest)?;

    let noise = 0.2;
    let variance = model.likelihood_mut().variance_mut();
    variance.assign(noise)?;
    variance.set_trainable(false);

    let (mean_f2, var_f2) = model.predict_f(&xtest)?;
    let (mean_y2, var_y2) = model.predict_y(&xtest)?;
    let log_density = model.predict_log_density(&xtest, &ytest)?;
    check_shape(
        "mean",
        mean_f2.shape(),
        &[problem.xtest.nrows(), problem.ytest.ncols()],
    )?;
    check_allclose("mean", &mean_f2, &mean_y2, Tolerance::default())?;
    check_allclose(
        "variance",
        &var_f2,
        &var_y2.mapv(|v| v - noise),
        Tolerance::default(),
    )?;
    check_allclose(
        "log density",
        &log_density,
        &gaussian_log_density(&mean_y2, &var_y2, &ytest),
        Tolerance::default(),
    )?;
    if !matches!(
        setup.kind,
        ModelKind::Gpr | ModelKind::Sgpr | ModelKind::Fitc
    ) {
        // variational and latent states are set independently of the likelihood
        check_allclose("mean", &mean_f2, &mean_f, Tolerance::default())?;
        check_allclose("variance", &var_f2, &var_f, Tolerance::default())?;
    }
    Ok(())
}

/// Marginal and full covariance predictions agree
pub fn check_full_cov(setup: &ModelSetup, problem: &Problem) -> Result<()> {
    let model = build(setup, problem)?;
    let xtest = problem.xtest.view();
    let (n, p) = (problem.xtest.nrows(), problem.y.ncols());
    let (mean, var) = model.predict_f(&xtest)?;
    let (mean_full, cov) = model.predict_f_full_cov(&xtest)?;
    check_allclose("mean", &mean, &mean_full, Tolerance::absolute(1e-10))?;
    check_shape("covariance", cov.shape(), &[p, n, n])?;
    check_shape("variance", var.shape(), &[n, p])?;
    check_diag_matches(&var, &cov, DIAG_TOL)?;
    Ok(())
}

/// Samples are laid out as (S, Ntest, P)
pub fn check_samples(
    setup: &ModelSetup,
    problem: &Problem,
    n_samples: usize,
    rng: &mut Xoshiro256Plus,
) -> Result<()> {
    let model = build(setup, problem)?;
    let samples = model.predict_f_samples(&problem.xtest.view(), n_samples, rng)?;
    check_shape(
        "samples",
        samples.shape(),
        &[n_samples, problem.xtest.nrows(), problem.y.ncols()],
    )?;
    Ok(())
}

/// Draw lower triangular factors (P, M, M) with a positive diagonal
fn random_lower(data: &mut RandomData, m: usize, p: usize) -> Array3<f64> {
    let mut factors = Array3::zeros((p, m, m));
    for mut l in factors.outer_iter_mut() {
        let draws = data.randn(m, m);
        for ((i, j), v) in l.indexed_iter_mut() {
            if j < i {
                *v = 0.3 * draws[[i, j]];
            } else if i == j {
                *v = 0.1 + 0.5 * draws[[i, j]].abs();
            }
        }
    }
    factors
}

/// SVGP predictions away from the prior state.
///
/// Random whitened variational parameters `q(v) = N(v_mu, Lv Lv^T)`, full and
/// diagonal, are mapped to unwhitened ones `q(u) = N(Lm v_mu, (Lm Lv)(Lm Lv)^T)`
/// with `Lm Lm^T = Kmm`. Both parametrizations must give the same predictions
/// and prior KL, and each one its own full covariance diagonal.
pub fn check_variational_state(problem: &Problem, data: &mut RandomData) -> Result<()> {
    let z = problem
        .z
        .as_ref()
        .ok_or(HarnessError::MissingInducings(ModelKind::Svgp))?;
    let (m, p) = (z.nrows(), problem.y.ncols());
    let kernel = Matern32::<f64>::default();
    let dataset = Dataset::new(problem.x.clone(), problem.y.clone());
    let fit_svgp = |whiten: bool, q_diag: bool| {
        SparseVariationalGaussianProcess::params(kernel.clone(), Inducings::Located(z.to_owned()))
            .whiten(whiten)
            .q_diag(q_diag)
            .fit(&dataset)
    };

    let mut kmm = kernel.k(z);
    let mut unwhite = fit_svgp(false, false)?;
    kmm.diag_mut().mapv_inplace(|v| v + unwhite.nugget());
    let lm = kmm.cholesky().map_err(GpError::from)?;

    let v_mu = data.randn(m, p);
    let full = random_lower(data, m, p);
    let diag = data.randn(m, p).mapv(|v| 0.1 + 0.5 * v.abs());
    let xtest = problem.xtest.view();
    let tol = Tolerance::default();

    for q_diag in [false, true] {
        let mut white = fit_svgp(true, q_diag)?;
        white.set_q_mu(v_mu.clone())?;
        let mut lu = Array3::zeros((p, m, m));
        if q_diag {
            white.set_q_sqrt(QSqrt::Diag(diag.clone()))?;
            for (i, mut l) in lu.outer_iter_mut().enumerate() {
                l.assign(&(&lm * &diag.column(i).insert_axis(Axis(0))));
            }
        } else {
            white.set_q_sqrt(QSqrt::Full(full.clone()))?;
            for (i, mut l) in lu.outer_iter_mut().enumerate() {
                l.assign(&lm.dot(&full.index_axis(Axis(0), i)));
            }
        }
        unwhite.set_q_mu(lm.dot(&v_mu))?;
        unwhite.set_q_sqrt(QSqrt::Full(lu))?;

        let (mean_w, var_w) = white.predict_f(&xtest)?;
        let (_, cov_w) = white.predict_f_full_cov(&xtest)?;
        let (mean_u, var_u) = unwhite.predict_f(&xtest)?;
        let (_, cov_u) = unwhite.predict_f_full_cov(&xtest)?;
        check_diag_matches(&var_w, &cov_w, DIAG_TOL)?;
        check_diag_matches(&var_u, &cov_u, DIAG_TOL)?;
        check_allclose("mean", &mean_u, &mean_w, tol)?;
        check_allclose("variance", &var_u, &var_w, tol)?;
        check_allclose("covariance", &cov_u, &cov_w, tol)?;
        let kl_u = arr1(&[unwhite.prior_kl()?]);
        check_allclose("prior kl", &kl_u, &arr1(&[white.prior_kl()?]), tol)?;
        info!("SVGP whitened and unwhitened states agree (q_diag={q_diag})");
    }
    Ok(())
}

fn build(setup: &ModelSetup, problem: &Problem) -> Result<Box<dyn GpPredictor<f64>>> {
    setup.build(&problem.x, &problem.y, problem.z.as_ref())
}

/// Run `case` for every setup, each on a fresh problem drawn from `data`.
///
/// Stops at the first failing case and returns the number of passed ones otherwise.
pub fn run_table<C>(
    setups: &[ModelSetup],
    dims: &Dims,
    data: &mut RandomData,
    mut case: C,
) -> Result<usize>
where
    C: FnMut(&ModelSetup, &Problem, &mut RandomData) -> Result<()>,
{
    for setup in setups {
        let problem = data.problem(dims);
        case(setup, &problem, data).map_err(|err| HarnessError::CaseError {
            case: setup.to_string(),
            source: Box::new(err),
        })?;
        info!("{setup} passed");
    }
    Ok(setups.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables() {
        let setups = model_setups();
        assert_eq!(setups.len(), 10);
        let svgps = setups.iter().filter(|s| s.kind == ModelKind::Svgp).count();
        assert_eq!(svgps, 4);
        assert_eq!(gaussian_setup().kernel.white, Some(1.));
    }

    #[test]
    fn test_run_table_reports_case() {
        let setups = [ModelSetup::new(ModelKind::Sgpr)];
        let dims = Dims {
            n_inducings: 0,
            ..FULL_COV_DIMS
        };
        let res = run_table(&setups, &dims, &mut RandomData::new(0), |s, p, _| {
            check_full_cov(s, p)
        });
        match res {
            Err(HarnessError::CaseError { case, source }) => {
                assert_eq!(case, "SGPR[Matern32]");
                assert!(matches!(
                    *source,
                    HarnessError::MissingInducings(ModelKind::Sgpr)
                ));
            }
            res => panic!("unexpected {res:?}"),
        }
    }
}
