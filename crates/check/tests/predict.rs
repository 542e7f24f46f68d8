use approx::assert_abs_diff_eq;
use gaussbox_check::cases::{
    check_full_cov, check_log_density, check_mean_and_variance, check_recompute, check_samples,
    check_variational_state, gaussian_setup, model_setups, FULL_COV_DIMS, GAUSSIAN_DIMS,
};
use gaussbox_check::{run_table, Dims, HarnessError, ModelKind, ModelSetup, RandomData};
use paste::paste;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_gaussian_mean_and_variance() {
    init();
    let mut data = RandomData::new(0);
    let problem = data.problem(&GAUSSIAN_DIMS);
    let model = gaussian_setup()
        .build(&problem.x, &problem.y, None)
        .expect("GPR built");
    let xtest = problem.xtest.view();
    let (mu_f, var_f) = model.predict_f(&xtest).expect("predict_f");
    let (mu_y, var_y) = model.predict_y(&xtest).expect("predict_y");
    assert_eq!(mu_f.dim(), (10, 1));
    assert_abs_diff_eq!(mu_f, mu_y, epsilon = 1e-12);
    assert_abs_diff_eq!(var_f, var_y.mapv(|v| v - 1.), epsilon = 1e-12);
    // white noise is part of the latent variance
    assert!(var_f.iter().all(|&v| v > 1.));

    check_mean_and_variance(&gaussian_setup(), &problem).expect("mean and variance");
}

#[test]
fn test_gaussian_log_density() {
    init();
    let mut data = RandomData::new(0);
    let problem = data.problem(&GAUSSIAN_DIMS);
    check_log_density(&gaussian_setup(), &problem).expect("log density");
}

#[test]
fn test_gaussian_recompute() {
    init();
    let mut data = RandomData::new(0);
    let problem = data.problem(&GAUSSIAN_DIMS);
    let mut model = gaussian_setup()
        .build(&problem.x, &problem.y, None)
        .expect("GPR built");
    let xtest = problem.xtest.view();
    let (_, var_before) = model.predict_y(&xtest).expect("predict_y");

    let variance = model.likelihood_mut().variance_mut();
    variance.assign(0.2).expect("positive variance");
    variance.set_trainable(false);

    let (_, var_f) = model.predict_f(&xtest).expect("predict_f");
    let (_, var_y) = model.predict_y(&xtest).expect("predict_y");
    model
        .predict_log_density(&xtest, &problem.ytest.view())
        .expect("log density");
    assert_abs_diff_eq!(var_y, var_f.mapv(|v| v + 0.2), epsilon = 1e-12);
    assert!(var_y
        .iter()
        .zip(var_before.iter())
        .all(|(after, before)| after < before));

    let trainable: Vec<String> = model
        .trainable_parameters()
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert!(!trainable.contains(&"likelihood.variance".to_string()));
    assert!(trainable.contains(&"kernel.kernels[0].theta".to_string()));

    check_recompute(&gaussian_setup(), &problem).expect("recompute");
}

#[test]
fn test_invalid_assignment_keeps_model_usable() {
    let mut data = RandomData::new(0);
    let problem = data.problem(&GAUSSIAN_DIMS);
    let mut model = gaussian_setup()
        .build(&problem.x, &problem.y, None)
        .expect("GPR built");
    assert!(model.likelihood_mut().variance_mut().assign(-1.).is_err());
    assert_eq!(model.likelihood().variance().scalar_value(), 1.);
    assert!(model.predict_y(&problem.xtest.view()).is_ok());
}

#[test]
fn test_other_models_full_cov() {
    init();
    let mut data = RandomData::new(0);
    let passed = run_table(&model_setups(), &FULL_COV_DIMS, &mut data, |setup, problem, _| {
        check_full_cov(setup, problem)
    })
    .expect("full covariance");
    assert_eq!(passed, 10);
}

#[test]
fn test_other_models_full_cov_samples() {
    init();
    let mut data = RandomData::new(0);
    let passed = run_table(
        &model_setups(),
        &FULL_COV_DIMS,
        &mut data,
        |setup, problem, data| {
            check_samples(setup, problem, FULL_COV_DIMS.n_samples, data.rng_mut())
        },
    )
    .expect("samples");
    assert_eq!(passed, 10);
}

#[test]
fn test_other_models_log_density() {
    init();
    let mut data = RandomData::new(0);
    run_table(&model_setups(), &FULL_COV_DIMS, &mut data, |setup, problem, _| {
        check_log_density(setup, problem)
    })
    .expect("log density");
}

#[test]
fn test_other_models_recompute() {
    init();
    let mut data = RandomData::new(0);
    run_table(&model_setups(), &FULL_COV_DIMS, &mut data, |setup, problem, _| {
        check_recompute(setup, problem)
    })
    .expect("recompute");
}

#[test]
fn test_svgp_variational_state() {
    init();
    let mut data = RandomData::new(0);
    for i in 0..3 {
        let problem = data.problem(&FULL_COV_DIMS);
        check_variational_state(&problem, &mut data)
            .unwrap_or_else(|err| panic!("problem {i}: {err}"));
    }
    let problem = data.problem(&Dims {
        n_inducings: 0,
        ..FULL_COV_DIMS
    });
    assert!(matches!(
        check_variational_state(&problem, &mut data),
        Err(HarnessError::MissingInducings(ModelKind::Svgp))
    ));
}

#[test]
fn test_missing_inducings() {
    let mut data = RandomData::new(0);
    let problem = data.problem(&FULL_COV_DIMS);
    for setup in model_setups() {
        let res = setup.build(&problem.x, &problem.y, None);
        if setup.kind.requires_inducings() {
            assert!(matches!(res, Err(HarnessError::MissingInducings(kind)) if kind == setup.kind));
        } else {
            assert!(res.is_ok());
        }
    }
}

macro_rules! test_variant {
    ($kind:ident) => {
        paste! {
            #[test]
            fn [<test_ $kind:snake _mean_and_variance>]() {
                init();
                let mut data = RandomData::new(0);
                let setups = [
                    ModelSetup::new(ModelKind::$kind),
                    ModelSetup::new(ModelKind::$kind).likelihood_variance(0.2),
                ];
                let passed = run_table(&setups, &FULL_COV_DIMS, &mut data, |setup, problem, _| {
                    check_mean_and_variance(setup, problem)
                })
                .expect("mean and variance");
                assert_eq!(passed, 2);
            }

            #[test]
            fn [<test_ $kind:snake _seeded_samples>]() {
                let mut data = RandomData::new(0);
                let problem = data.problem(&FULL_COV_DIMS);
                let model = ModelSetup::new(ModelKind::$kind)
                    .build(&problem.x, &problem.y, problem.z.as_ref())
                    .expect("model built");
                let xtest = problem.xtest.view();
                let s1 = model
                    .predict_f_samples(&xtest, 3, RandomData::new(7).rng_mut())
                    .expect("samples");
                let s2 = model
                    .predict_f_samples(&xtest, 3, RandomData::new(7).rng_mut())
                    .expect("samples");
                let s3 = model
                    .predict_f_samples(&xtest, 3, RandomData::new(8).rng_mut())
                    .expect("samples");
                assert_eq!(s1.dim(), (3, 30, 2));
                assert_eq!(s1, s2);
                assert_ne!(s1, s3);
            }
        }
    };
}

test_variant!(Gpr);
test_variant!(Sgpr);
test_variant!(Fitc);
test_variant!(Svgp);
test_variant!(Vgp);
test_variant!(Gpmc);
test_variant!(Sgpmc);
