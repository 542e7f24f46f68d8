use criterion::{criterion_group, criterion_main, Criterion};
use gaussbox_gp::kernels::{Matern32, White};
use gaussbox_gp::{
    GaussianProcess, GpPredictor, Inducings, SparseGaussianProcess,
    SparseVariationalGaussianProcess,
};
use linfa::prelude::{Dataset, Fit};
use ndarray::Array2;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use rand_xoshiro::Xoshiro256Plus;

fn criterion_predict(c: &mut Criterion) {
    let dims = [2, 5];
    let nts = [100, 400];

    let mut group = c.benchmark_group("predict");
    group.sample_size(20);
    for (&dim, &nt) in dims.iter().zip(nts.iter()) {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let xt = Array2::<f64>::random_using((nt, dim), StandardNormal, &mut rng);
        let yt = Array2::<f64>::random_using((nt, 2), StandardNormal, &mut rng);
        let xtest = Array2::<f64>::random_using((50, dim), StandardNormal, &mut rng);
        let dataset = Dataset::new(xt, yt);
        let kernel = Matern32::default() + White::new(0.01).expect("valid noise");

        let gpr = GaussianProcess::params(kernel.clone())
            .fit(&dataset)
            .expect("GPR fit error");
        let sgpr = SparseGaussianProcess::params(kernel.clone(), Inducings::Randomized(20))
            .seed(Some(42))
            .fit(&dataset)
            .expect("SGPR fit error");
        let svgp = SparseVariationalGaussianProcess::params(kernel, Inducings::Randomized(20))
            .seed(Some(42))
            .fit(&dataset)
            .expect("SVGP fit error");

        let models: [(&str, &dyn GpPredictor<f64>); 3] =
            [("gpr", &gpr), ("sgpr", &sgpr), ("svgp", &svgp)];
        for (name, model) in models {
            group.bench_function(format!("{name} full cov {dim}x{nt}"), |b| {
                b.iter(|| {
                    std::hint::black_box(
                        model
                            .predict_f_full_cov(&xtest.view())
                            .expect("prediction error"),
                    )
                });
            });
        }
    }
    group.finish();
}

criterion_group!(benches, criterion_predict);
criterion_main!(benches);
