use gaussbox_gp::kernels::SquaredExponential;
use gaussbox_gp::{
    Gaussian, GaussianProcess, GpPredictor, Inducings, SparseGaussianProcess, SparseMethod,
};
use linfa::prelude::*;
use ndarray::{array, concatenate, Array, Array2, Axis};

fn xsinx(x: &Array2<f64>) -> Array2<f64> {
    (x - 3.5) * ((x - 3.5) / std::f64::consts::PI).mapv(|v| v.sin())
}

fn main() {
    let xt = Array::linspace(0., 25., 40).insert_axis(Axis(1));
    let yt = xsinx(&xt);
    let kernel = SquaredExponential::new(100., array![0.3]).expect("valid kernel");
    let likelihood = Gaussian::new(1e-4).expect("valid noise");

    println!("Train GP surrogates of 'xsinx' on {} points", xt.nrows());
    let gpr = GaussianProcess::params(kernel.clone())
        .likelihood(likelihood.clone())
        .fit(&Dataset::new(xt.clone(), yt.clone()))
        .expect("GPR fitting");
    let sgpr = SparseGaussianProcess::params(kernel.clone(), Inducings::Randomized(10))
        .likelihood(likelihood.clone())
        .sparse_method(SparseMethod::Vfe)
        .seed(Some(42))
        .fit(&Dataset::new(xt.clone(), yt.clone()))
        .expect("SGPR fitting");
    let fitc = SparseGaussianProcess::params(kernel, Inducings::Randomized(10))
        .likelihood(likelihood)
        .seed(Some(42))
        .fit(&Dataset::new(xt, yt))
        .expect("FITC fitting");

    let xtest = Array::linspace(0., 25., 26).insert_axis(Axis(1));
    let ytest = xsinx(&xtest);
    let models: [&dyn GpPredictor<f64>; 3] = [&gpr, &sgpr, &fitc];
    for model in models {
        let (mean, var) = model.predict_f(&xtest.view()).expect("prediction");
        println!("{model}");
        println!("Prediction errors and standard deviations (x, err(x), sigma(x))");
        println!(
            "{}",
            concatenate![Axis(1), xtest, mean - &ytest, var.mapv(|v| v.sqrt())]
        );
    }
}
