//! Seeded random data sets.
use ndarray::Array2;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use rand_xoshiro::Xoshiro256Plus;

/// Sizes of a check problem
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dims {
    /// Number of input components `D`
    pub input_dim: usize,
    /// Number of outputs `P`
    pub output_dim: usize,
    /// Number of training points `N`
    pub n_train: usize,
    /// Number of test points
    pub n_test: usize,
    /// Number of inducing points `M`, no inducing points are drawn when 0
    pub n_inducings: usize,
    /// Number of drawn samples
    pub n_samples: usize,
}

/// Training, test and inducing data drawn from a standard normal
#[derive(Clone, Debug)]
pub struct Problem {
    /// Training inputs (N, D)
    pub x: Array2<f64>,
    /// Training targets (N, P)
    pub y: Array2<f64>,
    /// Test inputs (Ntest, D)
    pub xtest: Array2<f64>,
    /// Test targets (Ntest, P)
    pub ytest: Array2<f64>,
    /// Inducing points (M, D)
    pub z: Option<Array2<f64>>,
}

/// A seeded generator shared by all draws of a run
///
/// Draws happen strictly in call order so that a given seed always
/// yields the same arrays.
#[derive(Clone, Debug)]
pub struct RandomData {
    rng: Xoshiro256Plus,
}

impl RandomData {
    /// Generator seeded with `seed`
    pub fn new(seed: u64) -> Self {
        RandomData {
            rng: Xoshiro256Plus::seed_from_u64(seed),
        }
    }

    /// A (rows, cols) matrix of standard normal draws
    pub fn randn(&mut self, rows: usize, cols: usize) -> Array2<f64> {
        Array2::random_using((rows, cols), StandardNormal, &mut self.rng)
    }

    /// Draw a problem, in order: X, Y, Xtest, Ytest then Z
    pub fn problem(&mut self, dims: &Dims) -> Problem {
        let x = self.randn(dims.n_train, dims.input_dim);
        let y = self.randn(dims.n_train, dims.output_dim);
        let xtest = self.randn(dims.n_test, dims.input_dim);
        let ytest = self.randn(dims.n_test, dims.output_dim);
        let z = (dims.n_inducings > 0).then(|| self.randn(dims.n_inducings, dims.input_dim));
        Problem {
            x,
            y,
            xtest,
            ytest,
            z,
        }
    }

    /// Underlying generator, used to draw posterior samples
    pub fn rng_mut(&mut self) -> &mut Xoshiro256Plus {
        &mut self.rng
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_draws() {
        let dims = Dims {
            input_dim: 3,
            output_dim: 2,
            n_train: 20,
            n_test: 30,
            n_inducings: 5,
            n_samples: 5,
        };
        let p1 = RandomData::new(0).problem(&dims);
        let p2 = RandomData::new(0).problem(&dims);
        assert_eq!(p1.x, p2.x);
        assert_eq!(p1.ytest, p2.ytest);
        assert_eq!(p1.z, p2.z);
        assert_eq!(p1.x.dim(), (20, 3));
        assert_eq!(p1.y.dim(), (20, 2));
        assert_eq!(p1.xtest.dim(), (30, 3));
        assert_eq!(p1.z.map(|z| z.dim()), Some((5, 3)));
        assert_ne!(RandomData::new(1).problem(&dims).x, p2.x);
    }

    #[test]
    fn test_no_inducings() {
        let dims = Dims {
            input_dim: 2,
            output_dim: 1,
            n_train: 10,
            n_test: 4,
            n_inducings: 0,
            n_samples: 0,
        };
        assert!(RandomData::new(0).problem(&dims).z.is_none());
    }
}
