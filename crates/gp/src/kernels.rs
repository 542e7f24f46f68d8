//! Covariance functions (kernels) used as GP priors.
//!
//! A [`Stationary`] kernel is the product of a variance and one of the following
//! correlation models:
//! * squared exponential,
//! * absolute exponential,
//! * matern 3/2,
//! * matern 5/2.
//!
//! A [`White`] noise kernel and the [`Sum`] of two kernels (built with `+`) complete the set.
//!
//! ```
//! use gaussbox_gp::kernels::{Kernel, Matern32, White};
//! use ndarray::array;
//!
//! let kernel = Matern32::default() + White::default();
//! let x = array![[0., 0.], [1., 2.]];
//! let k = kernel.k(&x);
//! assert_eq!(k[[0, 0]], 2.);
//! ```

use crate::errors::{GpError, Result};
use crate::hyperparameters::Hyperparameter;
use linfa::Float;
use ndarray::{array, Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2, Zip};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;
use std::ops::Add;

/// A trait for correlation models used by stationary kernels
pub trait CorrelationModel<F: Float>:
    Clone + Copy + Default + fmt::Debug + fmt::Display + Send + Sync
{
    /// Compute correlation values r(x, x') given differences `d` between x and x'
    /// and `theta` parameters, where:
    /// `d`     : differences (nxd)
    /// `theta` : inverse length scales (d)
    /// Returns the n correlation values.
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array1<F>;
}

/// Squared exponential correlation models
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(into = "String"),
    serde(try_from = "String")
)]
pub struct SquaredExponentialCorr();

impl From<SquaredExponentialCorr> for String {
    fn from(_item: SquaredExponentialCorr) -> String {
        "SquaredExponential".to_string()
    }
}

impl TryFrom<String> for SquaredExponentialCorr {
    type Error = &'static str;
    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        if s == "SquaredExponential" {
            Ok(Self::default())
        } else {
            Err("Bad string value for SquaredExponentialCorr, should be \'SquaredExponential\'")
        }
    }
}

impl<F: Float> CorrelationModel<F> for SquaredExponentialCorr {
    ///  d
    /// prod exp( - |theta_j * d_j|^2 / 2 )
    /// j=1
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array1<F> {
        let theta2 = theta.mapv(|v| v * v);
        let r = d.mapv(|v| v * v).dot(&theta2);
        r.mapv(|v| (F::cast(-0.5) * v).exp())
    }
}

impl fmt::Display for SquaredExponentialCorr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SquaredExponential")
    }
}

/// Absolute exponential correlation models
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(into = "String"),
    serde(try_from = "String")
)]
pub struct AbsoluteExponentialCorr();

impl From<AbsoluteExponentialCorr> for String {
    fn from(_item: AbsoluteExponentialCorr) -> String {
        "AbsoluteExponential".to_string()
    }
}

impl TryFrom<String> for AbsoluteExponentialCorr {
    type Error = &'static str;
    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        if s == "AbsoluteExponential" {
            Ok(Self::default())
        } else {
            Err("Bad string value for AbsoluteExponentialCorr, should be \'AbsoluteExponential\'")
        }
    }
}

impl<F: Float> CorrelationModel<F> for AbsoluteExponentialCorr {
    ///  d
    /// prod exp( - theta_j * |d_j| )
    /// j=1
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array1<F> {
        let r = d.mapv(|v| v.abs()).dot(theta);
        r.mapv(|v| (-v).exp())
    }
}

impl fmt::Display for AbsoluteExponentialCorr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "AbsoluteExponential")
    }
}

/// Matern 3/2 correlation model
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(into = "String"),
    serde(try_from = "String")
)]
pub struct Matern32Corr();

impl From<Matern32Corr> for String {
    fn from(_item: Matern32Corr) -> String {
        "Matern32".to_string()
    }
}

impl TryFrom<String> for Matern32Corr {
    type Error = &'static str;
    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        if s == "Matern32" {
            Ok(Self::default())
        } else {
            Err("Bad string value for Matern32Corr, should be \'Matern32\'")
        }
    }
}

impl<F: Float> CorrelationModel<F> for Matern32Corr {
    ///   d                                  d
    /// prod (1 + sqrt(3) * theta_j * |d_j|) exp( - sum sqrt(3) * theta_j * |d_j| )
    ///  j=1                                j=1
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array1<F> {
        let sqrt3 = F::cast(3.).sqrt();
        let td = d.mapv(|v| v.abs()) * theta;
        let a = td.map_axis(Axis(1), |row| {
            row.fold(F::one(), |acc, v| acc * (F::one() + sqrt3 * *v))
        });
        let b = td.sum_axis(Axis(1)).mapv(|v| (-sqrt3 * v).exp());
        a * b
    }
}

impl fmt::Display for Matern32Corr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Matern32")
    }
}

/// Matern 5/2 correlation model
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(into = "String"),
    serde(try_from = "String")
)]
pub struct Matern52Corr();

impl From<Matern52Corr> for String {
    fn from(_item: Matern52Corr) -> String {
        "Matern52".to_string()
    }
}

impl TryFrom<String> for Matern52Corr {
    type Error = &'static str;
    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        if s == "Matern52" {
            Ok(Self::default())
        } else {
            Err("Bad string value for Matern52Corr, should be \'Matern52\'")
        }
    }
}

impl<F: Float> CorrelationModel<F> for Matern52Corr {
    ///   d                                                              d
    /// prod (1 + sqrt(5) * theta_j * |d_j| + 5/3 * (theta_j * d_j)^2) exp( - sum sqrt(5) * theta_j * |d_j| )
    ///  j=1                                                            j=1
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array1<F> {
        let sqrt5 = F::cast(5.).sqrt();
        let div5_3 = F::cast(5. / 3.);
        let td = d.mapv(|v| v.abs()) * theta;
        let a = td.map_axis(Axis(1), |row| {
            row.fold(F::one(), |acc, v| {
                acc * (F::one() + sqrt5 * *v + div5_3 * *v * *v)
            })
        });
        let b = td.sum_axis(Axis(1)).mapv(|v| (-sqrt5 * v).exp());
        a * b
    }
}

impl fmt::Display for Matern52Corr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Matern52")
    }
}

/// A covariance function k(x, x')
pub trait Kernel<F: Float>: Clone + fmt::Debug + fmt::Display + Send + Sync {
    /// Symmetric covariance matrix K(x, x) (nxn)
    fn k(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F>;

    /// Cross covariance matrix K(a, b) (naxnb)
    ///
    /// Points are never considered identical across the two sets,
    /// so noise kernels contribute zero here.
    fn k_cross(
        &self,
        a: &ArrayBase<impl Data<Elem = F>, Ix2>,
        b: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Array2<F>;

    /// Diagonal of K(x, x) (n)
    fn k_diag(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F>;

    /// Check the kernel can handle inputs with `nx` components
    fn check_input_dim(&self, _nx: usize) -> Result<()> {
        Ok(())
    }

    /// Hyperparameters with their names
    fn parameters(&self) -> Vec<(String, &Hyperparameter<F>)>;

    /// Mutable hyperparameters with their names
    fn parameters_mut(&mut self) -> Vec<(String, &mut Hyperparameter<F>)>;
}

/// Stationary kernel `variance * corr(x - x'; theta)`
///
/// `theta` holds inverse length scales, either one value shared by all input
/// components or one value per component.
///
/// Matern correlations are products of one dimensional Matern terms over the
/// input components, not functions of the scaled Euclidean distance. Both
/// forms agree for one dimensional inputs only.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(
        serialize = "F: Serialize, Corr: Serialize",
        deserialize = "F: Deserialize<'de>, Corr: Deserialize<'de>"
    ))
)]
pub struct Stationary<F: Float, Corr: CorrelationModel<F>> {
    corr: Corr,
    variance: Hyperparameter<F>,
    theta: Hyperparameter<F>,
}

/// Squared exponential kernel
pub type SquaredExponential<F> = Stationary<F, SquaredExponentialCorr>;
/// Absolute exponential kernel
pub type AbsoluteExponential<F> = Stationary<F, AbsoluteExponentialCorr>;
/// Matern 3/2 kernel
pub type Matern32<F> = Stationary<F, Matern32Corr>;
/// Matern 5/2 kernel
pub type Matern52<F> = Stationary<F, Matern52Corr>;

impl<F: Float, Corr: CorrelationModel<F>> Default for Stationary<F, Corr> {
    fn default() -> Self {
        Stationary {
            corr: Corr::default(),
            variance: Hyperparameter::constant(array![F::one()]),
            theta: Hyperparameter::constant(array![F::one()]),
        }
    }
}

impl<F: Float, Corr: CorrelationModel<F>> Stationary<F, Corr> {
    /// Kernel with given `variance` and inverse length scales `theta`
    pub fn new(variance: F, theta: Array1<F>) -> Result<Self> {
        Ok(Stationary {
            corr: Corr::default(),
            variance: Hyperparameter::try_scalar(variance)?,
            theta: Hyperparameter::try_new(theta)?,
        })
    }

    /// Correlation model
    pub fn corr(&self) -> &Corr {
        &self.corr
    }

    /// Kernel variance
    pub fn variance(&self) -> &Hyperparameter<F> {
        &self.variance
    }

    /// Mutable kernel variance
    pub fn variance_mut(&mut self) -> &mut Hyperparameter<F> {
        &mut self.variance
    }

    /// Inverse length scales
    pub fn theta(&self) -> &Hyperparameter<F> {
        &self.theta
    }

    /// Mutable inverse length scales
    pub fn theta_mut(&mut self) -> &mut Hyperparameter<F> {
        &mut self.theta
    }

    /// Length scales, the inverse of `theta`
    pub fn lengthscales(&self) -> Array1<F> {
        self.theta.value().mapv(|v| F::one() / v)
    }

    fn theta_for(&self, nx: usize) -> Array1<F> {
        if self.theta.len() == 1 {
            Array1::from_elem(nx, self.theta.scalar_value())
        } else {
            self.theta.value().to_owned()
        }
    }
}

impl<F: Float, Corr: CorrelationModel<F>> Kernel<F> for Stationary<F, Corr> {
    fn k(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        self.k_cross(x, x)
    }

    fn k_cross(
        &self,
        a: &ArrayBase<impl Data<Elem = F>, Ix2>,
        b: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Array2<F> {
        let theta = self.theta_for(a.ncols());
        let variance = self.variance.scalar_value();
        let mut k = Array2::zeros((a.nrows(), b.nrows()));
        Zip::from(k.rows_mut())
            .and(a.rows())
            .for_each(|mut k_i, a_i| {
                // correlations only depend on |d| so the sign of d is irrelevant
                let d = b - &a_i;
                let r = self.corr.value(&d, &theta);
                k_i.assign(&r.mapv(|v| variance * v));
            });
        k
    }

    fn k_diag(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F> {
        Array1::from_elem(x.nrows(), self.variance.scalar_value())
    }

    fn check_input_dim(&self, nx: usize) -> Result<()> {
        if self.theta.len() != 1 && self.theta.len() != nx {
            return Err(GpError::DimensionError(format!(
                "{} kernel has {} length scales, inputs have {} components",
                self.corr,
                self.theta.len(),
                nx
            )));
        }
        Ok(())
    }

    fn parameters(&self) -> Vec<(String, &Hyperparameter<F>)> {
        vec![
            ("variance".to_string(), &self.variance),
            ("theta".to_string(), &self.theta),
        ]
    }

    fn parameters_mut(&mut self) -> Vec<(String, &mut Hyperparameter<F>)> {
        vec![
            ("variance".to_string(), &mut self.variance),
            ("theta".to_string(), &mut self.theta),
        ]
    }
}

impl<F: Float, Corr: CorrelationModel<F>> fmt::Display for Stationary<F, Corr> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}(variance={}, theta={})",
            self.corr, self.variance, self.theta
        )
    }
}

/// White noise kernel `variance * I`
///
/// Only contributes to the covariance of a point set with itself.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(serialize = "F: Serialize", deserialize = "F: Deserialize<'de>"))
)]
pub struct White<F: Float> {
    variance: Hyperparameter<F>,
}

impl<F: Float> Default for White<F> {
    fn default() -> Self {
        White {
            variance: Hyperparameter::constant(array![F::one()]),
        }
    }
}

impl<F: Float> White<F> {
    /// White noise with given `variance`
    pub fn new(variance: F) -> Result<Self> {
        Ok(White {
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
}

impl<F: Float> Kernel<F> for White<F> {
    fn k(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        Array2::eye(x.nrows()) * self.variance.scalar_value()
    }

    fn k_cross(
        &self,
        a: &ArrayBase<impl Data<Elem = F>, Ix2>,
        b: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Array2<F> {
        Array2::zeros((a.nrows(), b.nrows()))
    }

    fn k_diag(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F> {
        Array1::from_elem(x.nrows(), self.variance.scalar_value())
    }

    fn parameters(&self) -> Vec<(String, &Hyperparameter<F>)> {
        vec![("variance".to_string(), &self.variance)]
    }

    fn parameters_mut(&mut self) -> Vec<(String, &mut Hyperparameter<F>)> {
        vec![("variance".to_string(), &mut self.variance)]
    }
}

impl<F: Float> fmt::Display for White<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "White(variance={})", self.variance)
    }
}

/// Sum of two kernels, usually built with `k1 + k2`
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Sum<K1, K2> {
    k1: K1,
    k2: K2,
}

impl<K1, K2> Sum<K1, K2> {
    /// Kernel `k1 + k2`
    pub fn new(k1: K1, k2: K2) -> Self {
        Sum { k1, k2 }
    }

    /// Left kernel
    pub fn left(&self) -> &K1 {
        &self.k1
    }

    /// Mutable left kernel
    pub fn left_mut(&mut self) -> &mut K1 {
        &mut self.k1
    }

    /// Right kernel
    pub fn right(&self) -> &K2 {
        &self.k2
    }

    /// Mutable right kernel
    pub fn right_mut(&mut self) -> &mut K2 {
        &mut self.k2
    }
}

impl<F: Float, K1: Kernel<F>, K2: Kernel<F>> Kernel<F> for Sum<K1, K2> {
    fn k(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        self.k1.k(x) + self.k2.k(x)
    }

    fn k_cross(
        &self,
        a: &ArrayBase<impl Data<Elem = F>, Ix2>,
        b: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Array2<F> {
        self.k1.k_cross(a, b) + self.k2.k_cross(a, b)
    }

    fn k_diag(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F> {
        self.k1.k_diag(x) + self.k2.k_diag(x)
    }

    fn check_input_dim(&self, nx: usize) -> Result<()> {
        self.k1.check_input_dim(nx)?;
        self.k2.check_input_dim(nx)
    }

    fn parameters(&self) -> Vec<(String, &Hyperparameter<F>)> {
        let mut params = prefixed("kernels[0]", self.k1.parameters());
        params.extend(prefixed("kernels[1]", self.k2.parameters()));
        params
    }

    fn parameters_mut(&mut self) -> Vec<(String, &mut Hyperparameter<F>)> {
        let mut params = prefixed("kernels[0]", self.k1.parameters_mut());
        params.extend(prefixed("kernels[1]", self.k2.parameters_mut()));
        params
    }
}

impl<K1: fmt::Display, K2: fmt::Display> fmt::Display for Sum<K1, K2> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Sum({}, {})", self.k1, self.k2)
    }
}

fn prefixed<T>(prefix: &str, params: Vec<(String, T)>) -> Vec<(String, T)> {
    params
        .into_iter()
        .map(|(name, p)| (format!("{prefix}.{name}"), p))
        .collect()
}

impl<F: Float, Corr: CorrelationModel<F>, Rhs> Add<Rhs> for Stationary<F, Corr> {
    type Output = Sum<Self, Rhs>;
    fn add(self, rhs: Rhs) -> Self::Output {
        Sum::new(self, rhs)
    }
}

impl<F: Float, Rhs> Add<Rhs> for White<F> {
    type Output = Sum<Self, Rhs>;
    fn add(self, rhs: Rhs) -> Self::Output {
        Sum::new(self, rhs)
    }
}

impl<K1, K2, Rhs> Add<Rhs> for Sum<K1, K2> {
    type Output = Sum<Self, Rhs>;
    fn add(self, rhs: Rhs) -> Self::Output {
        Sum::new(self, rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use paste::paste;

    #[test]
    fn test_squared_exponential() {
        // pairwise differences of [[4.5], [1.2], [2.0], [3.0], [4.0]] against the first point
        let d = array![[3.3], [2.5], [1.5], [0.5]];
        let res = SquaredExponentialCorr::default().value(&d, &array![f64::sqrt(0.2)]);
        let expected = array![0.336552878364737, 0.5352614285189903, 0.7985162187593771, 0.9753099120283326];
        assert_abs_diff_eq!(res, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_squared_exponential_2d() {
        let d = array![[2., 2.], [4., 4.], [2., 2.]];
        let res = SquaredExponentialCorr::default().value(&d, &array![f64::sqrt(2.), 2.]);
        let expected = array![6.14421235e-06, 1.42516408e-21, 6.14421235e-06];
        assert_abs_diff_eq!(res, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_matern32_2d() {
        let d = array![[2., 2.], [4., 4.], [2., 2.]];
        let res = Matern32Corr::default().value(&d, &array![1., 2.]);
        let expected = array![1.08539595e-03, 1.10776401e-07, 1.08539595e-03];
        assert_abs_diff_eq!(res, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_matern52_2d() {
        let d = array![[2., 2.], [4., 4.], [2., 2.]];
        let res = Matern52Corr::default().value(&d, &array![1., 2.]);
        let expected = array![6.62391590e-04, 1.02117882e-08, 6.62391590e-04];
        assert_abs_diff_eq!(res, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_matern_product_form() {
        // one dimensional terms multiply, the Euclidean distance is not used
        let d = array![[1., 1.]];
        let theta = array![1., 1.];
        let m32 = |t: f64| (1. + 3f64.sqrt() * t) * (-(3f64.sqrt()) * t).exp();
        let res = Matern32Corr::default().value(&d, &theta);
        assert_abs_diff_eq!(res[0], m32(1.) * m32(1.), epsilon = 1e-12);
        let euclidean = m32(2f64.sqrt());
        assert!((res[0] - euclidean).abs() > 1e-3);

        let m52 = |t: f64| (1. + 5f64.sqrt() * t + 5. / 3. * t * t) * (-(5f64.sqrt()) * t).exp();
        let res = Matern52Corr::default().value(&d, &theta);
        assert_abs_diff_eq!(res[0], m52(1.) * m52(1.), epsilon = 1e-12);
    }

    #[test]
    fn test_absolute_exponential_2d() {
        let d = array![[1., -2.], [0., 0.]];
        let res = AbsoluteExponentialCorr::default().value(&d, &array![1., 0.5]);
        assert_abs_diff_eq!(res, array![(-2f64).exp(), 1.], epsilon = 1e-12);
    }

    macro_rules! test_stationary {
        ($kernel:ident) => {
            paste! {
                #[test]
                fn [<test_ $kernel:snake _matrix>]() {
                    let kernel = $kernel::new(2., array![0.5, 2.]).unwrap();
                    let x = array![[0., 0.], [1., 0.3], [-0.4, 2.], [0.7, 0.7]];
                    let k = kernel.k(&x);
                    assert_eq!(k.dim(), (4, 4));
                    assert_abs_diff_eq!(k, k.t(), epsilon = 1e-15);
                    assert_abs_diff_eq!(k.diag(), kernel.k_diag(&x), epsilon = 1e-15);
                    let k_cross = kernel.k_cross(&x.slice(ndarray::s![..2, ..]), &x);
                    assert_abs_diff_eq!(k_cross, k.slice(ndarray::s![..2, ..]), epsilon = 1e-15);
                    assert!(k.iter().all(|v| *v > 0. && *v <= 2.));
                }
            }
        };
    }

    test_stationary!(SquaredExponential);
    test_stationary!(AbsoluteExponential);
    test_stationary!(Matern32);
    test_stationary!(Matern52);

    #[test]
    fn test_isotropic_theta_broadcast() {
        let iso = Matern52::new(1.5, array![0.8]).unwrap();
        let ard = Matern52::new(1.5, array![0.8, 0.8, 0.8]).unwrap();
        let x = array![[0., 1., 2.], [0.5, -1., 0.2]];
        assert_abs_diff_eq!(iso.k(&x), ard.k(&x), epsilon = 1e-15);
        assert!(iso.check_input_dim(3).is_ok());
        assert!(ard.check_input_dim(3).is_ok());
        assert!(matches!(
            ard.check_input_dim(2),
            Err(GpError::DimensionError(_))
        ));
    }

    #[test]
    fn test_white() {
        let white = White::new(0.3).unwrap();
        let x = array![[0.], [0.], [1.]];
        assert_abs_diff_eq!(white.k(&x), Array2::<f64>::eye(3) * 0.3);
        // identical locations in distinct sets do not correlate
        assert_abs_diff_eq!(white.k_cross(&x, &x), Array2::zeros((3, 3)));
        assert_abs_diff_eq!(white.k_diag(&x), array![0.3, 0.3, 0.3]);
    }

    #[test]
    fn test_sum() {
        let mut kernel = Matern32::default() + White::default();
        let x = array![[0., 0.], [1., 2.]];
        let a = Matern32::<f64>::default();
        assert_abs_diff_eq!(kernel.k(&x), a.k(&x) + Array2::<f64>::eye(2));
        assert_abs_diff_eq!(kernel.k_cross(&x, &x), a.k(&x));
        assert_abs_diff_eq!(kernel.k_diag(&x), array![2., 2.]);

        let names: Vec<String> = kernel.parameters().into_iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            vec![
                "kernels[0].variance",
                "kernels[0].theta",
                "kernels[1].variance"
            ]
        );
        kernel.right_mut().variance_mut().assign(0.1).unwrap();
        assert_abs_diff_eq!(kernel.k_diag(&x), array![1.1, 1.1]);
    }

    #[test]
    fn test_display() {
        let kernel = SquaredExponential::new(1., array![2.]).unwrap() + White::new(0.5).unwrap();
        assert_eq!(
            kernel.to_string(),
            "Sum(SquaredExponential(variance=1, theta=2), White(variance=0.5))"
        );
    }

    #[test]
    fn test_invalid_kernel() {
        assert!(Matern32::new(-1., array![1.]).is_err());
        assert!(Matern32::new(1., array![1., 0.]).is_err());
        assert!(White::new(0.).is_err());
    }

    #[cfg(feature = "serializable")]
    #[test]
    fn test_serde_kernel() {
        let kernel = Matern32::new(1.5, array![0.1, 0.2]).unwrap() + White::new(1e-2).unwrap();
        let json = serde_json::to_string(&kernel).unwrap();
        let back: Sum<Matern32<f64>, White<f64>> = serde_json::from_str(&json).unwrap();
        assert_eq!(kernel, back);
    }
}
