//! Numerical closeness and shape assertions.
use crate::errors::CheckError;
use ndarray::{Array2, Array3, ArrayBase, Axis, Data, Dimension, Ix2, Zip};

/// Tolerances of [`check_allclose`]: `|actual - expected| <= atol + rtol * |expected|`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerance {
    /// Absolute tolerance
    pub atol: f64,
    /// Relative tolerance
    pub rtol: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Tolerance {
            atol: 1e-8,
            rtol: 1e-5,
        }
    }
}

impl Tolerance {
    /// Purely absolute tolerance
    pub fn absolute(atol: f64) -> Self {
        Tolerance { atol, rtol: 0. }
    }
}

fn unravel(mut flat: usize, shape: &[usize]) -> Vec<usize> {
    let mut index = vec![0; shape.len()];
    for (i, &n) in shape.iter().enumerate().rev() {
        if n > 0 {
            index[i] = flat % n;
            flat /= n;
        }
    }
    index
}

/// Check `actual` has the `expected` shape
pub fn check_shape(what: &str, actual: &[usize], expected: &[usize]) -> Result<(), CheckError> {
    if actual != expected {
        return Err(CheckError::ShapeMismatch {
            what: what.to_string(),
            actual: actual.to_vec(),
            expected: expected.to_vec(),
        });
    }
    Ok(())
}

/// Check arrays have the same shape and elementwise close values.
///
/// NaN values are never close.
pub fn check_allclose<D: Dimension>(
    what: &str,
    actual: &ArrayBase<impl Data<Elem = f64>, D>,
    expected: &ArrayBase<impl Data<Elem = f64>, D>,
    tol: Tolerance,
) -> Result<(), CheckError> {
    check_shape(what, actual.shape(), expected.shape())?;
    let offending = actual
        .iter()
        .zip(expected.iter())
        .enumerate()
        .find(|(_, (&a, &e))| !((a - e).abs() <= tol.atol + tol.rtol * e.abs()));
    match offending {
        Some((flat, (&a, &e))) => Err(CheckError::Mismatch {
            what: what.to_string(),
            position: unravel(flat, actual.shape()),
            actual: a,
            expected: e,
            atol: tol.atol,
            rtol: tol.rtol,
        }),
        None => Ok(()),
    }
}

/// Check the diagonal of each output covariance `cov[p]` (P, n, n)
/// matches the marginal variance `var[.., p]` (n, P)
pub fn check_diag_matches(var: &Array2<f64>, cov: &Array3<f64>, atol: f64) -> Result<(), CheckError> {
    let (n, p) = var.dim();
    check_shape("covariance", cov.shape(), &[p, n, n])?;
    for (i, cov_i) in cov.axis_iter(Axis(0)).enumerate() {
        check_allclose(
            &format!("diag(cov[{i}])"),
            &cov_i.diag(),
            &var.column(i),
            Tolerance::absolute(atol),
        )?;
    }
    Ok(())
}

/// Elementwise `-½ln(2π) - ½ln(var) - ½(mean - y)²/var`
pub fn gaussian_log_density(
    mean: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    var: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    y: &ArrayBase<impl Data<Elem = f64>, Ix2>,
) -> Array2<f64> {
    let log_2pi = (2. * std::f64::consts::PI).ln();
    let mut res = Array2::zeros(mean.raw_dim());
    Zip::from(&mut res)
        .and(mean)
        .and(var)
        .and(y)
        .for_each(|r, &m, &v, &yv| {
            *r = -0.5 * (log_2pi + v.ln() + (m - yv).powi(2) / v);
        });
    res
}
