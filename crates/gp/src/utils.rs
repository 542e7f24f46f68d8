use crate::errors::{GpError, Result};
use linfa::Float;
use linfa_linalg::{cholesky::*, triangular::*};
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix2, Zip};

/// Lower Cholesky factor of `k + nugget * I`
pub(crate) fn cholesky_with_nugget<F: Float>(
    k: &ArrayBase<impl Data<Elem = F>, Ix2>,
    nugget: F,
) -> Result<Array2<F>> {
    let mut k = k.to_owned();
    k.diag_mut().mapv_inplace(|v| v + nugget);
    Ok(k.cholesky()?)
}

/// Solve `L x = b` with `L` lower triangular
pub(crate) fn solve_lower<F: Float>(
    l: &ArrayBase<impl Data<Elem = F>, Ix2>,
    b: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Result<Array2<F>> {
    Ok(l.solve_triangular(b, UPLO::Lower)?)
}

/// Solve `L^T x = b` with `L` lower triangular
pub(crate) fn solve_lower_t<F: Float>(
    l: &ArrayBase<impl Data<Elem = F>, Ix2>,
    b: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Result<Array2<F>> {
    Ok(l.t().solve_triangular(b, UPLO::Upper)?)
}

/// Column-wise sum of squares of `a`, i.e. `diag(a^T a)`
pub(crate) fn sum_squares_axis0<F: Float>(a: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F> {
    a.mapv(|v| v * v).sum_axis(Axis(0))
}

/// Lower triangle of a square matrix, upper part set to zero
pub(crate) fn tril<F: Float>(a: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
    let mut l = a.to_owned();
    Zip::indexed(&mut l).for_each(|(i, j), v| {
        if j > i {
            *v = F::zero();
        }
    });
    l
}

/// Check that `x` has `expected` columns
pub(crate) fn check_ncols<F: Float>(
    what: &str,
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    expected: usize,
) -> Result<()> {
    if x.ncols() != expected {
        return Err(GpError::DimensionError(format!(
            "{what} should have {expected} columns, got {}",
            x.ncols()
        )));
    }
    Ok(())
}

/// Check a training set is not empty and inputs and targets agree
pub(crate) fn check_training_data<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    y: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Result<()> {
    if x.nrows() == 0 || x.ncols() == 0 || y.ncols() == 0 {
        return Err(GpError::InvalidValueError(format!(
            "training data should not be empty, got x {:?} and y {:?}",
            x.dim(),
            y.dim()
        )));
    }
    if x.nrows() != y.nrows() {
        return Err(GpError::DimensionError(format!(
            "training inputs ({}) and targets ({}) should have the same number of rows",
            x.nrows(),
            y.nrows()
        )));
    }
    Ok(())
}
