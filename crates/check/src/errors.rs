use crate::setup::ModelKind;
use gaussbox_gp::GpError;
use thiserror::Error;

/// A result type for harness runs
pub type Result<T> = std::result::Result<T, HarnessError>;

/// An assertion failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CheckError {
    /// When two values are not close enough
    #[error("{what} mismatch at {position:?}: got {actual}, expected {expected} (atol={atol}, rtol={rtol})")]
    Mismatch {
        /// Checked quantity
        what: String,
        /// Multi-index of the first offending element
        position: Vec<usize>,
        /// Actual value
        actual: f64,
        /// Expected value
        expected: f64,
        /// Absolute tolerance
        atol: f64,
        /// Relative tolerance
        rtol: f64,
    },
    /// When array shapes differ
    #[error("{what} shape mismatch: got {actual:?}, expected {expected:?}")]
    ShapeMismatch {
        /// Checked quantity
        what: String,
        /// Actual shape
        actual: Vec<usize>,
        /// Expected shape
        expected: Vec<usize>,
    },
}

/// An error when running a check case
#[derive(Error, Debug)]
pub enum HarnessError {
    /// When model construction or prediction fails
    #[error(transparent)]
    GpError(#[from] GpError),
    /// When an assertion fails
    #[error(transparent)]
    CheckError(#[from] CheckError),
    /// When a sparse variant is built without inducing points
    #[error("{0} model requires inducing points")]
    MissingInducings(ModelKind),
    /// When a case of a table fails
    #[error("case {case} failed: {source}")]
    CaseError {
        /// Case name
        case: String,
        /// Cause
        #[source]
        source: Box<HarnessError>,
    },
}
