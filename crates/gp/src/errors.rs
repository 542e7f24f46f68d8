use thiserror::Error;

/// A result type for GP predictive inference
pub type Result<T> = std::result::Result<T, GpError>;

/// An error when building or querying one of the GP models
#[derive(Error, Debug)]
pub enum GpError {
    /// When linear algebra computation fails
    #[error(transparent)]
    LinalgError(#[from] linfa_linalg::LinalgError),
    /// When a linfa error occurs
    #[error(transparent)]
    LinfaError(#[from] linfa::error::Error),
    /// When a sparse model is built without inducing points
    #[error("Missing inducing points: {0}")]
    MissingInducings(String),
    /// When array shapes do not agree
    #[error("Dimension error: {0}")]
    DimensionError(String),
    /// When error dur to a bad value
    #[error("InvalidValue error: {0}")]
    InvalidValueError(String),
}
