//! Positive model hyperparameters with a trainability flag.
use crate::errors::{GpError, Result};
use linfa::Float;
use ndarray::{array, Array1};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// A positive hyperparameter (kernel variance, inverse length scales, noise variance...)
///
/// Values are stored as a vector so that scalar and per-dimension
/// parameters share the same type. A scalar parameter is a vector of length 1.
///
/// Assignment never caches anything downstream: models read the current
/// value each time a prediction is requested.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Hyperparameter<F: Float> {
    value: Array1<F>,
    trainable: bool,
}

impl<F: Float> Hyperparameter<F> {
    /// Build from known positive values (defaults)
    pub(crate) fn constant(value: Array1<F>) -> Self {
        Hyperparameter {
            value,
            trainable: true,
        }
    }

    /// A trainable scalar hyperparameter, checked
    pub fn try_scalar(value: F) -> Result<Self> {
        Self::try_new(array![value])
    }

    /// A trainable vector hyperparameter, checked
    pub fn try_new(value: Array1<F>) -> Result<Self> {
        check_positive(&value)?;
        Ok(Hyperparameter {
            value,
            trainable: true,
        })
    }

    /// Current value
    pub fn value(&self) -> &Array1<F> {
        &self.value
    }

    /// First component, the value of a scalar hyperparameter
    pub fn scalar_value(&self) -> F {
        self.value[0]
    }

    /// Number of components
    pub fn len(&self) -> usize {
        self.value.len()
    }

    /// Always false, a hyperparameter holds at least one component
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Whether an optimizer would be allowed to change this value
    pub fn is_trainable(&self) -> bool {
        self.trainable
    }

    /// Set trainability
    pub fn set_trainable(&mut self, trainable: bool) {
        self.trainable = trainable;
    }

    /// Assign `value` to every component
    pub fn assign(&mut self, value: F) -> Result<()> {
        if value <= F::zero() || !value.is_finite() {
            return Err(GpError::InvalidValueError(format!(
                "hyperparameter should be positive, got {value}"
            )));
        }
        self.value.fill(value);
        Ok(())
    }

    /// Replace all components, the length can not change
    pub fn assign_array(&mut self, value: Array1<F>) -> Result<()> {
        if value.len() != self.value.len() {
            return Err(GpError::DimensionError(format!(
                "hyperparameter has {} components, got {}",
                self.value.len(),
                value.len()
            )));
        }
        check_positive(&value)?;
        self.value = value;
        Ok(())
    }
}

impl<F: Float> fmt::Display for Hyperparameter<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.value.len() == 1 {
            write!(f, "{}", self.value[0])
        } else {
            write!(f, "{}", self.value)
        }
    }
}

fn check_positive<F: Float>(value: &Array1<F>) -> Result<()> {
    if value.is_empty() {
        return Err(GpError::InvalidValueError(
            "hyperparameter should have at least one component".to_string(),
        ));
    }
    if let Some(v) = value.iter().find(|v| **v <= F::zero() || !v.is_finite()) {
        return Err(GpError::InvalidValueError(format!(
            "hyperparameter should be positive, got {v}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_assign_keeps_trainability() {
        let mut p = Hyperparameter::try_scalar(1.0).unwrap();
        assert!(p.is_trainable());
        p.assign(0.2).unwrap();
        p.set_trainable(false);
        assert_abs_diff_eq!(p.scalar_value(), 0.2);
        assert!(!p.is_trainable());
    }

    #[test]
    fn test_invalid_values() {
        let mut p = Hyperparameter::try_new(array![1., 2.]).unwrap();
        assert!(p.assign(-1.).is_err());
        assert!(p.assign(f64::NAN).is_err());
        assert!(p.assign_array(array![1.]).is_err());
        assert!(p.assign_array(array![1., 0.]).is_err());
        assert_eq!(p.value(), &array![1., 2.]);
        assert!(Hyperparameter::<f64>::try_scalar(0.).is_err());
        assert!(Hyperparameter::<f64>::try_new(Array1::zeros(0)).is_err());
    }

    #[test]
    fn test_assign_broadcasts() {
        let mut p = Hyperparameter::try_new(array![1., 2., 3.]).unwrap();
        p.assign(0.5).unwrap();
        assert_eq!(p.value(), &array![0.5, 0.5, 0.5]);
    }
}
