//! Deprecated "every element" ordering checks.
//!
//! Each function compares element-wise (with broadcasting) and collapses the result
//! with [`ops::all`]. Incompatible shapes fail in the comparison, before the reduction.
//! The `_scalar` variants accept any primitive number and compare against it as `f32`.
//! New code should call the element-wise comparison and [`ops::all`] directly:
//!
//! ```rust
//! use rust_tensor_losses::{ops, CpuTensor};
//! let a = CpuTensor::from_vec(vec![1.0, 5.0, 3.0], &[3], false)?;
//! let b = CpuTensor::from_vec(vec![4.0, 5.0, 6.0], &[3], false)?;
//! assert!(!ops::all(&ops::less(&a, &b)?)?);
//! assert!(ops::all(&ops::less_equal(&a, &b)?)?);
//! # Ok::<(), rust_tensor_losses::Error>(())
//! ```

use num_traits::ToPrimitive;

use crate::backend::Backend;
use crate::error::Error;
use crate::ops;
use crate::tensor::Tensor;

fn scalar_tensor<B: Backend, S: ToPrimitive>(rhs: S) -> Result<Tensor<B>, Error> {
    let value = rhs.to_f32().ok_or_else(|| {
        Error::InvalidOperation("comparison scalar is not representable as f32".to_string())
    })?;
    Tensor::scalar(value, false)
}

/// `true` iff `lhs < rhs` for every element pair.
#[deprecated(note = "use `ops::less` followed by `ops::all`")]
pub fn all_less<B: Backend>(lhs: &Tensor<B>, rhs: &Tensor<B>) -> Result<bool, Error> {
    ops::all(&ops::less(lhs, rhs)?)
}

/// `true` iff `lhs <= rhs` for every element pair.
#[deprecated(note = "use `ops::less_equal` followed by `ops::all`")]
pub fn all_less_equal<B: Backend>(lhs: &Tensor<B>, rhs: &Tensor<B>) -> Result<bool, Error> {
    ops::all(&ops::less_equal(lhs, rhs)?)
}

/// `true` iff `lhs > rhs` for every element pair.
#[deprecated(note = "use `ops::greater` followed by `ops::all`")]
pub fn all_greater<B: Backend>(lhs: &Tensor<B>, rhs: &Tensor<B>) -> Result<bool, Error> {
    ops::all(&ops::greater(lhs, rhs)?)
}

/// `true` iff `lhs >= rhs` for every element pair.
#[deprecated(note = "use `ops::greater_equal` followed by `ops::all`")]
pub fn all_greater_equal<B: Backend>(lhs: &Tensor<B>, rhs: &Tensor<B>) -> Result<bool, Error> {
    ops::all(&ops::greater_equal(lhs, rhs)?)
}

/// `true` iff every element of `lhs` is below `rhs`.
#[deprecated(note = "use `ops::less` against a scalar tensor followed by `ops::all`")]
pub fn all_less_scalar<B: Backend, S: ToPrimitive>(
    lhs: &Tensor<B>,
    rhs: S,
) -> Result<bool, Error> {
    ops::all(&ops::less(lhs, &scalar_tensor(rhs)?)?)
}

/// `true` iff every element of `lhs` is at most `rhs`.
#[deprecated(note = "use `ops::less_equal` against a scalar tensor followed by `ops::all`")]
pub fn all_less_equal_scalar<B: Backend, S: ToPrimitive>(
    lhs: &Tensor<B>,
    rhs: S,
) -> Result<bool, Error> {
    ops::all(&ops::less_equal(lhs, &scalar_tensor(rhs)?)?)
}

/// `true` iff every element of `lhs` is above `rhs`.
#[deprecated(note = "use `ops::greater` against a scalar tensor followed by `ops::all`")]
pub fn all_greater_scalar<B: Backend, S: ToPrimitive>(
    lhs: &Tensor<B>,
    rhs: S,
) -> Result<bool, Error> {
    ops::all(&ops::greater(lhs, &scalar_tensor(rhs)?)?)
}

/// `true` iff every element of `lhs` is at least `rhs`.
#[deprecated(note = "use `ops::greater_equal` against a scalar tensor followed by `ops::all`")]
pub fn all_greater_equal_scalar<B: Backend, S: ToPrimitive>(
    lhs: &Tensor<B>,
    rhs: S,
) -> Result<bool, Error> {
    ops::all(&ops::greater_equal(lhs, &scalar_tensor(rhs)?)?)
}
