//! Loss shorthands with the reduction fixed per loss.
//!
//! `l1_loss`, `l2_loss`, `kullback_leibler_divergence` and `huber_loss` sum;
//! every other loss averages. The split matches the older API and must not be unified.
//! Each function returns a 0-dimensional tensor and propagates errors from
//! [`crate::losses`] unchanged.

use crate::backend::Backend;
use crate::error::Error;
use crate::losses::{self, Reduction};
use crate::tensor::Tensor;

pub fn l1_loss<B: Backend>(
    predicted: &Tensor<B>,
    expected: &Tensor<B>,
) -> Result<Tensor<B>, Error> {
    losses::l1_loss(predicted, expected, Reduction::Sum)
}

/// Sum of squared errors.
///
/// # Example
/// ```rust
/// use rust_tensor_losses::{compat, CpuTensor};
/// let predicted = CpuTensor::from_vec(vec![1.0, 2.0], &[2], true)?;
/// let expected = CpuTensor::from_vec(vec![0.0, 0.0], &[2], false)?;
/// let loss = compat::losses::l2_loss(&predicted, &expected)?;
/// assert_eq!(loss.to_vec()?, vec![5.0]);
/// # Ok::<(), rust_tensor_losses::Error>(())
/// ```
pub fn l2_loss<B: Backend>(
    predicted: &Tensor<B>,
    expected: &Tensor<B>,
) -> Result<Tensor<B>, Error> {
    losses::l2_loss(predicted, expected, Reduction::Sum)
}

pub fn kullback_leibler_divergence<B: Backend>(
    predicted: &Tensor<B>,
    expected: &Tensor<B>,
) -> Result<Tensor<B>, Error> {
    losses::kullback_leibler_divergence(predicted, expected, Reduction::Sum)
}

pub fn hinge_loss<B: Backend>(
    predicted: &Tensor<B>,
    expected: &Tensor<B>,
) -> Result<Tensor<B>, Error> {
    losses::hinge_loss(predicted, expected, Reduction::Mean)
}

pub fn squared_hinge_loss<B: Backend>(
    predicted: &Tensor<B>,
    expected: &Tensor<B>,
) -> Result<Tensor<B>, Error> {
    losses::squared_hinge_loss(predicted, expected, Reduction::Mean)
}

pub fn categorical_hinge_loss<B: Backend>(
    predicted: &Tensor<B>,
    expected: &Tensor<B>,
) -> Result<Tensor<B>, Error> {
    losses::categorical_hinge_loss(predicted, expected, Reduction::Mean)
}

pub fn log_cosh_loss<B: Backend>(
    predicted: &Tensor<B>,
    expected: &Tensor<B>,
) -> Result<Tensor<B>, Error> {
    losses::log_cosh_loss(predicted, expected, Reduction::Mean)
}

pub fn poisson_loss<B: Backend>(
    predicted: &Tensor<B>,
    expected: &Tensor<B>,
) -> Result<Tensor<B>, Error> {
    losses::poisson_loss(predicted, expected, Reduction::Mean)
}

pub fn softmax_cross_entropy<B: Backend>(
    logits: &Tensor<B>,
    probabilities: &Tensor<B>,
) -> Result<Tensor<B>, Error> {
    losses::softmax_cross_entropy(logits, probabilities, Reduction::Mean)
}

pub fn sigmoid_cross_entropy<B: Backend>(
    logits: &Tensor<B>,
    labels: &Tensor<B>,
) -> Result<Tensor<B>, Error> {
    losses::sigmoid_cross_entropy(logits, labels, Reduction::Mean)
}

pub fn huber_loss<B: Backend>(
    predicted: &Tensor<B>,
    expected: &Tensor<B>,
    delta: f32,
) -> Result<Tensor<B>, Error> {
    losses::huber_loss(predicted, expected, delta, Reduction::Sum)
}
