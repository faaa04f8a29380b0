//! Differentiable loss functions built from graph-recording ops.
//!
//! Every loss takes `(predicted, expected)` tensors of identical shape. Gradients flow
//! into `predicted` only: `expected` is detached before use, so no gradient is ever
//! accumulated on it. Losses that take a [`Reduction`] return the unreduced tensor for
//! `Reduction::None` and a 0-dimensional tensor for `Sum`/`Mean`.

mod reduction;

pub use reduction::Reduction;

use crate::backend::Backend;
use crate::error::Error;
use crate::ops::{
    abs, add, div, ln, log_softmax, max, maximum, mean, minimum, mul, mul_scalar, relu, softplus,
    square, sub, sum,
};
use crate::tensor::Tensor;
use crate::util::last_axis;

/// Checks that both operands share a shape and returns `expected` as a constant.
fn detached_target<B: Backend>(
    loss: &str,
    predicted: &Tensor<B>,
    expected: &Tensor<B>,
) -> Result<Tensor<B>, Error> {
    if predicted.shape() != expected.shape() {
        return Err(Error::IncompatibleShapes {
            op: loss.to_string(),
            shape_a: predicted.shape(),
            shape_b: expected.shape(),
        });
    }
    if expected.requires_grad() {
        tracing::warn!(
            loss,
            tensor_id = expected.id(),
            "target tensor requires grad; it is treated as a constant"
        );
    }
    Ok(expected.detach())
}

/// Last (class) axis of a per-example loss input.
fn class_axis<B: Backend>(loss: &str, predicted: &Tensor<B>) -> Result<usize, Error> {
    last_axis(&predicted.shape()).ok_or_else(|| {
        Error::InvalidOperation(format!(
            "{} requires at least one dimension, got a rank-0 tensor",
            loss
        ))
    })
}

fn constant<B: Backend>(value: f32) -> Result<Tensor<B>, Error> {
    Tensor::scalar(value, false)
}

/// `|expected - predicted|`
pub fn l1_loss<B: Backend>(
    predicted: &Tensor<B>,
    expected: &Tensor<B>,
    reduction: Reduction,
) -> Result<Tensor<B>, Error> {
    let expected = detached_target("l1_loss", predicted, expected)?;
    let loss = abs(&sub(&expected, predicted)?)?;
    reduction.apply(&loss)
}

/// `(expected - predicted)^2`
pub fn l2_loss<B: Backend>(
    predicted: &Tensor<B>,
    expected: &Tensor<B>,
    reduction: Reduction,
) -> Result<Tensor<B>, Error> {
    let expected = detached_target("l2_loss", predicted, expected)?;
    let loss = square(&sub(&expected, predicted)?)?;
    reduction.apply(&loss)
}

/// `max(0, 1 - expected * predicted)`, with labels expected in {-1, 1}.
pub fn hinge_loss<B: Backend>(
    predicted: &Tensor<B>,
    expected: &Tensor<B>,
    reduction: Reduction,
) -> Result<Tensor<B>, Error> {
    let expected = detached_target("hinge_loss", predicted, expected)?;
    let loss = relu(&sub(&constant(1.0)?, &mul(&expected, predicted)?)?)?;
    reduction.apply(&loss)
}

/// `max(0, 1 - expected * predicted)^2`
pub fn squared_hinge_loss<B: Backend>(
    predicted: &Tensor<B>,
    expected: &Tensor<B>,
    reduction: Reduction,
) -> Result<Tensor<B>, Error> {
    let expected = detached_target("squared_hinge_loss", predicted, expected)?;
    let margin = relu(&sub(&constant(1.0)?, &mul(&expected, predicted)?)?)?;
    reduction.apply(&square(&margin)?)
}

/// Per-example hinge between the true class score and the best wrong class score.
///
/// Along the last axis, with one-hot `expected`:
/// `max(0, max((1 - expected) * predicted) - sum(expected * predicted) + 1)`.
/// The last axis is reduced, so `Reduction::None` returns one value per example.
///
/// # Errors
/// `Error::InvalidOperation` for rank-0 inputs.
pub fn categorical_hinge_loss<B: Backend>(
    predicted: &Tensor<B>,
    expected: &Tensor<B>,
    reduction: Reduction,
) -> Result<Tensor<B>, Error> {
    let expected = detached_target("categorical_hinge_loss", predicted, expected)?;
    let axis = class_axis("categorical_hinge_loss", predicted)?;
    let one = constant(1.0)?;

    let positive = sum(&mul(&expected, predicted)?, Some(axis))?;
    let negative = max(&mul(&sub(&one, &expected)?, predicted)?, Some(axis))?;
    let loss = relu(&add(&sub(&negative, &positive)?, &one)?)?;
    reduction.apply(&loss)
}

/// `ln(cosh(predicted - expected))`.
///
/// Evaluated as `x + softplus(-2x) - ln 2` so large errors do not overflow `cosh`.
pub fn log_cosh_loss<B: Backend>(
    predicted: &Tensor<B>,
    expected: &Tensor<B>,
    reduction: Reduction,
) -> Result<Tensor<B>, Error> {
    let expected = detached_target("log_cosh_loss", predicted, expected)?;
    let x = sub(predicted, &expected)?;
    let log_2cosh = add(&x, &softplus(&mul_scalar(&x, -2.0)?)?)?;
    let loss = sub(&log_2cosh, &constant(std::f32::consts::LN_2)?)?;
    reduction.apply(&loss)
}

/// `predicted - expected * ln(predicted)`. Non-positive predictions yield inf/NaN.
pub fn poisson_loss<B: Backend>(
    predicted: &Tensor<B>,
    expected: &Tensor<B>,
    reduction: Reduction,
) -> Result<Tensor<B>, Error> {
    let expected = detached_target("poisson_loss", predicted, expected)?;
    let loss = sub(predicted, &mul(&expected, &ln(predicted)?)?)?;
    reduction.apply(&loss)
}

/// `expected * ln(expected / predicted)`.
///
/// Entries where `expected == 0` evaluate to `0 * -inf = NaN`; no masking is applied.
pub fn kullback_leibler_divergence<B: Backend>(
    predicted: &Tensor<B>,
    expected: &Tensor<B>,
    reduction: Reduction,
) -> Result<Tensor<B>, Error> {
    let expected = detached_target("kullback_leibler_divergence", predicted, expected)?;
    let loss = mul(&expected, &ln(&div(&expected, predicted)?)?)?;
    reduction.apply(&loss)
}

/// Cross entropy between `probabilities` and the softmax of `logits` over the last axis.
///
/// Per example: `-sum(probabilities * log_softmax(logits))`. The last axis is reduced.
///
/// # Errors
/// `Error::InvalidOperation` for rank-0 inputs.
pub fn softmax_cross_entropy<B: Backend>(
    logits: &Tensor<B>,
    probabilities: &Tensor<B>,
    reduction: Reduction,
) -> Result<Tensor<B>, Error> {
    let probabilities = detached_target("softmax_cross_entropy", logits, probabilities)?;
    let axis = class_axis("softmax_cross_entropy", logits)?;

    let log_probs = log_softmax(logits, axis)?;
    let per_example = sum(&mul(&probabilities, &log_probs)?, Some(axis))?;
    reduction.apply(&mul_scalar(&per_example, -1.0)?)
}

/// Binary cross entropy on raw logits.
///
/// loss = max(logits, 0) - logits * labels + ln(1 + exp(-|logits|))
pub fn sigmoid_cross_entropy<B: Backend>(
    logits: &Tensor<B>,
    labels: &Tensor<B>,
    reduction: Reduction,
) -> Result<Tensor<B>, Error> {
    let labels = detached_target("sigmoid_cross_entropy", logits, labels)?;

    let positive_part = relu(logits)?;
    let label_term = mul(logits, &labels)?;
    let log_term = softplus(&mul_scalar(&abs(logits)?, -1.0)?)?;
    let loss = add(&sub(&positive_part, &label_term)?, &log_term)?;
    reduction.apply(&loss)
}

/// Quadratic for errors up to `delta`, linear beyond.
///
/// With `err = |expected - predicted|` and `q = min(err, delta)`:
/// `0.5 * q^2 + delta * (err - q)`.
///
/// # Errors
/// `Error::InvalidOperation` unless `delta` is positive and finite.
pub fn huber_loss<B: Backend>(
    predicted: &Tensor<B>,
    expected: &Tensor<B>,
    delta: f32,
    reduction: Reduction,
) -> Result<Tensor<B>, Error> {
    if !(delta > 0.0 && delta.is_finite()) {
        return Err(Error::InvalidOperation(format!(
            "huber_loss delta must be positive and finite, got {}",
            delta
        )));
    }
    let expected = detached_target("huber_loss", predicted, expected)?;

    let error = abs(&sub(&expected, predicted)?)?;
    let quadratic = minimum(&error, &constant(delta)?)?;
    let linear = sub(&error, &quadratic)?;
    let loss = add(
        &mul_scalar(&square(&quadratic)?, 0.5)?,
        &mul_scalar(&linear, delta)?,
    )?;
    reduction.apply(&loss)
}

// --- Mean-only shorthands ---

pub fn mean_squared_error<B: Backend>(
    predicted: &Tensor<B>,
    expected: &Tensor<B>,
) -> Result<Tensor<B>, Error> {
    l2_loss(predicted, expected, Reduction::Mean)
}

pub fn mean_absolute_error<B: Backend>(
    predicted: &Tensor<B>,
    expected: &Tensor<B>,
) -> Result<Tensor<B>, Error> {
    l1_loss(predicted, expected, Reduction::Mean)
}

/// `mean((ln(max(p, eps) + 1) - ln(max(e, eps) + 1))^2)` with `eps = f32::EPSILON`.
pub fn mean_squared_logarithmic_error<B: Backend>(
    predicted: &Tensor<B>,
    expected: &Tensor<B>,
) -> Result<Tensor<B>, Error> {
    let expected = detached_target("mean_squared_logarithmic_error", predicted, expected)?;
    let eps = constant(f32::EPSILON)?;
    let one = constant(1.0)?;

    let log_predicted = ln(&add(&maximum(predicted, &eps)?, &one)?)?;
    let log_expected = ln(&add(&maximum(&expected, &eps)?, &one)?)?;
    mean(&square(&sub(&log_predicted, &log_expected)?)?, None)
}

/// `100 * mean(|(e - p) / |e||)`. Zero targets yield inf/NaN.
pub fn mean_absolute_percentage_error<B: Backend>(
    predicted: &Tensor<B>,
    expected: &Tensor<B>,
) -> Result<Tensor<B>, Error> {
    let expected = detached_target("mean_absolute_percentage_error", predicted, expected)?;
    let relative = div(&sub(&expected, predicted)?, &abs(&expected)?)?;
    mul_scalar(&mean(&abs(&relative)?, None)?, 100.0)
}
