// src/ops/cpu_backward.rs
//! Backward kernels, generic over the Backend trait.
//!
//! Every function receives the recorded `Op` (holding the forward inputs) and the gradient
//! flowing into the op's output, and returns gradients shaped exactly like the inputs.

use crate::backend::Backend;
use crate::error::Error;
use crate::graph::{Op, OpType};

fn expect_inputs<B: Backend>(op: &Op<B>, expected: usize) -> Result<(), Error> {
    if op.inputs.len() != expected {
        return Err(Error::InvalidOperation(format!(
            "{} backward expected {} input(s), found {}",
            op.op_type,
            expected,
            op.inputs.len()
        )));
    }
    Ok(())
}

/// Reverses broadcasting by summing `grad` down to `target_shape`.
///
/// Leading axes that broadcasting prepended are summed away first, then every axis
/// where the target has extent 1 but the gradient does not is summed and kept as 1.
pub(crate) fn unbroadcast<B: Backend>(
    grad: B::Storage,
    target_shape: &[usize],
) -> Result<B::Storage, Error> {
    if B::shape(&grad) == target_shape {
        return Ok(grad);
    }

    let mut current = grad;
    while B::shape(&current).len() > target_shape.len() {
        current = B::sum_along_axis(&current, 0)?;
    }

    let current_shape = B::shape(&current).to_vec();
    if current_shape.len() == target_shape.len() {
        for (axis, &target_dim) in target_shape.iter().enumerate() {
            let current_dim = B::shape(&current)[axis];
            if target_dim == 1 && current_dim != 1 {
                let mut kept_shape = B::shape(&current).to_vec();
                kept_shape[axis] = 1;
                current = B::sum_along_axis(&current, axis)?;
                B::set_shape(&mut current, &kept_shape)?;
            }
        }
    } else if B::size(&current) == target_shape.iter().product::<usize>() {
        // Lower-rank gradient for a higher-rank target, e.g. [] against [1, 1].
        B::set_shape(&mut current, target_shape)?;
    }

    if B::shape(&current) != target_shape {
        return Err(Error::IncompatibleShapes {
            op: "unbroadcast".to_string(),
            shape_a: B::shape(&current).to_vec(),
            shape_b: target_shape.to_vec(),
        });
    }
    Ok(current)
}

/// Re-inserts a reduced axis (as extent 1) and broadcasts back to `input_shape`.
/// A global reduction (`axis == None`) broadcasts the 0-dim value directly.
fn expand_reduced<B: Backend>(
    reduced: &B::Storage,
    axis: Option<usize>,
    input_shape: &[usize],
) -> Result<B::Storage, Error> {
    match axis {
        None => B::broadcast_to(reduced, input_shape),
        Some(axis) => {
            let mut keep_dims = B::shape(reduced).to_vec();
            if axis > keep_dims.len() {
                return Err(Error::InvalidIndex(vec![axis]));
            }
            keep_dims.insert(axis, 1);
            let mut reshaped = reduced.clone();
            B::set_shape(&mut reshaped, &keep_dims)?;
            B::broadcast_to(&reshaped, input_shape)
        }
    }
}

// --- Binary element-wise ops ---

pub(crate) fn add_backward<B: Backend>(
    op: &Op<B>,
    output_grad: &B::Storage,
) -> Result<(B::Storage, B::Storage), Error> {
    expect_inputs(op, 2)?;
    let a_ref = op.inputs[0].data();
    let b_ref = op.inputs[1].data();

    let grad_a = unbroadcast::<B>(output_grad.clone(), B::shape(&*a_ref))?;
    let grad_b = unbroadcast::<B>(output_grad.clone(), B::shape(&*b_ref))?;
    Ok((grad_a, grad_b))
}

pub(crate) fn sub_backward<B: Backend>(
    op: &Op<B>,
    output_grad: &B::Storage,
) -> Result<(B::Storage, B::Storage), Error> {
    expect_inputs(op, 2)?;
    let a_ref = op.inputs[0].data();
    let b_ref = op.inputs[1].data();

    // da = dout, db = -dout
    let grad_a = unbroadcast::<B>(output_grad.clone(), B::shape(&*a_ref))?;
    let grad_b = unbroadcast::<B>(B::mul_scalar(output_grad, -1.0)?, B::shape(&*b_ref))?;
    Ok((grad_a, grad_b))
}

pub(crate) fn mul_backward<B: Backend>(
    op: &Op<B>,
    output_grad: &B::Storage,
) -> Result<(B::Storage, B::Storage), Error> {
    expect_inputs(op, 2)?;
    let a_ref = op.inputs[0].data();
    let b_ref = op.inputs[1].data();
    let a = &*a_ref;
    let b = &*b_ref;

    // dA = dC * B, dB = dC * A
    let grad_a = unbroadcast::<B>(B::mul(output_grad, b)?, B::shape(a))?;
    let grad_b = unbroadcast::<B>(B::mul(output_grad, a)?, B::shape(b))?;
    Ok((grad_a, grad_b))
}

pub(crate) fn div_backward<B: Backend>(
    op: &Op<B>,
    output_grad: &B::Storage,
) -> Result<(B::Storage, B::Storage), Error> {
    expect_inputs(op, 2)?;
    let a_ref = op.inputs[0].data();
    let b_ref = op.inputs[1].data();
    let a = &*a_ref;
    let b = &*b_ref;

    // da = dout / b, db = -dout * a / b^2
    let grad_a = B::div(output_grad, b)?;
    let a_over_b_squared = B::div(a, &B::square(b)?)?;
    let grad_b = B::mul_scalar(&B::mul(output_grad, &a_over_b_squared)?, -1.0)?;

    Ok((
        unbroadcast::<B>(grad_a, B::shape(a))?,
        unbroadcast::<B>(grad_b, B::shape(b))?,
    ))
}

/// Routes the gradient to `a` where `select_a(a, b)` holds and to `b` otherwise.
fn select_backward<B: Backend>(
    op: &Op<B>,
    output_grad: &B::Storage,
    select_a: fn(&B::Storage, &B::Storage) -> Result<B::Storage, Error>,
    select_b: fn(&B::Storage, &B::Storage) -> Result<B::Storage, Error>,
) -> Result<(B::Storage, B::Storage), Error> {
    expect_inputs(op, 2)?;
    let a_ref = op.inputs[0].data();
    let b_ref = op.inputs[1].data();
    let a = &*a_ref;
    let b = &*b_ref;

    let mask_a = select_a(a, b)?;
    let mask_b = select_b(a, b)?;
    let grad_a = B::mul(output_grad, &mask_a)?;
    let grad_b = B::mul(output_grad, &mask_b)?;

    Ok((
        unbroadcast::<B>(grad_a, B::shape(a))?,
        unbroadcast::<B>(grad_b, B::shape(b))?,
    ))
}

/// Ties send the whole gradient to the first operand.
pub(crate) fn maximum_backward<B: Backend>(
    op: &Op<B>,
    output_grad: &B::Storage,
) -> Result<(B::Storage, B::Storage), Error> {
    select_backward::<B>(op, output_grad, B::greater_equal, B::less)
}

/// Ties send the whole gradient to the first operand.
pub(crate) fn minimum_backward<B: Backend>(
    op: &Op<B>,
    output_grad: &B::Storage,
) -> Result<(B::Storage, B::Storage), Error> {
    select_backward::<B>(op, output_grad, B::less_equal, B::greater)
}

// --- Unary element-wise ops ---

pub(crate) fn exp_backward<B: Backend>(
    op: &Op<B>,
    output_grad: &B::Storage,
) -> Result<B::Storage, Error> {
    expect_inputs(op, 1)?;
    let x = op.inputs[0].data();
    B::mul(output_grad, &B::exp(&*x)?)
}

pub(crate) fn ln_backward<B: Backend>(
    op: &Op<B>,
    output_grad: &B::Storage,
) -> Result<B::Storage, Error> {
    expect_inputs(op, 1)?;
    let x = op.inputs[0].data();
    B::div(output_grad, &*x)
}

/// Uses sign(x), so the subgradient at 0 is 0.
pub(crate) fn abs_backward<B: Backend>(
    op: &Op<B>,
    output_grad: &B::Storage,
) -> Result<B::Storage, Error> {
    expect_inputs(op, 1)?;
    let x = op.inputs[0].data();
    let sign = B::map(&*x, |v| {
        if v > 0.0 {
            1.0
        } else if v < 0.0 {
            -1.0
        } else {
            0.0
        }
    })?;
    B::mul(output_grad, &sign)
}

pub(crate) fn square_backward<B: Backend>(
    op: &Op<B>,
    output_grad: &B::Storage,
) -> Result<B::Storage, Error> {
    expect_inputs(op, 1)?;
    let x = op.inputs[0].data();
    B::mul(output_grad, &B::mul_scalar(&*x, 2.0)?)
}

pub(crate) fn relu_backward<B: Backend>(
    op: &Op<B>,
    output_grad: &B::Storage,
) -> Result<B::Storage, Error> {
    expect_inputs(op, 1)?;
    let x = op.inputs[0].data();

    // dx = dC * (1 if x > 0 else 0)
    let mask = B::map(&*x, |v| if v > 0.0 { 1.0 } else { 0.0 })?;
    B::mul(output_grad, &mask)
}

pub(crate) fn sigmoid_backward<B: Backend>(
    op: &Op<B>,
    output_grad: &B::Storage,
) -> Result<B::Storage, Error> {
    expect_inputs(op, 1)?;
    let x = op.inputs[0].data();

    // y * (1 - y)
    let y = B::sigmoid(&*x)?;
    let one_minus_y = B::map(&y, |v| 1.0 - v)?;
    B::mul(output_grad, &B::mul(&y, &one_minus_y)?)
}

pub(crate) fn softplus_backward<B: Backend>(
    op: &Op<B>,
    output_grad: &B::Storage,
) -> Result<B::Storage, Error> {
    expect_inputs(op, 1)?;
    let x = op.inputs[0].data();
    B::mul(output_grad, &B::sigmoid(&*x)?)
}

/// dx = dy - softmax(x) * sum(dy, axis)
pub(crate) fn log_softmax_backward<B: Backend>(
    op: &Op<B>,
    output_grad: &B::Storage,
) -> Result<B::Storage, Error> {
    expect_inputs(op, 1)?;
    let x_ref = op.inputs[0].data();
    let x = &*x_ref;
    let axis = op.axis()?;

    let softmax = B::exp(&B::log_softmax(x, axis)?)?;
    let sum_grad = B::sum_along_axis(output_grad, axis)?;
    let sum_grad_expanded = expand_reduced::<B>(&sum_grad, Some(axis), B::shape(x))?;

    B::sub(output_grad, &B::mul(&softmax, &sum_grad_expanded)?)
}

// --- Reductions ---

pub(crate) fn sum_backward<B: Backend>(
    op: &Op<B>,
    output_grad: &B::Storage,
) -> Result<B::Storage, Error> {
    expect_inputs(op, 1)?;
    let input_ref = op.inputs[0].data();
    let input_shape = B::shape(&*input_ref);

    match op.op_type {
        OpType::Sum(axis) => expand_reduced::<B>(output_grad, axis, input_shape),
        _ => Err(Error::InternalLogicError(format!(
            "Incorrect OpType ({}) passed to sum_backward. Expected Sum.",
            op.op_type
        ))),
    }
}

pub(crate) fn mean_backward<B: Backend>(
    op: &Op<B>,
    output_grad: &B::Storage,
) -> Result<B::Storage, Error> {
    expect_inputs(op, 1)?;
    let input_ref = op.inputs[0].data();
    let input = &*input_ref;
    let input_shape = B::shape(input);

    let axis = match op.op_type {
        OpType::Mean(axis) => axis,
        _ => {
            return Err(Error::InternalLogicError(format!(
                "Incorrect OpType ({}) passed to mean_backward. Expected Mean.",
                op.op_type
            )))
        }
    };

    let count = match axis {
        None => B::size(input),
        Some(ax) => *input_shape.get(ax).ok_or(Error::InvalidIndex(vec![ax]))?,
    };
    if count == 0 {
        return B::zeros(input_shape);
    }

    let expanded = expand_reduced::<B>(output_grad, axis, input_shape)?;
    B::div_scalar(&expanded, count as f32)
}

pub(crate) fn max_backward<B: Backend>(
    op: &Op<B>,
    output_grad: &B::Storage,
) -> Result<B::Storage, Error> {
    expect_inputs(op, 1)?;
    let input_ref = op.inputs[0].data();
    let input = &*input_ref;
    let input_shape = B::shape(input);

    let axis = match op.op_type {
        OpType::Max(axis) => axis,
        _ => {
            return Err(Error::InternalLogicError(
                "Incorrect OpType in max_backward".to_string(),
            ))
        }
    };

    // 1.0 where x attains the max, 0.0 elsewhere
    let max_values = B::max(input, axis)?;
    let max_expanded = expand_reduced::<B>(&max_values, axis, input_shape)?;
    let mask = B::equal(input, &max_expanded)?;

    let count = match axis {
        None => B::broadcast_to(&B::from_vec(vec![B::sum_all(&mask)?], &[])?, input_shape)?,
        Some(ax) => expand_reduced::<B>(&B::sum_along_axis(&mask, ax)?, axis, input_shape)?,
    };

    let grad_expanded = expand_reduced::<B>(output_grad, axis, input_shape)?;
    B::div(&B::mul(&grad_expanded, &mask)?, &count)
}
