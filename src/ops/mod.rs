//! Generic tensor operations that dispatch to backend implementations
//! and construct the computation graph when gradients are required.

use crate::backend::Backend;
use crate::error::Error;
use crate::graph::{Op, OpType};
use crate::tensor::Tensor;

// CPU-specific implementation modules (used by CpuBackend)
pub mod cpu_backward;
pub mod cpu_ops;

/// Wraps `data` in a tensor that records `op_type` when any input requires gradients.
fn record<B: Backend>(data: B::Storage, op_type: OpType, inputs: Vec<Tensor<B>>) -> Tensor<B> {
    let requires_grad = inputs.iter().any(|t| t.requires_grad());
    Tensor::new_with_op(
        data,
        requires_grad,
        if requires_grad { Some(op_type) } else { None },
        inputs,
    )
}

// --- Random Factories ---

/// Creates a tensor with values sampled from a normal (Gaussian) distribution N(mean, std_dev^2).
///
/// This operation is NOT differentiable.
///
/// # Errors
/// Returns an error if `std_dev` is negative.
pub fn random_normal<B: Backend>(
    shape: &[usize],
    mean: f32,
    std_dev: f32,
) -> Result<Tensor<B>, Error> {
    if std_dev < 0.0 {
        return Err(Error::InvalidOperation(format!(
            "Standard deviation ({}) must be non-negative for normal distribution",
            std_dev
        )));
    }
    let storage = B::random_normal(shape, mean, std_dev)?;
    Ok(Tensor::new(storage, false))
}

/// Creates a tensor with values sampled from a uniform distribution U(low, high).
///
/// This operation is NOT differentiable.
///
/// # Errors
/// Returns an error if `high <= low`.
pub fn random_uniform<B: Backend>(
    shape: &[usize],
    low: f32,
    high: f32,
) -> Result<Tensor<B>, Error> {
    if high <= low {
        return Err(Error::InvalidOperation(format!(
            "Upper bound ({}) must be greater than lower bound ({}) for uniform distribution",
            high, low
        )));
    }
    let storage = B::random_uniform(shape, low, high)?;
    Ok(Tensor::new(storage, false))
}

// --- Element-wise Arithmetic ---

/// Element-wise addition with broadcasting.
pub fn add<B: Backend>(a: &Tensor<B>, b: &Tensor<B>) -> Result<Tensor<B>, Error> {
    let output_data = B::add(&*a.data(), &*b.data())?;
    let requires_grad = a.requires_grad() || b.requires_grad();
    let output_tensor = Tensor::new(output_data, requires_grad);

    if requires_grad {
        let op = Op::new(
            OpType::Add,
            vec![a.clone(), b.clone()],
            |op_ctx, grad_output| {
                let (grad_a, grad_b) = B::add_backward(op_ctx, grad_output)?;
                Ok(vec![grad_a, grad_b])
            },
        );
        output_tensor.set_op(op);
    }
    Ok(output_tensor)
}

/// Element-wise subtraction: a - b
pub fn sub<B: Backend>(a: &Tensor<B>, b: &Tensor<B>) -> Result<Tensor<B>, Error> {
    let output_data = B::sub(&*a.data(), &*b.data())?;
    Ok(record(output_data, OpType::Sub, vec![a.clone(), b.clone()]))
}

/// Element-wise multiplication with broadcasting.
pub fn mul<B: Backend>(a: &Tensor<B>, b: &Tensor<B>) -> Result<Tensor<B>, Error> {
    let output_data = B::mul(&*a.data(), &*b.data())?;
    let requires_grad = a.requires_grad() || b.requires_grad();
    let output_tensor = Tensor::new(output_data, requires_grad);

    if requires_grad {
        let op = Op::new(
            OpType::Mul,
            vec![a.clone(), b.clone()],
            |op_ctx, grad_output| {
                let (grad_a, grad_b) = B::mul_backward(op_ctx, grad_output)?;
                Ok(vec![grad_a, grad_b])
            },
        );
        output_tensor.set_op(op);
    }
    Ok(output_tensor)
}

/// Element-wise division: a / b. Division by zero follows IEEE semantics.
pub fn div<B: Backend>(a: &Tensor<B>, b: &Tensor<B>) -> Result<Tensor<B>, Error> {
    let output_data = B::div(&*a.data(), &*b.data())?;
    Ok(record(output_data, OpType::Div, vec![a.clone(), b.clone()]))
}

/// Multiplies every element by a constant.
pub fn mul_scalar<B: Backend>(x: &Tensor<B>, scalar: f32) -> Result<Tensor<B>, Error> {
    let output_data = B::mul_scalar(&*x.data(), scalar)?;
    Ok(record(output_data, OpType::MulScalar(scalar), vec![x.clone()]))
}

/// Element-wise maximum of two tensors, with broadcasting.
/// On ties the gradient flows to `a`.
pub fn maximum<B: Backend>(a: &Tensor<B>, b: &Tensor<B>) -> Result<Tensor<B>, Error> {
    let output_data = B::maximum(&*a.data(), &*b.data())?;
    Ok(record(output_data, OpType::Maximum, vec![a.clone(), b.clone()]))
}

/// Element-wise minimum of two tensors, with broadcasting.
/// On ties the gradient flows to `a`.
pub fn minimum<B: Backend>(a: &Tensor<B>, b: &Tensor<B>) -> Result<Tensor<B>, Error> {
    let output_data = B::minimum(&*a.data(), &*b.data())?;
    Ok(record(output_data, OpType::Minimum, vec![a.clone(), b.clone()]))
}

// --- Unary Functions ---

pub fn abs<B: Backend>(x: &Tensor<B>) -> Result<Tensor<B>, Error> {
    let output_data = B::abs(&*x.data())?;
    Ok(record(output_data, OpType::Abs, vec![x.clone()]))
}

pub fn exp<B: Backend>(x: &Tensor<B>) -> Result<Tensor<B>, Error> {
    let output_data = B::exp(&*x.data())?;
    Ok(record(output_data, OpType::Exp, vec![x.clone()]))
}

/// Natural logarithm. Non-positive inputs yield `-inf`/`NaN` rather than an error.
pub fn ln<B: Backend>(x: &Tensor<B>) -> Result<Tensor<B>, Error> {
    let output_data = B::ln(&*x.data())?;
    Ok(record(output_data, OpType::Ln, vec![x.clone()]))
}

pub fn square<B: Backend>(x: &Tensor<B>) -> Result<Tensor<B>, Error> {
    let output_data = B::square(&*x.data())?;
    Ok(record(output_data, OpType::Square, vec![x.clone()]))
}

/// ReLU activation that dispatches to the backend implementation
pub fn relu<B: Backend>(x: &Tensor<B>) -> Result<Tensor<B>, Error> {
    let output_data = B::relu(&*x.data())?;
    let requires_grad = x.requires_grad();
    let output_tensor = Tensor::new(output_data, requires_grad);
    if requires_grad {
        let op = Op::new(OpType::Relu, vec![x.clone()], |op_ctx, grad_output| {
            Ok(vec![B::relu_backward(op_ctx, grad_output)?])
        });
        output_tensor.set_op(op);
    }
    Ok(output_tensor)
}

pub fn sigmoid<B: Backend>(x: &Tensor<B>) -> Result<Tensor<B>, Error> {
    let output_data = B::sigmoid(&*x.data())?;
    Ok(record(output_data, OpType::Sigmoid, vec![x.clone()]))
}

/// Softplus: `ln(1 + exp(x))`, evaluated as `max(x, 0) + ln(1 + exp(-|x|))`.
pub fn softplus<B: Backend>(x: &Tensor<B>) -> Result<Tensor<B>, Error> {
    let output_data = B::softplus(&*x.data())?;
    Ok(record(output_data, OpType::Softplus, vec![x.clone()]))
}

/// Log-softmax along `axis`, shifted by the per-slice max for stability.
pub fn log_softmax<B: Backend>(x: &Tensor<B>, axis: usize) -> Result<Tensor<B>, Error> {
    let output_data = B::log_softmax(&*x.data(), axis)?;
    Ok(record(output_data, OpType::LogSoftmax(axis), vec![x.clone()]))
}

// --- Reductions ---

/// Sums elements along a specified axis or globally.
/// A global sum returns a 0-dimensional tensor.
pub fn sum<B: Backend>(x: &Tensor<B>, axis: Option<usize>) -> Result<Tensor<B>, Error> {
    let output_data = match axis {
        Some(axis) => B::sum_along_axis(&*x.data(), axis)?,
        None => {
            let total_sum = B::sum_all(&*x.data())?;
            B::from_vec(vec![total_sum], &[])?
        }
    };
    Ok(record(output_data, OpType::Sum(axis), vec![x.clone()]))
}

/// Computes the mean reduction along a specified axis or globally if axis=None.
///
/// # Errors
/// `Error::EmptyTensor` for the global mean of an empty tensor.
pub fn mean<B: Backend>(x: &Tensor<B>, axis: Option<usize>) -> Result<Tensor<B>, Error> {
    let output_data = B::mean(&*x.data(), axis)?;
    Ok(record(output_data, OpType::Mean(axis), vec![x.clone()]))
}

/// Computes the maximum value along the specified axis.
/// If axis is None, computes the global maximum. Ties share the gradient equally.
pub fn max<B: Backend>(x: &Tensor<B>, axis: Option<usize>) -> Result<Tensor<B>, Error> {
    let output_data = B::max(&*x.data(), axis)?;
    Ok(record(output_data, OpType::Max(axis), vec![x.clone()]))
}

// --- Shape ---

/// Broadcasts a tensor to a new shape that is compatible with broadcasting rules.
pub fn broadcast_to<B: Backend>(x: &Tensor<B>, shape: &[usize]) -> Result<Tensor<B>, Error> {
    let output_data = B::broadcast_to(&*x.data(), shape)?;
    Ok(record(output_data, OpType::Broadcast, vec![x.clone()]))
}

/// Reshapes a tensor to a new shape without changing its data.
/// The new shape must have the same total number of elements as the original shape.
pub fn view<B: Backend>(x: &Tensor<B>, shape: &[usize]) -> Result<Tensor<B>, Error> {
    let old_size = x.size();
    let new_size = shape.iter().product::<usize>();
    if old_size != new_size {
        return Err(Error::IncompatibleShapes {
            op: "view".to_string(),
            shape_a: x.shape(),
            shape_b: shape.to_vec(),
        });
    }

    let mut output_data = x.data().clone();
    B::set_shape(&mut output_data, shape)?;
    Ok(record(output_data, OpType::View, vec![x.clone()]))
}

// --- Comparisons ---
// Element-wise, broadcasting, 1.0 for true and 0.0 for false. Never differentiable.

pub fn equal<B: Backend>(a: &Tensor<B>, b: &Tensor<B>) -> Result<Tensor<B>, Error> {
    Ok(Tensor::new(B::equal(&*a.data(), &*b.data())?, false))
}

pub fn not_equal<B: Backend>(a: &Tensor<B>, b: &Tensor<B>) -> Result<Tensor<B>, Error> {
    Ok(Tensor::new(B::not_equal(&*a.data(), &*b.data())?, false))
}

/// Computes element-wise greater comparison: `a > b`.
pub fn greater<B: Backend>(a: &Tensor<B>, b: &Tensor<B>) -> Result<Tensor<B>, Error> {
    Ok(Tensor::new(B::greater(&*a.data(), &*b.data())?, false))
}

/// Computes element-wise greater or equal comparison: `a >= b`.
pub fn greater_equal<B: Backend>(a: &Tensor<B>, b: &Tensor<B>) -> Result<Tensor<B>, Error> {
    Ok(Tensor::new(B::greater_equal(&*a.data(), &*b.data())?, false))
}

/// Computes element-wise less comparison: `a < b`.
pub fn less<B: Backend>(a: &Tensor<B>, b: &Tensor<B>) -> Result<Tensor<B>, Error> {
    Ok(Tensor::new(B::less(&*a.data(), &*b.data())?, false))
}

/// Computes element-wise less or equal comparison: `a <= b`.
pub fn less_equal<B: Backend>(a: &Tensor<B>, b: &Tensor<B>) -> Result<Tensor<B>, Error> {
    Ok(Tensor::new(B::less_equal(&*a.data(), &*b.data())?, false))
}

/// Logical AND over every element of `x` (non-zero counts as true).
///
/// Empty tensors are vacuously `true`.
///
/// # Example
/// ```rust
/// use rust_tensor_losses::{ops, CpuTensor};
/// let a = CpuTensor::from_vec(vec![1.0, 2.0, 3.0], &[3], false)?;
/// let b = CpuTensor::from_vec(vec![4.0, 5.0, 6.0], &[3], false)?;
/// assert!(ops::all(&ops::less(&a, &b)?)?);
/// # Ok::<(), rust_tensor_losses::Error>(())
/// ```
pub fn all<B: Backend>(x: &Tensor<B>) -> Result<bool, Error> {
    B::all_true(&*x.data())
}
