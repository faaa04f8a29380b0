//! Backend trait definition and module structure.

use crate::error::Error;
use crate::graph::Op;
use std::fmt::{Debug, Display};

pub mod cpu;

pub type CpuTensor = crate::tensor::Tensor<cpu::CpuBackend>;

pub trait Backend: Sized + Debug + Clone {
    type Storage: Clone + Debug + Display;

    // --- Factory Methods (Creating Storage) ---

    /// Creates new storage filled with zeros.
    fn zeros(shape: &[usize]) -> Result<Self::Storage, Error>;
    /// Creates new storage filled with ones.
    fn ones(shape: &[usize]) -> Result<Self::Storage, Error>;
    /// Creates new storage from a flat vector and a shape.
    fn from_vec(data: Vec<f32>, shape: &[usize]) -> Result<Self::Storage, Error>;

    /// Creates new storage filled with values from a uniform distribution U(low, high).
    fn random_uniform(shape: &[usize], low: f32, high: f32) -> Result<Self::Storage, Error>;
    /// Creates new storage filled with values from a normal distribution N(mean, std_dev^2).
    fn random_normal(shape: &[usize], mean: f32, std_dev: f32) -> Result<Self::Storage, Error>;

    // --- Shape/Data Access ---

    fn shape(storage: &Self::Storage) -> &[usize];
    fn size(storage: &Self::Storage) -> usize;
    /// Consumes the storage and returns its data as a flat `Vec<f32>`.
    fn into_raw_vec(storage: Self::Storage) -> Result<Vec<f32>, Error>;
    /// Copies the data to a host vector in row-major order.
    fn copy_to_host(storage: &Self::Storage) -> Result<Vec<f32>, Error>;
    /// Sets the shape of the storage without changing its data.
    /// The new shape must have the same total number of elements.
    fn set_shape(storage: &mut Self::Storage, shape: &[usize]) -> Result<(), Error>;
    /// Broadcasts the storage to a new compatible shape.
    fn broadcast_to(x: &Self::Storage, shape: &[usize]) -> Result<Self::Storage, Error>;

    // --- Element-wise Arithmetic (all binary ops broadcast) ---

    fn add(a: &Self::Storage, b: &Self::Storage) -> Result<Self::Storage, Error>;
    fn sub(a: &Self::Storage, b: &Self::Storage) -> Result<Self::Storage, Error>;
    fn mul(a: &Self::Storage, b: &Self::Storage) -> Result<Self::Storage, Error>;
    fn div(a: &Self::Storage, b: &Self::Storage) -> Result<Self::Storage, Error>;
    fn mul_scalar(x: &Self::Storage, scalar: f32) -> Result<Self::Storage, Error>;
    /// Element-wise division by a non-zero scalar.
    fn div_scalar(x: &Self::Storage, scalar: f32) -> Result<Self::Storage, Error>;
    /// Element-wise maximum of two tensors.
    fn maximum(a: &Self::Storage, b: &Self::Storage) -> Result<Self::Storage, Error>;
    /// Element-wise minimum of two tensors.
    fn minimum(a: &Self::Storage, b: &Self::Storage) -> Result<Self::Storage, Error>;

    // --- Unary Functions ---

    fn exp(x: &Self::Storage) -> Result<Self::Storage, Error>;
    fn ln(x: &Self::Storage) -> Result<Self::Storage, Error>;
    fn abs(x: &Self::Storage) -> Result<Self::Storage, Error>;
    fn square(x: &Self::Storage) -> Result<Self::Storage, Error>;
    fn relu(x: &Self::Storage) -> Result<Self::Storage, Error>;
    fn sigmoid(x: &Self::Storage) -> Result<Self::Storage, Error>;
    /// Numerically stable softplus: `max(x, 0) + ln(1 + exp(-|x|))`.
    fn softplus(x: &Self::Storage) -> Result<Self::Storage, Error>;
    /// Applies the log-softmax function along a specified axis.
    fn log_softmax(x: &Self::Storage, axis: usize) -> Result<Self::Storage, Error>;
    /// Applies a function element-wise.
    fn map<F>(x: &Self::Storage, f: F) -> Result<Self::Storage, Error>
    where
        F: Fn(f32) -> f32 + Send + Sync + 'static;

    // --- Reduction Operations ---

    /// Sums elements along a specified axis.
    fn sum_along_axis(x: &Self::Storage, axis: usize) -> Result<Self::Storage, Error>;
    /// Sums all elements in the storage, returning a scalar f32.
    fn sum_all(x: &Self::Storage) -> Result<f32, Error>;
    /// Calculates the mean along a specified axis (or globally if `axis` is `None`).
    /// The global mean is a 0-dim storage.
    fn mean(x: &Self::Storage, axis: Option<usize>) -> Result<Self::Storage, Error>;
    /// Computes the maximum value along the specified axis.
    /// If axis is None, computes the global maximum.
    fn max(x: &Self::Storage, axis: Option<usize>) -> Result<Self::Storage, Error>;

    // --- Comparisons (return 1.0 for true, 0.0 for false; broadcast) ---

    fn equal(a: &Self::Storage, b: &Self::Storage) -> Result<Self::Storage, Error>;
    fn not_equal(a: &Self::Storage, b: &Self::Storage) -> Result<Self::Storage, Error>;
    fn greater(a: &Self::Storage, b: &Self::Storage) -> Result<Self::Storage, Error>;
    fn greater_equal(a: &Self::Storage, b: &Self::Storage) -> Result<Self::Storage, Error>;
    fn less(a: &Self::Storage, b: &Self::Storage) -> Result<Self::Storage, Error>;
    fn less_equal(a: &Self::Storage, b: &Self::Storage) -> Result<Self::Storage, Error>;
    /// Logical AND over every element (non-zero counts as true).
    /// Vacuously true for empty storage.
    fn all_true(x: &Self::Storage) -> Result<bool, Error>;

    // --- Backward Operations for Autograd ---
    // Each takes the `Op` context (holding the original inputs) and the output gradient
    // and returns gradients shaped like the corresponding inputs.

    fn add_backward(
        op: &Op<Self>,
        output_grad: &Self::Storage,
    ) -> Result<(Self::Storage, Self::Storage), Error>;
    fn sub_backward(
        op: &Op<Self>,
        output_grad: &Self::Storage,
    ) -> Result<(Self::Storage, Self::Storage), Error>;
    fn mul_backward(
        op: &Op<Self>,
        output_grad: &Self::Storage,
    ) -> Result<(Self::Storage, Self::Storage), Error>;
    fn div_backward(
        op: &Op<Self>,
        output_grad: &Self::Storage,
    ) -> Result<(Self::Storage, Self::Storage), Error>;
    fn maximum_backward(
        op: &Op<Self>,
        output_grad: &Self::Storage,
    ) -> Result<(Self::Storage, Self::Storage), Error>;
    fn minimum_backward(
        op: &Op<Self>,
        output_grad: &Self::Storage,
    ) -> Result<(Self::Storage, Self::Storage), Error>;

    fn exp_backward(op: &Op<Self>, output_grad: &Self::Storage) -> Result<Self::Storage, Error>;
    fn ln_backward(op: &Op<Self>, output_grad: &Self::Storage) -> Result<Self::Storage, Error>;
    fn abs_backward(op: &Op<Self>, output_grad: &Self::Storage) -> Result<Self::Storage, Error>;
    /// dL/dx = dL/dy * 2x
    fn square_backward(op: &Op<Self>, output_grad: &Self::Storage)
        -> Result<Self::Storage, Error>;
    fn relu_backward(op: &Op<Self>, output_grad: &Self::Storage) -> Result<Self::Storage, Error>;
    fn sigmoid_backward(
        op: &Op<Self>,
        output_grad: &Self::Storage,
    ) -> Result<Self::Storage, Error>;
    /// The derivative of softplus is sigmoid.
    fn softplus_backward(
        op: &Op<Self>,
        output_grad: &Self::Storage,
    ) -> Result<Self::Storage, Error>;
    fn log_softmax_backward(
        op: &Op<Self>,
        output_grad: &Self::Storage,
    ) -> Result<Self::Storage, Error>;

    /// The `Op` carries the axis via `OpType::Sum(Option<usize>)`.
    fn sum_backward(op: &Op<Self>, output_grad: &Self::Storage) -> Result<Self::Storage, Error>;
    fn mean_backward(op: &Op<Self>, output_grad: &Self::Storage)
        -> Result<Self::Storage, Error>;
    /// Ties share the gradient equally.
    fn max_backward(op: &Op<Self>, output_grad: &Self::Storage) -> Result<Self::Storage, Error>;
}
