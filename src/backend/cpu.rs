//! CPU backend implementation using `ndarray`.

use crate::array::Array;
use crate::backend::Backend;
use crate::error::Error;
use crate::graph::Op;
use crate::ops::{cpu_backward, cpu_ops};
use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};

/// Marker struct for the CPU backend.
/// Implements the `Backend` trait using `ndarray` operations via the `Array` wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuBackend;

/// Fills a fresh array of `shape` with samples drawn from `dist`.
fn sample_array<D>(shape: &[usize], dist: D) -> Result<Array, Error>
where
    D: Distribution<f32>,
{
    let size = shape.iter().product::<usize>();
    if size == 0 {
        return Ok(Array::zeros(shape));
    }
    let mut rng = rand::rng();
    let data: Vec<f32> = (0..size).map(|_| rng.sample(&dist)).collect();
    Array::from_vec(data, shape)
}

impl Backend for CpuBackend {
    type Storage = Array;

    // --- Factory Methods ---
    fn zeros(shape: &[usize]) -> Result<Self::Storage, Error> {
        Ok(Array::zeros(shape))
    }

    fn ones(shape: &[usize]) -> Result<Self::Storage, Error> {
        Ok(Array::ones(shape))
    }

    fn from_vec(data: Vec<f32>, shape: &[usize]) -> Result<Self::Storage, Error> {
        Array::from_vec(data, shape)
    }

    fn random_uniform(shape: &[usize], low: f32, high: f32) -> Result<Self::Storage, Error> {
        let dist = Uniform::new(low, high).map_err(|_| Error::InitializationError)?;
        sample_array(shape, dist)
    }

    fn random_normal(shape: &[usize], mean: f32, std_dev: f32) -> Result<Self::Storage, Error> {
        // rand_distr only rejects a non-finite std_dev.
        if std_dev.is_nan() || std_dev < 0.0 {
            return Err(Error::InitializationError);
        }
        let dist = Normal::new(mean, std_dev).map_err(|_| Error::InitializationError)?;
        sample_array(shape, dist)
    }

    // --- Shape/Data Access ---
    fn shape(storage: &Self::Storage) -> &[usize] {
        storage.shape()
    }

    fn size(storage: &Self::Storage) -> usize {
        storage.size()
    }

    fn into_raw_vec(storage: Self::Storage) -> Result<Vec<f32>, Error> {
        Ok(storage.to_vec())
    }

    fn copy_to_host(storage: &Self::Storage) -> Result<Vec<f32>, Error> {
        Ok(storage.to_vec())
    }

    fn set_shape(storage: &mut Self::Storage, shape: &[usize]) -> Result<(), Error> {
        storage.reshape(shape).map_err(|_| Error::ShapeMismatch {
            expected: shape.to_vec(),
            actual: storage.shape().to_vec(),
        })
    }

    fn broadcast_to(x: &Self::Storage, shape: &[usize]) -> Result<Self::Storage, Error> {
        x.broadcast_to(shape)
    }

    // --- Element-wise Arithmetic ---
    fn add(a: &Self::Storage, b: &Self::Storage) -> Result<Self::Storage, Error> {
        cpu_ops::add(a, b)
    }

    fn sub(a: &Self::Storage, b: &Self::Storage) -> Result<Self::Storage, Error> {
        cpu_ops::sub(a, b)
    }

    fn mul(a: &Self::Storage, b: &Self::Storage) -> Result<Self::Storage, Error> {
        cpu_ops::mul(a, b)
    }

    fn div(a: &Self::Storage, b: &Self::Storage) -> Result<Self::Storage, Error> {
        cpu_ops::div(a, b)
    }

    fn mul_scalar(x: &Self::Storage, scalar: f32) -> Result<Self::Storage, Error> {
        Ok(Array::new(x.get_data() * scalar))
    }

    fn div_scalar(x: &Self::Storage, scalar: f32) -> Result<Self::Storage, Error> {
        if scalar == 0.0 {
            return Err(Error::InvalidOperation(
                "Division by zero scalar".to_string(),
            ));
        }
        Ok(Array::new(x.get_data() / scalar))
    }

    fn maximum(a: &Self::Storage, b: &Self::Storage) -> Result<Self::Storage, Error> {
        cpu_ops::maximum(a, b)
    }

    fn minimum(a: &Self::Storage, b: &Self::Storage) -> Result<Self::Storage, Error> {
        cpu_ops::minimum(a, b)
    }

    // --- Unary Functions ---
    fn exp(x: &Self::Storage) -> Result<Self::Storage, Error> {
        Ok(Array::new(x.get_data().mapv(|v| v.exp())))
    }

    fn ln(x: &Self::Storage) -> Result<Self::Storage, Error> {
        // Non-positive inputs follow IEEE: ln(0) = -inf, ln(<0) = NaN
        Ok(Array::new(x.get_data().mapv(|v| v.ln())))
    }

    fn abs(x: &Self::Storage) -> Result<Self::Storage, Error> {
        Ok(Array::new(x.get_data().mapv(|v| v.abs())))
    }

    fn square(x: &Self::Storage) -> Result<Self::Storage, Error> {
        cpu_ops::square(x)
    }

    fn relu(x: &Self::Storage) -> Result<Self::Storage, Error> {
        cpu_ops::relu(x)
    }

    fn sigmoid(x: &Self::Storage) -> Result<Self::Storage, Error> {
        cpu_ops::sigmoid(x)
    }

    fn softplus(x: &Self::Storage) -> Result<Self::Storage, Error> {
        cpu_ops::softplus(x)
    }

    fn log_softmax(x: &Self::Storage, axis: usize) -> Result<Self::Storage, Error> {
        cpu_ops::log_softmax(x, axis)
    }

    fn map<F>(x: &Self::Storage, f: F) -> Result<Self::Storage, Error>
    where
        F: Fn(f32) -> f32 + Send + Sync + 'static,
    {
        Ok(Array::new(x.get_data().mapv(f)))
    }

    // --- Reduction Operations ---
    fn sum_along_axis(x: &Self::Storage, axis: usize) -> Result<Self::Storage, Error> {
        x.sum_along_axis(axis)
    }

    fn sum_all(x: &Self::Storage) -> Result<f32, Error> {
        Ok(x.get_data().sum())
    }

    fn mean(x: &Self::Storage, axis: Option<usize>) -> Result<Self::Storage, Error> {
        cpu_ops::mean(x, axis)
    }

    fn max(x: &Self::Storage, axis: Option<usize>) -> Result<Self::Storage, Error> {
        cpu_ops::max(x, axis)
    }

    // --- Comparisons ---
    fn equal(a: &Self::Storage, b: &Self::Storage) -> Result<Self::Storage, Error> {
        cpu_ops::equal(a, b)
    }

    fn not_equal(a: &Self::Storage, b: &Self::Storage) -> Result<Self::Storage, Error> {
        cpu_ops::not_equal(a, b)
    }

    fn greater(a: &Self::Storage, b: &Self::Storage) -> Result<Self::Storage, Error> {
        cpu_ops::greater(a, b)
    }

    fn greater_equal(a: &Self::Storage, b: &Self::Storage) -> Result<Self::Storage, Error> {
        cpu_ops::greater_equal(a, b)
    }

    fn less(a: &Self::Storage, b: &Self::Storage) -> Result<Self::Storage, Error> {
        cpu_ops::less(a, b)
    }

    fn less_equal(a: &Self::Storage, b: &Self::Storage) -> Result<Self::Storage, Error> {
        cpu_ops::less_equal(a, b)
    }

    fn all_true(x: &Self::Storage) -> Result<bool, Error> {
        Ok(cpu_ops::all_true(x))
    }

    // --- Backward Operations ---
    fn add_backward(
        op: &Op<Self>,
        output_grad: &Self::Storage,
    ) -> Result<(Self::Storage, Self::Storage), Error> {
        cpu_backward::add_backward(op, output_grad)
    }

    fn sub_backward(
        op: &Op<Self>,
        output_grad: &Self::Storage,
    ) -> Result<(Self::Storage, Self::Storage), Error> {
        cpu_backward::sub_backward(op, output_grad)
    }

    fn mul_backward(
        op: &Op<Self>,
        output_grad: &Self::Storage,
    ) -> Result<(Self::Storage, Self::Storage), Error> {
        cpu_backward::mul_backward(op, output_grad)
    }

    fn div_backward(
        op: &Op<Self>,
        output_grad: &Self::Storage,
    ) -> Result<(Self::Storage, Self::Storage), Error> {
        cpu_backward::div_backward(op, output_grad)
    }

    fn maximum_backward(
        op: &Op<Self>,
        output_grad: &Self::Storage,
    ) -> Result<(Self::Storage, Self::Storage), Error> {
        cpu_backward::maximum_backward(op, output_grad)
    }

    fn minimum_backward(
        op: &Op<Self>,
        output_grad: &Self::Storage,
    ) -> Result<(Self::Storage, Self::Storage), Error> {
        cpu_backward::minimum_backward(op, output_grad)
    }

    fn exp_backward(op: &Op<Self>, output_grad: &Self::Storage) -> Result<Self::Storage, Error> {
        cpu_backward::exp_backward(op, output_grad)
    }

    fn ln_backward(op: &Op<Self>, output_grad: &Self::Storage) -> Result<Self::Storage, Error> {
        cpu_backward::ln_backward(op, output_grad)
    }

    fn abs_backward(op: &Op<Self>, output_grad: &Self::Storage) -> Result<Self::Storage, Error> {
        cpu_backward::abs_backward(op, output_grad)
    }

    fn square_backward(
        op: &Op<Self>,
        output_grad: &Self::Storage,
    ) -> Result<Self::Storage, Error> {
        cpu_backward::square_backward(op, output_grad)
    }

    fn relu_backward(op: &Op<Self>, output_grad: &Self::Storage) -> Result<Self::Storage, Error> {
        cpu_backward::relu_backward(op, output_grad)
    }

    fn sigmoid_backward(
        op: &Op<Self>,
        output_grad: &Self::Storage,
    ) -> Result<Self::Storage, Error> {
        cpu_backward::sigmoid_backward(op, output_grad)
    }

    fn softplus_backward(
        op: &Op<Self>,
        output_grad: &Self::Storage,
    ) -> Result<Self::Storage, Error> {
        cpu_backward::softplus_backward(op, output_grad)
    }

    fn log_softmax_backward(
        op: &Op<Self>,
        output_grad: &Self::Storage,
    ) -> Result<Self::Storage, Error> {
        cpu_backward::log_softmax_backward(op, output_grad)
    }

    fn sum_backward(op: &Op<Self>, output_grad: &Self::Storage) -> Result<Self::Storage, Error> {
        cpu_backward::sum_backward(op, output_grad)
    }

    fn mean_backward(
        op: &Op<Self>,
        output_grad: &Self::Storage,
    ) -> Result<Self::Storage, Error> {
        cpu_backward::mean_backward(op, output_grad)
    }

    fn max_backward(op: &Op<Self>, output_grad: &Self::Storage) -> Result<Self::Storage, Error> {
        cpu_backward::max_backward(op, output_grad)
    }
}
