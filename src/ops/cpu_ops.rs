use crate::array::Array;
use crate::error::Error;
use crate::util::broadcast_shapes;
use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn, Zip};

/// Broadcasts two arrays against each other following numpy rules.
/// Missing leading axes are treated as size 1.
fn broadcast_views<'a>(
    a: &'a Array,
    b: &'a Array,
    op: &str,
) -> Result<(ArrayViewD<'a, f32>, ArrayViewD<'a, f32>), Error> {
    let a_data = a.get_data();
    let b_data = b.get_data();
    let incompatible = || Error::IncompatibleShapes {
        op: op.to_string(),
        shape_a: a_data.shape().to_vec(),
        shape_b: b_data.shape().to_vec(),
    };

    let broadcast_shape =
        broadcast_shapes(a_data.shape(), b_data.shape()).map_err(|_| incompatible())?;
    let a_broadcast = a_data
        .broadcast(IxDyn(&broadcast_shape))
        .ok_or_else(incompatible)?;
    let b_broadcast = b_data
        .broadcast(IxDyn(&broadcast_shape))
        .ok_or_else(incompatible)?;
    Ok((a_broadcast, b_broadcast))
}

/// Applies `f` pairwise over the broadcast of `a` and `b`.
pub(crate) fn zip_broadcast<F>(a: &Array, b: &Array, op: &str, f: F) -> Result<Array, Error>
where
    F: Fn(f32, f32) -> f32,
{
    let (a_broadcast, b_broadcast) = broadcast_views(a, b, op)?;
    let result = Zip::from(&a_broadcast)
        .and(&b_broadcast)
        .map_collect(|&a_val, &b_val| f(a_val, b_val));
    Ok(Array::new(result))
}

fn compare<F>(a: &Array, b: &Array, op: &str, predicate: F) -> Result<Array, Error>
where
    F: Fn(f32, f32) -> bool,
{
    zip_broadcast(a, b, op, |a_val, b_val| {
        if predicate(a_val, b_val) {
            1.0
        } else {
            0.0
        }
    })
}

/// Element-wise addition of two tensors with broadcasting support
pub fn add(a: &Array, b: &Array) -> Result<Array, Error> {
    zip_broadcast(a, b, "add", |x, y| x + y)
}

/// Element-wise subtraction with broadcasting support
pub fn sub(a: &Array, b: &Array) -> Result<Array, Error> {
    zip_broadcast(a, b, "sub", |x, y| x - y)
}

/// Element-wise multiplication of two tensors with broadcasting support
pub fn mul(a: &Array, b: &Array) -> Result<Array, Error> {
    zip_broadcast(a, b, "mul", |x, y| x * y)
}

/// Element-wise division with broadcasting support. Follows IEEE semantics for zero divisors.
pub fn div(a: &Array, b: &Array) -> Result<Array, Error> {
    zip_broadcast(a, b, "div", |x, y| x / y)
}

pub fn maximum(a: &Array, b: &Array) -> Result<Array, Error> {
    zip_broadcast(a, b, "maximum", f32::max)
}

pub fn minimum(a: &Array, b: &Array) -> Result<Array, Error> {
    zip_broadcast(a, b, "minimum", f32::min)
}

/// Exact IEEE equality: NaN equals nothing, and infinities of the same sign are equal.
pub fn equal(a: &Array, b: &Array) -> Result<Array, Error> {
    compare(a, b, "equal", |x, y| x == y)
}

pub fn not_equal(a: &Array, b: &Array) -> Result<Array, Error> {
    compare(a, b, "not_equal", |x, y| x != y)
}

pub fn greater(a: &Array, b: &Array) -> Result<Array, Error> {
    compare(a, b, "greater", |x, y| x > y)
}

pub fn greater_equal(a: &Array, b: &Array) -> Result<Array, Error> {
    compare(a, b, "greater_equal", |x, y| x >= y)
}

pub fn less(a: &Array, b: &Array) -> Result<Array, Error> {
    compare(a, b, "less", |x, y| x < y)
}

pub fn less_equal(a: &Array, b: &Array) -> Result<Array, Error> {
    compare(a, b, "less_equal", |x, y| x <= y)
}

/// True when every element is non-zero. Empty arrays are vacuously true.
pub fn all_true(a: &Array) -> bool {
    a.get_data().iter().all(|&x| x != 0.0)
}

/// Mean of tensor along specified axis
pub fn mean(a: &Array, axis: Option<usize>) -> Result<Array, Error> {
    let a_data = a.get_data();

    match axis {
        Some(ax) => {
            if ax >= a_data.ndim() {
                return Err(Error::InvalidIndex(vec![ax]));
            }
            a_data
                .mean_axis(Axis(ax))
                .map(Array::new)
                .ok_or_else(|| Error::InvalidOperation(format!("Mean failed along axis {}", ax)))
        }
        None => a_data
            .mean()
            .map(|mean_val| Array::new(ArrayD::from_elem(vec![], mean_val)))
            .ok_or(Error::EmptyTensor),
    }
}

/// ReLU activation function
pub fn relu(a: &Array) -> Result<Array, Error> {
    Ok(Array::new(a.get_data().mapv(|x| x.max(0.0))))
}

/// Sigmoid activation function
pub fn sigmoid(a: &Array) -> Result<Array, Error> {
    Ok(Array::new(a.get_data().mapv(|x| 1.0 / (1.0 + (-x).exp()))))
}

/// Softplus, written so that neither branch overflows for large |x|.
pub fn softplus(a: &Array) -> Result<Array, Error> {
    Ok(Array::new(
        a.get_data()
            .mapv(|x| x.max(0.0) + (-x.abs()).exp().ln_1p()),
    ))
}

pub fn square(a: &Array) -> Result<Array, Error> {
    Ok(Array::new(a.get_data().mapv(|x| x * x)))
}

/// Log-softmax function with numerical stability
pub fn log_softmax(a: &Array, axis: usize) -> Result<Array, Error> {
    let a_data = a.get_data();

    if axis >= a_data.ndim() {
        return Err(Error::InvalidIndex(vec![axis]));
    }

    // Shift by the max along the axis before exponentiating
    let max = a_data.fold_axis(Axis(axis), f32::NEG_INFINITY, |acc, &x| acc.max(x));
    let shifted = a_data - &max.insert_axis(Axis(axis));

    let sum = shifted.mapv(|x| x.exp()).sum_axis(Axis(axis));
    let log_sum_exp = sum.mapv(|x| x.ln());
    let log_softmax = shifted - &log_sum_exp.insert_axis(Axis(axis));

    Ok(Array::new(log_softmax))
}

/// Computes the maximum value along the specified axis.
/// If axis is None, computes the global maximum.
pub fn max(a: &Array, axis: Option<usize>) -> Result<Array, Error> {
    let a_data = a.get_data();

    match axis {
        Some(ax) => {
            if ax >= a_data.ndim() {
                return Err(Error::InvalidIndex(vec![ax]));
            }
            if a_data.len_of(Axis(ax)) == 0 {
                return Err(Error::EmptyTensor);
            }
            let max = a_data.fold_axis(Axis(ax), f32::NEG_INFINITY, |acc, &x| acc.max(x));
            Ok(Array::new(max))
        }
        None => {
            if a_data.is_empty() {
                return Err(Error::EmptyTensor);
            }
            let max_val = a_data.fold(f32::NEG_INFINITY, |acc, &x| acc.max(x));
            Ok(Array::new(ArrayD::from_elem(vec![], max_val)))
        }
    }
}
