use rust_tensor_losses::ops::cpu_ops::{
    add, all_true, equal, less, log_softmax, max, maximum, mean, mul, not_equal, relu,
};
use rust_tensor_losses::{ops, Array, CpuTensor, Error};

#[test]
fn test_mul_broadcasting() {
    let a = Array::from_vec(vec![1.0, 2.0, 3.0], &[3, 1]).unwrap();
    let b = Array::from_vec(vec![2.0], &[1]).unwrap();

    let result = mul(&a, &b).unwrap();
    assert_eq!(result.shape(), &[3, 1]);
    assert_eq!(result.to_vec(), vec![2.0, 4.0, 6.0]);
}

#[test]
fn test_add_mismatched_shapes() {
    let a = Array::from_vec(vec![1.0, 2.0], &[2]).unwrap();
    let b = Array::from_vec(vec![3.0, 4.0, 5.0], &[3]).unwrap();

    match add(&a, &b) {
        Err(Error::IncompatibleShapes { op, shape_a, shape_b }) => {
            assert_eq!(op, "add");
            assert_eq!(shape_a, vec![2]);
            assert_eq!(shape_b, vec![3]);
        }
        other => panic!("expected IncompatibleShapes, got {:?}", other),
    }
}

#[test]
fn test_rank_zero_broadcasts_against_anything() {
    let scalar = Array::from_vec(vec![2.0], &[]).unwrap();
    let matrix = Array::from_vec(vec![1.0, 3.0, 5.0, 7.0], &[2, 2]).unwrap();

    let result = maximum(&matrix, &scalar).unwrap();
    assert_eq!(result.shape(), &[2, 2]);
    assert_eq!(result.to_vec(), vec![2.0, 3.0, 5.0, 7.0]);

    let both = add(&scalar, &scalar).unwrap();
    assert!(both.shape().is_empty());
    assert_eq!(both.to_vec(), vec![4.0]);
}

#[test]
fn test_mean_invalid_axis() {
    let a = Array::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
    assert!(matches!(mean(&a, Some(2)), Err(Error::InvalidIndex(_))));
    assert!(matches!(max(&a, Some(5)), Err(Error::InvalidIndex(_))));
}

#[test]
fn test_log_softmax_invalid_axis() {
    let a = Array::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
    assert!(matches!(log_softmax(&a, 2), Err(Error::InvalidIndex(_))));
}

#[test]
fn test_empty_reductions() {
    let empty = Array::from_vec(vec![], &[0]).unwrap();
    assert!(matches!(mean(&empty, None), Err(Error::EmptyTensor)));
    assert!(matches!(max(&empty, None), Err(Error::EmptyTensor)));
    assert!(all_true(&empty));
}

#[test]
fn test_relu_on_empty_array() {
    let empty = Array::from_vec(vec![], &[0, 3]).unwrap();
    let result = relu(&empty).unwrap();
    assert_eq!(result.shape(), &[0, 3]);
    assert!(result.to_vec().is_empty());
}

#[test]
fn test_comparison_handles_nan() {
    let a = Array::from_vec(vec![f32::NAN, 1.0], &[2]).unwrap();
    let b = Array::from_vec(vec![0.0, 2.0], &[2]).unwrap();
    assert_eq!(less(&a, &b).unwrap().to_vec(), vec![0.0, 1.0]);
    assert_eq!(not_equal(&a, &b).unwrap().to_vec(), vec![1.0, 1.0]);
}

#[test]
fn test_equal_on_infinities() {
    let a = Array::from_vec(vec![f32::INFINITY, 1.0], &[2]).unwrap();
    assert_eq!(equal(&a, &a).unwrap().to_vec(), vec![1.0, 1.0]);

    let x = CpuTensor::from_vec(vec![f32::NEG_INFINITY, 0.0], &[2], false).unwrap();
    let y = CpuTensor::from_vec(vec![f32::NEG_INFINITY, f32::NAN], &[2], false).unwrap();
    assert_eq!(ops::equal(&x, &y).unwrap().to_vec().unwrap(), vec![1.0, 0.0]);
}

#[test]
fn test_max_backward_with_infinite_maximum() -> Result<(), Error> {
    let x = CpuTensor::from_vec(vec![f32::INFINITY, 1.0], &[2], true)?;
    ops::max(&x, None)?.backward()?;
    assert_eq!(x.grad().map(|g| g.to_vec()), Some(vec![1.0, 0.0]));

    let rows = CpuTensor::from_vec(
        vec![1.0, f32::INFINITY, -2.0, f32::NEG_INFINITY],
        &[2, 2],
        true,
    )?;
    ops::sum(&ops::max(&rows, Some(1))?, None)?.backward()?;
    assert_eq!(rows.grad().map(|g| g.to_vec()), Some(vec![0.0, 1.0, 1.0, 0.0]));
    Ok(())
}

#[test]
fn test_tensor_sum_on_empty_is_zero() -> Result<(), Error> {
    let empty = CpuTensor::from_vec(vec![], &[0], false)?;
    let total = ops::sum(&empty, None)?;
    assert!(total.shape().is_empty());
    assert_eq!(total.to_vec()?, vec![0.0]);
    Ok(())
}

#[test]
fn test_tensor_invalid_axis_on_sum_and_log_softmax() {
    let x = CpuTensor::from_vec(vec![1.0, 2.0], &[2], true).unwrap();
    assert!(matches!(ops::sum(&x, Some(1)), Err(Error::InvalidIndex(_))));
    assert!(matches!(ops::log_softmax(&x, 1), Err(Error::InvalidIndex(_))));
}

#[test]
fn test_tensor_ops_on_rank_zero() -> Result<(), Error> {
    let x = CpuTensor::scalar(-3.0, true)?;
    let y = ops::mul(&ops::abs(&x)?, &x)?;
    assert!(y.shape().is_empty());
    assert_eq!(y.to_vec()?, vec![-9.0]);

    y.backward()?;
    // d/dx (|x| * x) = 2|x|
    assert_eq!(x.to_vec()?, vec![-3.0]);
    assert_eq!(x.grad().map(|g| g.to_vec()), Some(vec![6.0]));
    Ok(())
}

#[test]
fn test_from_vec_rejects_wrong_length() {
    assert!(CpuTensor::from_vec(vec![1.0, 2.0, 3.0], &[2, 2], false).is_err());
    assert!(Array::from_vec(vec![1.0], &[0]).is_err());
}
