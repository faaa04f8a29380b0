// tests/tensor_tests.rs
use rust_tensor_losses::test_utils::assert_storage_eq;
use rust_tensor_losses::{backend::cpu::CpuBackend, ops, Backend, CpuTensor, Error, Tensor};
use std::collections::HashSet;

#[test]
fn test_backend_array_creation() {
    let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let shape = &[2, 3];
    let storage = CpuBackend::from_vec(data.clone(), shape).unwrap();

    assert_eq!(CpuBackend::shape(&storage), shape);
    assert_eq!(CpuBackend::size(&storage), 6);
    let raw_vec = CpuBackend::into_raw_vec(storage).unwrap();
    assert_eq!(raw_vec, data);
}

#[test]
fn test_backend_zeros_ones() {
    let shape = &[2, 3];
    let zeros = CpuBackend::zeros(shape).unwrap();
    let ones = CpuBackend::ones(shape).unwrap();

    assert_eq!(CpuBackend::shape(&zeros), shape);
    assert_eq!(CpuBackend::shape(&ones), shape);

    assert!(CpuBackend::into_raw_vec(zeros).unwrap().iter().all(|&x| x == 0.0));
    assert!(CpuBackend::into_raw_vec(ones).unwrap().iter().all(|&x| x == 1.0));
}

#[test]
fn test_backend_shape_mismatch() {
    let result = CpuBackend::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0], &[2, 3]);
    match result {
        Err(Error::ShapeMismatch { expected, actual }) => {
            assert_eq!(expected, vec![2, 3]);
            assert_eq!(actual, vec![5]);
        }
        other => panic!("Expected ShapeMismatch error, got {:?}", other),
    }
}

#[test]
fn test_tensor_creation_cpu() {
    let storage = CpuBackend::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
    let tensor: CpuTensor = Tensor::new(storage, true);
    assert!(tensor.requires_grad());
    assert_eq!(tensor.shape(), vec![2, 3]);
    assert_eq!(tensor.size(), 6);
    assert!(!tensor.is_empty());

    let zeros_tensor = Tensor::<CpuBackend>::zeros(&[2, 3], false).unwrap();
    assert!(!zeros_tensor.requires_grad());
    assert!(zeros_tensor.to_vec().unwrap().iter().all(|&x| x == 0.0));

    let ones_tensor = Tensor::<CpuBackend>::ones(&[2, 3], true).unwrap();
    assert!(ones_tensor.requires_grad());
    assert!(ones_tensor.to_vec().unwrap().iter().all(|&x| x == 1.0));
}

#[test]
fn test_scalar_is_rank_zero() -> Result<(), Error> {
    let s = CpuTensor::scalar(4.5, false)?;
    assert!(s.shape().is_empty());
    assert_eq!(s.size(), 1);
    assert_eq!(s.to_vec()?, vec![4.5]);
    Ok(())
}

#[test]
fn test_grad_access() {
    let tensor: CpuTensor = Tensor::zeros(&[2], true).unwrap();
    assert!(tensor.grad().is_none());

    tensor
        .set_grad(Some(CpuBackend::ones(&[2]).unwrap()))
        .unwrap();
    {
        let grad_ref = tensor.grad().unwrap();
        assert_eq!(grad_ref.shape(), &[2]);
        assert_eq!(CpuBackend::copy_to_host(&grad_ref).unwrap(), vec![1.0, 1.0]);
    }

    tensor.zero_grad();
    assert!(tensor.grad().is_none());
}

#[test]
fn test_set_grad_rejects_wrong_shape() {
    let tensor: CpuTensor = Tensor::zeros(&[2], true).unwrap();
    let result = tensor.set_grad(Some(CpuBackend::ones(&[3]).unwrap()));
    assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
    assert!(tensor.grad().is_none());
}

#[test]
fn test_detach_cuts_the_graph() -> Result<(), Error> {
    let x = CpuTensor::from_vec(vec![1.0, 2.0], &[2], true)?;
    let doubled = ops::mul_scalar(&x, 2.0)?;
    let frozen = doubled.detach();

    assert!(!frozen.requires_grad());
    assert_ne!(frozen, doubled);
    assert_storage_eq::<CpuBackend>(&frozen.data(), &doubled.data());

    // Only the non-detached branch reaches x.
    let y = ops::sum(&ops::mul(&x, &frozen)?, None)?;
    y.backward()?;
    assert_eq!(x.grad().map(|g| g.to_vec()), Some(vec![2.0, 4.0]));
    Ok(())
}

#[test]
fn test_clone_shares_identity() -> Result<(), Error> {
    let a = CpuTensor::from_vec(vec![1.0], &[1], false)?;
    let b = a.clone();
    let c = CpuTensor::from_vec(vec![1.0], &[1], false)?;

    assert_eq!(a, b);
    assert_eq!(a.id(), b.id());
    assert_ne!(a, c);

    let set: HashSet<CpuTensor> = [a.clone(), b, c].into_iter().collect();
    assert_eq!(set.len(), 2);
    Ok(())
}

#[test]
fn test_backward_on_constant_is_noop() -> Result<(), Error> {
    let x = CpuTensor::from_vec(vec![1.0, 2.0], &[2], false)?;
    let y = ops::sum(&x, None)?;
    y.backward()?;
    assert!(x.grad().is_none());
    assert!(y.grad().is_none());
    Ok(())
}

#[test]
fn test_debug_output_mentions_shape() -> Result<(), Error> {
    let x = CpuTensor::from_vec(vec![1.0, 2.0, 3.0], &[3], true)?;
    let y = ops::exp(&x)?;
    let rendered = format!("{:?}", y);
    assert!(rendered.contains("shape: [3]"), "{}", rendered);
    assert!(rendered.contains("Exp"), "{}", rendered);
    Ok(())
}
