use approx::assert_abs_diff_eq;
use rust_tensor_losses::{compat, losses, CpuTensor, Error, Reduction};

fn cpu_tensor(data: Vec<f32>, shape: &[usize]) -> CpuTensor {
    CpuTensor::from_vec(data, shape, false).unwrap()
}

fn cpu_tensor_req_grad(data: Vec<f32>, shape: &[usize]) -> CpuTensor {
    CpuTensor::from_vec(data, shape, true).unwrap()
}

fn scalar_value(t: &CpuTensor) -> f32 {
    assert!(t.shape().is_empty(), "expected a 0-d tensor, got {:?}", t.shape());
    t.data().as_ref()[0]
}

type General = fn(&CpuTensor, &CpuTensor, Reduction) -> Result<CpuTensor, Error>;
type Facade = fn(&CpuTensor, &CpuTensor) -> Result<CpuTensor, Error>;

/// Asserts that `facade` equals `general` under `reduction` and differs from the other one.
fn assert_fixed_reduction(
    facade: Facade,
    general: General,
    reduction: Reduction,
    predicted: &CpuTensor,
    expected: &CpuTensor,
) {
    let other = match reduction {
        Reduction::Sum => Reduction::Mean,
        _ => Reduction::Sum,
    };
    let from_facade = scalar_value(&facade(predicted, expected).unwrap());
    let from_general = scalar_value(&general(predicted, expected, reduction).unwrap());
    let from_other = scalar_value(&general(predicted, expected, other).unwrap());

    assert_abs_diff_eq!(from_facade, from_general, epsilon = 1e-6);
    assert!(
        (from_facade - from_other).abs() > 1e-3,
        "facade result {} should not match {:?} reduction",
        from_facade,
        other
    );
}

fn regression_pair() -> (CpuTensor, CpuTensor) {
    (
        cpu_tensor(vec![0.3, 1.2, 2.5, 0.8], &[4]),
        cpu_tensor(vec![0.5, 1.0, 2.0, 1.5], &[4]),
    )
}

fn classification_pair() -> (CpuTensor, CpuTensor) {
    (
        cpu_tensor(vec![0.2, 1.5, -0.3, 0.4, 0.9, 2.0], &[2, 3]),
        cpu_tensor(vec![0.0, 1.0, 0.0, 1.0, 0.0, 0.0], &[2, 3]),
    )
}

#[test]
fn test_l2_loss_example() -> Result<(), Error> {
    let predicted = cpu_tensor(vec![1.0, 2.0], &[2]);
    let expected = cpu_tensor(vec![0.0, 0.0], &[2]);
    let loss = compat::losses::l2_loss(&predicted, &expected)?;
    assert_eq!(scalar_value(&loss), 5.0);
    Ok(())
}

#[test]
fn test_l1_loss_is_sum_of_absolute_errors() -> Result<(), Error> {
    let (predicted, expected) = regression_pair();
    let loss = compat::losses::l1_loss(&predicted, &expected)?;
    assert_abs_diff_eq!(scalar_value(&loss), 0.2 + 0.2 + 0.5 + 0.7, epsilon = 1e-5);
    Ok(())
}

#[test]
fn test_sum_reduced_losses() {
    let (predicted, expected) = regression_pair();
    assert_fixed_reduction(
        compat::losses::l1_loss,
        losses::l1_loss,
        Reduction::Sum,
        &predicted,
        &expected,
    );
    assert_fixed_reduction(
        compat::losses::l2_loss,
        losses::l2_loss,
        Reduction::Sum,
        &predicted,
        &expected,
    );

    let predicted = cpu_tensor(vec![0.1, 0.6, 0.3], &[3]);
    let expected = cpu_tensor(vec![0.2, 0.5, 0.3], &[3]);
    assert_fixed_reduction(
        compat::losses::kullback_leibler_divergence,
        losses::kullback_leibler_divergence,
        Reduction::Sum,
        &predicted,
        &expected,
    );
}

#[test]
fn test_mean_reduced_losses() {
    let (predicted, expected) = regression_pair();
    let labels = cpu_tensor(vec![1.0, -1.0, 1.0, -1.0], &[4]);
    assert_fixed_reduction(
        compat::losses::hinge_loss,
        losses::hinge_loss,
        Reduction::Mean,
        &predicted,
        &labels,
    );
    assert_fixed_reduction(
        compat::losses::squared_hinge_loss,
        losses::squared_hinge_loss,
        Reduction::Mean,
        &predicted,
        &labels,
    );
    assert_fixed_reduction(
        compat::losses::log_cosh_loss,
        losses::log_cosh_loss,
        Reduction::Mean,
        &predicted,
        &expected,
    );
    assert_fixed_reduction(
        compat::losses::poisson_loss,
        losses::poisson_loss,
        Reduction::Mean,
        &predicted,
        &expected,
    );

    let binary = cpu_tensor(vec![1.0, 0.0, 1.0, 1.0], &[4]);
    assert_fixed_reduction(
        compat::losses::sigmoid_cross_entropy,
        losses::sigmoid_cross_entropy,
        Reduction::Mean,
        &predicted,
        &binary,
    );

    let (logits, one_hot) = classification_pair();
    assert_fixed_reduction(
        compat::losses::categorical_hinge_loss,
        losses::categorical_hinge_loss,
        Reduction::Mean,
        &logits,
        &one_hot,
    );
    assert_fixed_reduction(
        compat::losses::softmax_cross_entropy,
        losses::softmax_cross_entropy,
        Reduction::Mean,
        &logits,
        &one_hot,
    );
}

#[test]
fn test_hinge_loss_matches_mean_of_margins() -> Result<(), Error> {
    let predicted = cpu_tensor(vec![0.5, 2.0, -0.5, 0.0], &[4]);
    let expected = cpu_tensor(vec![1.0, 1.0, -1.0, 1.0], &[4]);
    let loss = compat::losses::hinge_loss(&predicted, &expected)?;
    // max(0, 1 - e*p) = [0.5, 0, 0.5, 1]
    assert_abs_diff_eq!(scalar_value(&loss), 0.5, epsilon = 1e-6);
    Ok(())
}

#[test]
fn test_huber_loss_sums() -> Result<(), Error> {
    let predicted = cpu_tensor(vec![0.0, 0.0, 0.0], &[3]);
    let expected = cpu_tensor(vec![0.5, 2.0, -3.0], &[3]);
    let loss = compat::losses::huber_loss(&predicted, &expected, 1.0)?;
    assert_abs_diff_eq!(scalar_value(&loss), 4.125, epsilon = 1e-5);
    Ok(())
}

#[test]
fn test_facade_outputs_are_rank_zero_for_batched_inputs() -> Result<(), Error> {
    let (logits, one_hot) = classification_pair();
    let ce = compat::losses::softmax_cross_entropy(&logits, &one_hot)?;
    assert!(ce.shape().is_empty());
    let l1 = compat::losses::l1_loss(&logits, &one_hot)?;
    assert!(l1.shape().is_empty());
    Ok(())
}

#[test]
fn test_facade_propagates_errors_unchanged() {
    let predicted = cpu_tensor(vec![1.0, 2.0], &[2]);
    let expected = cpu_tensor(vec![1.0, 2.0, 3.0], &[3]);

    let facade = compat::losses::poisson_loss(&predicted, &expected).unwrap_err();
    let general = losses::poisson_loss(&predicted, &expected, Reduction::Mean).unwrap_err();
    assert_eq!(facade.to_string(), general.to_string());

    let scalar = CpuTensor::scalar(0.0, false).unwrap();
    assert!(matches!(
        compat::losses::softmax_cross_entropy(&scalar, &scalar),
        Err(Error::InvalidOperation(_))
    ));
}

#[test]
fn test_facade_gradients_flow_to_predicted_only() -> Result<(), Error> {
    let predicted = cpu_tensor_req_grad(vec![0.5, 2.0, -0.5, 0.25], &[4]);
    let expected = cpu_tensor_req_grad(vec![1.0, 1.0, -1.0, -1.0], &[4]);

    let loss = compat::losses::hinge_loss(&predicted, &expected)?;
    loss.backward()?;

    // Active margins contribute -e / n
    let grad = predicted.grad().expect("predicted should receive a gradient");
    let expected_grad = [-0.25, 0.0, 0.25, 0.25];
    for (g, e) in grad.as_ref().iter().zip(expected_grad.iter()) {
        assert_abs_diff_eq!(*g, *e, epsilon = 1e-6);
    }
    assert!(expected.grad().is_none());
    Ok(())
}
