//! Finite-difference gradient checking and storage assertions shared by the test suites.

use crate::{Backend, Error, Tensor};

/// Checks the analytical gradient of `func` with respect to `inputs[input_idx]`
/// against central finite differences.
///
/// # Arguments
/// * `func`: Builds a single-element loss from the inputs. Called once for the
///   backward pass and twice per element of the checked input.
/// * `inputs`: Input tensors. The checked one must `require_grad`.
/// * `input_idx`: Index into `inputs` of the tensor being checked.
/// * `epsilon`: Perturbation for the central difference (e.g. 1e-4).
/// * `tolerance`: Per element, `|analytical - numerical|` may be at most
///   `tolerance * (1 + max(|analytical|, |numerical|))`.
///
/// # Errors
/// `Error::GradientCheckError` with both gradients when they disagree.
pub fn check_gradient<B, F>(
    func: F,
    inputs: &[Tensor<B>],
    input_idx: usize,
    epsilon: f32,
    tolerance: f32,
) -> Result<(), Error>
where
    B: Backend + 'static,
    F: Fn(&[Tensor<B>]) -> Result<Tensor<B>, Error>,
{
    let target_input = inputs.get(input_idx).ok_or_else(|| {
        Error::InvalidOperation(format!(
            "input_idx ({}) is out of bounds for inputs slice (len {})",
            input_idx,
            inputs.len()
        ))
    })?;

    if !target_input.requires_grad() {
        tracing::warn!(
            input_idx,
            tensor_id = target_input.id(),
            "skipping gradient check: input does not require grad"
        );
        return Ok(());
    }

    let analytical = compute_analytical_gradient(&func, inputs, input_idx)?;
    let numerical = compute_numerical_gradient(&func, inputs, input_idx, epsilon)?;
    tracing::debug!(?analytical, ?numerical, input_idx, "gradient check");

    compare_gradients(&analytical, &numerical, tolerance)
}

fn compute_analytical_gradient<B, F>(
    func: &F,
    inputs: &[Tensor<B>],
    input_idx: usize,
) -> Result<Vec<f32>, Error>
where
    B: Backend + 'static,
    F: Fn(&[Tensor<B>]) -> Result<Tensor<B>, Error>,
{
    for input in inputs.iter().filter(|t| t.requires_grad()) {
        input.zero_grad();
    }

    let loss = func(inputs)?;
    if loss.size() != 1 {
        return Err(Error::InvalidOperation(format!(
            "Function must return a scalar tensor for gradient checking, got shape {:?}",
            loss.shape()
        )));
    }
    loss.backward()?;

    let target_input = &inputs[input_idx];
    let grad = target_input.grad().map(|g| B::copy_to_host(&*g));
    match grad {
        Some(grad) => grad,
        None => {
            // Not reached by the loss at all.
            tracing::debug!(
                tensor_id = target_input.id(),
                "no analytical gradient after backward, assuming zero"
            );
            Ok(vec![0.0; target_input.size()])
        }
    }
}

fn compute_numerical_gradient<B, F>(
    func: &F,
    original_inputs: &[Tensor<B>],
    input_idx: usize,
    epsilon: f32,
) -> Result<Vec<f32>, Error>
where
    B: Backend + 'static,
    F: Fn(&[Tensor<B>]) -> Result<Tensor<B>, Error>,
{
    let target_input = &original_inputs[input_idx];
    let shape = target_input.shape();
    let original_data = target_input.to_vec()?;

    let mut inputs = original_inputs.to_vec();
    let mut evaluate = |data: Vec<f32>| -> Result<f32, Error> {
        inputs[input_idx] = Tensor::new(B::from_vec(data, &shape)?, true);
        let loss = func(&inputs)?;
        loss.to_vec()?.first().copied().ok_or_else(|| {
            Error::InternalLogicError("Loss tensor copied to host is empty".to_string())
        })
    };

    let mut numerical = Vec::with_capacity(original_data.len());
    for i in 0..original_data.len() {
        let mut data_plus = original_data.clone();
        data_plus[i] += epsilon;
        let mut data_minus = original_data.clone();
        data_minus[i] -= epsilon;

        let loss_plus = evaluate(data_plus)?;
        let loss_minus = evaluate(data_minus)?;
        numerical.push((loss_plus - loss_minus) / (2.0 * epsilon));
    }
    Ok(numerical)
}

fn compare_gradients(analytical: &[f32], numerical: &[f32], tolerance: f32) -> Result<(), Error> {
    if analytical.len() != numerical.len() {
        return Err(Error::InternalLogicError(format!(
            "Gradient size mismatch: analytical size={}, numerical size={}",
            analytical.len(),
            numerical.len()
        )));
    }

    // Worst element by error relative to `1 + |gradient|`: relative for large
    // components, absolute near zero where f32 differencing noise dominates.
    let mut worst_scaled_err = 0.0_f32;
    let mut max_rel_err = 0.0;
    let mut max_abs_err = 0.0;
    let mut max_err_idx = 0;

    for (i, (a, n)) in analytical.iter().zip(numerical.iter()).enumerate() {
        let abs_err = (a - n).abs();
        let magnitude = a.abs().max(n.abs());
        let scaled_err = abs_err / (1.0 + magnitude);

        if !worst_scaled_err.is_nan() && (scaled_err.is_nan() || scaled_err > worst_scaled_err) {
            worst_scaled_err = scaled_err;
            max_abs_err = abs_err;
            max_rel_err = if magnitude > 1e-8 {
                abs_err / magnitude
            } else {
                abs_err
            };
            max_err_idx = i;
        }
    }

    if worst_scaled_err <= tolerance {
        Ok(())
    } else {
        Err(Error::GradientCheckError {
            analytical: analytical.to_vec(),
            numerical: numerical.to_vec(),
            max_rel_error: max_rel_err,
            max_abs_error: max_abs_err,
            at_index: max_err_idx,
        })
    }
}

/// Asserts two storages hold exactly the same values.
pub fn assert_storage_eq<B: Backend>(a: &B::Storage, b: &B::Storage) {
    assert_storage_close::<B>(a, b, 0.0);
}

/// Asserts two storages agree element-wise within `tol` (inclusive).
pub fn assert_storage_close<B: Backend>(a: &B::Storage, b: &B::Storage, tol: f32) {
    assert_eq!(B::shape(a), B::shape(b), "Storage shapes don't match");
    let a_data = B::copy_to_host(a).unwrap();
    let b_data = B::copy_to_host(b).unwrap();
    for (i, (a_val, b_val)) in a_data.iter().zip(b_data.iter()).enumerate() {
        assert!(
            (a_val - b_val).abs() <= tol,
            "Values at index {i} aren't close enough: a={a_val}, b={b_val}, diff={}, tol={tol}",
            (a_val - b_val).abs()
        );
    }
}
