use crate::{
    backend::Backend,
    error::Error,
    graph::{Op, OpType},
    ops,
};
use std::ops::{Add, Div, Mul, Sub};
use std::{
    cell::{Ref, RefCell},
    collections::HashSet,
    hash::{Hash, Hasher},
    marker::PhantomData,
    rc::Rc,
    sync::atomic::{AtomicUsize, Ordering},
};

static TENSOR_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn next_id() -> usize {
    TENSOR_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

pub struct TensorData<B: Backend> {
    pub id: usize,
    pub data: B::Storage,
    pub grad: Option<B::Storage>,
    pub requires_grad: bool,
    pub op: Option<Op<B>>,
}

/// A multi-dimensional array with automatic differentiation support.
///
/// A `Tensor` is a cheap, shared handle: cloning it clones the handle, not the data,
/// and two handles compare equal only if they refer to the same node. Operations in
/// [`crate::ops`] record the graph whenever one of their inputs requires gradients,
/// and [`Tensor::backward`] accumulates gradients into every such input.
///
/// # Example
/// ```rust
/// use rust_tensor_losses::{Tensor, CpuBackend, ops::*};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let x = Tensor::<CpuBackend>::from_vec(vec![1.0, 2.0, 3.0], &[3], true)?;
///     let y = exp(&x)?;
///
///     // Reduce to a scalar so no gradient seed is needed
///     let loss = mean(&y, None)?;
///     loss.backward()?;
///
///     assert!(x.grad().is_some());
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Tensor<B: Backend> {
    pub(crate) inner: Rc<RefCell<TensorData<B>>>,
    _backend: PhantomData<B>,
}

impl<B: Backend> Clone for Tensor<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            _backend: PhantomData,
        }
    }
}

impl<B: Backend> PartialEq for Tensor<B> {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl<B: Backend> Eq for Tensor<B> {}

impl<B: Backend> Hash for Tensor<B> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

// --- Operator Overloading ---
impl<'b, B: Backend> Add<&'b Tensor<B>> for &Tensor<B> {
    type Output = Result<Tensor<B>, Error>;

    /// Element-wise addition through `ops::add`.
    ///
    /// # Example
    /// ```rust
    /// use rust_tensor_losses::{Tensor, CpuBackend};
    /// let a = Tensor::<CpuBackend>::from_vec(vec![1.0], &[1], false)?;
    /// let b = Tensor::<CpuBackend>::from_vec(vec![2.0], &[1], false)?;
    /// let c = (&a + &b)?;
    /// assert_eq!(c.data().as_ref(), &[3.0]);
    /// # Ok::<(), rust_tensor_losses::Error>(())
    /// ```
    fn add(self, rhs: &'b Tensor<B>) -> Self::Output {
        ops::add(self, rhs)
    }
}

impl<'b, B: Backend> Mul<&'b Tensor<B>> for &Tensor<B> {
    type Output = Result<Tensor<B>, Error>;

    /// Element-wise multiplication through `ops::mul`.
    fn mul(self, rhs: &'b Tensor<B>) -> Self::Output {
        ops::mul(self, rhs)
    }
}

impl<'b, B: Backend> Sub<&'b Tensor<B>> for &Tensor<B> {
    type Output = Result<Tensor<B>, Error>;

    /// Element-wise subtraction through `ops::sub`.
    fn sub(self, rhs: &'b Tensor<B>) -> Self::Output {
        ops::sub(self, rhs)
    }
}

impl<'b, B: Backend> Div<&'b Tensor<B>> for &Tensor<B> {
    type Output = Result<Tensor<B>, Error>;

    /// Element-wise division through `ops::div`.
    fn div(self, rhs: &'b Tensor<B>) -> Self::Output {
        ops::div(self, rhs)
    }
}

impl<B: Backend> Tensor<B> {
    pub fn relu(&self) -> Result<Tensor<B>, Error> {
        ops::relu(self)
    }

    pub fn exp(&self) -> Result<Tensor<B>, Error> {
        ops::exp(self)
    }

    pub fn ln(&self) -> Result<Tensor<B>, Error> {
        ops::ln(self)
    }

    pub fn abs(&self) -> Result<Tensor<B>, Error> {
        ops::abs(self)
    }

    pub fn square(&self) -> Result<Tensor<B>, Error> {
        ops::square(self)
    }

    pub fn sigmoid(&self) -> Result<Tensor<B>, Error> {
        ops::sigmoid(self)
    }

    pub fn softplus(&self) -> Result<Tensor<B>, Error> {
        ops::softplus(self)
    }

    pub fn mul_scalar(&self, scalar: f32) -> Result<Tensor<B>, Error> {
        ops::mul_scalar(self, scalar)
    }

    pub fn mean(&self, axis: Option<usize>) -> Result<Tensor<B>, Error> {
        ops::mean(self, axis)
    }

    pub fn sum(&self, axis: Option<usize>) -> Result<Tensor<B>, Error> {
        ops::sum(self, axis)
    }

    pub fn max(&self, axis: Option<usize>) -> Result<Tensor<B>, Error> {
        ops::max(self, axis)
    }

    pub fn log_softmax(&self, axis: usize) -> Result<Tensor<B>, Error> {
        ops::log_softmax(self, axis)
    }

    pub fn view(&self, shape: &[usize]) -> Result<Tensor<B>, Error> {
        ops::view(self, shape)
    }

    pub fn broadcast_to(&self, shape: &[usize]) -> Result<Tensor<B>, Error> {
        ops::broadcast_to(self, shape)
    }

    /// Creates a new tensor from backend storage.
    pub fn new(data: B::Storage, requires_grad: bool) -> Self {
        Self {
            inner: Rc::new(RefCell::new(TensorData {
                id: next_id(),
                data,
                grad: None,
                requires_grad,
                op: None,
            })),
            _backend: PhantomData,
        }
    }

    /// Creates a new tensor whose backward pass is dispatched on `op_type`
    /// to the matching `Backend::*_backward` kernel.
    pub fn new_with_op(
        data: B::Storage,
        requires_grad: bool,
        op_type: Option<OpType>,
        inputs: Vec<Tensor<B>>,
    ) -> Self {
        let tensor = Self::new(data, requires_grad);
        if let Some(op_type) = op_type {
            let op = Op::new(op_type, inputs, |op_ctx, grad_output| {
                match op_ctx.op_type {
                    OpType::Add => B::add_backward(op_ctx, grad_output).map(|(a, b)| vec![a, b]),
                    OpType::Sub => B::sub_backward(op_ctx, grad_output).map(|(a, b)| vec![a, b]),
                    OpType::Mul => B::mul_backward(op_ctx, grad_output).map(|(a, b)| vec![a, b]),
                    OpType::Div => B::div_backward(op_ctx, grad_output).map(|(a, b)| vec![a, b]),
                    OpType::MulScalar(scalar) => Ok(vec![B::mul_scalar(grad_output, scalar)?]),
                    OpType::Exp => B::exp_backward(op_ctx, grad_output).map(|x| vec![x]),
                    OpType::Ln => B::ln_backward(op_ctx, grad_output).map(|x| vec![x]),
                    OpType::Abs => B::abs_backward(op_ctx, grad_output).map(|x| vec![x]),
                    OpType::Square => B::square_backward(op_ctx, grad_output).map(|x| vec![x]),
                    OpType::Relu => B::relu_backward(op_ctx, grad_output).map(|x| vec![x]),
                    OpType::Sigmoid => B::sigmoid_backward(op_ctx, grad_output).map(|x| vec![x]),
                    OpType::Softplus => B::softplus_backward(op_ctx, grad_output).map(|x| vec![x]),
                    OpType::LogSoftmax(_) => {
                        B::log_softmax_backward(op_ctx, grad_output).map(|x| vec![x])
                    }
                    OpType::Maximum => {
                        B::maximum_backward(op_ctx, grad_output).map(|(a, b)| vec![a, b])
                    }
                    OpType::Minimum => {
                        B::minimum_backward(op_ctx, grad_output).map(|(a, b)| vec![a, b])
                    }
                    OpType::Sum(_) => B::sum_backward(op_ctx, grad_output).map(|x| vec![x]),
                    OpType::Mean(_) => B::mean_backward(op_ctx, grad_output).map(|x| vec![x]),
                    OpType::Max(_) => B::max_backward(op_ctx, grad_output).map(|x| vec![x]),
                    OpType::Broadcast => {
                        let input = &*op_ctx.inputs[0].data();
                        Ok(vec![crate::ops::cpu_backward::unbroadcast::<B>(
                            grad_output.clone(),
                            B::shape(input),
                        )?])
                    }
                    OpType::View => {
                        let input = &*op_ctx.inputs[0].data();
                        let mut grad = grad_output.clone();
                        B::set_shape(&mut grad, B::shape(input))?;
                        Ok(vec![grad])
                    }
                }
            });
            tensor.set_op(op);
        }
        tensor
    }

    /// Creates a new tensor with zeros in all elements.
    pub fn zeros(shape: &[usize], requires_grad: bool) -> Result<Self, Error> {
        Ok(Self::new(B::zeros(shape)?, requires_grad))
    }

    /// Creates a new tensor with ones in all elements.
    pub fn ones(shape: &[usize], requires_grad: bool) -> Result<Self, Error> {
        Ok(Self::new(B::ones(shape)?, requires_grad))
    }

    /// Creates a new tensor from a vector of f32 values.
    ///
    /// # Errors
    /// Returns an error if the product of dimensions in `shape` doesn't match `data.len()`.
    pub fn from_vec(data: Vec<f32>, shape: &[usize], requires_grad: bool) -> Result<Self, Error> {
        Ok(Self::new(B::from_vec(data, shape)?, requires_grad))
    }

    /// Creates a rank-0 tensor holding `value`.
    pub fn scalar(value: f32, requires_grad: bool) -> Result<Self, Error> {
        Self::from_vec(vec![value], &[], requires_grad)
    }

    /// Returns a new leaf tensor sharing this tensor's values but no graph history.
    /// The result never requires gradients.
    pub fn detach(&self) -> Tensor<B> {
        Tensor::new(self.data().clone(), false)
    }

    /// Gets an immutable reference to the underlying storage.
    pub fn data(&self) -> Ref<'_, B::Storage> {
        Ref::map(self.inner.borrow(), |inner| &inner.data)
    }

    /// Copies the values to a flat host vector in row-major order.
    pub fn to_vec(&self) -> Result<Vec<f32>, Error> {
        B::copy_to_host(&*self.data())
    }

    pub fn shape(&self) -> Vec<usize> {
        let inner = self.inner.borrow();
        B::shape(&inner.data).to_vec()
    }

    /// Total number of elements.
    pub fn size(&self) -> usize {
        let inner = self.inner.borrow();
        B::size(&inner.data)
    }

    pub fn len(&self) -> usize {
        self.size()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn requires_grad(&self) -> bool {
        self.inner.borrow().requires_grad
    }

    /// Gets an immutable reference to the gradient if it exists.
    pub fn grad(&self) -> Option<Ref<'_, B::Storage>> {
        Ref::filter_map(self.inner.borrow(), |inner| inner.grad.as_ref()).ok()
    }

    /// Sets the gradient storage of this tensor. Replaces existing gradient.
    ///
    /// # Errors
    /// Returns `Error::ShapeMismatch` if the gradient shape differs from the data shape.
    pub fn set_grad(&self, grad: Option<B::Storage>) -> Result<(), Error> {
        let mut inner = self.inner.borrow_mut();
        if let Some(ref g) = grad {
            if B::shape(&inner.data) != B::shape(g) {
                return Err(Error::ShapeMismatch {
                    expected: B::shape(&inner.data).to_vec(),
                    actual: B::shape(g).to_vec(),
                });
            }
        }
        inner.grad = grad;
        Ok(())
    }

    /// Clear the gradient of this tensor (sets it to None)
    pub fn zero_grad(&self) {
        self.inner.borrow_mut().grad = None;
    }

    /// Add gradient to this tensor's gradient (accumulate if gradient exists).
    pub(crate) fn add_grad(&self, grad_to_add: B::Storage) -> Result<(), Error> {
        let (data_shape, existing_grad_opt) = {
            let inner = self.inner.borrow();
            (B::shape(&inner.data).to_vec(), inner.grad.clone())
        };

        let grad_shape = B::shape(&grad_to_add).to_vec();
        if data_shape != grad_shape {
            return Err(Error::IncompatibleShapes {
                op: format!("add_grad on Tensor ID {}", self.id()),
                shape_a: data_shape,
                shape_b: grad_shape,
            });
        }

        let new_total_grad = match existing_grad_opt {
            Some(existing_grad) => B::add(&existing_grad, &grad_to_add)?,
            None => grad_to_add,
        };

        self.inner.borrow_mut().grad = Some(new_total_grad);
        Ok(())
    }

    /// Computes gradients through the computation graph.
    ///
    /// A single-element root is seeded with 1.0; any other root must already carry a
    /// gradient set through [`Tensor::set_grad`]. Gradients are accumulated only into
    /// tensors that require them.
    pub fn backward(&self) -> Result<(), Error> {
        if !self.requires_grad() {
            return Ok(());
        }

        if self.size() == 1 {
            if self.inner.borrow().grad.is_none() {
                let seed = B::ones(&self.shape())?;
                self.set_grad(Some(seed))?;
            }
        } else if self.inner.borrow().grad.is_none() {
            return Err(Error::InvalidOperation(
                "backward() called on non-scalar tensor without pre-existing gradient. Seed gradient required.".to_string()
            ));
        }

        // Leaves first, root last; walk it root-first.
        let mut sorted_nodes = self.build_topo_sort();
        sorted_nodes.reverse();

        let mut visited = HashSet::new();
        for node_tensor in sorted_nodes.iter() {
            let node_id = node_tensor.id();
            if !visited.insert(node_id) {
                continue;
            }

            let (op_opt, output_grad_opt) = {
                let inner = node_tensor.inner.borrow();
                (inner.op.clone(), inner.grad.clone())
            };

            if let (Some(op), Some(output_grad_data)) = (op_opt, output_grad_opt) {
                crate::debug_println!("backward through {} (node {})", op.op_type, node_id);
                let input_grads_vec = (op.backward_fn)(&op, &output_grad_data)?;

                if op.inputs.len() != input_grads_vec.len() {
                    return Err(Error::InternalLogicError(format!(
                        "Backward function for op {} (Node ID: {}) returned {} gradients, expected {}",
                        op.op_type,
                        node_id,
                        input_grads_vec.len(),
                        op.inputs.len()
                    )));
                }

                for (input_tensor, grad_storage) in op.inputs.iter().zip(input_grads_vec) {
                    if input_tensor.requires_grad() {
                        input_tensor.add_grad(grad_storage)?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Builds a topologically sorted list of tensors in the graph ending at `self`.
    ///
    /// Uses DFS post-order traversal.
    fn build_topo_sort(&self) -> Vec<Tensor<B>> {
        let mut sorted = Vec::new();
        let mut visited = HashSet::new();
        let mut visiting = HashSet::new();

        fn visit<B: Backend>(
            node: &Tensor<B>,
            visited: &mut HashSet<usize>,
            sorted: &mut Vec<Tensor<B>>,
            visiting: &mut HashSet<usize>,
        ) {
            let node_id = node.id();
            if visited.contains(&node_id) {
                return;
            }
            // Ops only ever reference previously created tensors.
            if !visiting.insert(node_id) {
                panic!(
                    "Cycle detected in computation graph involving Tensor ID {}",
                    node_id
                );
            }

            if let Some(op) = node.inner.borrow().op.as_ref() {
                for input in &op.inputs {
                    visit(input, visited, sorted, visiting);
                }
            }

            visiting.remove(&node_id);
            visited.insert(node_id);
            sorted.push(node.clone());
        }

        visit(self, &mut visited, &mut sorted, &mut visiting);
        sorted
    }

    /// Unique identifier of this tensor, used for graph traversal and equality.
    pub fn id(&self) -> usize {
        self.inner.borrow().id
    }

    /// Sets the operation that produced this tensor. Internal use by ops functions.
    pub(crate) fn set_op(&self, op: Op<B>) {
        self.inner.borrow_mut().op = Some(op);
    }
}
