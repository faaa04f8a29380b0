use crate::backend::Backend;
use crate::error::Error;
use crate::ops;
use crate::tensor::Tensor;

/// How an element-wise (or per-example) loss tensor is collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reduction {
    /// Keep the unreduced loss tensor.
    None,
    /// Sum every element into a 0-dimensional tensor.
    Sum,
    /// Average every element into a 0-dimensional tensor.
    #[default]
    Mean,
}

impl Reduction {
    /// Applies the reduction. `Mean` of an empty tensor fails with `Error::EmptyTensor`.
    pub fn apply<B: Backend>(self, loss: &Tensor<B>) -> Result<Tensor<B>, Error> {
        match self {
            Reduction::None => Ok(loss.clone()),
            Reduction::Sum => ops::sum(loss, None),
            Reduction::Mean => ops::mean(loss, None),
        }
    }
}
