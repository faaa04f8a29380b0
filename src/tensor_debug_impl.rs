use crate::backend::Backend;
use crate::tensor::TensorData;
use std::fmt;

impl<B: Backend> fmt::Debug for TensorData<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TensorData")
            .field("id", &self.id)
            .field("shape", &B::shape(&self.data))
            .field(
                "grad",
                &self.grad.as_ref().map(|_| "Some(<backend storage>)"),
            )
            .field("requires_grad", &self.requires_grad)
            .field("op", &self.op.as_ref().map(|op| op.op_type.to_string()))
            .finish()
    }
}
