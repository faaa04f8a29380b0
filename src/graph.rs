use crate::backend::Backend;
use crate::error::Error;
use crate::tensor::Tensor;

use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub enum OpType {
    Add,
    Sub,
    Mul,
    Div,
    MulScalar(f32),
    Exp,
    Ln,
    Abs,
    Square,
    Relu,
    Sigmoid,
    Softplus,
    LogSoftmax(usize),
    Maximum,
    Minimum,
    Sum(Option<usize>),
    Mean(Option<usize>),
    Max(Option<usize>),
    Broadcast,
    View,
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OpType::Add => write!(f, "Add"),
            OpType::Sub => write!(f, "Sub"),
            OpType::Mul => write!(f, "Mul"),
            OpType::Div => write!(f, "Div"),
            OpType::MulScalar(scalar) => write!(f, "MulScalar(scalar={})", scalar),
            OpType::Exp => write!(f, "Exp"),
            OpType::Ln => write!(f, "Ln"),
            OpType::Abs => write!(f, "Abs"),
            OpType::Square => write!(f, "Square"),
            OpType::Relu => write!(f, "ReLU"),
            OpType::Sigmoid => write!(f, "Sigmoid"),
            OpType::Softplus => write!(f, "Softplus"),
            OpType::LogSoftmax(axis) => write!(f, "LogSoftmax(axis={})", axis),
            OpType::Maximum => write!(f, "Maximum"),
            OpType::Minimum => write!(f, "Minimum"),
            OpType::Sum(None) => write!(f, "Sum(global)"),
            OpType::Sum(Some(axis)) => write!(f, "Sum(axis={})", axis),
            OpType::Mean(None) => write!(f, "Mean(global)"),
            OpType::Mean(Some(axis)) => write!(f, "Mean(axis={})", axis),
            OpType::Max(None) => write!(f, "Max(global)"),
            OpType::Max(Some(axis)) => write!(f, "Max(axis={})", axis),
            OpType::Broadcast => write!(f, "Broadcast"),
            OpType::View => write!(f, "View"),
        }
    }
}

impl OpType {
    /// Returns the axis for operations that have one (e.g., reduction operations)
    /// Returns None for operations that have no axis or are global reductions
    pub fn get_axis(&self) -> Option<usize> {
        match self {
            OpType::Mean(axis) | OpType::Sum(axis) | OpType::Max(axis) => *axis,
            OpType::LogSoftmax(axis) => Some(*axis),
            _ => None,
        }
    }
}

#[allow(type_alias_bounds)]
type BackwardFn<B: Backend> = dyn Fn(&Op<B>, &B::Storage) -> Result<Vec<B::Storage>, Error>;

#[derive(Clone)]
pub struct Op<B: Backend> {
    pub op_type: OpType,
    pub inputs: Vec<Tensor<B>>,
    pub backward_fn: Rc<BackwardFn<B>>,
}

impl<B: Backend> Op<B> {
    pub fn new(
        op_type: OpType,
        inputs: Vec<Tensor<B>>,
        backward_fn: impl Fn(&Op<B>, &B::Storage) -> Result<Vec<B::Storage>, Error> + 'static,
    ) -> Self {
        Self {
            op_type,
            inputs,
            backward_fn: Rc::new(backward_fn),
        }
    }

    /// Axis of an axis-bearing op, or an error for ops without one.
    pub(crate) fn axis(&self) -> Result<usize, Error> {
        self.op_type.get_axis().ok_or_else(|| {
            Error::InvalidOperation(format!("Op {} does not have an axis", self.op_type))
        })
    }
}

impl<B: Backend> fmt::Debug for Op<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Op")
            .field("op_type", &self.op_type)
            .field(
                "inputs",
                &self.inputs.iter().map(|t| t.id()).collect::<Vec<_>>(),
            )
            .field("backward_fn", &"<closure>")
            .finish()
    }
}
