use crate::error::Error;

use ndarray::{ArrayD, Axis, IxDyn, ShapeError};
use std::fmt;

/// Owned CPU storage: a dynamically-shaped `f32` ndarray.
#[derive(Clone)]
pub struct Array {
    pub(crate) data: ArrayD<f32>,
}

impl Array {
    pub fn new(data: ArrayD<f32>) -> Self {
        Self { data }
    }

    pub fn from_vec(data: Vec<f32>, shape: &[usize]) -> Result<Self, Error> {
        let actual_len = data.len();
        let map_err = |_e: ShapeError| Error::ShapeMismatch {
            expected: shape.to_vec(),
            actual: vec![actual_len],
        };
        let array = ArrayD::from_shape_vec(IxDyn(shape), data).map_err(map_err)?;
        Ok(Self { data: array })
    }

    pub fn zeros(shape: &[usize]) -> Self {
        Self {
            data: ArrayD::zeros(IxDyn(shape)),
        }
    }

    pub fn ones(shape: &[usize]) -> Self {
        Self {
            data: ArrayD::ones(IxDyn(shape)),
        }
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the array contains no elements
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get_data(&self) -> &ArrayD<f32> {
        &self.data
    }

    /// Copies the elements out in logical (row-major) order.
    pub fn to_vec(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }

    pub(crate) fn broadcast_to(&self, shape: &[usize]) -> Result<Array, Error> {
        match self.data.broadcast(IxDyn(shape)) {
            Some(broadcasted_view) => Ok(Array::new(broadcasted_view.to_owned())),
            None => Err(Error::IncompatibleShapes {
                op: "broadcast".to_string(),
                shape_a: self.shape().to_vec(),
                shape_b: shape.to_vec(),
            }),
        }
    }

    pub(crate) fn sum_along_axis(&self, axis: usize) -> Result<Array, Error> {
        if axis >= self.data.ndim() {
            return Err(Error::InvalidIndex(vec![axis]));
        }
        Ok(Array::new(self.data.sum_axis(Axis(axis))))
    }

    /// Reshapes the array without changing its data.
    /// The new shape must have the same total number of elements.
    pub fn reshape(&mut self, shape: &[usize]) -> Result<(), Error> {
        let new_size = shape.iter().product::<usize>();
        if self.data.len() != new_size {
            return Err(Error::ShapeMismatch {
                expected: shape.to_vec(),
                actual: self.data.shape().to_vec(),
            });
        }
        // Logical order is preserved even when the current layout is not contiguous.
        let new_data = ArrayD::from_shape_vec(IxDyn(shape), self.to_vec())
            .map_err(|e| Error::ShapeError(e.to_string()))?;
        self.data = new_data;
        Ok(())
    }
}

impl fmt::Display for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get_data())
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Array(shape={:?}, data={:?})",
            self.shape(),
            self.get_data()
        )
    }
}

impl AsRef<[f32]> for Array {
    fn as_ref(&self) -> &[f32] {
        // Every constructor in this crate yields standard-layout data.
        self.get_data().as_slice().unwrap_or(&[])
    }
}
