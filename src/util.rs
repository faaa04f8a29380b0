/// Compute the broadcasted shape for two shapes, following numpy broadcasting rules.
pub fn broadcast_shapes(a: &[usize], b: &[usize]) -> Result<Vec<usize>, crate::error::Error> {
    let ndim = std::cmp::max(a.len(), b.len());
    let mut result = Vec::with_capacity(ndim);
    for i in 0..ndim {
        let a_dim = if i >= ndim - a.len() {
            a[i - (ndim - a.len())]
        } else {
            1
        };
        let b_dim = if i >= ndim - b.len() {
            b[i - (ndim - b.len())]
        } else {
            1
        };
        if a_dim == b_dim || a_dim == 1 || b_dim == 1 {
            result.push(if a_dim == 1 { b_dim } else { a_dim });
        } else {
            return Err(crate::error::Error::IncompatibleShapes {
                op: format!("broadcast (dimension {})", i),
                shape_a: a.to_vec(),
                shape_b: b.to_vec(),
            });
        }
    }
    Ok(result)
}

/// Index of the last axis of a shape, or `None` for rank-0 shapes.
pub fn last_axis(shape: &[usize]) -> Option<usize> {
    shape.len().checked_sub(1)
}
