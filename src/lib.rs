//! Differentiable loss functions on a small reverse-mode autodiff tensor library.
//!
//! The crate is organised in three layers:
//! - a tensor core (`Tensor`, `Backend`, `CpuBackend`, `ops`) with automatic differentiation
//! - general loss functions in [`losses`], each parameterized by a [`Reduction`]
//! - the [`compat`] facade: fixed-reduction loss shorthands and deprecated
//!   "all elements" ordering comparisons returning a single `bool`
//!
//! # Features
//! - `debug_logs` - emits per-node autograd diagnostics through `tracing` at `debug` level
//!
//! # Example
//! ```rust
//! use rust_tensor_losses::{compat, CpuBackend, Tensor};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let predicted = Tensor::<CpuBackend>::from_vec(vec![1.0, 2.0], &[2], true)?;
//!     let expected = Tensor::<CpuBackend>::from_vec(vec![0.0, 0.0], &[2], false)?;
//!
//!     // Sum of squared errors: 1 + 4
//!     let loss = compat::losses::l2_loss(&predicted, &expected)?;
//!     assert_eq!(loss.data().as_ref()[0], 5.0);
//!
//!     loss.backward()?;
//!     println!("Gradient of predicted: {:?}", predicted.grad());
//!     Ok(())
//! }
//! ```

// --- Central debug_println macro definition ---
/// Conditional diagnostics macro. Logs through `tracing::debug!` if the
/// `debug_logs` feature is enabled.
#[cfg(feature = "debug_logs")]
#[macro_export]
macro_rules! debug_println {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: "rust_tensor_losses::autograd", $($arg)*)
    };
}

/// Conditional diagnostics macro (disabled version). Does nothing.
#[cfg(not(feature = "debug_logs"))]
#[macro_export]
macro_rules! debug_println {
    ($($arg:tt)*) => {};
}

pub mod array;
pub mod backend;
pub mod compat;
pub mod error;
pub mod graph;
pub mod losses;
pub mod ops;
pub mod tensor;
mod tensor_debug_impl;
pub mod util;

pub mod test_utils;

// Re-export the public types for easier use by consumers of the library
pub use array::Array;
pub use backend::cpu::CpuBackend;
pub use backend::Backend;
pub use backend::CpuTensor;
pub use error::Error;
pub use graph::{Op, OpType};
pub use losses::Reduction;
pub use tensor::Tensor;
