//! Fixed-argument forms kept for callers written against the older API.
//!
//! [`losses`] pins each loss to the reduction the older API used, and [`comparison`]
//! provides deprecated "every element" ordering checks returning a single `bool`.

pub mod comparison;
pub mod losses;
