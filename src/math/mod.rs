//! Mathematical utilities: least squares and special functions.

pub mod ols;
pub mod special;

pub use ols::*;
