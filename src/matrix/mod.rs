//! Matrix types, operations, and utilities.

mod base;
mod linear;

pub use base::{Matrix, MatrixStorage};
pub use linear::Lu;
