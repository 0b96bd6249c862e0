//! Mathematical utilities: least squares, Levenberg–Marquardt and statistics.

pub mod lm;
pub mod ols;
pub mod stats;

pub use lm::*;
pub use ols::*;
pub use stats::*;
