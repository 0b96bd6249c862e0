//! Curve fitting orchestration.
//!
//! Responsibilities:
//!
//! - fit each catalog model with Levenberg–Marquardt
//! - score every candidate (RSS, AIC, R²)
//! - select the best model and flag residual outliers against it

pub mod fitter;
pub mod selection;

pub use fitter::*;
pub use selection::*;
