//! Uncertainty propagation for derived quantities.

pub mod propagate;

pub use propagate::{evaluate_with_uncertainty, propagate};
