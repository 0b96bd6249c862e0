//! Physical constants available to expressions.

pub mod registry;

pub use registry::*;
