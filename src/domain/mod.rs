//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the in-memory catalog (`Dataset`, `Column`, `ColumnMeta`)
//! - the model catalog (`ModelKind`)
//! - fit configuration and outputs (`FitConfig`, `FitResult`, `Outlier`, ...)

pub mod types;

pub use types::*;
