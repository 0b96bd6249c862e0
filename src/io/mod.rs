//! Input/output helpers.
//!
//! - CSV catalog + column-info ingest (`ingest`)
//! - outlier and column-subset CSV exports (`export`)
//! - fit JSON read/write (`fit_json`)

pub mod export;
pub mod fit_json;
pub mod ingest;

pub use export::*;
pub use fit_json::*;
pub use ingest::*;
