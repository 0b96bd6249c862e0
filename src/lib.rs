//! `exo-curves` library crate.
//!
//! The binary (`exo`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - evaluation, propagation and fitting are reusable from other front ends
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod constants;
pub mod data;
pub mod domain;
pub mod error;
pub mod expr;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
pub mod uncertainty;
