//! Command-line parsing for the catalog expression analyser.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the evaluation/fitting code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::app::pipeline::DEFAULT_ID_COLUMN;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "exo",
    version,
    about = "Catalog expression analysis: uncertainty propagation, multi-model fits and outliers"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the catalog columns with their unit and description.
    Columns(DataArgs),
    /// Evaluate one expression per row, with its propagated uncertainty.
    Eval(EvalArgs),
    /// Evaluate X and Y, fit the model catalog and flag outliers.
    Fit(FitArgs),
    /// Run the radius-mass analysis on a synthetic catalog.
    Demo(DemoArgs),
    /// Export a subset of columns (with their error pairs) to a new CSV.
    Select(SelectArgs),
}

/// Where the catalog comes from.
///
/// Without `--file` the seeded synthetic catalog is used.
#[derive(Debug, Args, Clone)]
pub struct DataArgs {
    /// Catalog CSV file.
    #[arg(short = 'f', long, value_name = "CSV")]
    pub file: Option<PathBuf>,

    /// Tab-separated column info file (name, unit, description).
    #[arg(long, value_name = "TSV")]
    pub columns_info: Option<PathBuf>,

    /// Seed of the synthetic catalog.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of planets in the synthetic catalog.
    #[arg(short = 'n', long, default_value_t = 200)]
    pub count: usize,
}

/// Expression evaluation options.
#[derive(Debug, Args, Clone)]
pub struct ExprArgs {
    /// Ignore the uncertainty of physical constants.
    #[arg(long)]
    pub no_constant_uncertainty: bool,

    /// Column used to label rows and outliers.
    #[arg(long, default_value = DEFAULT_ID_COLUMN)]
    pub id_column: String,
}

/// Model fitting options.
#[derive(Debug, Args, Clone)]
pub struct FitOptions {
    /// Minimum number of valid points required to fit.
    #[arg(long, default_value_t = 5)]
    pub min_points: usize,

    /// Outlier threshold in residual standard deviations.
    #[arg(short = 'k', long, default_value_t = 2.0)]
    pub std_threshold: f64,

    /// X is displayed on a log axis (recorded, does not change the fit).
    #[arg(long)]
    pub log_x: bool,

    /// Y is displayed on a log axis (recorded, does not change the fit).
    #[arg(long)]
    pub log_y: bool,

    /// Levenberg-Marquardt iteration cap per model.
    #[arg(long, default_value_t = 200)]
    pub max_iterations: usize,

    /// Relative convergence tolerance.
    #[arg(long, default_value_t = 1e-10)]
    pub tolerance: f64,

    /// Write `outliers.csv` and `fit.json` into a numbered run folder here.
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct EvalArgs {
    /// Expression, optionally suffixed with a unit in brackets.
    pub expression: String,

    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub expr: ExprArgs,
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// X axis expression.
    pub x: String,

    /// Y axis expression.
    pub y: String,

    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub expr: ExprArgs,

    #[command(flatten)]
    pub fit: FitOptions,
}

#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    /// Seed of the synthetic catalog.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of planets in the synthetic catalog.
    #[arg(short = 'n', long, default_value_t = 200)]
    pub count: usize,

    #[command(flatten)]
    pub fit: FitOptions,
}

#[derive(Debug, Args, Clone)]
pub struct SelectArgs {
    /// Columns to keep.
    #[arg(required = true, num_args = 1..)]
    pub columns: Vec<String>,

    #[command(flatten)]
    pub data: DataArgs,

    /// Output CSV file.
    #[arg(short = 'o', long, value_name = "CSV")]
    pub output: PathBuf,
}
