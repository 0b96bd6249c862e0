//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads a catalog (CSV or synthetic)
//! - evaluates expressions with uncertainties
//! - runs multi-model fitting + outlier detection
//! - prints reports and writes optional exports

use std::path::Path;

use clap::Parser;
use log::info;

use crate::cli::{Command, DataArgs, DemoArgs, EvalArgs, ExprArgs, FitArgs, FitOptions, SelectArgs};
use crate::data::{CatalogConfig, generate_catalog};
use crate::domain::{Dataset, FitConfig};
use crate::error::AppError;
use crate::expr::EvalContext;
use crate::io::{
    FitFile, apply_columns_info, finite_range, load_catalog_csv, load_columns_info, next_run_dir, write_dataset_csv,
    write_fit_json, write_outliers_csv,
};
use crate::report::{format_analysis_summary, format_columns, format_evaluation, format_fit_summary, strip_unit_suffix};
use crate::uncertainty::evaluate_with_uncertainty;

use self::pipeline::{AnalysisConfig, AnalysisOutput, run_analysis};

pub mod pipeline;

/// Axes of the `demo` analysis.
const DEMO_X: &str = "pl_rade";
const DEMO_Y: &str = "pl_bmasse";

/// Entry point for the `exo` binary.
pub fn run() -> Result<(), AppError> {
    // A `.env` file may carry RUST_LOG.
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = crate::cli::Cli::parse();
    match cli.command {
        Command::Columns(args) => handle_columns(&args),
        Command::Eval(args) => handle_eval(&args),
        Command::Fit(args) => handle_fit(&args),
        Command::Demo(args) => handle_demo(&args),
        Command::Select(args) => handle_select(&args),
    }
}

fn handle_columns(args: &DataArgs) -> Result<(), AppError> {
    let dataset = load_dataset(args)?;
    print!("{}", format_columns(&dataset));
    Ok(())
}

fn handle_eval(args: &EvalArgs) -> Result<(), AppError> {
    let dataset = load_dataset(&args.data)?;
    let ctx = EvalContext::standard();
    let expression = strip_unit_suffix(&args.expression);
    let (values, sigma) =
        evaluate_with_uncertainty(expression, &dataset, &ctx, !args.expr.no_constant_uncertainty)?;
    let ids = dataset.row_labels(&args.expr.id_column);
    print!("{}", format_evaluation(expression, ids.as_deref(), &values, &sigma));
    Ok(())
}

fn handle_fit(args: &FitArgs) -> Result<(), AppError> {
    let dataset = load_dataset(&args.data)?;
    analyse(&dataset, &args.x, &args.y, &args.expr, &args.fit)
}

fn handle_demo(args: &DemoArgs) -> Result<(), AppError> {
    let dataset = generate_catalog(&CatalogConfig {
        count: args.count,
        seed: args.seed,
        ..CatalogConfig::default()
    })?;
    let expr = ExprArgs {
        no_constant_uncertainty: false,
        id_column: pipeline::DEFAULT_ID_COLUMN.to_string(),
    };
    analyse(&dataset, DEMO_X, DEMO_Y, &expr, &args.fit)
}

fn handle_select(args: &SelectArgs) -> Result<(), AppError> {
    let dataset = load_dataset(&args.data)?;
    let names: Vec<&str> = args.columns.iter().map(String::as_str).collect();
    let subset = dataset.select_with_errors(&names)?;
    write_dataset_csv(&args.output, &subset)?;
    println!(
        "Wrote {} columns x {} rows to {}",
        subset.n_columns(),
        subset.n_rows(),
        args.output.display()
    );
    Ok(())
}

/// Shared body of `fit` and `demo`.
fn analyse(dataset: &Dataset, x: &str, y: &str, expr: &ExprArgs, options: &FitOptions) -> Result<(), AppError> {
    let fit_config = fit_config_from_args(options)?;
    let config = analysis_config_from_args(expr, Some(fit_config.clone()));
    let ctx = EvalContext::standard();
    let output = run_analysis(dataset, x, y, &ctx, &config)?;

    print!("{}", format_analysis_summary(&output));

    let Some(fit) = &output.fit else {
        return Err(no_fit_error(&output, &fit_config));
    };
    print!("{}", format_fit_summary(fit));

    if let Some(root) = &options.out_dir {
        write_run_outputs(root, &output)?;
    }
    Ok(())
}

fn write_run_outputs(root: &Path, output: &AnalysisOutput) -> Result<(), AppError> {
    let Some(fit) = &output.fit else {
        return Ok(());
    };
    let dir = next_run_dir(root, &output.x.expression, &output.y.expression)?;
    write_outliers_csv(&dir.join("outliers.csv"), fit)?;

    let range = finite_range(&output.x.values).unwrap_or((0.0, 1.0));
    let file = FitFile::new(
        &output.x.expression,
        &output.y.expression,
        &output.x.label,
        &output.y.label,
        fit,
        range,
    );
    write_fit_json(&dir.join("fit.json"), &file)?;
    println!("Results written to {}", dir.display());
    Ok(())
}

/// Map a missing fit to the right exit code.
fn no_fit_error(output: &AnalysisOutput, config: &FitConfig) -> AppError {
    let n = output.n_points();
    if n < config.min_points {
        AppError::new(
            3,
            format!("Not enough valid points to fit: n={n}, min_points={}.", config.min_points),
        )
    } else {
        AppError::new(4, format!("No model converged on {n} points."))
    }
}

/// Load the catalog named by `args`, or generate the synthetic one.
pub fn load_dataset(args: &DataArgs) -> Result<Dataset, AppError> {
    let Some(path) = &args.file else {
        info!("No catalog file given, generating {} synthetic planets (seed {}).", args.count, args.seed);
        return generate_catalog(&CatalogConfig {
            count: args.count,
            seed: args.seed,
            ..CatalogConfig::default()
        });
    };

    let mut dataset = load_catalog_csv(path)?;
    if let Some(info_path) = &args.columns_info {
        let info = load_columns_info(info_path)?;
        let applied = apply_columns_info(&mut dataset, &info);
        info!("Applied column info to {applied} of {} columns.", dataset.n_columns());
    }
    Ok(dataset)
}

pub fn fit_config_from_args(args: &FitOptions) -> Result<FitConfig, AppError> {
    if !(args.std_threshold.is_finite() && args.std_threshold > 0.0) {
        return Err(AppError::new(2, "--std-threshold must be a positive number."));
    }
    if !(args.tolerance.is_finite() && args.tolerance > 0.0) {
        return Err(AppError::new(2, "--tolerance must be a positive number."));
    }
    if args.max_iterations == 0 {
        return Err(AppError::new(2, "--max-iterations must be > 0."));
    }
    Ok(FitConfig {
        min_points: args.min_points,
        std_threshold: args.std_threshold,
        log_x: args.log_x,
        log_y: args.log_y,
        max_iterations: args.max_iterations,
        tolerance: args.tolerance,
    })
}

pub fn analysis_config_from_args(args: &ExprArgs, fit: Option<FitConfig>) -> AnalysisConfig {
    AnalysisConfig {
        include_constant_uncertainty: !args.no_constant_uncertainty,
        id_column: args.id_column.clone(),
        fit,
    }
}
