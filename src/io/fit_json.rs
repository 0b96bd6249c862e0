//! Read/write fit JSON files.
//!
//! Fit JSON is the "portable" representation of an analysis fit:
//! - the full `FitResult` (every candidate, best model, outliers)
//! - the axis expressions and labels
//! - a precomputed best-fit grid for quick plotting
//! - a generation timestamp

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{FitResult, vec_f64_or_nan};
use crate::error::AppError;
use crate::models::predict_grid;

/// Number of samples in the exported best-fit grid.
pub const GRID_POINTS: usize = 101;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveGrid {
    pub x: Vec<f64>,
    #[serde(deserialize_with = "vec_f64_or_nan")]
    pub y: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub x_expression: String,
    pub y_expression: String,
    pub x_label: String,
    pub y_label: String,
    pub fit: FitResult,
    pub grid: CurveGrid,
}

impl FitFile {
    /// Assemble a fit file, sampling the best model over `[x_min, x_max]`.
    pub fn new(x_expression: &str, y_expression: &str, x_label: &str, y_label: &str, fit: &FitResult, x_range: (f64, f64)) -> Self {
        Self {
            tool: "exo".to_string(),
            generated_at: Utc::now(),
            x_expression: x_expression.to_string(),
            y_expression: y_expression.to_string(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            fit: fit.clone(),
            grid: build_grid(fit, x_range.0, x_range.1, GRID_POINTS),
        }
    }
}

/// Write a fit JSON file.
pub fn write_fit_json(path: &Path, file: &FitFile) -> Result<(), AppError> {
    let out = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create fit JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(out, file).map_err(|e| AppError::new(2, format!("Failed to write fit JSON: {e}")))?;
    Ok(())
}

/// Read a fit JSON file.
pub fn read_fit_json(path: &Path) -> Result<FitFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open fit JSON '{}': {e}", path.display())))?;
    let fit: FitFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid fit JSON: {e}")))?;
    Ok(fit)
}

/// Evenly spaced samples of the best model between `x_min` and `x_max`.
pub fn build_grid(fit: &FitResult, x_min: f64, x_max: f64, n: usize) -> CurveGrid {
    let n = n.max(2);
    let mut x0 = x_min;
    let mut x1 = x_max;
    if !(x0.is_finite() && x1.is_finite()) || x1 < x0 {
        x0 = 0.0;
        x1 = 1.0;
    }
    if (x1 - x0).abs() < 1e-12 {
        x0 -= 0.5;
        x1 += 0.5;
    }

    let x: Vec<f64> = (0..n)
        .map(|i| {
            let u = i as f64 / (n as f64 - 1.0);
            x0 + u * (x1 - x0)
        })
        .collect();
    let y = predict_grid(fit.best_model, &x, &fit.best_params);
    CurveGrid { x, y }
}

/// `(min, max)` of the finite values, if any.
pub fn finite_range(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}
