//! Multi-model fitting, AIC selection and residual outlier detection.
//!
//! The tool fits every catalog model and computes:
//! - RSS
//! - AIC = n * ln(RSS/n) + 2k (RSS/n floored at the smallest positive f64)
//! - R² = 1 - RSS/TSS
//!
//! Selection rules:
//! 1. Only converged models are eligible
//! 2. Choose the model with minimum AIC
//! 3. Ties go to fewer parameters, then catalog order
//!
//! Outliers are judged against the winner: with σ the population standard
//! deviation of its residuals, `|r| > std_threshold * σ` flags a row.

use log::{debug, warn};

use crate::domain::{FitConfig, FitResult, ModelEvaluation, ModelKind, Outlier};
use crate::error::FitFailure;
use crate::fit::fitter::fit_model;
use crate::math::{population_std, total_sum_of_squares};
use crate::models::predict;

/// Residual spread below this fraction of `max |y|` counts as an exact fit.
const EXACT_FIT_REL: f64 = 1e-9;

/// Fit every candidate model to `(x, y)` and select the best.
///
/// Returns `None` when fewer than `config.min_points` finite pairs remain or
/// when no model converges.
pub fn fit(x: &[f64], y: &[f64], config: &FitConfig) -> Option<FitResult> {
    fit_with_ids(x, y, None, config)
}

/// As [`fit`], attaching `ids[i]` to an outlier found at original row `i`.
pub fn fit_with_ids(x: &[f64], y: &[f64], ids: Option<&[String]>, config: &FitConfig) -> Option<FitResult> {
    if x.len() != y.len() {
        warn!("X has {} rows but Y has {}; extra rows are ignored.", x.len(), y.len());
    }

    let valid: Vec<usize> = x
        .iter()
        .zip(y)
        .enumerate()
        .filter(|(_, (xv, yv))| xv.is_finite() && yv.is_finite())
        .map(|(i, _)| i)
        .collect();
    let n = valid.len();
    if n < config.min_points {
        debug!("Insufficient data for fitting: n={n} < min_points={}.", config.min_points);
        return None;
    }

    let xv: Vec<f64> = valid.iter().map(|&i| x[i]).collect();
    let yv: Vec<f64> = valid.iter().map(|&i| y[i]).collect();
    let tss = total_sum_of_squares(&yv);

    let evaluations: Vec<ModelEvaluation> = ModelKind::ALL
        .iter()
        .map(|&model| evaluate_model(model, &xv, &yv, tss, config))
        .collect();

    let Some(best) = select_best(&evaluations) else {
        warn!("No candidate model converged on {n} points.");
        return None;
    };
    let best = best.clone();

    let residuals: Vec<f64> = xv
        .iter()
        .zip(&yv)
        .map(|(&xi, &yi)| yi - predict(best.model, xi, &best.params))
        .collect();
    let residual_std = population_std(&residuals);
    let outlier_threshold = config.std_threshold * residual_std;

    let scale = yv.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let exact_fit = residual_std <= EXACT_FIT_REL * scale;

    let outliers = if exact_fit {
        Vec::new()
    } else {
        valid
            .iter()
            .zip(&residuals)
            .filter(|(_, r)| r.abs() > outlier_threshold)
            .map(|(&i, &r)| Outlier {
                index: i,
                x: x[i],
                y: y[i],
                y_fit: y[i] - r,
                residual: r,
                id: ids.and_then(|ids| ids.get(i).cloned()),
            })
            .collect()
    };

    debug!(
        "Best model {} (AIC {:.3}, R² {:.4}); {} outlier(s) beyond {:.4}.",
        best.model.name(),
        best.aic,
        best.r2,
        outliers.len(),
        outlier_threshold
    );

    Some(FitResult {
        best_model: best.model,
        best_params: best.params.clone(),
        best_aic: best.aic,
        best_r2: best.r2,
        evaluations,
        outliers,
        residual_std,
        outlier_threshold,
        std_threshold: config.std_threshold,
        n,
        log_x: config.log_x,
        log_y: config.log_y,
    })
}

fn evaluate_model(model: ModelKind, x: &[f64], y: &[f64], tss: f64, config: &FitConfig) -> ModelEvaluation {
    let n = x.len();
    match fit_model(model, x, y, config) {
        Ok(fit) => {
            let aic = aic(n, fit.rss, model.param_count());
            let r2 = r_squared(fit.rss, tss);
            debug!(
                "Model {}: params={:?} RSS={:.6e} AIC={aic:.3} R²={r2:.4} ({} iterations).",
                model.name(),
                fit.params,
                fit.rss,
                fit.iterations
            );
            ModelEvaluation {
                model,
                params: fit.params,
                rss: fit.rss,
                aic,
                r2,
                converged: true,
                iterations: fit.iterations,
                failure: None,
            }
        }
        Err(failure) => {
            warn!("Model {} did not converge: {failure}.", model.name());
            let iterations = match failure {
                FitFailure::NonConvergence { iterations } => iterations,
                _ => 0,
            };
            ModelEvaluation {
                model,
                params: Vec::new(),
                rss: f64::NAN,
                aic: f64::INFINITY,
                r2: f64::NAN,
                converged: false,
                iterations,
                failure: Some(failure.to_string()),
            }
        }
    }
}

/// Akaike information criterion for least squares.
pub fn aic(n: usize, rss: f64, k: usize) -> f64 {
    let n_f = n as f64;
    let rss_per = (rss / n_f).max(f64::MIN_POSITIVE);
    n_f * rss_per.ln() + 2.0 * k as f64
}

/// Coefficient of determination.
///
/// A constant `y` (TSS = 0) scores 1 when it is reproduced exactly, else 0.
pub fn r_squared(rss: f64, tss: f64) -> f64 {
    if tss > 0.0 {
        1.0 - rss / tss
    } else if rss <= f64::EPSILON {
        1.0
    } else {
        0.0
    }
}

/// Minimum AIC among converged evaluations; ties -> fewer params -> catalog order.
pub fn select_best(evaluations: &[ModelEvaluation]) -> Option<&ModelEvaluation> {
    let mut best: Option<&ModelEvaluation> = None;
    for e in evaluations {
        if !e.converged || e.aic.is_nan() {
            continue;
        }
        best = match best {
            None => Some(e),
            Some(b) => {
                let better = e.aic < b.aic
                    || (e.aic == b.aic
                        && (e.model.param_count(), e.model.catalog_index())
                            < (b.model.param_count(), b.model.catalog_index()));
                if better { Some(e) } else { Some(b) }
            }
        };
    }
    best
}
