//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized

use crate::app::pipeline::AnalysisOutput;
use crate::domain::{Dataset, FitResult, Outlier};

/// Column listing sorted by name, with unit/description placeholders.
pub fn format_columns(dataset: &Dataset) -> String {
    let mut names: Vec<&str> = dataset.columns().map(|c| c.name.as_str()).collect();
    names.sort_unstable();

    let mut out = String::new();
    let header = format!("{:<25} | {:<15} | {:<40}", "COLUMN NAME", "UNIT", "DESCRIPTION");
    out.push_str(header.trim_end());
    out.push('\n');
    out.push_str(&"-".repeat(header.len()));
    out.push('\n');

    for name in names {
        let meta = dataset.meta(name);
        let unit = meta.map(|m| m.unit.as_str()).filter(|u| !u.is_empty()).unwrap_or("No unit");
        let desc = meta
            .map(|m| m.description.as_str())
            .filter(|d| !d.is_empty())
            .unwrap_or("No description");
        out.push_str(format!("{name:<25} | {unit:<15} | {desc}").trim_end());
        out.push('\n');
    }
    out
}

/// Values and uncertainties of one expression, one row per dataset row.
pub fn format_evaluation(expression: &str, ids: Option<&[String]>, values: &[f64], sigma: &[f64]) -> String {
    let mut out = String::new();
    out.push_str(&format!("Expression: {expression}\n"));
    out.push_str(format!("{:<24} {:>16} {:>16}", "id", "value", "uncertainty").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<24} {:-<16} {:-<16}", "", "", "").trim_end());
    out.push('\n');
    for (i, (v, s)) in values.iter().zip(sigma).enumerate() {
        let id = ids
            .and_then(|ids| ids.get(i))
            .map(|s| truncate(s, 24))
            .unwrap_or_else(|| i.to_string());
        out.push_str(format!("{id:<24} {:>16} {:>16}", fmt_num(*v), fmt_num(*s)).trim_end());
        out.push('\n');
    }
    out
}

/// Header lines of an analysis: axes, point count, correlation.
pub fn format_analysis_summary(output: &AnalysisOutput) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== {} vs {} ===\n", output.x.expression, output.y.expression));
    out.push_str(&format!("X axis: {}\n", output.x.label));
    out.push_str(&format!("Y axis: {}\n", output.y.label));
    out.push_str(&format!("Points: n={}\n", output.n_points()));
    match output.correlation {
        Some(r) => out.push_str(&format!("Pearson correlation: {r:.6}\n")),
        None => out.push_str("Pearson correlation: undefined\n"),
    }
    out
}

/// Model evaluation table, chosen model and outliers.
pub fn format_fit_summary(fit: &FitResult) -> String {
    let mut out = String::new();

    out.push_str("--- Models evaluation ---\n");
    for e in &fit.evaluations {
        let chosen = if e.model == fit.best_model { "*" } else { " " };
        match &e.failure {
            None => out.push_str(&format!(
                "{chosen} Model: {:<12} AIC: {:>12.3}  R^2: {:.3}\n",
                e.model.name(),
                e.aic,
                e.r2
            )),
            Some(reason) => out.push_str(&format!("{chosen} Model: {:<12} failed: {reason}\n", e.model.name())),
        }
    }
    out.push_str("------------------------\n");

    out.push_str(&format!(
        "\nBest model found: {} (y = {})\n",
        fit.best_model.name(),
        fit.best_model.formula()
    ));
    out.push_str(&format!("Parameters: {}\n", fmt_params(fit)));
    out.push_str(&format!("AIC: {:.3}\n", fit.best_aic));
    out.push_str(&format!("R^2: {:.3}\n", fit.best_r2));
    if fit.log_x || fit.log_y {
        out.push_str(&format!("Display scale: log_x={} log_y={}\n", fit.log_x, fit.log_y));
    }

    if fit.outliers.is_empty() {
        out.push_str("\nNo relevant outliers found.\n");
    } else {
        out.push_str(&format!(
            "\nOutliers (|residual| > {} * std = {:.4}):\n",
            fit.std_threshold, fit.outlier_threshold
        ));
        out.push_str(&format_outliers(&fit.outliers));
    }
    out
}

fn format_outliers(rows: &[Outlier]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<24} {:>8} {:>14} {:>14} {:>14} {:>14}",
            "id", "row", "x", "y", "y_fit", "residual"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<24} {:-<8} {:-<14} {:-<14} {:-<14} {:-<14}", "", "", "", "", "", "").trim_end());
    out.push('\n');
    for o in rows {
        out.push_str(
            format!(
                "{:<24} {:>8} {:>14} {:>14} {:>14} {:>14}",
                truncate(o.id.as_deref().unwrap_or(""), 24),
                o.index,
                fmt_num(o.x),
                fmt_num(o.y),
                fmt_num(o.y_fit),
                fmt_num(o.residual)
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// `name=value` pairs of the best model's parameters.
pub fn fmt_params(fit: &FitResult) -> String {
    let parts: Vec<String> = fit
        .best_model
        .param_names()
        .iter()
        .zip(&fit.best_params)
        .map(|(name, v)| format!("{name}={v:.6}"))
        .collect();
    format!("[{}]", parts.join(", "))
}

fn fmt_num(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v != 0.0 && (v.abs() >= 1e6 || v.abs() < 1e-3) {
        format!("{v:.4e}")
    } else {
        format!("{v:.4}")
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
