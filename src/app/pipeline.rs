//! Shared "analysis pipeline" logic used by the `eval`, `fit` and `demo` commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! strip units -> evaluate X/Y with uncertainties -> drop missing rows ->
//! correlation -> optional multi-model fit with row identifiers
//!
//! The commands can then focus on presentation (printing vs exports).

use log::{debug, info};

use crate::domain::{Dataset, FitConfig, FitResult};
use crate::error::ExpressionError;
use crate::expr::EvalContext;
use crate::fit::fit_with_ids;
use crate::math::pearson;
use crate::report::{axis_label, strip_unit_suffix};
use crate::uncertainty::evaluate_with_uncertainty;

/// Column used for row identifiers when present.
pub const DEFAULT_ID_COLUMN: &str = "pl_name";

/// Options of one X-vs-Y analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub include_constant_uncertainty: bool,
    /// Column providing row identifiers for outliers (ignored when absent).
    pub id_column: String,
    /// `None` skips fitting.
    pub fit: Option<FitConfig>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            include_constant_uncertainty: true,
            id_column: DEFAULT_ID_COLUMN.to_string(),
            fit: Some(FitConfig::default()),
        }
    }
}

/// One axis of the analysis, restricted to plotted rows.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisSeries {
    /// Expression after unit stripping.
    pub expression: String,
    pub label: String,
    pub values: Vec<f64>,
    /// Propagated one-sigma uncertainty.
    pub sigma: Vec<f64>,
    /// `(|err1|, |err2|)` when the expression is a column with an error pair.
    pub err_plus: Vec<f64>,
    pub err_minus: Vec<f64>,
}

/// All computed outputs of a single X-vs-Y analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutput {
    pub x: AxisSeries,
    pub y: AxisSeries,
    /// Original dataset row of each plotted point.
    pub rows: Vec<usize>,
    /// Identifier of each plotted point, when the id column exists.
    pub ids: Option<Vec<String>>,
    pub correlation: Option<f64>,
    pub fit: Option<FitResult>,
}

impl AnalysisOutput {
    pub fn n_points(&self) -> usize {
        self.rows.len()
    }
}

/// Execute the full analysis pipeline for `x_expr` versus `y_expr`.
pub fn run_analysis(
    dataset: &Dataset,
    x_expr: &str,
    y_expr: &str,
    ctx: &EvalContext<'_>,
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, ExpressionError> {
    let x_src = strip_unit_suffix(x_expr);
    let y_src = strip_unit_suffix(y_expr);
    info!("Analysing X='{x_src}' vs Y='{y_src}'.");

    // 1) Evaluate both axes with uncertainties.
    let (x_all, x_sigma) = evaluate_with_uncertainty(x_src, dataset, ctx, config.include_constant_uncertainty)?;
    let (y_all, y_sigma) = evaluate_with_uncertainty(y_src, dataset, ctx, config.include_constant_uncertainty)?;
    let ids_all = dataset.row_labels(&config.id_column);

    // 2) Drop rows where X or Y is missing.
    let rows: Vec<usize> = (0..dataset.n_rows())
        .filter(|&i| x_all[i].is_finite() && y_all[i].is_finite())
        .collect();
    debug!("{} of {} rows have finite X and Y.", rows.len(), dataset.n_rows());

    let x = axis(dataset, x_src, &x_all, &x_sigma, &rows);
    let y = axis(dataset, y_src, &y_all, &y_sigma, &rows);
    let ids = ids_all
        .as_ref()
        .map(|all| rows.iter().map(|&i| all[i].clone()).collect());

    // 3) Correlation of the plotted set.
    let correlation = pearson(&x.values, &y.values);

    // 4) Optional fit over the full series, so outlier indices are dataset rows.
    let fit = match &config.fit {
        Some(fit_config) => fit_with_ids(&x_all, &y_all, ids_all.as_deref(), fit_config),
        None => None,
    };

    Ok(AnalysisOutput {
        x,
        y,
        rows,
        ids,
        correlation,
        fit,
    })
}

fn axis(dataset: &Dataset, expression: &str, values: &[f64], sigma: &[f64], rows: &[usize]) -> AxisSeries {
    let (plus, minus) = dataset.asymmetric_errors(expression);
    let pick = |v: &[f64]| rows.iter().map(|&i| v[i]).collect::<Vec<f64>>();
    AxisSeries {
        expression: expression.to_string(),
        label: axis_label(dataset, expression),
        values: pick(values),
        sigma: pick(sigma),
        err_plus: pick(&plus),
        err_minus: pick(&minus),
    }
}
