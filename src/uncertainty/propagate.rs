//! First-order (delta-method) uncertainty propagation.
//!
//! `σ_row = sqrt(Σ_s (∂f/∂s · δ_s)²)` over every symbol `s` the expression
//! references. A column contributes `δ = 0.5(|err1| + |err2|)` only when both
//! error columns exist; a constant contributes its registry uncertainty only
//! when asked to. Symbols with no uncertainty, or whose partial folds to zero,
//! are skipped without evaluating anything. A partial that is undefined at a
//! scalar point (`d sqrt(k)/dk` at `k = 0`) leaves every row's σ as `NaN`
//! rather than failing a request that evaluation accepted.

use log::{debug, error, warn};

use crate::domain::Dataset;
use crate::error::{ExprErrorKind, ExpressionError};
use crate::expr::diff::differentiate;
use crate::expr::eval::{Binding, EvalContext, Namespace, eval_value, evaluate, parse_expression};

/// Per-symbol uncertainty, broadcast lazily.
enum Delta {
    Scalar(f64),
    Series(Vec<f64>),
}

impl Delta {
    fn at(&self, row: usize) -> f64 {
        match self {
            Delta::Scalar(v) => *v,
            Delta::Series(v) => v[row],
        }
    }
}

/// Propagated one-sigma uncertainty of `expression`, one value per row.
pub fn propagate(
    expression: &str,
    dataset: &Dataset,
    ctx: &EvalContext<'_>,
    include_constant_uncertainty: bool,
) -> Result<Vec<f64>, ExpressionError> {
    let result = propagate_inner(expression, dataset, ctx, include_constant_uncertainty);
    if let Err(err) = &result {
        error!("Error propagating uncertainty: {err}");
    }
    result
}

fn propagate_inner(
    expression: &str,
    dataset: &Dataset,
    ctx: &EvalContext<'_>,
    include_constant_uncertainty: bool,
) -> Result<Vec<f64>, ExpressionError> {
    let expr = parse_expression(expression, ctx)?;
    let ns = Namespace::bind(&expr, dataset, ctx).map_err(|kind| ExpressionError::new(expression, kind))?;
    let n = ns.n_rows();
    let mut variance = vec![0.0; n];

    for (symbol, binding) in ns.iter() {
        let delta = match binding {
            Binding::Column(_) => match dataset.column_delta(symbol) {
                Some(d) if d.iter().any(|v| *v != 0.0) => Delta::Series(d),
                _ => continue,
            },
            Binding::Constant { uncertainty, .. } => {
                if !include_constant_uncertainty || uncertainty == 0.0 {
                    continue;
                }
                Delta::Scalar(uncertainty)
            }
        };

        let partial = differentiate(&expr, symbol);
        if partial.is_zero() {
            continue;
        }
        debug!("d({expression})/d{symbol} = {partial}");

        let values = match eval_value(&partial, &ns) {
            Ok(value) => value.into_series(n),
            // The partial is undefined at this scalar point: every row's sigma is too.
            Err(ExprErrorKind::Domain(message)) => {
                warn!("d({expression})/d{symbol} is undefined ({message}); uncertainty is NaN.");
                vec![f64::NAN; n]
            }
            Err(other) => {
                return Err(ExpressionError::new(
                    expression,
                    ExprErrorKind::Derivative {
                        symbol: symbol.to_string(),
                        message: other.to_string(),
                    },
                ));
            }
        };

        for (row, (var, d)) in variance.iter_mut().zip(values).enumerate() {
            let term = d * delta.at(row);
            *var += term * term;
        }
    }

    Ok(variance.into_iter().map(f64::sqrt).collect())
}

/// Values and propagated uncertainties of `expression` in one call.
pub fn evaluate_with_uncertainty(
    expression: &str,
    dataset: &Dataset,
    ctx: &EvalContext<'_>,
    include_constant_uncertainty: bool,
) -> Result<(Vec<f64>, Vec<f64>), ExpressionError> {
    let values = evaluate(expression, dataset, ctx)?;
    let sigma = propagate(expression, dataset, ctx, include_constant_uncertainty)?;
    Ok((values, sigma))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ConstantsRegistry;
    use crate::expr::ast::FunctionSet;

    fn with_errors() -> Dataset {
        Dataset::new()
            .with_numeric("x", vec![1.0, -2.0, 3.0])
            .unwrap()
            .with_numeric("xerr1", vec![2.0, 2.0, 2.0])
            .unwrap()
            .with_numeric("xerr2", vec![-4.0, -4.0, -4.0])
            .unwrap()
            .with_numeric("y", vec![5.0, 5.0, 5.0])
            .unwrap()
    }

    #[test]
    fn no_error_columns_and_no_constants_give_zero() {
        let ds = Dataset::new().with_numeric("y", vec![1.0, 2.0]).unwrap();
        let sigma = propagate("y * 3 + 1", &ds, &EvalContext::standard(), true).unwrap();
        assert_eq!(sigma, vec![0.0, 0.0]);
    }

    #[test]
    fn identity_uses_symmetrised_error_columns() {
        let sigma = propagate("x", &with_errors(), &EvalContext::standard(), false).unwrap();
        assert_eq!(sigma, vec![3.0, 3.0, 3.0]);
    }

    #[test]
    fn constant_uncertainty_is_opt_in() {
        let mut registry = ConstantsRegistry::new();
        registry.insert("a", 2.0, 0.5);
        let ctx = EvalContext::new(&registry, FunctionSet::all());
        let ds = Dataset::new().with_numeric("x", vec![1.0, -2.0, 3.0]).unwrap();

        let on = propagate("a*x", &ds, &ctx, true).unwrap();
        assert_eq!(on, vec![0.5, 1.0, 1.5]);
        let off = propagate("a*x", &ds, &ctx, false).unwrap();
        assert_eq!(off, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn independent_terms_add_in_quadrature() {
        // d(x*y)/dx = y = 5, δx = 3 -> 15; y has no error columns.
        let sigma = propagate("x*y", &with_errors(), &EvalContext::standard(), false).unwrap();
        for s in sigma {
            assert!((s - 15.0).abs() < 1e-12);
        }
    }

    #[test]
    fn unknown_identifier_fails() {
        let err = propagate("x + nope", &with_errors(), &EvalContext::standard(), false).unwrap_err();
        assert_eq!(err.kind, ExprErrorKind::UnknownIdentifier("nope".to_string()));
    }

    #[test]
    fn undefined_scalar_partial_gives_nan_sigma() {
        let mut registry = ConstantsRegistry::new();
        registry.insert("k", 0.0, 1.0);
        let ctx = EvalContext::new(&registry, FunctionSet::all());
        let ds = Dataset::new().with_numeric("x", vec![1.0, 2.0]).unwrap();
        // d(x*sqrt(k))/dk = x / (2 sqrt(k)) is undefined at k = 0.
        let (values, sigma) = evaluate_with_uncertainty("x * sqrt(k)", &ds, &ctx, true).unwrap();
        assert_eq!(values, vec![0.0, 0.0]);
        assert!(sigma.iter().all(|s| s.is_nan()));

        // Without constant uncertainty k is never differentiated.
        let sigma = propagate("x * sqrt(k)", &ds, &ctx, false).unwrap();
        assert_eq!(sigma, vec![0.0, 0.0]);
    }

    #[test]
    fn values_and_uncertainties_together() {
        let (values, sigma) = evaluate_with_uncertainty("2*x", &with_errors(), &EvalContext::standard(), false).unwrap();
        assert_eq!(values, vec![2.0, -4.0, 6.0]);
        assert_eq!(sigma, vec![6.0, 6.0, 6.0]);
    }
}
