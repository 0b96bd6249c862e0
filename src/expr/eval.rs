//! Row-wise evaluation of expressions over a `Dataset`.
//!
//! Every referenced identifier is bound before any arithmetic happens, so an
//! unknown name fails the whole request without producing partial data.
//!
//! Values are either scalars (literals, constants) or row-aligned series
//! (columns). Mixed operations broadcast the scalar. Failure policy:
//!
//! - a scalar sub-expression that yields a non-finite value (`1/0`,
//!   `sqrt(-1)`) is an `ExpressionError`
//! - inside a series, a non-finite row result becomes `NaN` (missing), the
//!   same way a missing catalog value is represented

use log::{error, warn};

use crate::constants::ConstantsRegistry;
use crate::domain::Dataset;
use crate::error::{ExprErrorKind, ExpressionError};
use crate::expr::ast::{BinOp, Expr, Function, FunctionSet};
use crate::expr::parser::parse;

/// Explicit evaluation configuration: which constants and functions exist.
#[derive(Debug, Clone)]
pub struct EvalContext<'a> {
    pub constants: &'a ConstantsRegistry,
    pub functions: FunctionSet,
}

impl<'a> EvalContext<'a> {
    pub fn new(constants: &'a ConstantsRegistry, functions: FunctionSet) -> Self {
        Self { constants, functions }
    }
}

impl EvalContext<'static> {
    /// Standard constants and every allow-listed function.
    pub fn standard() -> Self {
        Self::new(ConstantsRegistry::standard(), FunctionSet::all())
    }
}

/// An intermediate evaluation result.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(f64),
    Series(Vec<f64>),
}

impl Value {
    /// Broadcast to a row-aligned series of `n` rows.
    pub fn into_series(self, n: usize) -> Vec<f64> {
        match self {
            Value::Scalar(v) => vec![v; n],
            Value::Series(v) => v,
        }
    }
}

/// What an identifier resolved to.
#[derive(Debug, Clone, Copy)]
pub enum Binding<'d> {
    Column(&'d [f64]),
    Constant { value: f64, uncertainty: f64 },
}

/// Resolved identifiers of one expression.
#[derive(Debug, Clone)]
pub struct Namespace<'d> {
    bindings: Vec<(String, Binding<'d>)>,
    n_rows: usize,
}

impl<'d> Namespace<'d> {
    /// Bind every symbol of `expr`. Constants shadow same-named columns.
    pub fn bind(expr: &Expr, dataset: &'d Dataset, ctx: &EvalContext<'_>) -> Result<Self, ExprErrorKind> {
        let mut bindings = Vec::new();
        for name in expr.symbols() {
            let binding = if let Some(c) = ctx.constants.get(&name) {
                if dataset.contains(&name) {
                    warn!("Constant `{name}` shadows a dataset column of the same name.");
                }
                Binding::Constant {
                    value: c.value,
                    uncertainty: c.uncertainty,
                }
            } else if let Some(values) = dataset.numeric(&name) {
                Binding::Column(values)
            } else if dataset.contains(&name) {
                return Err(ExprErrorKind::Domain(format!("column `{name}` is not numeric")));
            } else {
                return Err(ExprErrorKind::UnknownIdentifier(name));
            };
            bindings.push((name, binding));
        }
        Ok(Self {
            bindings,
            n_rows: dataset.n_rows(),
        })
    }

    pub fn get(&self, name: &str) -> Option<Binding<'d>> {
        self.bindings.iter().find(|(n, _)| n == name).map(|(_, b)| *b)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Bound symbols in first-appearance order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Binding<'d>)> + '_ {
        self.bindings.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Parse an expression with the context's allow-list.
pub fn parse_expression(expression: &str, ctx: &EvalContext<'_>) -> Result<Expr, ExpressionError> {
    parse(expression, &ctx.functions).map_err(|kind| ExpressionError::new(expression, kind))
}

/// Evaluate `expression` row-wise over `dataset`.
pub fn evaluate(expression: &str, dataset: &Dataset, ctx: &EvalContext<'_>) -> Result<Vec<f64>, ExpressionError> {
    let result = evaluate_inner(expression, dataset, ctx);
    if let Err(err) = &result {
        error!("Error evaluating expression: {err}");
    }
    result
}

fn evaluate_inner(expression: &str, dataset: &Dataset, ctx: &EvalContext<'_>) -> Result<Vec<f64>, ExpressionError> {
    let expr = parse_expression(expression, ctx)?;
    let ns = Namespace::bind(&expr, dataset, ctx).map_err(|kind| ExpressionError::new(expression, kind))?;
    match eval_value(&expr, &ns).map_err(|kind| ExpressionError::new(expression, kind))? {
        Value::Series(values) => Ok(values),
        Value::Scalar(_) => Err(ExpressionError::new(expression, ExprErrorKind::NotASeries)),
    }
}

/// Evaluate a parsed tree against bound identifiers.
pub fn eval_value(expr: &Expr, ns: &Namespace<'_>) -> Result<Value, ExprErrorKind> {
    match expr {
        Expr::Num(v) => Ok(Value::Scalar(*v)),
        Expr::Var(name) => match ns.get(name) {
            Some(Binding::Column(values)) => Ok(Value::Series(values.to_vec())),
            Some(Binding::Constant { value, .. }) => Ok(Value::Scalar(value)),
            None => Err(ExprErrorKind::UnknownIdentifier(name.clone())),
        },
        Expr::Neg(a) => Ok(map_unary(eval_value(a, ns)?, |v| -v)),
        Expr::Binary { op, lhs, rhs } => {
            let a = eval_value(lhs, ns)?;
            let b = eval_value(rhs, ns)?;
            binary(*op, a, b)
        }
        Expr::Call { func, arg } => call(*func, eval_value(arg, ns)?),
    }
}

fn map_unary(value: Value, f: impl Fn(f64) -> f64) -> Value {
    match value {
        Value::Scalar(v) => Value::Scalar(f(v)),
        Value::Series(vs) => Value::Series(vs.into_iter().map(|v| missing_if_non_finite(f(v))).collect()),
    }
}

fn missing_if_non_finite(v: f64) -> f64 {
    if v.is_finite() { v } else { f64::NAN }
}

fn binary(op: BinOp, a: Value, b: Value) -> Result<Value, ExprErrorKind> {
    let row = |x: f64, y: f64| missing_if_non_finite(op.apply(x, y));
    match (a, b) {
        (Value::Scalar(x), Value::Scalar(y)) => {
            let v = op.apply(x, y);
            if v.is_finite() {
                Ok(Value::Scalar(v))
            } else if op == BinOp::Div && y == 0.0 {
                Err(ExprErrorKind::Domain("division by zero".to_string()))
            } else {
                Err(ExprErrorKind::Domain(format!(
                    "non-finite result of `{x} {} {y}`",
                    op.symbol()
                )))
            }
        }
        (Value::Scalar(x), Value::Series(ys)) => Ok(Value::Series(ys.into_iter().map(|y| row(x, y)).collect())),
        (Value::Series(xs), Value::Scalar(y)) => Ok(Value::Series(xs.into_iter().map(|x| row(x, y)).collect())),
        (Value::Series(xs), Value::Series(ys)) => {
            if xs.len() != ys.len() {
                return Err(ExprErrorKind::Domain(format!(
                    "series length mismatch ({} vs {})",
                    xs.len(),
                    ys.len()
                )));
            }
            Ok(Value::Series(xs.into_iter().zip(ys).map(|(x, y)| row(x, y)).collect()))
        }
    }
}

fn call(func: Function, arg: Value) -> Result<Value, ExprErrorKind> {
    match arg {
        Value::Scalar(x) => {
            let v = func.apply(x);
            if v.is_finite() {
                Ok(Value::Scalar(v))
            } else {
                Err(ExprErrorKind::Domain(format!("{}({x}) is undefined", func.name())))
            }
        }
        series => Ok(map_unary(series, |v| func.apply(v))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planets() -> Dataset {
        Dataset::new()
            .with_numeric("pl_rade", vec![1.0, 2.0, 4.0])
            .unwrap()
            .with_numeric("pl_bmasse", vec![1.0, 8.0, 0.0])
            .unwrap()
            .with_text("pl_name", vec!["a".into(), "b".into(), "c".into()])
            .unwrap()
    }

    #[test]
    fn columns_and_constants_broadcast() {
        let ctx = EvalContext::standard();
        let out = evaluate("pl_rade * Earth_radius", &planets(), &ctx).unwrap();
        assert_eq!(out, vec![6371.0, 12742.0, 25484.0]);
    }

    #[test]
    fn row_level_division_by_zero_is_missing() {
        let ctx = EvalContext::standard();
        let out = evaluate("pl_rade / pl_bmasse", &planets(), &ctx).unwrap();
        assert_eq!(out[0], 1.0);
        assert_eq!(out[1], 0.25);
        assert!(out[2].is_nan());
    }

    #[test]
    fn scalar_failures_are_errors() {
        let ctx = EvalContext::standard();
        let err = evaluate("pl_rade + 1/0", &planets(), &ctx).unwrap_err();
        assert_eq!(err.kind, ExprErrorKind::Domain("division by zero".to_string()));
        let err = evaluate("pl_rade * sqrt(-1)", &planets(), &ctx).unwrap_err();
        assert!(matches!(err.kind, ExprErrorKind::Domain(_)));
    }

    #[test]
    fn scalar_result_is_not_a_series() {
        let ctx = EvalContext::standard();
        let err = evaluate("2 * pi", &planets(), &ctx).unwrap_err();
        assert_eq!(err.kind, ExprErrorKind::NotASeries);
        assert_eq!(err.expression, "2 * pi");
    }

    #[test]
    fn unknown_and_text_identifiers_fail() {
        let ctx = EvalContext::standard();
        let err = evaluate("pl_rade + pl_orbper", &planets(), &ctx).unwrap_err();
        assert_eq!(err.kind, ExprErrorKind::UnknownIdentifier("pl_orbper".to_string()));
        let err = evaluate("pl_name * 2", &planets(), &ctx).unwrap_err();
        assert!(matches!(err.kind, ExprErrorKind::Domain(_)));
    }

    #[test]
    fn constants_shadow_columns() {
        let ds = Dataset::new().with_numeric("pi", vec![1.0, 1.0]).unwrap();
        let ctx = EvalContext::standard();
        let out = evaluate("pi + 0 * pi", &ds, &ctx);
        // Shadowed by the constant: the whole expression is scalar.
        assert_eq!(out.unwrap_err().kind, ExprErrorKind::NotASeries);
    }

    #[test]
    fn custom_registry_is_honoured() {
        let mut registry = ConstantsRegistry::new();
        registry.insert("k", 10.0, 1.0);
        let ctx = EvalContext::new(&registry, FunctionSet::all());
        let out = evaluate("k * pl_rade", &planets(), &ctx).unwrap();
        assert_eq!(out, vec![10.0, 20.0, 40.0]);
        assert!(evaluate("Earth_radius * pl_rade", &planets(), &ctx).is_err());
    }
}
