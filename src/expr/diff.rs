//! Symbolic differentiation over the expression tree.
//!
//! Each node kind has its own rule; results are built with the folding
//! constructors so a partial that does not depend on the symbol collapses to
//! `Num(0.0)`.
//!
//! Power rule cases:
//!
//! - `u^c` (exponent independent of the symbol): `c * u^(c-1) * u'`
//! - `c^v` (base independent of the symbol): `c^v * ln(c) * v'`
//! - `u^v`: `u^v * (v' * ln(u) + v * u' / u)`

use std::f64::consts::LN_10;

use crate::expr::ast::{BinOp, Expr, Function, add, call, div, mul, neg, pow, sub};

/// `d expr / d wrt`.
pub fn differentiate(expr: &Expr, wrt: &str) -> Expr {
    if !expr.depends_on(wrt) {
        return Expr::Num(0.0);
    }

    match expr {
        Expr::Num(_) => Expr::Num(0.0),
        Expr::Var(name) => Expr::Num(if name == wrt { 1.0 } else { 0.0 }),
        Expr::Neg(a) => neg(differentiate(a, wrt)),
        Expr::Binary { op, lhs, rhs } => {
            let (u, v) = (lhs.as_ref(), rhs.as_ref());
            let du = differentiate(u, wrt);
            let dv = differentiate(v, wrt);
            match op {
                BinOp::Add => add(du, dv),
                BinOp::Sub => sub(du, dv),
                BinOp::Mul => add(mul(du, v.clone()), mul(u.clone(), dv)),
                BinOp::Div => div(
                    sub(mul(du, v.clone()), mul(u.clone(), dv)),
                    pow(v.clone(), Expr::Num(2.0)),
                ),
                BinOp::Pow => {
                    if !v.depends_on(wrt) {
                        let exponent = sub(v.clone(), Expr::Num(1.0));
                        mul(mul(v.clone(), pow(u.clone(), exponent)), du)
                    } else if !u.depends_on(wrt) {
                        mul(mul(pow(u.clone(), v.clone()), call(Function::Ln, u.clone())), dv)
                    } else {
                        let inner = add(
                            mul(dv, call(Function::Ln, u.clone())),
                            div(mul(v.clone(), du), u.clone()),
                        );
                        mul(pow(u.clone(), v.clone()), inner)
                    }
                }
            }
        }
        Expr::Call { func, arg } => {
            let da = differentiate(arg, wrt);
            mul(outer_derivative(*func, arg), da)
        }
    }
}

/// `f'(a)` for the allow-listed functions.
fn outer_derivative(func: Function, a: &Expr) -> Expr {
    let a = a.clone();
    match func {
        Function::Sqrt => div(Expr::Num(1.0), mul(Expr::Num(2.0), call(Function::Sqrt, a))),
        Function::Exp => call(Function::Exp, a),
        Function::Ln => div(Expr::Num(1.0), a),
        Function::Log10 => div(Expr::Num(1.0), mul(a, Expr::Num(LN_10))),
        Function::Sin => call(Function::Cos, a),
        Function::Cos => neg(call(Function::Sin, a)),
        Function::Tan => div(Expr::Num(1.0), pow(call(Function::Cos, a), Expr::Num(2.0))),
        Function::Abs => div(a.clone(), call(Function::Abs, a)),
    }
}
