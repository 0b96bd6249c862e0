//! Expression tree and the function allow-list.
//!
//! The tree is a plain tagged enum. Two families of constructors exist:
//!
//! - the raw variants, used by the parser so the tree mirrors the input text
//!   (and `1/0` still fails at evaluation time)
//! - the folding helpers (`add`, `mul`, `pow`, ...), used by differentiation so
//!   that `0 * f` collapses to `0` and identically-zero partials are detectable

use std::fmt;

/// Functions an expression may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Sqrt,
    Exp,
    Ln,
    Log10,
    Sin,
    Cos,
    Tan,
    Abs,
}

impl Function {
    pub const ALL: [Function; 8] = [
        Function::Sqrt,
        Function::Exp,
        Function::Ln,
        Function::Log10,
        Function::Sin,
        Function::Cos,
        Function::Tan,
        Function::Abs,
    ];

    /// Resolve a call name. `log` is the natural logarithm.
    pub fn from_name(name: &str) -> Option<Function> {
        match name {
            "sqrt" => Some(Function::Sqrt),
            "exp" => Some(Function::Exp),
            "ln" | "log" => Some(Function::Ln),
            "log10" => Some(Function::Log10),
            "sin" => Some(Function::Sin),
            "cos" => Some(Function::Cos),
            "tan" => Some(Function::Tan),
            "abs" => Some(Function::Abs),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::Sqrt => "sqrt",
            Function::Exp => "exp",
            Function::Ln => "ln",
            Function::Log10 => "log10",
            Function::Sin => "sin",
            Function::Cos => "cos",
            Function::Tan => "tan",
            Function::Abs => "abs",
        }
    }

    pub fn apply(self, v: f64) -> f64 {
        match self {
            Function::Sqrt => v.sqrt(),
            Function::Exp => v.exp(),
            Function::Ln => v.ln(),
            Function::Log10 => v.log10(),
            Function::Sin => v.sin(),
            Function::Cos => v.cos(),
            Function::Tan => v.tan(),
            Function::Abs => v.abs(),
        }
    }
}

/// The set of functions the parser accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSet {
    allowed: Vec<Function>,
}

impl FunctionSet {
    pub fn all() -> Self {
        Self {
            allowed: Function::ALL.to_vec(),
        }
    }

    pub fn only(functions: &[Function]) -> Self {
        let mut allowed = Vec::with_capacity(functions.len());
        for &f in functions {
            if !allowed.contains(&f) {
                allowed.push(f);
            }
        }
        Self { allowed }
    }

    pub fn contains(&self, f: Function) -> bool {
        self.allowed.contains(&f)
    }

    pub fn iter(&self) -> impl Iterator<Item = Function> + '_ {
        self.allowed.iter().copied()
    }
}

impl Default for FunctionSet {
    fn default() -> Self {
        Self::all()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Pow => "^",
        }
    }

    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BinOp::Add => a + b,
            BinOp::Sub => a - b,
            BinOp::Mul => a * b,
            BinOp::Div => a / b,
            BinOp::Pow => a.powf(b),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Var(String),
    Neg(Box<Expr>),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        func: Function,
        arg: Box<Expr>,
    },
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Expr {
        Expr::Var(name.into())
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            Expr::Num(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.as_num() == Some(0.0)
    }

    pub fn is_one(&self) -> bool {
        self.as_num() == Some(1.0)
    }

    /// Referenced identifiers, in order of first appearance.
    pub fn symbols(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut Vec<String>) {
        match self {
            Expr::Num(_) => {}
            Expr::Var(name) => {
                if !out.iter().any(|s| s == name) {
                    out.push(name.clone());
                }
            }
            Expr::Neg(a) | Expr::Call { arg: a, .. } => a.collect_symbols(out),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_symbols(out);
                rhs.collect_symbols(out);
            }
        }
    }

    pub fn depends_on(&self, name: &str) -> bool {
        match self {
            Expr::Num(_) => false,
            Expr::Var(v) => v == name,
            Expr::Neg(a) | Expr::Call { arg: a, .. } => a.depends_on(name),
            Expr::Binary { lhs, rhs, .. } => lhs.depends_on(name) || rhs.depends_on(name),
        }
    }
}

// Folding constructors. Literal folding only happens when the result is
// finite, so numeric failures still surface during evaluation.

fn fold(v: f64, otherwise: impl FnOnce() -> Expr) -> Expr {
    if v.is_finite() { Expr::Num(v) } else { otherwise() }
}

pub fn neg(a: Expr) -> Expr {
    match a {
        Expr::Num(v) => Expr::Num(-v),
        Expr::Neg(inner) => *inner,
        other => Expr::Neg(Box::new(other)),
    }
}

pub fn add(a: Expr, b: Expr) -> Expr {
    if a.is_zero() {
        return b;
    }
    if b.is_zero() {
        return a;
    }
    match (a.as_num(), b.as_num()) {
        (Some(x), Some(y)) => fold(x + y, || Expr::binary(BinOp::Add, a, b)),
        _ => Expr::binary(BinOp::Add, a, b),
    }
}

pub fn sub(a: Expr, b: Expr) -> Expr {
    if b.is_zero() {
        return a;
    }
    if a.is_zero() {
        return neg(b);
    }
    match (a.as_num(), b.as_num()) {
        (Some(x), Some(y)) => fold(x - y, || Expr::binary(BinOp::Sub, a, b)),
        _ => Expr::binary(BinOp::Sub, a, b),
    }
}

pub fn mul(a: Expr, b: Expr) -> Expr {
    if a.is_zero() || b.is_zero() {
        return Expr::Num(0.0);
    }
    if a.is_one() {
        return b;
    }
    if b.is_one() {
        return a;
    }
    match (a.as_num(), b.as_num()) {
        (Some(x), Some(y)) => fold(x * y, || Expr::binary(BinOp::Mul, a, b)),
        (Some(x), None) if x == -1.0 => neg(b),
        (None, Some(y)) if y == -1.0 => neg(a),
        _ => Expr::binary(BinOp::Mul, a, b),
    }
}

pub fn div(a: Expr, b: Expr) -> Expr {
    if a.is_zero() {
        return Expr::Num(0.0);
    }
    if b.is_one() {
        return a;
    }
    match (a.as_num(), b.as_num()) {
        (Some(x), Some(y)) if y != 0.0 => fold(x / y, || Expr::binary(BinOp::Div, a, b)),
        _ => Expr::binary(BinOp::Div, a, b),
    }
}

pub fn pow(a: Expr, b: Expr) -> Expr {
    if b.is_zero() {
        return Expr::Num(1.0);
    }
    if b.is_one() {
        return a;
    }
    match (a.as_num(), b.as_num()) {
        (Some(x), Some(y)) => fold(x.powf(y), || Expr::binary(BinOp::Pow, a, b)),
        _ => Expr::binary(BinOp::Pow, a, b),
    }
}

pub fn call(func: Function, a: Expr) -> Expr {
    match a.as_num() {
        Some(v) => fold(func.apply(v), || Expr::Call {
            func,
            arg: Box::new(a),
        }),
        None => Expr::Call {
            func,
            arg: Box::new(a),
        },
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Num(v) => write!(f, "{v}"),
            Expr::Var(name) => write!(f, "{name}"),
            Expr::Neg(a) => write!(f, "-({a})"),
            Expr::Binary { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
            Expr::Call { func, arg } => write!(f, "{}({arg})", func.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folding_collapses_zero_products() {
        let x = Expr::var("x");
        assert!(mul(Expr::Num(0.0), x.clone()).is_zero());
        assert_eq!(add(Expr::Num(0.0), x.clone()), x);
        assert_eq!(pow(x.clone(), Expr::Num(1.0)), x);
        assert_eq!(sub(Expr::Num(3.0), Expr::Num(1.0)), Expr::Num(2.0));
    }

    #[test]
    fn folding_keeps_non_finite_literals_as_trees() {
        let e = div(Expr::Num(1.0), Expr::Num(0.0));
        assert!(matches!(e, Expr::Binary { op: BinOp::Div, .. }));
        let e = call(Function::Sqrt, Expr::Num(-1.0));
        assert!(matches!(e, Expr::Call { .. }));
    }

    #[test]
    fn symbols_are_unique_in_first_appearance_order() {
        let e = Expr::binary(
            BinOp::Mul,
            Expr::var("b"),
            Expr::binary(BinOp::Add, Expr::var("a"), Expr::var("b")),
        );
        assert_eq!(e.symbols(), vec!["b".to_string(), "a".to_string()]);
        assert!(e.depends_on("a"));
        assert!(!e.depends_on("c"));
    }

    #[test]
    fn function_set_restricts_and_dedups() {
        let set = FunctionSet::only(&[Function::Sqrt, Function::Sqrt]);
        assert!(set.contains(Function::Sqrt));
        assert!(!set.contains(Function::Exp));
        assert_eq!(set.iter().count(), 1);
        assert_eq!(Function::from_name("log"), Some(Function::Ln));
    }
}
