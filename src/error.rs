//! Error types.
//!
//! Library components return typed errors (`ExpressionError`, `DatasetError`,
//! `FitFailure`). The binary folds everything into `AppError`, which carries
//! the process exit code:
//!
//! - `2`: bad input (expression, column, file, flag)
//! - `3`: insufficient data
//! - `4`: numeric failure

use thiserror::Error;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<ExpressionError> for AppError {
    fn from(err: ExpressionError) -> Self {
        AppError::new(2, err.to_string())
    }
}

impl From<DatasetError> for AppError {
    fn from(err: DatasetError) -> Self {
        AppError::new(2, err.to_string())
    }
}

/// A failed expression evaluation or propagation.
///
/// Always names the expression so the caller can report which one failed.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("expression '{expression}': {kind}")]
pub struct ExpressionError {
    pub expression: String,
    pub kind: ExprErrorKind,
}

impl ExpressionError {
    pub fn new(expression: impl Into<String>, kind: ExprErrorKind) -> Self {
        Self {
            expression: expression.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprErrorKind {
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("unknown identifier `{0}`")]
    UnknownIdentifier(String),

    #[error("function `{0}` is not allowed")]
    UnknownFunction(String),

    #[error("evaluates to a single value, not a per-row series")]
    NotASeries,

    #[error("{0}")]
    Domain(String),

    #[error("derivative with respect to `{symbol}` failed: {message}")]
    Derivative { symbol: String, message: String },
}

/// Dataset construction and lookup errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DatasetError {
    #[error("duplicate column `{0}`")]
    DuplicateColumn(String),

    #[error("column `{name}` has {len} rows, dataset has {expected}")]
    LengthMismatch {
        name: String,
        len: usize,
        expected: usize,
    },

    #[error("unknown column `{0}`")]
    UnknownColumn(String),
}

/// Why a single candidate model failed to produce a usable fit.
///
/// These never abort a multi-model fit; they end up in the evaluation table.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitFailure {
    #[error("no convergence after {iterations} iterations")]
    NonConvergence { iterations: usize },

    #[error("invalid parameters or predictions ({0})")]
    InvalidParameters(String),

    #[error("normal equations could not be solved")]
    SingularSystem,

    #[error("underdetermined: n={n} < k={k}")]
    Underdetermined { n: usize, k: usize },
}
