//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during evaluation and fitting
//! - exported to JSON/CSV by the presentation layer
//! - constructed directly in tests without any file I/O

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::DatasetError;

/// Suffix of the upper (positive) error column paired with a value column.
pub const ERR_UPPER_SUFFIX: &str = "err1";
/// Suffix of the lower (negative) error column paired with a value column.
pub const ERR_LOWER_SUFFIX: &str = "err2";

/// Values of a single column.
///
/// Missing numeric values are stored as `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Human-facing column metadata supplied by the loading layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub unit: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
    pub meta: Option<ColumnMeta>,
}

/// An ordered set of uniquely named, row-aligned columns.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    columns: Vec<Column>,
    index: HashMap<String, usize>,
    n_rows: usize,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper for numeric columns (mostly used by tests and the
    /// synthetic catalog).
    pub fn with_numeric(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self, DatasetError> {
        self.push_numeric(name, values)?;
        Ok(self)
    }

    pub fn with_text(mut self, name: impl Into<String>, values: Vec<String>) -> Result<Self, DatasetError> {
        self.push_text(name, values)?;
        Ok(self)
    }

    pub fn push_numeric(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<(), DatasetError> {
        self.push_column(Column {
            name: name.into(),
            data: ColumnData::Numeric(values),
            meta: None,
        })
    }

    pub fn push_text(&mut self, name: impl Into<String>, values: Vec<String>) -> Result<(), DatasetError> {
        self.push_column(Column {
            name: name.into(),
            data: ColumnData::Text(values),
            meta: None,
        })
    }

    pub fn push_column(&mut self, column: Column) -> Result<(), DatasetError> {
        if self.index.contains_key(&column.name) {
            return Err(DatasetError::DuplicateColumn(column.name));
        }
        let len = column.data.len();
        if self.columns.is_empty() {
            self.n_rows = len;
        } else if len != self.n_rows {
            return Err(DatasetError::LengthMismatch {
                name: column.name,
                len,
                expected: self.n_rows,
            });
        }
        self.index.insert(column.name.clone(), self.columns.len());
        self.columns.push(column);
        Ok(())
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index.get(name).map(|&i| &self.columns[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Numeric values of a column, or `None` if absent or textual.
    pub fn numeric(&self, name: &str) -> Option<&[f64]> {
        match &self.column(name)?.data {
            ColumnData::Numeric(v) => Some(v),
            ColumnData::Text(_) => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&[String]> {
        match &self.column(name)?.data {
            ColumnData::Text(v) => Some(v),
            ColumnData::Numeric(_) => None,
        }
    }

    pub fn set_meta(&mut self, name: &str, meta: ColumnMeta) -> Result<(), DatasetError> {
        let idx = *self
            .index
            .get(name)
            .ok_or_else(|| DatasetError::UnknownColumn(name.to_string()))?;
        self.columns[idx].meta = Some(meta);
        Ok(())
    }

    pub fn meta(&self, name: &str) -> Option<&ColumnMeta> {
        self.column(name)?.meta.as_ref()
    }

    /// Paired `(err1, err2)` columns for `name`, only when both exist and are numeric.
    pub fn error_columns(&self, name: &str) -> Option<(&[f64], &[f64])> {
        let upper = self.numeric(&format!("{name}{ERR_UPPER_SUFFIX}"))?;
        let lower = self.numeric(&format!("{name}{ERR_LOWER_SUFFIX}"))?;
        Some((upper, lower))
    }

    /// Symmetrised per-row delta `0.5 * (|err1| + |err2|)`.
    pub fn column_delta(&self, name: &str) -> Option<Vec<f64>> {
        let (upper, lower) = self.error_columns(name)?;
        Some(
            upper
                .iter()
                .zip(lower)
                .map(|(u, l)| 0.5 * (u.abs() + l.abs()))
                .collect(),
        )
    }

    /// Asymmetric error bars `(|err1|, |err2|)`; zeros when the pair is absent.
    pub fn asymmetric_errors(&self, name: &str) -> (Vec<f64>, Vec<f64>) {
        match self.error_columns(name) {
            Some((upper, lower)) => (
                upper.iter().map(|v| v.abs()).collect(),
                lower.iter().map(|v| v.abs()).collect(),
            ),
            None => (vec![0.0; self.n_rows], vec![0.0; self.n_rows]),
        }
    }

    /// Per-row labels from a column (text as-is, numbers formatted).
    pub fn row_labels(&self, name: &str) -> Option<Vec<String>> {
        match &self.column(name)?.data {
            ColumnData::Text(v) => Some(v.clone()),
            ColumnData::Numeric(v) => Some(v.iter().map(|x| x.to_string()).collect()),
        }
    }

    /// Copy of the named columns, each followed by its `err1`/`err2` pair when
    /// both exist. Original column order is kept.
    pub fn select_with_errors(&self, names: &[&str]) -> Result<Dataset, DatasetError> {
        for name in names {
            if !self.contains(name) {
                return Err(DatasetError::UnknownColumn(name.to_string()));
            }
        }
        let mut keep: Vec<String> = Vec::new();
        for name in names {
            keep.push(name.to_string());
            if self.error_columns(name).is_some() {
                keep.push(format!("{name}{ERR_UPPER_SUFFIX}"));
                keep.push(format!("{name}{ERR_LOWER_SUFFIX}"));
            }
        }

        let mut out = Dataset::new();
        for column in self.columns.iter().filter(|c| keep.contains(&c.name)) {
            out.push_column(column.clone())?;
        }
        Ok(out)
    }
}

/// Candidate model family for the multi-model fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Linear,
    Exponential,
    Power,
    Logarithmic,
}

impl ModelKind {
    /// Catalog in declaration order (also the final tie-break order).
    pub const ALL: [ModelKind; 4] = [
        ModelKind::Linear,
        ModelKind::Exponential,
        ModelKind::Power,
        ModelKind::Logarithmic,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ModelKind::Linear => "linear",
            ModelKind::Exponential => "exponential",
            ModelKind::Power => "power",
            ModelKind::Logarithmic => "logarithmic",
        }
    }

    pub fn formula(self) -> &'static str {
        match self {
            ModelKind::Linear => "m*x + c",
            ModelKind::Exponential => "a*exp(b*x)",
            ModelKind::Power => "a*x^b",
            ModelKind::Logarithmic => "a*ln(x) + b",
        }
    }

    pub fn param_names(self) -> &'static [&'static str] {
        match self {
            ModelKind::Linear => &["m", "c"],
            ModelKind::Exponential | ModelKind::Power | ModelKind::Logarithmic => &["a", "b"],
        }
    }

    pub fn param_count(self) -> usize {
        self.param_names().len()
    }

    pub fn catalog_index(self) -> usize {
        ModelKind::ALL.iter().position(|&m| m == self).unwrap_or(usize::MAX)
    }
}

/// Tuning knobs for the multi-model fit.
///
/// Each model starts from an initial guess derived from the data
/// (log-linearised least squares), not from fixed constants; fixed neutral
/// values are used only when the data rule the linearisation out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitConfig {
    /// Minimum number of valid (finite) pairs required to attempt a fit.
    pub min_points: usize,
    /// Outlier threshold in residual standard deviations.
    pub std_threshold: f64,
    /// Caller displays X on a log axis (metadata only).
    pub log_x: bool,
    /// Caller displays Y on a log axis (metadata only).
    pub log_y: bool,
    /// Levenberg–Marquardt iteration cap per model.
    pub max_iterations: usize,
    /// Relative tolerance for cost and step convergence.
    pub tolerance: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            min_points: 5,
            std_threshold: 2.0,
            log_x: false,
            log_y: false,
            max_iterations: 200,
            tolerance: 1e-10,
        }
    }
}

/// Evaluation of one candidate model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEvaluation {
    pub model: ModelKind,
    pub params: Vec<f64>,
    #[serde(deserialize_with = "f64_or_nan")]
    pub rss: f64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub aic: f64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub r2: f64,
    pub converged: bool,
    pub iterations: usize,
    /// Failure reason when `converged` is false.
    pub failure: Option<String>,
}

/// A row flagged as an outlier against the best model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outlier {
    /// Position in the caller's original X/Y series.
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub y_fit: f64,
    pub residual: f64,
    pub id: Option<String>,
}

/// Output of a multi-model fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub best_model: ModelKind,
    pub best_params: Vec<f64>,
    #[serde(deserialize_with = "f64_or_nan")]
    pub best_aic: f64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub best_r2: f64,
    /// Every candidate, in catalog order, converged or not.
    pub evaluations: Vec<ModelEvaluation>,
    pub outliers: Vec<Outlier>,
    #[serde(deserialize_with = "f64_or_nan")]
    pub residual_std: f64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub outlier_threshold: f64,
    pub std_threshold: f64,
    /// Number of valid pairs used.
    pub n: usize,
    pub log_x: bool,
    pub log_y: bool,
}

impl FitResult {
    pub fn evaluation(&self, model: ModelKind) -> Option<&ModelEvaluation> {
        self.evaluations.iter().find(|e| e.model == model)
    }
}

/// JSON has no NaN/infinity: they are written as `null` and read back as `NaN`.
pub fn f64_or_nan<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

/// Vector form of [`f64_or_nan`].
pub fn vec_f64_or_nan<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
    let values = Vec::<Option<f64>>::deserialize(deserializer)?;
    Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}
