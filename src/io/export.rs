//! CSV exports: outlier reports and column subsets.
//!
//! Exports are meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::domain::{ColumnData, Dataset, FitResult};
use crate::error::AppError;
use crate::report::fmt_params;

/// One row of the outlier report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierRecord {
    pub id: String,
    pub row: usize,
    pub orig_x: f64,
    pub orig_y: f64,
    pub y_fit: f64,
    pub residual: f64,
    pub detection_method: String,
    pub reason: String,
    pub best_model: String,
    pub parameters: String,
    #[serde(rename = "chosen_AIC")]
    pub chosen_aic: f64,
}

/// Build report rows for every outlier of `fit`.
pub fn outlier_records(fit: &FitResult) -> Vec<OutlierRecord> {
    let detection_method = format!("Residual > {} * std threshold", fit.std_threshold);
    let parameters = fmt_params(fit);
    fit.outliers
        .iter()
        .map(|o| OutlierRecord {
            id: o.id.clone().unwrap_or_default(),
            row: o.index,
            orig_x: o.x,
            orig_y: o.y,
            y_fit: o.y_fit,
            residual: o.residual,
            detection_method: detection_method.clone(),
            reason: "Deviation from best model".to_string(),
            best_model: fit.best_model.name().to_string(),
            parameters: parameters.clone(),
            chosen_aic: fit.best_aic,
        })
        .collect()
}

/// Write the outlier report of `fit` to a CSV file.
pub fn write_outliers_csv(path: &Path, fit: &FitResult) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create outliers CSV '{}': {e}", path.display())))?;
    for record in outlier_records(fit) {
        writer
            .serialize(&record)
            .map_err(|e| AppError::new(2, format!("Failed to write outliers CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to write outliers CSV: {e}")))?;
    Ok(())
}

/// Write every column of `dataset` to a CSV file (`NaN` as an empty cell).
pub fn write_dataset_csv(path: &Path, dataset: &Dataset) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;

    let header: Vec<&str> = dataset.columns().map(|c| c.name.as_str()).collect();
    writer
        .write_record(&header)
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for row in 0..dataset.n_rows() {
        let cells: Vec<String> = dataset
            .columns()
            .map(|c| match &c.data {
                ColumnData::Numeric(v) if v[row].is_nan() => String::new(),
                ColumnData::Numeric(v) => v[row].to_string(),
                ColumnData::Text(v) => v[row].clone(),
            })
            .collect();
        writer
            .write_record(&cells)
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV: {e}")))?;
    Ok(())
}

/// Create and return the next numbered run folder `root/<x>_VS_<y>/<n>`.
pub fn next_run_dir(root: &Path, x_expr: &str, y_expr: &str) -> Result<PathBuf, AppError> {
    let chart_root = root.join(format!("{}_VS_{}", sanitize(x_expr), sanitize(y_expr)));
    fs::create_dir_all(&chart_root)
        .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", chart_root.display())))?;

    let entries = fs::read_dir(&chart_root)
        .map_err(|e| AppError::new(2, format!("Failed to list '{}': {e}", chart_root.display())))?;
    let last = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().to_str().and_then(|s| s.parse::<u32>().ok()))
        .max()
        .unwrap_or(0);

    let dir = chart_root.join((last + 1).to_string());
    fs::create_dir_all(&dir).map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", dir.display())))?;
    Ok(dir)
}

/// Make an expression safe to use as a path component.
fn sanitize(expr: &str) -> String {
    expr.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitConfig, ModelKind};
    use crate::fit::fit_with_ids;

    fn fit_with_one_outlier() -> FitResult {
        let x: Vec<f64> = (1..=30).map(|i| i as f64).collect();
        let mut y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, v)| 2.0 * v + 3.0 + 0.1 * (1.7 * i as f64).sin())
            .collect();
        y[7] += 2.0;
        let ids: Vec<String> = (0..30).map(|i| format!("P{i}")).collect();
        fit_with_ids(&x, &y, Some(ids.as_slice()), &FitConfig::default()).unwrap()
    }

    #[test]
    fn outlier_records_carry_report_columns() {
        let fit = fit_with_one_outlier();
        assert_eq!(fit.best_model, ModelKind::Linear);
        let records = outlier_records(&fit);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.id, "P7");
        assert_eq!(r.row, 7);
        assert_eq!(r.detection_method, "Residual > 2 * std threshold");
        assert_eq!(r.reason, "Deviation from best model");
        assert_eq!(r.best_model, "linear");
        assert_eq!(r.chosen_aic, fit.best_aic);
    }

    #[test]
    fn writes_outliers_and_numbered_run_dirs() {
        let root = std::env::temp_dir().join(format!("exo-curves-export-{}", std::process::id()));
        let first = next_run_dir(&root, "pl_orbper", "pl_rade * 2").unwrap();
        let second = next_run_dir(&root, "pl_orbper", "pl_rade * 2").unwrap();
        assert!(first.ends_with("pl_orbper_VS_pl_rade___2/1"));
        assert!(second.ends_with("pl_orbper_VS_pl_rade___2/2"));

        let path = first.join("outliers.csv");
        write_outliers_csv(&path, &fit_with_one_outlier()).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,row,orig_x,orig_y,y_fit,residual,detection_method,reason,best_model,parameters,chosen_AIC"
        );
        assert!(lines.next().unwrap().starts_with("P7,7,8"));
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn dataset_export_writes_missing_as_empty() {
        let root = std::env::temp_dir().join(format!("exo-curves-subset-{}", std::process::id()));
        fs::create_dir_all(&root).unwrap();
        let ds = Dataset::new()
            .with_text("pl_name", vec!["a".into(), "b".into()])
            .unwrap()
            .with_numeric("pl_rade", vec![1.5, f64::NAN])
            .unwrap();
        let path = root.join("subset.csv");
        write_dataset_csv(&path, &ds).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "pl_name,pl_rade\na,1.5\nb,\n");
        fs::remove_dir_all(&root).unwrap();
    }
}
