//! CSV ingest into a `Dataset`.
//!
//! This module is the thinnest possible loading layer: it turns a catalog CSV
//! (e.g. an exoplanet archive export) into named, row-aligned columns, and a
//! column-info file into per-column unit/description metadata.
//!
//! Design goals:
//! - **Typed columns**: a column is numeric when every non-empty cell parses
//!   as a number (empty cells become `NaN`); otherwise it is text
//! - **Tolerant input**: `#` comment lines, BOM-prefixed headers and ragged
//!   rows are accepted
//! - **Separation of concerns**: no evaluation or fitting logic here

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use log::{info, warn};

use crate::domain::{ColumnMeta, Dataset};
use crate::error::AppError;

/// Load a catalog CSV file.
pub fn load_catalog_csv(path: &Path) -> Result<Dataset, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    let dataset = read_catalog(file)?;
    info!(
        "Loaded '{}': {} rows, {} columns.",
        path.display(),
        dataset.n_rows(),
        dataset.n_columns()
    );
    Ok(dataset)
}

/// Read a catalog CSV from any reader.
pub fn read_catalog<R: Read>(reader: R) -> Result<Dataset, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .iter()
        .map(normalize_header_name)
        .collect();

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for (idx, result) in reader.records().enumerate() {
        // Line numbers are 1-based and the header is line 1.
        let record = result.map_err(|e| AppError::new(2, format!("CSV parse error near row {}: {e}", idx + 2)))?;
        for (col, values) in cells.iter_mut().enumerate() {
            values.push(record.get(col).unwrap_or("").to_string());
        }
    }

    let mut dataset = Dataset::new();
    for (name, values) in headers.into_iter().zip(cells) {
        if name.is_empty() {
            warn!("Skipping CSV column with an empty header.");
            continue;
        }
        match parse_numeric_column(&values) {
            Some(numeric) => dataset.push_numeric(name, numeric)?,
            None => dataset.push_text(name, values)?,
        }
    }
    Ok(dataset)
}

/// Load a column-info file (`name`, `unit`, `description`, tab-separated).
///
/// Fields may be separated by a single tab or by runs of four tabs.
pub fn load_columns_info(path: &Path) -> Result<HashMap<String, ColumnMeta>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open column info '{}': {e}", path.display())))?;
    read_columns_info(file)
}

pub fn read_columns_info<R: Read>(reader: R) -> Result<HashMap<String, ColumnMeta>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .quoting(false)
        .from_reader(reader);

    let mut info = HashMap::new();
    for result in reader.records() {
        let record = result.map_err(|e| AppError::new(2, format!("Failed to read column info: {e}")))?;
        let Some((name, meta)) = parse_info_record(&record) else {
            continue;
        };
        info.insert(name, meta);
    }
    Ok(info)
}

/// Attach metadata to every dataset column that has an entry.
pub fn apply_columns_info(dataset: &mut Dataset, info: &HashMap<String, ColumnMeta>) -> usize {
    let names: Vec<String> = dataset.columns().map(|c| c.name.clone()).collect();
    let mut applied = 0;
    for name in names {
        if let Some(meta) = info.get(&name) {
            if dataset.set_meta(&name, meta.clone()).is_ok() {
                applied += 1;
            }
        }
    }
    applied
}

fn parse_info_record(record: &StringRecord) -> Option<(String, ColumnMeta)> {
    let stride = if record.len() >= 9 { 4 } else { 1 };
    let field = |i: usize| record.get(i * stride).map(str::trim);
    let name = field(0).filter(|n| !n.is_empty())?;
    let unit = field(1)?;
    let description = field(2)?;
    Some((
        name.to_string(),
        ColumnMeta {
            unit: unit.to_string(),
            description: description.to_string(),
        },
    ))
}

fn parse_numeric_column(values: &[String]) -> Option<Vec<f64>> {
    values
        .iter()
        .map(|s| if s.is_empty() { Some(f64::NAN) } else { s.parse::<f64>().ok() })
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Some tools emit UTF-8 CSVs with a BOM prefix on the first header.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_typed_columns_and_skips_comments() {
        let csv = "# exported catalog\n\u{feff}pl_name,pl_rade,pl_radeerr1,pl_radeerr2\n\
                   Kepler-1 b,1.5,0.1,-0.2\n\
                   Kepler-2 c,,0.3,-0.3\n";
        let ds = read_catalog(csv.as_bytes()).unwrap();
        assert_eq!(ds.n_rows(), 2);
        assert_eq!(ds.text("pl_name").unwrap()[1], "Kepler-2 c");
        let rade = ds.numeric("pl_rade").unwrap();
        assert_eq!(rade[0], 1.5);
        assert!(rade[1].is_nan());
        let delta = ds.column_delta("pl_rade").unwrap();
        assert!((delta[0] - 0.15).abs() < 1e-12 && (delta[1] - 0.3).abs() < 1e-12);
    }

    #[test]
    fn mixed_columns_stay_text() {
        let csv = "code,value\n12,1\nA7,2\n";
        let ds = read_catalog(csv.as_bytes()).unwrap();
        assert!(ds.text("code").is_some());
        assert!(ds.numeric("value").is_some());
    }

    #[test]
    fn column_info_accepts_single_and_quadruple_tabs() {
        let info = "# name unit description\n\
                    pl_rade\t\t\t\tEarth Radius\t\t\t\tPlanet Radius\n\
                    pl_orbper\tdays\tOrbital Period\n\
                    broken\n";
        let map = read_columns_info(info.as_bytes()).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["pl_rade"].unit, "Earth Radius");
        assert_eq!(map["pl_rade"].description, "Planet Radius");
        assert_eq!(map["pl_orbper"].unit, "days");

        let mut ds = Dataset::new().with_numeric("pl_rade", vec![1.0]).unwrap();
        assert_eq!(apply_columns_info(&mut ds, &map), 1);
        assert_eq!(ds.meta("pl_rade").unwrap().description, "Planet Radius");
    }
}
