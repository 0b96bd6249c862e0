//! Synthetic planet catalog generation.
//!
//! Produces a reproducible catalog shaped like an exoplanet archive export:
//! planet names, radius, mass, orbital period and insolation, each measured
//! column with its `err1`/`err2` pair, plus column metadata. A small fraction
//! of masses is missing and a few are pushed far off the mass-radius relation
//! so the outlier detection has something to find.

use std::collections::HashMap;

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{LogNormal, Normal};

use crate::domain::{ColumnMeta, Dataset, ERR_LOWER_SUFFIX, ERR_UPPER_SUFFIX};
use crate::error::AppError;

/// Mass-radius exponent: M = R^MASS_RADIUS_EXPONENT (Earth units).
pub const MASS_RADIUS_EXPONENT: f64 = 1.8;

/// Solar-type host: insolation in Earth flux for a period in days.
const EARTH_YEAR_DAYS: f64 = 365.25;

/// Log-space scatter of the mass-radius relation.
const MASS_SCATTER_LN: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogConfig {
    pub count: usize,
    pub seed: u64,
    /// Probability that a planet has no mass measurement.
    pub missing_mass_prob: f64,
    /// Probability that a mass is an outlier.
    pub outlier_prob: f64,
    /// Outlier displacement in units of the log-space scatter.
    pub outlier_k: f64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            count: 200,
            seed: 42,
            missing_mass_prob: 0.05,
            outlier_prob: 0.03,
            outlier_k: 8.0,
        }
    }
}

/// Generate a synthetic catalog with metadata attached to every column.
pub fn generate_catalog(config: &CatalogConfig) -> Result<Dataset, AppError> {
    if config.count == 0 {
        return Err(AppError::new(2, "Catalog size must be > 0."));
    }
    let probs_ok = [config.missing_mass_prob, config.outlier_prob]
        .iter()
        .all(|p| p.is_finite() && (0.0..1.0).contains(p));
    if !probs_ok {
        return Err(AppError::new(2, "Invalid probability settings for the synthetic catalog."));
    }
    if !(config.outlier_k.is_finite() && config.outlier_k > 0.0) {
        return Err(AppError::new(2, "Invalid outlier magnitude for the synthetic catalog."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let scatter = Normal::new(0.0, MASS_SCATTER_LN)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;
    let rel_err = LogNormal::new((0.05_f64).ln(), 0.3)
        .map_err(|e| AppError::new(4, format!("Error distribution error: {e}")))?;

    let n = config.count;
    let mut names = Vec::with_capacity(n);
    let mut rade = Measured::with_capacity(n);
    let mut mass = Measured::with_capacity(n);
    let mut period = Measured::with_capacity(n);
    let mut insol = Measured::with_capacity(n);

    for i in 0..n {
        names.push(format!("EXO-{:03} {}", i / 3 + 1, ['b', 'c', 'd'][i % 3]));

        let r = log_uniform(&mut rng, 0.8, 15.0);
        rade.push(r, r * rel_err.sample(&mut rng));

        let m = if rng.r#gen::<f64>() < config.missing_mass_prob {
            f64::NAN
        } else {
            let mut ln_m = MASS_RADIUS_EXPONENT * r.ln() + scatter.sample(&mut rng);
            if rng.r#gen::<f64>() < config.outlier_prob {
                ln_m += config.outlier_k * MASS_SCATTER_LN;
            }
            ln_m.exp()
        };
        mass.push(m, 2.0 * m * rel_err.sample(&mut rng));

        let p = log_uniform(&mut rng, 0.5, 500.0);
        period.push(p, p * 1e-4);

        let s = (EARTH_YEAR_DAYS / p).powf(4.0 / 3.0);
        insol.push(s, s * rel_err.sample(&mut rng));
    }

    let mut dataset = Dataset::new();
    dataset.push_text("pl_name", names)?;
    rade.push_into(&mut dataset, "pl_rade")?;
    mass.push_into(&mut dataset, "pl_bmasse")?;
    period.push_into(&mut dataset, "pl_orbper")?;
    insol.push_into(&mut dataset, "pl_insol")?;

    for (name, meta) in catalog_columns_info() {
        if dataset.contains(&name) {
            dataset.set_meta(&name, meta)?;
        }
    }
    Ok(dataset)
}

/// Unit/description metadata of the synthetic catalog columns.
pub fn catalog_columns_info() -> HashMap<String, ColumnMeta> {
    let entries = [
        ("pl_name", "", "Planet Name"),
        ("pl_rade", "Earth Radius", "Planet Radius"),
        ("pl_bmasse", "Earth Mass", "Planet Mass"),
        ("pl_orbper", "days", "Orbital Period"),
        ("pl_insol", "Earth Flux", "Insolation Flux"),
    ];
    entries
        .iter()
        .map(|(name, unit, description)| {
            (
                name.to_string(),
                ColumnMeta {
                    unit: unit.to_string(),
                    description: description.to_string(),
                },
            )
        })
        .collect()
}

/// A measured column and its symmetric error bars.
struct Measured {
    values: Vec<f64>,
    upper: Vec<f64>,
    lower: Vec<f64>,
}

impl Measured {
    fn with_capacity(n: usize) -> Self {
        Self {
            values: Vec::with_capacity(n),
            upper: Vec::with_capacity(n),
            lower: Vec::with_capacity(n),
        }
    }

    fn push(&mut self, value: f64, err: f64) {
        self.values.push(value);
        self.upper.push(err);
        self.lower.push(-err);
    }

    fn push_into(self, dataset: &mut Dataset, name: &str) -> Result<(), AppError> {
        dataset.push_numeric(name, self.values)?;
        dataset.push_numeric(format!("{name}{ERR_UPPER_SUFFIX}"), self.upper)?;
        dataset.push_numeric(format!("{name}{ERR_LOWER_SUFFIX}"), self.lower)?;
        Ok(())
    }
}

fn log_uniform(rng: &mut StdRng, lo: f64, hi: f64) -> f64 {
    rng.gen_range(lo.ln()..hi.ln()).exp()
}
