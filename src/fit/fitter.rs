//! Low-level fitting routine for a single model kind.
//!
//! Given valid pairs `(x_i, y_i)` we minimise `Σ (y_i - f(x_i; p))^2` with
//! Levenberg–Marquardt, starting from the model's deterministic initial guess
//! and using its analytic Jacobian.

use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::domain::{FitConfig, ModelKind};
use crate::error::FitFailure;
use crate::math::{LeastSquaresProblem, LmOptions, levenberg_marquardt};
use crate::models::{fill_jacobian_row, initial_guess, predict};

/// Converged fit for a single model kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFit {
    pub model: ModelKind,
    pub params: Vec<f64>,
    pub rss: f64,
    pub iterations: usize,
}

/// One model over a fixed set of points.
struct CurveProblem<'a> {
    model: ModelKind,
    x: &'a [f64],
    y: &'a [f64],
}

impl LeastSquaresProblem for CurveProblem<'_> {
    fn n_params(&self) -> usize {
        self.model.param_count()
    }

    fn n_observations(&self) -> usize {
        self.x.len()
    }

    fn residuals(&self, params: &[f64]) -> DVector<f64> {
        DVector::from_iterator(
            self.x.len(),
            self.x
                .iter()
                .zip(self.y)
                .map(|(&x, &y)| y - predict(self.model, x, params)),
        )
    }

    fn jacobian(&self, params: &[f64]) -> DMatrix<f64> {
        let k = self.n_params();
        let mut jac = DMatrix::<f64>::zeros(self.x.len(), k);
        let mut row = vec![0.0; k];
        for (i, &x) in self.x.iter().enumerate() {
            fill_jacobian_row(self.model, x, params, &mut row);
            for j in 0..k {
                jac[(i, j)] = row[j];
            }
        }
        jac
    }
}

/// Fit a single model kind.
///
/// `x` and `y` must already be filtered to finite pairs of equal length.
pub fn fit_model(model: ModelKind, x: &[f64], y: &[f64], config: &FitConfig) -> Result<ModelFit, FitFailure> {
    let problem = CurveProblem { model, x, y };
    let start = initial_guess(model, x, y);
    debug!("Fitting {} from initial guess {:?}.", model.name(), start);

    let opts = LmOptions {
        max_iterations: config.max_iterations,
        tolerance: config.tolerance,
    };
    let solution = levenberg_marquardt(&problem, &start, &opts)?;

    if solution.params.iter().any(|v| !v.is_finite()) {
        return Err(FitFailure::InvalidParameters("non-finite parameters".to_string()));
    }
    let rss = solution.cost;
    if !rss.is_finite() {
        return Err(FitFailure::InvalidParameters("non-finite residuals".to_string()));
    }

    Ok(ModelFit {
        model,
        params: solution.params,
        rss,
        iterations: solution.iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xs() -> Vec<f64> {
        (1..=12).map(|i| i as f64 * 0.5).collect()
    }

    #[test]
    fn fits_each_model_on_its_own_exact_data() {
        let config = FitConfig::default();
        let truth = [
            (ModelKind::Linear, [2.0, 3.0]),
            (ModelKind::Exponential, [1.5, 0.4]),
            (ModelKind::Power, [2.5, 1.3]),
            (ModelKind::Logarithmic, [4.0, -1.0]),
        ];
        for (model, params) in truth {
            let x = xs();
            let y: Vec<f64> = x.iter().map(|&v| predict(model, v, &params)).collect();
            let fit = fit_model(model, &x, &y, &config).unwrap();
            assert!(
                (fit.params[0] - params[0]).abs() < 1e-6 && (fit.params[1] - params[1]).abs() < 1e-6,
                "{}: {:?}",
                model.name(),
                fit.params
            );
            assert!(fit.rss < 1e-10);
        }
    }

    #[test]
    fn too_few_points_is_underdetermined() {
        let err = fit_model(ModelKind::Linear, &[1.0], &[2.0], &FitConfig::default()).unwrap_err();
        assert_eq!(err, FitFailure::Underdetermined { n: 1, k: 2 });
    }

    #[test]
    fn non_convergence_is_reported_not_panicked() {
        let x = xs();
        let y: Vec<f64> = x.iter().map(|v| (3.0 * v).sin() * 10.0).collect();
        let config = FitConfig {
            max_iterations: 1,
            tolerance: 1e-300,
            ..FitConfig::default()
        };
        let err = fit_model(ModelKind::Exponential, &x, &y, &config).unwrap_err();
        assert_eq!(err, FitFailure::NonConvergence { iterations: 1 });
    }
}
