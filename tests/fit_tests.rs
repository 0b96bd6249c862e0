//! Tests for multi-model fitting, model selection and outlier detection.
//!
//! ## Test Organization
//!
//! 1. **Guards** - Insufficient data, missing values
//! 2. **Selection** - Each model family recovers its own data
//! 3. **Outliers** - Residual threshold behaviour
//! 4. **Configuration** - Log flags, iteration caps, failed candidates

use approx::assert_relative_eq;

use exo_curves::domain::{FitConfig, ModelKind};
use exo_curves::error::FitFailure;
use exo_curves::fit::{fit, fit_model, fit_with_ids};
use exo_curves::math::population_std;

fn grid(n: usize) -> Vec<f64> {
    (1..=n).map(|i| i as f64).collect()
}

/// Deterministic small wiggle (std ~0.07).
fn wiggle(i: usize) -> f64 {
    0.1 * (1.7 * i as f64).sin()
}

// ============================================================================
// Guard Tests
// ============================================================================

#[test]
fn test_fewer_than_min_points_is_none() {
    let x = grid(4);
    let y: Vec<f64> = x.iter().map(|v| 2.0 * v + 3.0).collect();
    assert!(fit(&x, &y, &FitConfig::default()).is_none());
}

#[test]
fn test_missing_values_do_not_count_as_points() {
    let x = vec![1.0, 2.0, f64::NAN, 4.0, 5.0, 6.0];
    let y = vec![5.0, 7.0, 9.0, f64::INFINITY, 13.0, 15.0];
    assert!(fit(&x, &y, &FitConfig::default()).is_none());

    let relaxed = FitConfig {
        min_points: 4,
        ..FitConfig::default()
    };
    let result = fit(&x, &y, &relaxed).unwrap();
    assert_eq!(result.n, 4);
}

// ============================================================================
// Selection Tests
// ============================================================================

#[test]
fn test_exact_line_selects_linear() {
    let x = grid(10);
    let y: Vec<f64> = x.iter().map(|v| 2.0 * v + 3.0).collect();
    let result = fit(&x, &y, &FitConfig::default()).unwrap();

    assert_eq!(result.best_model, ModelKind::Linear);
    assert_relative_eq!(result.best_params[0], 2.0, epsilon = 1e-6);
    assert_relative_eq!(result.best_params[1], 3.0, epsilon = 1e-6);
    assert!(result.outliers.is_empty());
    assert_eq!(result.evaluations.len(), ModelKind::ALL.len());
    for e in result.evaluations.iter().filter(|e| e.converged) {
        assert!(result.best_aic <= e.aic, "{} beats the line", e.model.name());
    }
    assert_relative_eq!(result.best_r2, 1.0, epsilon = 1e-9);
}

#[test]
fn test_exponential_data_selects_exponential() {
    let x: Vec<f64> = (0..12).map(|i| i as f64 * 0.5).collect();
    let y: Vec<f64> = x.iter().map(|v| 1.5 * (0.4 * v).exp()).collect();
    let result = fit(&x, &y, &FitConfig::default()).unwrap();
    assert_eq!(result.best_model, ModelKind::Exponential);
    assert_relative_eq!(result.best_params[1], 0.4, epsilon = 1e-6);
}

#[test]
fn test_power_data_selects_power() {
    let x = grid(12);
    let y: Vec<f64> = x.iter().map(|v| 3.0 * v.powf(1.5)).collect();
    let result = fit(&x, &y, &FitConfig::default()).unwrap();
    assert_eq!(result.best_model, ModelKind::Power);
    assert_relative_eq!(result.best_params[0], 3.0, epsilon = 1e-6);
    assert_relative_eq!(result.best_params[1], 1.5, epsilon = 1e-6);
}

#[test]
fn test_logarithmic_data_selects_logarithmic() {
    let x = grid(15);
    let y: Vec<f64> = x.iter().map(|v| 4.0 * v.ln() - 1.0).collect();
    let result = fit(&x, &y, &FitConfig::default()).unwrap();
    assert_eq!(result.best_model, ModelKind::Logarithmic);
}

// ============================================================================
// Outlier Tests
// ============================================================================

#[test]
fn test_single_large_perturbation_is_the_only_outlier() {
    let x = grid(30);
    let mut y: Vec<f64> = x.iter().enumerate().map(|(i, v)| 2.0 * v + 3.0 + wiggle(i)).collect();
    y[12] += 2.0;
    let ids: Vec<String> = (0..30).map(|i| format!("planet-{i}")).collect();

    let result = fit_with_ids(&x, &y, Some(ids.as_slice()), &FitConfig::default()).unwrap();
    assert_eq!(result.best_model, ModelKind::Linear);
    assert_eq!(result.outliers.len(), 1);

    let outlier = &result.outliers[0];
    assert_eq!(outlier.index, 12);
    assert_eq!(outlier.id.as_deref(), Some("planet-12"));
    assert_relative_eq!(outlier.y - outlier.y_fit, outlier.residual, epsilon = 1e-12);
    assert!(outlier.residual.abs() > result.outlier_threshold);
    assert_relative_eq!(result.outlier_threshold, 2.0 * result.residual_std);
}

#[test]
fn test_outlier_indices_refer_to_original_rows() {
    let mut x = grid(30);
    let mut y: Vec<f64> = x.iter().enumerate().map(|(i, v)| 2.0 * v + 3.0 + wiggle(i)).collect();
    x[3] = f64::NAN;
    y[20] += 2.0;
    let result = fit(&x, &y, &FitConfig::default()).unwrap();
    assert_eq!(result.n, 29);
    assert_eq!(result.outliers.len(), 1);
    assert_eq!(result.outliers[0].index, 20);
}

#[test]
fn test_higher_threshold_flags_fewer_points() {
    let x = grid(30);
    let mut y: Vec<f64> = x.iter().enumerate().map(|(i, v)| 2.0 * v + 3.0 + wiggle(i)).collect();
    y[12] += 2.0;
    let strict = fit(&x, &y, &FitConfig::default()).unwrap();
    let loose = fit(
        &x,
        &y,
        &FitConfig {
            std_threshold: 10.0,
            ..FitConfig::default()
        },
    )
    .unwrap();
    assert!(loose.outliers.len() <= strict.outliers.len());
    assert!(loose.outliers.is_empty());
}

#[test]
fn test_ten_sigma_perturbation_is_flagged() {
    let x = grid(30);
    let noise: Vec<f64> = (0..30).map(wiggle).collect();
    let sigma = population_std(&noise);
    let mut y: Vec<f64> = x.iter().zip(&noise).map(|(v, e)| 2.0 * v + 3.0 + e).collect();
    y[12] += 10.0 * sigma;

    let result = fit(&x, &y, &FitConfig::default()).unwrap();
    assert_eq!(result.std_threshold, 2.0);
    assert_eq!(result.best_model, ModelKind::Linear);
    let rows: Vec<usize> = result.outliers.iter().map(|o| o.index).collect();
    assert_eq!(rows, vec![12]);
}

#[test]
fn test_outliers_survive_tiny_data_scale() {
    let x = grid(30);
    let mut y: Vec<f64> = x.iter().enumerate().map(|(i, v)| 2.0 * v + 3.0 + wiggle(i)).collect();
    y[12] += 2.0;
    let tiny: Vec<f64> = y.iter().map(|v| v * 1e-10).collect();

    let unit = fit(&x, &y, &FitConfig::default()).unwrap();
    let scaled = fit(&x, &tiny, &FitConfig::default()).unwrap();
    assert_eq!(scaled.best_model, unit.best_model);
    assert_relative_eq!(scaled.residual_std, unit.residual_std * 1e-10, max_relative = 1e-6);

    let rows: Vec<usize> = scaled.outliers.iter().map(|o| o.index).collect();
    assert_eq!(rows, vec![12]);
    assert_eq!(rows, unit.outliers.iter().map(|o| o.index).collect::<Vec<_>>());
}

// ============================================================================
// Configuration Tests
// ============================================================================

#[test]
fn test_log_flags_do_not_change_the_fit() {
    let x = grid(20);
    let y: Vec<f64> = x.iter().enumerate().map(|(i, v)| 3.0 * v.powf(1.2) + wiggle(i)).collect();
    let plain = fit(&x, &y, &FitConfig::default()).unwrap();
    let logged = fit(
        &x,
        &y,
        &FitConfig {
            log_x: true,
            log_y: true,
            ..FitConfig::default()
        },
    )
    .unwrap();

    assert!(logged.log_x && logged.log_y);
    assert_eq!(plain.best_model, logged.best_model);
    assert_eq!(plain.best_params, logged.best_params);
    assert_eq!(plain.outliers, logged.outliers);
    for (a, b) in plain.evaluations.iter().zip(&logged.evaluations) {
        assert_eq!(a.model, b.model);
        assert_eq!(a.converged, b.converged);
        assert_eq!(a.params, b.params);
        assert_eq!(a.rss.to_bits(), b.rss.to_bits());
    }
}

#[test]
fn test_iteration_cap_is_reported_as_non_convergence() {
    let x = grid(12);
    let y: Vec<f64> = x.iter().map(|v| 10.0 * (3.0 * v).sin()).collect();
    let config = FitConfig {
        max_iterations: 1,
        tolerance: 1e-300,
        ..FitConfig::default()
    };

    let err = fit_model(ModelKind::Exponential, &x, &y, &config).unwrap_err();
    assert_eq!(err, FitFailure::NonConvergence { iterations: 1 });
    assert!(err.to_string().contains('1'));
}

#[test]
fn test_no_converged_model_is_none() {
    let x = grid(12);
    let y: Vec<f64> = x.iter().map(|v| 10.0 * (3.0 * v).sin()).collect();
    let config = FitConfig {
        max_iterations: 1,
        tolerance: 1e-300,
        ..FitConfig::default()
    };
    assert!(fit(&x, &y, &config).is_none());
    assert!(fit(&x, &y, &FitConfig::default()).is_some());
}

#[test]
fn test_failed_candidates_are_listed_beside_the_winner() {
    // One iteration is enough only for models linear in their parameters,
    // whose initial guess is already the least squares solution.
    let x = grid(12);
    let y: Vec<f64> = x.iter().map(|v| 10.0 * (3.0 * v).sin()).collect();
    let config = FitConfig {
        max_iterations: 1,
        ..FitConfig::default()
    };
    let result = fit(&x, &y, &config).unwrap();
    assert_eq!(result.evaluations.len(), ModelKind::ALL.len());

    let failure = FitFailure::NonConvergence { iterations: 1 }.to_string();
    for e in &result.evaluations {
        match e.model {
            ModelKind::Linear | ModelKind::Logarithmic => {
                assert!(e.converged, "{} should converge", e.model.name());
                assert!(e.failure.is_none());
            }
            ModelKind::Exponential | ModelKind::Power => {
                assert!(!e.converged, "{} should hit the cap", e.model.name());
                assert_eq!(e.failure.as_deref(), Some(failure.as_str()));
                assert!(e.params.is_empty());
                assert!(e.rss.is_nan());
                assert_eq!(e.aic, f64::INFINITY);
            }
        }
    }
    assert!(matches!(result.best_model, ModelKind::Linear | ModelKind::Logarithmic));
}
