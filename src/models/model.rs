//! Model evaluation for the linear / exponential / power / logarithmic catalog.
//!
//! The fitter relies on three primitive operations:
//! - predict `y(x)` given parameters (for residuals and curves)
//! - fill a Jacobian row `∂y/∂p` at `x` (for Levenberg–Marquardt)
//! - a deterministic initial guess derived from the data
//!
//! These are implemented here for each model kind. The initial guesses are
//! data-dependent rather than fixed per model: a fixed start such as
//! `(1, 0)` stalls the exponential fit when `y` spans several decades.

use crate::domain::ModelKind;
use crate::math::fit_line;

/// Floor applied to `x` inside the logarithmic model.
pub const LOG_FLOOR: f64 = 1e-12;

/// Predict `y(x)` for the given model kind.
pub fn predict(model: ModelKind, x: f64, params: &[f64]) -> f64 {
    let (p0, p1) = (params[0], params[1]);
    match model {
        ModelKind::Linear => p0 * x + p1,
        ModelKind::Exponential => p0 * (p1 * x).exp(),
        ModelKind::Power => p0 * x.powf(p1),
        ModelKind::Logarithmic => p0 * x.max(LOG_FLOOR).ln() + p1,
    }
}

/// Fill `out` with the partial derivatives of `y(x)` w.r.t. each parameter.
///
/// # Panics
/// Panics if `out` or `params` is shorter than `model.param_count()`.
pub fn fill_jacobian_row(model: ModelKind, x: f64, params: &[f64], out: &mut [f64]) {
    let (p0, p1) = (params[0], params[1]);
    match model {
        ModelKind::Linear => {
            out[0] = x;
            out[1] = 1.0;
        }
        ModelKind::Exponential => {
            let e = (p1 * x).exp();
            out[0] = e;
            out[1] = p0 * x * e;
        }
        ModelKind::Power => {
            let g = x.powf(p1);
            out[0] = g;
            // x^b ln x -> 0 as x -> 0+.
            out[1] = if x > 0.0 { p0 * g * x.ln() } else { 0.0 };
        }
        ModelKind::Logarithmic => {
            out[0] = x.max(LOG_FLOOR).ln();
            out[1] = 1.0;
        }
    }
}

/// Deterministic starting point for the iterative fit.
///
/// Linearised least squares where the model admits it:
/// - exponential: `ln y = ln a + b x` (needs every `y > 0`)
/// - power: `ln y = ln a + b ln x` (needs every `x, y > 0`)
///
/// Falls back to neutral parameters otherwise.
pub fn initial_guess(model: ModelKind, x: &[f64], y: &[f64]) -> Vec<f64> {
    match model {
        ModelKind::Linear => match fit_line(x, y) {
            Some((m, c)) => vec![m, c],
            None => vec![1.0, 0.0],
        },
        ModelKind::Exponential => {
            if y.iter().all(|v| *v > 0.0) {
                let ln_y: Vec<f64> = y.iter().map(|v| v.ln()).collect();
                if let Some((b, ln_a)) = fit_line(x, &ln_y) {
                    return vec![ln_a.exp(), b];
                }
            }
            vec![1.0, 0.0]
        }
        ModelKind::Power => {
            if x.iter().all(|v| *v > 0.0) && y.iter().all(|v| *v > 0.0) {
                let ln_x: Vec<f64> = x.iter().map(|v| v.ln()).collect();
                let ln_y: Vec<f64> = y.iter().map(|v| v.ln()).collect();
                if let Some((b, ln_a)) = fit_line(&ln_x, &ln_y) {
                    return vec![ln_a.exp(), b];
                }
            }
            vec![1.0, 1.0]
        }
        ModelKind::Logarithmic => {
            let ln_x: Vec<f64> = x.iter().map(|v| v.max(LOG_FLOOR).ln()).collect();
            match fit_line(&ln_x, y) {
                Some((a, b)) => vec![a, b],
                None => vec![1.0, 0.0],
            }
        }
    }
}

/// Evaluate the model on a grid of `x` values.
pub fn predict_grid(model: ModelKind, xs: &[f64], params: &[f64]) -> Vec<f64> {
    xs.iter().map(|&x| predict(model, x, params)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_each_model() {
        assert_eq!(predict(ModelKind::Linear, 2.0, &[2.0, 3.0]), 7.0);
        assert!((predict(ModelKind::Exponential, 1.0, &[2.0, 1.0]) - 2.0 * std::f64::consts::E).abs() < 1e-12);
        assert_eq!(predict(ModelKind::Power, 4.0, &[3.0, 0.5]), 6.0);
        assert_eq!(predict(ModelKind::Logarithmic, 1.0, &[5.0, 1.5]), 1.5);
    }

    #[test]
    fn logarithmic_model_floors_non_positive_x() {
        let y = predict(ModelKind::Logarithmic, 0.0, &[1.0, 0.0]);
        assert!((y - LOG_FLOOR.ln()).abs() < 1e-9);
        assert!(y.is_finite());
    }

    #[test]
    fn jacobian_matches_finite_differences() {
        let h = 1e-7;
        for model in ModelKind::ALL {
            let params = [1.3, 0.7];
            let x = 1.9;
            let mut row = [0.0; 2];
            fill_jacobian_row(model, x, &params, &mut row);
            for j in 0..2 {
                let mut up = params;
                let mut dn = params;
                up[j] += h;
                dn[j] -= h;
                let numeric = (predict(model, x, &up) - predict(model, x, &dn)) / (2.0 * h);
                assert!(
                    (numeric - row[j]).abs() < 1e-6 * (1.0 + numeric.abs()),
                    "{} param {j}: analytic={} numeric={numeric}",
                    model.name(),
                    row[j]
                );
            }
        }
    }

    #[test]
    fn initial_guess_recovers_exact_exponential_and_power() {
        let x: Vec<f64> = (1..=6).map(|i| i as f64).collect();
        let y_exp: Vec<f64> = x.iter().map(|v| 2.0 * (0.3 * v).exp()).collect();
        let g = initial_guess(ModelKind::Exponential, &x, &y_exp);
        assert!((g[0] - 2.0).abs() < 1e-9 && (g[1] - 0.3).abs() < 1e-9);

        let y_pow: Vec<f64> = x.iter().map(|v| 1.5 * v.powf(1.7)).collect();
        let g = initial_guess(ModelKind::Power, &x, &y_pow);
        assert!((g[0] - 1.5).abs() < 1e-9 && (g[1] - 1.7).abs() < 1e-9);
    }

    #[test]
    fn initial_guess_falls_back_on_non_positive_data() {
        let x = [-1.0, 0.0, 1.0, 2.0];
        let y = [-3.0, 1.0, 2.0, 4.0];
        assert_eq!(initial_guess(ModelKind::Exponential, &x, &y), vec![1.0, 0.0]);
        assert_eq!(initial_guess(ModelKind::Power, &x, &y), vec![1.0, 1.0]);
    }
}
