//! Linear least squares solver.
//!
//! Two callers:
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2
//! ```
//!
//! - the damped Gauss–Newton step of Levenberg–Marquardt, posed as an
//!   augmented tall system
//! - straight-line fits used for initial guesses
//!
//! Implementation choices:
//! - SVD, so tall (more rows than columns) and rank-deficient systems are
//!   handled without panicking. Nalgebra's `QR::solve` is intended for square
//!   systems.
//! - The parameter dimension is tiny (2 columns), so SVD cost is negligible.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Ordinary least squares line `y = slope * x + intercept`.
///
/// Returns `None` with fewer than two points, non-finite input, or a constant `x`.
pub fn fit_line(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    let n = x.len();
    if n < 2 || y.len() != n {
        return None;
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return None;
    }
    if x.iter().all(|v| *v == x[0]) {
        return None;
    }

    let mut design = DMatrix::<f64>::zeros(n, 2);
    for (i, &xi) in x.iter().enumerate() {
        design[(i, 0)] = xi;
        design[(i, 1)] = 1.0;
    }
    let rhs = DVector::from_column_slice(y);
    let beta = solve_least_squares(&design, &rhs)?;
    Some((beta[0], beta[1]))
}
