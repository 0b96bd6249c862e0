//! Levenberg–Marquardt for small nonlinear least squares problems.
//!
//! Each iteration solves the damped Gauss–Newton step as a tall linear system
//!
//! ```text
//! [ J         ] δ ≈ [ r ]
//! [ sqrt(λ) D ]     [ 0 ]
//! ```
//!
//! with `D = diag(‖J_j‖)` (Marquardt scaling) through the shared SVD solver.
//! Accepted steps shrink `λ`, rejected ones grow it.
//!
//! Termination:
//! - converged: relative cost decrease `<= tolerance`, step norm
//!   `<= tolerance * (‖p‖ + tolerance)`, or zero cost
//! - `NonConvergence`: iteration cap or runaway damping
//! - `InvalidParameters`: non-finite parameters or predictions where a step
//!   cannot be retried

use nalgebra::{DMatrix, DVector};

use crate::error::FitFailure;
use crate::math::solve_least_squares;

const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MIN: f64 = 1e-12;
const LAMBDA_MAX: f64 = 1e16;
const LAMBDA_UP: f64 = 10.0;
const LAMBDA_DOWN: f64 = 10.0;

/// A least squares problem `min Σ r_i(p)^2`.
pub trait LeastSquaresProblem {
    fn n_params(&self) -> usize;
    fn n_observations(&self) -> usize;
    /// Residuals `y_i - f(x_i; p)`.
    fn residuals(&self, params: &[f64]) -> DVector<f64>;
    /// Jacobian of the model `∂f(x_i; p)/∂p_j` (n × k).
    fn jacobian(&self, params: &[f64]) -> DMatrix<f64>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LmOptions {
    pub max_iterations: usize,
    pub tolerance: f64,
}

/// A converged solution.
#[derive(Debug, Clone, PartialEq)]
pub struct LmSolution {
    pub params: Vec<f64>,
    /// Sum of squared residuals at `params`.
    pub cost: f64,
    pub iterations: usize,
}

pub fn levenberg_marquardt<P: LeastSquaresProblem>(
    problem: &P,
    initial: &[f64],
    opts: &LmOptions,
) -> Result<LmSolution, FitFailure> {
    let k = problem.n_params();
    let n = problem.n_observations();
    if n < k {
        return Err(FitFailure::Underdetermined { n, k });
    }
    if initial.len() != k || initial.iter().any(|v| !v.is_finite()) {
        return Err(FitFailure::InvalidParameters("initial guess".to_string()));
    }

    let mut p = DVector::from_column_slice(initial);
    let mut r = problem.residuals(p.as_slice());
    if r.iter().any(|v| !v.is_finite()) {
        return Err(FitFailure::InvalidParameters(
            "non-finite predictions at initial guess".to_string(),
        ));
    }
    let mut cost = r.norm_squared();
    let mut lambda = LAMBDA_INIT;

    for iteration in 1..=opts.max_iterations {
        if cost == 0.0 {
            return Ok(solution(&p, cost, iteration - 1));
        }

        let jac = problem.jacobian(p.as_slice());
        if jac.iter().any(|v| !v.is_finite()) {
            return Err(FitFailure::InvalidParameters("non-finite Jacobian".to_string()));
        }

        let Some(delta) = damped_step(&jac, &r, lambda) else {
            lambda *= LAMBDA_UP;
            if lambda > LAMBDA_MAX {
                return Err(FitFailure::SingularSystem);
            }
            continue;
        };

        let step_small = delta.norm() <= opts.tolerance * (p.norm() + opts.tolerance);
        let candidate = &p + &delta;
        let candidate_r = if candidate.iter().all(|v| v.is_finite()) {
            Some(problem.residuals(candidate.as_slice()))
        } else {
            None
        };

        match candidate_r {
            Some(new_r) if new_r.iter().all(|v| v.is_finite()) && new_r.norm_squared() < cost => {
                let new_cost = new_r.norm_squared();
                let relative_decrease = (cost - new_cost) / cost;
                p = candidate;
                r = new_r;
                cost = new_cost;
                lambda = (lambda / LAMBDA_DOWN).max(LAMBDA_MIN);
                if relative_decrease <= opts.tolerance || step_small || cost == 0.0 {
                    return Ok(solution(&p, cost, iteration));
                }
            }
            _ => {
                // No improvement from a negligible step: already at the minimum.
                if step_small {
                    return Ok(solution(&p, cost, iteration));
                }
                lambda *= LAMBDA_UP;
                if lambda > LAMBDA_MAX {
                    return Err(FitFailure::NonConvergence { iterations: iteration });
                }
            }
        }
    }

    Err(FitFailure::NonConvergence {
        iterations: opts.max_iterations,
    })
}

fn damped_step(jac: &DMatrix<f64>, r: &DVector<f64>, lambda: f64) -> Option<DVector<f64>> {
    let (n, k) = jac.shape();
    let mut a = DMatrix::<f64>::zeros(n + k, k);
    let mut b = DVector::<f64>::zeros(n + k);
    a.view_mut((0, 0), (n, k)).copy_from(jac);
    b.rows_mut(0, n).copy_from(r);

    let sqrt_lambda = lambda.sqrt();
    for j in 0..k {
        let scale = jac.column(j).norm().max(1e-12);
        a[(n + j, j)] = sqrt_lambda * scale;
    }
    solve_least_squares(&a, &b)
}

fn solution(p: &DVector<f64>, cost: f64, iterations: usize) -> LmSolution {
    LmSolution {
        params: p.iter().copied().collect(),
        cost,
        iterations,
    }
}
