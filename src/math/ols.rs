//! Least squares solver.
//!
//! The regression engine solves a tiny problem:
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2,   x_i = [1, log_ddh_i]
//! ```
//!
//! Implementation choices:
//! - SVD handles the tall (n × 2) design matrix directly; nalgebra's `QR::solve`
//!   only accepts square systems.
//! - Rank deficiency (relative to the largest singular value) is refused rather
//!   than truncated; the caller reports a constant regressor before solving.

use nalgebra::{DMatrix, DVector};

/// Build the `[1, x]` design matrix for a straight-line fit with intercept.
pub fn intercept_design(x: &[f64]) -> DMatrix<f64> {
    DMatrix::from_fn(x.len(), 2, |i, j| if j == 0 { 1.0 } else { x[i] })
}

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the design is rank deficient, the solve fails, or it
/// produces non-finite coefficients.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    if x.nrows() != y.len() || x.nrows() < x.ncols() {
        return None;
    }

    let svd = x.clone().svd(true, true);

    // Singular values below this are rounding noise relative to the largest one.
    let sigma_max = svd.singular_values.max();
    let tol = f64::EPSILON * sigma_max * x.nrows().max(x.ncols()) as f64;
    if svd.singular_values.min() <= tol {
        return None;
    }
    let beta = svd.solve(y, tol).ok()?;

    if beta.iter().all(|v| v.is_finite()) {
        Some(beta)
    } else {
        None
    }
}
