//! Linear solver backend for the reduced Newton system.
//!
//! The driver only needs `K δu = b` on a dense matrix. The trait keeps the
//! factorization swappable; [`DenseLu`] is the default.

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct BackendError(pub String);

/// Solver diagnostics
#[derive(Debug, Clone)]
pub struct SolveInfo {
    /// 1 for direct solvers
    pub iterations: usize,
    pub solver_name: String,
}

/// Trait for a linear solver backend.
pub trait LinearSolver: Send + Sync {
    /// Solve `k * x = rhs`.
    fn solve_linear(
        &self,
        k: &DMatrix<f64>,
        rhs: &DVector<f64>,
    ) -> Result<(DVector<f64>, SolveInfo), BackendError>;

    fn name(&self) -> &str;
}

/// Dense LU decomposition with partial pivoting (nalgebra).
///
/// A factorization whose smallest pivot is below `n ε` times the largest
/// counts as singular.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenseLu;

impl LinearSolver for DenseLu {
    fn solve_linear(
        &self,
        k: &DMatrix<f64>,
        rhs: &DVector<f64>,
    ) -> Result<(DVector<f64>, SolveInfo), BackendError> {
        let n = k.nrows();
        if k.ncols() != n || rhs.len() != n {
            return Err(BackendError(format!(
                "dimension mismatch: {}x{} matrix, {} right-hand side entries",
                n,
                k.ncols(),
                rhs.len()
            )));
        }

        let info = SolveInfo {
            iterations: 1,
            solver_name: self.name().to_string(),
        };
        if n == 0 {
            return Ok((DVector::zeros(0), info));
        }

        let lu = k.clone().lu();
        let pivots = lu.u().diagonal();
        let largest = pivots.amax();
        let ratio = if largest > 0.0 { pivots.amin() / largest } else { 0.0 };
        if ratio.is_nan() || ratio < n as f64 * f64::EPSILON {
            return Err(BackendError(format!(
                "singular matrix in LU decomposition (pivot ratio {ratio:.3e})"
            )));
        }

        let x = lu
            .solve(rhs)
            .ok_or_else(|| BackendError("singular matrix in LU decomposition".into()))?;
        if x.iter().any(|v| !v.is_finite()) {
            return Err(BackendError(
                "LU solution is not finite (matrix numerically singular)".into(),
            ));
        }

        Ok((x, info))
    }

    fn name(&self) -> &str {
        "nalgebra-LU"
    }
}
