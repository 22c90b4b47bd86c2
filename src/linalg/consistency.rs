//! Covariance consistency checks.
//!
//! Long-running sessions can let the covariance drift away from symmetry or
//! positive semi-definiteness through floating-point error. These checks report
//! such drift; they never modify the matrix.

use nalgebra::DMatrix;
use super::ops::is_finite;
use crate::{Error, Result};

/// Relative tolerance used when no explicit tolerance is configured.
pub const DEFAULT_CONSISTENCY_TOLERANCE: f64 = 1e-9;

/// Largest absolute difference between mirrored entries, `max |p_ij - p_ji|`.
pub fn asymmetry(p: &DMatrix<f64>) -> f64 {
    let n = p.nrows().min(p.ncols());
    let mut worst = 0.0_f64;
    for i in 0..n {
        for j in (i + 1)..n {
            worst = worst.max((p[(i, j)] - p[(j, i)]).abs());
        }
    }
    worst
}

/// Symmetric part `(p + pᵗ) / 2`.
pub fn symmetrize(p: &DMatrix<f64>) -> DMatrix<f64> {
    (p + p.transpose()) * 0.5
}

/// Check that `p` is a valid covariance matrix.
///
/// `tolerance` is relative to the largest entry magnitude and applies both to
/// the asymmetry and to how far below zero the smallest eigenvalue may fall.
/// The zero matrix is consistent.
pub fn check_covariance(p: &DMatrix<f64>, tolerance: f64) -> Result<()> {
    if !p.is_square() {
        return Err(Error::InconsistentCovariance(format!(
            "covariance is {}x{}, expected a square matrix",
            p.nrows(),
            p.ncols()
        )));
    }
    if !is_finite(p) {
        return Err(Error::InconsistentCovariance(
            "covariance has non-finite entries".to_string(),
        ));
    }
    if p.is_empty() {
        return Ok(());
    }

    let scale = p.amax();
    if scale == 0.0 {
        return Ok(());
    }
    let bound = tolerance * scale;

    let skew = asymmetry(p);
    if skew > bound {
        return Err(Error::InconsistentCovariance(format!(
            "asymmetry {:e} exceeds tolerance {:e}",
            skew, bound
        )));
    }

    let smallest = symmetrize(p).symmetric_eigenvalues().min();
    if smallest < -bound {
        return Err(Error::InconsistentCovariance(format!(
            "smallest eigenvalue {:e} is negative beyond tolerance {:e}",
            smallest, bound
        )));
    }

    Ok(())
}
