//! Shape-checked matrix and vector operations.

use nalgebra::{DMatrix, DVector};
use crate::{Error, Result};

/// Reciprocal condition number below which a matrix is treated as singular.
pub const SINGULARITY_TOLERANCE: f64 = 1e-12;

fn shape(m: &DMatrix<f64>) -> String {
    format!("{}x{}", m.nrows(), m.ncols())
}

/// True if every value is finite (no NaN or infinity).
pub fn is_finite<'a>(values: impl IntoIterator<Item = &'a f64>) -> bool {
    values.into_iter().all(|v| v.is_finite())
}

/// Matrix product `a · b`.
///
/// Fails with `DimensionMismatch` unless `a.ncols() == b.nrows()`.
pub fn multiply(a: &DMatrix<f64>, b: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    if a.ncols() != b.nrows() {
        return Err(Error::dimension(
            format!("lhs ({})", shape(a)),
            format!("rhs ({})", shape(b)),
            format!("inner dimensions {} and {} differ", a.ncols(), b.nrows()),
        ));
    }
    Ok(a * b)
}

/// Matrix-vector product `a · v`.
pub fn apply(a: &DMatrix<f64>, v: &DVector<f64>) -> Result<DVector<f64>> {
    if a.ncols() != v.len() {
        return Err(Error::dimension(
            format!("matrix ({})", shape(a)),
            format!("vector (length {})", v.len()),
            format!("matrix has {} columns", a.ncols()),
        ));
    }
    Ok(a * v)
}

/// Transpose `aᵗ`.
pub fn transpose(a: &DMatrix<f64>) -> DMatrix<f64> {
    a.transpose()
}

fn check_same_shape(a: &DMatrix<f64>, b: &DMatrix<f64>) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(Error::dimension(
            format!("lhs ({})", shape(a)),
            format!("rhs ({})", shape(b)),
            "element-wise operation requires equal shapes",
        ));
    }
    Ok(())
}

/// Element-wise sum `a + b`.
pub fn add(a: &DMatrix<f64>, b: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    check_same_shape(a, b)?;
    Ok(a + b)
}

/// Element-wise difference `a - b`.
pub fn subtract(a: &DMatrix<f64>, b: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    check_same_shape(a, b)?;
    Ok(a - b)
}

fn check_same_length(a: &DVector<f64>, b: &DVector<f64>) -> Result<()> {
    if a.len() != b.len() {
        return Err(Error::dimension(
            format!("lhs (length {})", a.len()),
            format!("rhs (length {})", b.len()),
            "vector lengths differ",
        ));
    }
    Ok(())
}

/// Vector sum `a + b`.
pub fn add_vectors(a: &DVector<f64>, b: &DVector<f64>) -> Result<DVector<f64>> {
    check_same_length(a, b)?;
    Ok(a + b)
}

/// Vector difference `a - b`.
pub fn subtract_vectors(a: &DVector<f64>, b: &DVector<f64>) -> Result<DVector<f64>> {
    check_same_length(a, b)?;
    Ok(a - b)
}

/// Ratio of the smallest to the largest singular value.
///
/// Returns 0.0 for the zero matrix or when the singular values are not finite.
pub fn reciprocal_condition(a: &DMatrix<f64>) -> f64 {
    if a.is_empty() {
        return 0.0;
    }
    let singular_values = a.singular_values();
    let largest = singular_values.max();
    let smallest = singular_values.min();
    if !largest.is_finite() || !smallest.is_finite() || largest <= 0.0 {
        return 0.0;
    }
    smallest / largest
}

/// Inverse `a⁻¹` of a square, well-conditioned matrix.
///
/// Fails with `DimensionMismatch` if `a` is not square (or empty) and with
/// `SingularMatrix` if its reciprocal condition number is below
/// [`SINGULARITY_TOLERANCE`], the LU factorization breaks down, or the
/// inverse contains non-finite values.
pub fn invert(a: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    if !a.is_square() || a.is_empty() {
        return Err(Error::dimension(
            format!("matrix ({})", shape(a)),
            format!("matrix ({})", shape(a)),
            "inversion requires a non-empty square matrix",
        ));
    }
    if !is_finite(a) {
        return Err(Error::SingularMatrix(format!(
            "{} matrix has non-finite entries",
            shape(a)
        )));
    }

    let rcond = reciprocal_condition(a);
    if rcond < SINGULARITY_TOLERANCE {
        return Err(Error::SingularMatrix(format!(
            "{} matrix has reciprocal condition number {:e} (tolerance {:e})",
            shape(a),
            rcond,
            SINGULARITY_TOLERANCE
        )));
    }

    let inverse = a.clone().try_inverse().ok_or_else(|| {
        Error::SingularMatrix(format!("LU factorization of {} matrix failed", shape(a)))
    })?;

    if !is_finite(&inverse) {
        return Err(Error::SingularMatrix(format!(
            "inverse of {} matrix is not finite",
            shape(a)
        )));
    }
    Ok(inverse)
}
