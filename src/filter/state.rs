//! Mutable filter state: mean estimate and covariance.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::linalg::is_finite;
use crate::model::StateSpaceModel;
use crate::{Error, Result};

/// Mean estimate `x` (length n) and covariance estimate `P` (n x n).
///
/// Predict and correct overwrite the buffers in place; a state is never shared
/// between sessions.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterState {
    x: DVector<f64>,
    p: DMatrix<f64>,
}

impl FilterState {
    /// Create a state from an initial mean and optional covariance.
    ///
    /// The covariance defaults to the identity.
    pub fn new(x0: DVector<f64>, p0: Option<DMatrix<f64>>) -> Result<Self> {
        let n = x0.len();
        if n == 0 {
            return Err(Error::dimension("x0", "x0", "initial state must not be empty"));
        }
        let p = p0.unwrap_or_else(|| DMatrix::identity(n, n));
        if p.shape() != (n, n) {
            return Err(Error::dimension(
                "x0",
                "P0",
                format!("P0 must be {}x{}, got {}x{}", n, n, p.nrows(), p.ncols()),
            ));
        }
        if !is_finite(&x0) || !is_finite(&p) {
            return Err(Error::NonFiniteState(
                "initial state or covariance has non-finite entries".to_string(),
            ));
        }
        Ok(Self { x: x0, p })
    }

    /// Create a state and check it against the model's state dimension.
    pub fn for_model(
        model: &StateSpaceModel,
        x0: DVector<f64>,
        p0: Option<DMatrix<f64>>,
    ) -> Result<Self> {
        if x0.len() != model.dim_x() {
            return Err(Error::dimension(
                "F",
                "x0",
                format!("model has {} states, initial state has {}", model.dim_x(), x0.len()),
            ));
        }
        Self::new(x0, p0)
    }

    /// State dimension n.
    #[inline(always)]
    pub fn dim(&self) -> usize {
        self.x.len()
    }

    /// Mean estimate `x`.
    pub fn mean(&self) -> &DVector<f64> {
        &self.x
    }

    /// Covariance estimate `P`.
    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.p
    }

    /// Overwrite both buffers after a step has produced finite values.
    pub(crate) fn commit(&mut self, x: &DVector<f64>, p: &DMatrix<f64>) -> Result<()> {
        if !is_finite(x) || !is_finite(p) {
            return Err(Error::NonFiniteState(
                "step produced NaN or infinite values; state left unchanged".to_string(),
            ));
        }
        self.x.copy_from(x);
        self.p.copy_from(p);
        Ok(())
    }

    /// Owned copy of the current mean and covariance.
    pub fn snapshot(&self) -> Estimate {
        Estimate {
            state: self.x.clone(),
            covariance: self.p.clone(),
        }
    }
}

/// Read-only snapshot of a filter's estimate.
///
/// Detached from the filter: mutating it has no effect on the live state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    /// Mean estimate `x`
    pub state: DVector<f64>,
    /// Covariance estimate `P`
    pub covariance: DMatrix<f64>,
}

impl Estimate {
    /// Mean estimate as an ordered slice.
    pub fn state_slice(&self) -> &[f64] {
        self.state.as_slice()
    }

    /// Diagonal of the covariance (per-component variances).
    pub fn variances(&self) -> DVector<f64> {
        self.covariance.diagonal()
    }

    pub fn into_parts(self) -> (DVector<f64>, DMatrix<f64>) {
        (self.state, self.covariance)
    }
}
