//! Measurement update.

use log::{debug, trace};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::state::FilterState;
use crate::linalg::{add, add_vectors, apply, invert, multiply, subtract, subtract_vectors, transpose};
use crate::model::StateSpaceModel;
use crate::{Error, Result};

/// Covariance update used by the corrector.
///
/// Both forms agree in exact arithmetic. The simple form is cheaper; the
/// Joseph form keeps `P` symmetric and positive semi-definite under rounding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CovarianceUpdate {
    /// `P ← P − K·H·P`
    #[default]
    Simple,
    /// `P ← (I − K·H)·P·(I − K·H)ᵗ + K·R·Kᵗ`
    Joseph,
}

/// Measurement noise in effect: the override if given, else the model's R.
pub(crate) fn effective_noise<'a>(
    model: &'a StateSpaceModel,
    measurement_noise: Option<&'a DMatrix<f64>>,
) -> Result<&'a DMatrix<f64>> {
    let r = measurement_noise
        .or_else(|| model.measurement_noise())
        .ok_or_else(|| {
            Error::ConfigurationError(
                "no measurement noise covariance R in the model or set on the filter".to_string(),
            )
        })?;
    let k = model.dim_z();
    if r.shape() != (k, k) {
        return Err(Error::dimension(
            "H",
            "R",
            format!("R must be {}x{}, got {}x{}", k, k, r.nrows(), r.ncols()),
        ));
    }
    Ok(r)
}

/// Fuse a measurement into the state.
///
/// ```text
/// y ← z − H·x
/// Σ ← H·P·Hᵗ + R
/// K ← P·Hᵗ·Σ⁻¹
/// x ← x + K·y
/// P ← per `strategy`
/// ```
///
/// # Arguments
/// * `state` - Filter state, updated in place on success
/// * `model` - State-space model
/// * `measurement` - Measurement vector (length k)
/// * `measurement_noise` - Optional R overriding the model's R
/// * `strategy` - Covariance update form
///
/// # Returns
/// The innovation `y`. On error the state is left untouched.
pub fn correct(
    state: &mut FilterState,
    model: &StateSpaceModel,
    measurement: &DVector<f64>,
    measurement_noise: Option<&DMatrix<f64>>,
    strategy: CovarianceUpdate,
) -> Result<DVector<f64>> {
    if measurement.len() != model.dim_z() {
        return Err(Error::dimension(
            "H",
            "measurement",
            format!(
                "expected measurement of length {}, got {}",
                model.dim_z(),
                measurement.len()
            ),
        ));
    }
    if state.dim() != model.dim_x() {
        return Err(Error::dimension(
            "H",
            "x",
            format!("model has {} states, filter state has {}", model.dim_x(), state.dim()),
        ));
    }
    let r = effective_noise(model, measurement_noise)?;

    let h = model.observation();
    let p = state.covariance();
    let h_t = transpose(h);

    // y = z - H @ x (innovation)
    let innovation = subtract_vectors(measurement, &apply(h, state.mean())?)?;

    // Sigma = H @ P @ H.T + R (innovation covariance)
    let p_ht = multiply(p, &h_t)?;
    let sigma = add(&multiply(h, &p_ht)?, r)?;
    let sigma_inv = invert(&sigma).map_err(|e| match e {
        Error::SingularMatrix(msg) => {
            Error::SingularMatrix(format!("innovation covariance: {}", msg))
        }
        other => other,
    })?;

    // K = P @ H.T @ Sigma^-1 (Kalman gain)
    let gain = multiply(&p_ht, &sigma_inv)?;

    let x = add_vectors(state.mean(), &apply(&gain, &innovation)?)?;

    let kh = multiply(&gain, h)?;
    let p_new = match strategy {
        CovarianceUpdate::Simple => subtract(p, &multiply(&kh, p)?)?,
        CovarianceUpdate::Joseph => {
            let n = state.dim();
            let i_kh = subtract(&DMatrix::identity(n, n), &kh)?;
            let propagated = multiply(&multiply(&i_kh, p)?, &transpose(&i_kh))?;
            let injected = multiply(&multiply(&gain, r)?, &transpose(&gain))?;
            add(&propagated, &injected)?
        }
    };

    state.commit(&x, &p_new)?;

    debug!(
        "correct: |innovation| = {:.6}, strategy = {:?}",
        innovation.norm(),
        strategy
    );
    trace!("corrected x = {:?}", state.mean().as_slice());
    Ok(innovation)
}
