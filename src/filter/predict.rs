//! Time update.

use log::{debug, trace};
use nalgebra::{DMatrix, DVector};

use super::correct::effective_noise;
use super::state::FilterState;
use crate::linalg::{add, add_vectors, apply, invert, multiply, transpose};
use crate::model::StateSpaceModel;
use crate::{Error, Result};

/// Advance the state one step in time.
///
/// ```text
/// x ← F·x [+ G·u] [+ S·R⁻¹·z]
/// P ← F·P·Fᵗ + Q
/// ```
///
/// # Arguments
/// * `state` - Filter state, updated in place on success
/// * `model` - State-space model
/// * `control` - Control vector (length m); required iff the model has G
/// * `correlated_measurement` - Measurement (length k) for the correlated-noise
///   term; only accepted when the model has S
/// * `measurement_noise` - Optional R overriding the model's R
///
/// # Errors
/// * `ConfigurationError` - a control vector without G, G without a control
///   vector, or a correlated measurement for a model without S. These are
///   treated like the control rule: the input does not fit the model's
///   configuration, whatever its length.
/// * `DimensionMismatch` - a control or correlated measurement of the wrong length
/// * `SingularMatrix` - R is not invertible when the correlated term is used
/// * `NonFiniteState` - the step produced NaN or infinite values
///
/// On error the state is left untouched.
pub fn predict(
    state: &mut FilterState,
    model: &StateSpaceModel,
    control: Option<&DVector<f64>>,
    correlated_measurement: Option<&DVector<f64>>,
    measurement_noise: Option<&DMatrix<f64>>,
) -> Result<()> {
    if state.dim() != model.dim_x() {
        return Err(Error::dimension(
            "F",
            "x",
            format!("model has {} states, filter state has {}", model.dim_x(), state.dim()),
        ));
    }

    let control = match (model.control(), control) {
        (Some(g), Some(u)) => {
            if u.len() != g.ncols() {
                return Err(Error::dimension(
                    "G",
                    "control",
                    format!("expected control of length {}, got {}", g.ncols(), u.len()),
                ));
            }
            Some((g, u))
        }
        (None, Some(_)) => {
            return Err(Error::ConfigurationError(
                "control vector supplied but the model has no control matrix G".to_string(),
            ))
        }
        (Some(_), None) => {
            return Err(Error::ConfigurationError(
                "the model has a control matrix G but no control vector was supplied".to_string(),
            ))
        }
        (None, None) => None,
    };

    let correlated = match (model.cross_covariance(), correlated_measurement) {
        (Some(s), Some(z)) => {
            if z.len() != model.dim_z() {
                return Err(Error::dimension(
                    "S",
                    "measurement",
                    format!("expected measurement of length {}, got {}", model.dim_z(), z.len()),
                ));
            }
            Some((s, z))
        }
        (None, Some(_)) => {
            return Err(Error::ConfigurationError(
                "correlated measurement supplied but the model has no cross-covariance S"
                    .to_string(),
            ))
        }
        (_, None) => None,
    };

    let f = model.transition();
    let mut x = apply(f, state.mean())?;

    if let Some((g, u)) = control {
        x = add_vectors(&x, &apply(g, u)?)?;
    }

    if let Some((s, z)) = correlated {
        let r = effective_noise(model, measurement_noise)?;
        let r_inv = invert(r).map_err(|e| match e {
            Error::SingularMatrix(msg) => {
                Error::SingularMatrix(format!("measurement noise covariance R: {}", msg))
            }
            other => other,
        })?;
        x = add_vectors(&x, &apply(&multiply(s, &r_inv)?, z)?)?;
    }

    let fp = multiply(f, state.covariance())?;
    let p = add(&multiply(&fp, &transpose(f))?, model.process_noise())?;

    state.commit(&x, &p)?;

    debug!(
        "predict: control={}, correlated={}",
        control.is_some(),
        correlated.is_some()
    );
    trace!("predicted x = {:?}", state.mean().as_slice());
    Ok(())
}
