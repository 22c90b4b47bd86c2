//! Ready-made kinematic models for vehicle telemetry.
//!
//! The constant-velocity family treats acceleration (e.g. from an IMU, rotated
//! into the world frame) as the control input and position/velocity fixes
//! (e.g. from a GNSS receiver) as measurements.
//!
//! The presets return a [`StateSpaceModelBuilder`] so the caller can add a
//! measurement noise covariance, or leave it out and set it per cycle from the
//! sensor's own accuracy report with [`noise_from_accuracy`].

use nalgebra::{DMatrix, DVector};

use crate::model::{StateSpaceModel, StateSpaceModelBuilder};
use crate::{Error, Result};

fn kinematic_blocks(axes: usize, dt: f64) -> Result<(DMatrix<f64>, DMatrix<f64>)> {
    if axes == 0 {
        return Err(Error::ConfigurationError(
            "kinematic model needs at least one axis".to_string(),
        ));
    }
    if !dt.is_finite() || dt <= 0.0 {
        return Err(Error::ConfigurationError(format!(
            "sample time must be positive and finite, got {}",
            dt
        )));
    }

    let n = 2 * axes;

    // F = [I, dt*I]
    //     [0,    I]
    let mut f = DMatrix::identity(n, n);
    for i in 0..axes {
        f[(i, axes + i)] = dt;
    }

    // G = [dt^2/2 * I]
    //     [dt     * I]
    let mut g = DMatrix::zeros(n, axes);
    for i in 0..axes {
        g[(i, i)] = 0.5 * dt * dt;
        g[(axes + i, i)] = dt;
    }

    Ok((f, g))
}

/// Constant-velocity model observing position and velocity.
///
/// State `[p_1..p_axes, v_1..v_axes]`, control = acceleration per axis,
/// `H = I`, `Q = G·Gᵗ·accel_std²`.
///
/// # Arguments
/// * `axes` - Number of spatial axes
/// * `dt` - Sample time in seconds
/// * `accel_std` - Standard deviation of unmodelled acceleration
pub fn constant_velocity(axes: usize, dt: f64, accel_std: f64) -> Result<StateSpaceModelBuilder> {
    let (f, g) = kinematic_blocks(axes, dt)?;
    let n = 2 * axes;
    let q = &g * g.transpose() * (accel_std * accel_std);
    Ok(StateSpaceModel::builder(f, DMatrix::identity(n, n), q).control(g))
}

/// Constant-velocity model observing position only (`H = [I, 0]`).
pub fn position_only(axes: usize, dt: f64, accel_std: f64) -> Result<StateSpaceModelBuilder> {
    let (f, g) = kinematic_blocks(axes, dt)?;
    let n = 2 * axes;
    let q = &g * g.transpose() * (accel_std * accel_std);
    let mut h = DMatrix::zeros(axes, n);
    for i in 0..axes {
        h[(i, i)] = 1.0;
    }
    Ok(StateSpaceModel::builder(f, h, q).control(g))
}

/// Diagonal measurement noise from per-component accuracy figures.
///
/// Receivers report accuracy as a 2σ bound, so each variance is
/// `(accuracy / 2)² = 0.25·accuracy²`.
pub fn noise_from_accuracy(accuracies: &[f64]) -> Result<DMatrix<f64>> {
    if accuracies.is_empty() {
        return Err(Error::ConfigurationError(
            "at least one accuracy figure is required".to_string(),
        ));
    }
    if let Some(bad) = accuracies.iter().find(|a| !a.is_finite() || **a <= 0.0) {
        return Err(Error::ConfigurationError(format!(
            "accuracy figures must be positive and finite, got {}",
            bad
        )));
    }
    let variances = DVector::from_iterator(
        accuracies.len(),
        accuracies.iter().map(|a| 0.25 * a * a),
    );
    Ok(DMatrix::from_diagonal(&variances))
}
