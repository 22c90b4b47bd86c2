//! Linear Kalman filter.
//!
//! This module is split along the recursion:
//! - `state` - Mean/covariance pair and read-only snapshots
//! - `predict` - Time update, with control and correlated-noise terms
//! - `correct` - Measurement update, simple or Joseph covariance form
//! - `controller` - `KalmanFilter`, one tracking session over a shared model
//! - `traits` / `factory` - Estimator seam for the telemetry loop

mod state;
mod predict;
mod correct;
mod controller;
mod traits;
mod factory;

pub use state::{Estimate, FilterState};
pub use predict::predict;
pub use correct::{correct, CovarianceUpdate};
pub use controller::KalmanFilter;
pub use traits::{Estimator, EstimatorFactory};
pub use factory::KalmanFilterFactory;
