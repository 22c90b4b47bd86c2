//! Estimator traits for the telemetry loop.

use nalgebra::DVector;

use super::state::Estimate;
use crate::Result;

/// Trait for recursive state estimators.
///
/// The polling loop of the surrounding system drives an estimator through this
/// trait without knowing the concrete filter or model.
pub trait Estimator: Send + Sync {
    /// Advance the estimate one step in time.
    ///
    /// # Arguments
    /// * `control` - Control vector, if the model takes one
    /// * `correlated_measurement` - Measurement for correlated process/measurement noise
    fn predict(
        &mut self,
        control: Option<&DVector<f64>>,
        correlated_measurement: Option<&DVector<f64>>,
    ) -> Result<()>;

    /// Fuse a measurement. Returns the innovation.
    fn correct(&mut self, measurement: &DVector<f64>) -> Result<DVector<f64>>;

    /// Owned snapshot of the current estimate.
    fn estimate(&self) -> Estimate;

    /// Current mean estimate.
    fn state_vector(&self) -> &DVector<f64>;

    /// State dimension.
    fn dim_x(&self) -> usize;

    /// Measurement dimension.
    fn dim_z(&self) -> usize;
}

/// Factory for creating estimator instances.
///
/// One factory per tracked process type; one estimator per tracking session.
pub trait EstimatorFactory: Send + Sync {
    /// Create a new estimator starting from `initial_state`.
    fn create_estimator(&self, initial_state: &DVector<f64>) -> Result<Box<dyn Estimator>>;
}
