//! Filter controller: one tracking session over a shared model.

use std::sync::Arc;

use log::{debug, warn};
use nalgebra::{DMatrix, DVector};

use super::correct::correct;
use super::predict::predict;
use super::state::{Estimate, FilterState};
use crate::config::FilterConfig;
use crate::linalg::{check_covariance, invert, is_finite};
use crate::model::StateSpaceModel;
use crate::{Error, Result};

/// Generalized linear Kalman filter.
///
/// Owns its [`FilterState`] and shares the model read-only. `predict` and
/// `correct` take `&mut self`, so one instance is driven by one loop at a time;
/// independent sessions use independent instances.
#[derive(Clone, Debug)]
pub struct KalmanFilter {
    model: Arc<StateSpaceModel>,
    state: FilterState,
    config: FilterConfig,
    /// Measurement noise set at runtime, replaces the model's R
    measurement_noise: Option<DMatrix<f64>>,
    predictions: u64,
    corrections: u64,
}

impl KalmanFilter {
    /// Create a filter for a model.
    ///
    /// # Arguments
    /// * `model` - Shared state-space model
    /// * `x0` - Initial state estimate (length n)
    /// * `p0` - Initial covariance (n x n), identity if `None`
    /// * `config` - Runtime options
    pub fn new(
        model: Arc<StateSpaceModel>,
        x0: DVector<f64>,
        p0: Option<DMatrix<f64>>,
        config: FilterConfig,
    ) -> Result<Self> {
        let state = FilterState::for_model(&model, x0, p0)?;
        debug!(
            "created filter: n={}, k={}, covariance update {:?}",
            model.dim_x(),
            model.dim_z(),
            config.covariance_update
        );
        Ok(Self {
            model,
            state,
            config,
            measurement_noise: None,
            predictions: 0,
            corrections: 0,
        })
    }

    /// Time update.
    ///
    /// # Arguments
    /// * `control` - Control vector; required iff the model has a control matrix
    /// * `correlated_measurement` - Measurement for the correlated-noise term;
    ///   only accepted when the model has a cross-covariance
    pub fn predict(
        &mut self,
        control: Option<&DVector<f64>>,
        correlated_measurement: Option<&DVector<f64>>,
    ) -> Result<()> {
        predict(
            &mut self.state,
            &self.model,
            control,
            correlated_measurement,
            self.measurement_noise.as_ref(),
        )?;
        self.predictions += 1;
        self.verify("predict");
        Ok(())
    }

    /// Measurement update. Returns the innovation.
    pub fn correct(&mut self, measurement: &DVector<f64>) -> Result<DVector<f64>> {
        let innovation = correct(
            &mut self.state,
            &self.model,
            measurement,
            self.measurement_noise.as_ref(),
            self.config.covariance_update,
        )?;
        self.corrections += 1;
        self.verify("correct");
        Ok(innovation)
    }

    /// Owned snapshot of the current mean and covariance.
    pub fn estimate(&self) -> Estimate {
        self.state.snapshot()
    }

    /// Current mean estimate.
    pub fn state_vector(&self) -> &DVector<f64> {
        self.state.mean()
    }

    /// Reinitialize the session. Counters restart from zero; runtime
    /// measurement noise is kept.
    pub fn reset(&mut self, x0: DVector<f64>, p0: Option<DMatrix<f64>>) -> Result<()> {
        self.state = FilterState::for_model(&self.model, x0, p0)?;
        self.predictions = 0;
        self.corrections = 0;
        debug!("filter reset");
        Ok(())
    }

    /// Replace the measurement noise covariance for subsequent cycles.
    ///
    /// Used when sensors report their own accuracy each sample.
    pub fn set_measurement_noise(&mut self, r: DMatrix<f64>) -> Result<()> {
        let k = self.model.dim_z();
        if r.shape() != (k, k) {
            return Err(Error::dimension(
                "H",
                "R",
                format!("R must be {}x{}, got {}x{}", k, k, r.nrows(), r.ncols()),
            ));
        }
        if !is_finite(&r) {
            return Err(Error::ConfigurationError(
                "measurement noise covariance has non-finite entries".to_string(),
            ));
        }
        invert(&r).map_err(|e| match e {
            Error::SingularMatrix(msg) => {
                Error::SingularMatrix(format!("measurement noise covariance R: {}", msg))
            }
            other => other,
        })?;
        self.measurement_noise = Some(r);
        Ok(())
    }

    /// Fall back to the model's measurement noise covariance.
    pub fn clear_measurement_noise(&mut self) {
        self.measurement_noise = None;
    }

    /// Measurement noise covariance in effect.
    pub fn measurement_noise(&self) -> Option<&DMatrix<f64>> {
        self.measurement_noise
            .as_ref()
            .or_else(|| self.model.measurement_noise())
    }

    /// Check the covariance for symmetry and positive semi-definiteness.
    pub fn check_consistency(&self) -> Result<()> {
        check_covariance(self.state.covariance(), self.config.consistency_tolerance)
    }

    fn verify(&self, step: &str) {
        if !self.config.verify_consistency {
            return;
        }
        if let Err(e) = self.check_consistency() {
            warn!(
                "covariance degraded after {} (predictions={}, corrections={}): {}",
                step, self.predictions, self.corrections, e
            );
        }
    }

    pub fn model(&self) -> &Arc<StateSpaceModel> {
        &self.model
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Completed time updates since creation or the last reset.
    pub fn predictions(&self) -> u64 {
        self.predictions
    }

    /// Completed measurement updates since creation or the last reset.
    pub fn corrections(&self) -> u64 {
        self.corrections
    }

    #[inline(always)]
    pub fn dim_x(&self) -> usize {
        self.model.dim_x()
    }

    #[inline(always)]
    pub fn dim_z(&self) -> usize {
        self.model.dim_z()
    }

    #[inline(always)]
    pub fn dim_u(&self) -> Option<usize> {
        self.model.dim_u()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::CovarianceUpdate;
    use approx::assert_relative_eq;

    fn scalar_model(q: f64, r: Option<f64>) -> Arc<StateSpaceModel> {
        let mut builder = StateSpaceModel::builder(
            DMatrix::identity(1, 1),
            DMatrix::identity(1, 1),
            DMatrix::from_element(1, 1, q),
        );
        if let Some(r) = r {
            builder = builder.measurement_noise(DMatrix::from_element(1, 1, r));
        }
        Arc::new(builder.build().unwrap())
    }

    #[test]
    fn test_filter_create() {
        let filter = KalmanFilter::new(
            scalar_model(0.01, Some(1.0)),
            DVector::zeros(1),
            None,
            FilterConfig::default(),
        )
        .unwrap();
        assert_eq!(filter.dim_x(), 1);
        assert_eq!(filter.dim_z(), 1);
        assert_eq!(filter.dim_u(), None);
        assert_eq!(filter.predictions(), 0);
        assert_eq!(filter.estimate().covariance, DMatrix::identity(1, 1));
    }

    #[test]
    fn test_filter_create_wrong_state_length() {
        let result = KalmanFilter::new(
            scalar_model(0.01, Some(1.0)),
            DVector::zeros(3),
            None,
            FilterConfig::default(),
        );
        assert!(matches!(result, Err(Error::DimensionMismatch { .. })));
    }

    #[test]
    fn test_scalar_scenario_converges_monotonically() {
        let mut filter = KalmanFilter::new(
            scalar_model(0.01, Some(1.0)),
            DVector::zeros(1),
            Some(DMatrix::identity(1, 1)),
            FilterConfig::default(),
        )
        .unwrap();

        let z = DVector::from_vec(vec![1.0]);
        let mut previous = 0.0;
        for step in 0..5 {
            filter.predict(None, None).unwrap();
            filter.correct(&z).unwrap();
            let x = filter.estimate().state[0];
            assert!(x > previous, "step {}: {} did not increase from {}", step, x, previous);
            assert!(x < 1.0, "step {}: {} exceeded the measurement", step, x);
            previous = x;
        }

        assert_eq!(filter.predictions(), 5);
        assert_eq!(filter.corrections(), 5);
    }

    #[test]
    fn test_first_cycle_gain() {
        let mut filter = KalmanFilter::new(
            scalar_model(0.01, Some(1.0)),
            DVector::zeros(1),
            None,
            FilterConfig::default(),
        )
        .unwrap();
        filter.predict(None, None).unwrap();
        let innovation = filter.correct(&DVector::from_vec(vec![1.0])).unwrap();
        assert_relative_eq!(innovation[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(filter.state_vector()[0], 1.01 / 2.01, epsilon = 1e-12);
        assert_relative_eq!(filter.estimate().covariance[(0, 0)], 1.01 / 2.01, epsilon = 1e-12);
    }

    #[test]
    fn test_runtime_measurement_noise() {
        let mut filter = KalmanFilter::new(
            scalar_model(0.0, None),
            DVector::zeros(1),
            None,
            FilterConfig::default(),
        )
        .unwrap();
        let z = DVector::from_vec(vec![2.0]);

        assert!(filter.measurement_noise().is_none());
        assert!(matches!(filter.correct(&z), Err(Error::ConfigurationError(_))));
        assert_eq!(filter.corrections(), 0);

        filter.set_measurement_noise(DMatrix::from_element(1, 1, 3.0)).unwrap();
        filter.correct(&z).unwrap();
        // K = 1 / (1 + 3)
        assert_relative_eq!(filter.state_vector()[0], 0.5, epsilon = 1e-12);

        filter.clear_measurement_noise();
        assert!(filter.measurement_noise().is_none());
    }

    #[test]
    fn test_set_measurement_noise_validation() {
        let mut filter = KalmanFilter::new(
            scalar_model(0.0, Some(1.0)),
            DVector::zeros(1),
            None,
            FilterConfig::default(),
        )
        .unwrap();
        assert!(matches!(
            filter.set_measurement_noise(DMatrix::identity(2, 2)),
            Err(Error::DimensionMismatch { .. })
        ));
        match filter.set_measurement_noise(DMatrix::zeros(1, 1)) {
            Err(Error::SingularMatrix(msg)) => {
                assert!(msg.contains("measurement noise covariance R"), "got {}", msg)
            }
            other => panic!("expected SingularMatrix, got {:?}", other),
        }
        assert!(matches!(
            filter.set_measurement_noise(DMatrix::from_element(1, 1, f64::NAN)),
            Err(Error::ConfigurationError(_))
        ));
        assert_relative_eq!(filter.measurement_noise().unwrap()[(0, 0)], 1.0);
    }

    #[test]
    fn test_reset() {
        let mut filter = KalmanFilter::new(
            scalar_model(0.01, Some(1.0)),
            DVector::zeros(1),
            None,
            FilterConfig::new(CovarianceUpdate::Joseph),
        )
        .unwrap();
        filter.predict(None, None).unwrap();
        filter.correct(&DVector::from_vec(vec![5.0])).unwrap();

        filter
            .reset(DVector::from_vec(vec![-1.0]), Some(DMatrix::from_element(1, 1, 4.0)))
            .unwrap();
        let estimate = filter.estimate();
        assert_relative_eq!(estimate.state[0], -1.0);
        assert_relative_eq!(estimate.covariance[(0, 0)], 4.0);
        assert_eq!(filter.predictions(), 0);
        assert_eq!(filter.corrections(), 0);

        assert!(filter.reset(DVector::zeros(2), None).is_err());
    }

    #[test]
    fn test_estimate_is_a_snapshot() {
        let mut filter = KalmanFilter::new(
            scalar_model(0.01, Some(1.0)),
            DVector::from_vec(vec![2.0]),
            None,
            FilterConfig::default(),
        )
        .unwrap();
        let mut snapshot = filter.estimate();
        snapshot.state[0] = -50.0;
        assert_relative_eq!(filter.state_vector()[0], 2.0);

        filter.predict(None, None).unwrap();
        assert_relative_eq!(snapshot.state[0], -50.0);
    }

    #[test]
    fn test_check_consistency() {
        let filter = KalmanFilter::new(
            scalar_model(0.01, Some(1.0)),
            DVector::zeros(1),
            None,
            FilterConfig::default(),
        )
        .unwrap();
        assert!(filter.check_consistency().is_ok());

        let broken = KalmanFilter::new(
            Arc::new(
                StateSpaceModel::builder(
                    DMatrix::identity(2, 2),
                    DMatrix::identity(2, 2),
                    DMatrix::zeros(2, 2),
                )
                .measurement_noise(DMatrix::identity(2, 2))
                .build()
                .unwrap(),
            ),
            DVector::zeros(2),
            Some(DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0])),
            FilterConfig::default(),
        )
        .unwrap();
        assert!(matches!(
            broken.check_consistency(),
            Err(Error::InconsistentCovariance(_))
        ));
    }
}
