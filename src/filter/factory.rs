//! Factory producing one `KalmanFilter` per session from a shared model.

use std::sync::Arc;

use nalgebra::{DMatrix, DVector};

use super::controller::KalmanFilter;
use super::state::Estimate;
use super::traits::{Estimator, EstimatorFactory};
use crate::config::FilterConfig;
use crate::model::StateSpaceModel;
use crate::{Error, Result};

impl Estimator for KalmanFilter {
    #[inline(always)]
    fn predict(
        &mut self,
        control: Option<&DVector<f64>>,
        correlated_measurement: Option<&DVector<f64>>,
    ) -> Result<()> {
        KalmanFilter::predict(self, control, correlated_measurement)
    }

    #[inline(always)]
    fn correct(&mut self, measurement: &DVector<f64>) -> Result<DVector<f64>> {
        KalmanFilter::correct(self, measurement)
    }

    #[inline(always)]
    fn estimate(&self) -> Estimate {
        KalmanFilter::estimate(self)
    }

    #[inline(always)]
    fn state_vector(&self) -> &DVector<f64> {
        KalmanFilter::state_vector(self)
    }

    #[inline(always)]
    fn dim_x(&self) -> usize {
        KalmanFilter::dim_x(self)
    }

    #[inline(always)]
    fn dim_z(&self) -> usize {
        KalmanFilter::dim_z(self)
    }
}

/// Factory for creating [`KalmanFilter`] instances over one shared model.
#[derive(Clone, Debug)]
pub struct KalmanFilterFactory {
    model: Arc<StateSpaceModel>,
    initial_covariance: Option<DMatrix<f64>>,
    config: FilterConfig,
}

impl KalmanFilterFactory {
    /// Create a factory. New filters start with an identity covariance.
    pub fn new(model: Arc<StateSpaceModel>, config: FilterConfig) -> Self {
        Self {
            model,
            initial_covariance: None,
            config,
        }
    }

    /// Initial covariance given to every new filter.
    pub fn with_initial_covariance(mut self, p0: DMatrix<f64>) -> Result<Self> {
        let n = self.model.dim_x();
        if p0.shape() != (n, n) {
            return Err(Error::dimension(
                "F",
                "P0",
                format!("P0 must be {}x{}, got {}x{}", n, n, p0.nrows(), p0.ncols()),
            ));
        }
        self.initial_covariance = Some(p0);
        Ok(self)
    }

    /// Create a filter with static dispatch.
    pub fn create(&self, initial_state: &DVector<f64>) -> Result<KalmanFilter> {
        KalmanFilter::new(
            Arc::clone(&self.model),
            initial_state.clone(),
            self.initial_covariance.clone(),
            self.config.clone(),
        )
    }

    pub fn model(&self) -> &Arc<StateSpaceModel> {
        &self.model
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }
}

impl EstimatorFactory for KalmanFilterFactory {
    fn create_estimator(&self, initial_state: &DVector<f64>) -> Result<Box<dyn Estimator>> {
        Ok(Box::new(self.create(initial_state)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn shared_model() -> Arc<StateSpaceModel> {
        Arc::new(
            StateSpaceModel::builder(
                DMatrix::identity(2, 2),
                DMatrix::identity(2, 2),
                DMatrix::identity(2, 2) * 0.01,
            )
            .measurement_noise(DMatrix::identity(2, 2))
            .build()
            .unwrap(),
        )
    }

    #[test]
    fn test_factory_creates_independent_sessions() {
        let factory = KalmanFilterFactory::new(shared_model(), FilterConfig::default());
        let mut first = factory.create_estimator(&DVector::zeros(2)).unwrap();
        let second = factory.create_estimator(&DVector::from_vec(vec![5.0, 5.0])).unwrap();

        first.predict(None, None).unwrap();
        first.correct(&DVector::from_vec(vec![1.0, 1.0])).unwrap();

        assert!(first.state_vector()[0] > 0.0);
        assert_relative_eq!(second.state_vector()[0], 5.0);
        assert_eq!(second.dim_x(), 2);
        assert_eq!(second.dim_z(), 2);
        assert_eq!(Arc::strong_count(factory.model()), 3);
    }

    #[test]
    fn test_factory_initial_covariance() {
        let factory = KalmanFilterFactory::new(shared_model(), FilterConfig::default())
            .with_initial_covariance(DMatrix::identity(2, 2) * 9.0)
            .unwrap();
        let filter = factory.create(&DVector::zeros(2)).unwrap();
        assert_relative_eq!(filter.estimate().covariance[(1, 1)], 9.0);

        let result = KalmanFilterFactory::new(shared_model(), FilterConfig::default())
            .with_initial_covariance(DMatrix::identity(3, 3));
        assert!(matches!(result, Err(Error::DimensionMismatch { .. })));
    }

    #[test]
    fn test_factory_rejects_wrong_initial_state() {
        let factory = KalmanFilterFactory::new(shared_model(), FilterConfig::default());
        assert!(factory.create_estimator(&DVector::zeros(4)).is_err());
    }
}
