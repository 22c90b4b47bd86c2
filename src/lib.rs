//! # sailtrack-kalman - Linear State Estimation
//!
//! Generalized discrete-time Kalman filter for the telemetry node of a moving
//! vehicle (attitude, position, battery state).
//!
//! The crate fuses periodic sensor measurements into a running estimate of a
//! hidden state. It performs no I/O: the surrounding system feeds control and
//! measurement vectors on its own cadence and publishes the posterior estimate.
//!
//! ## Features
//!
//! - Dimension-generic model with optional control, feedthrough and
//!   process/measurement cross-covariance matrices
//! - Correlated-noise time update (`S·R⁻¹·z` term)
//! - Simple or Joseph-form covariance update
//! - Condition-checked inversion; failed steps never corrupt the state
//! - Covariance consistency checks for long-running sessions
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use nalgebra::{DMatrix, DVector};
//! use sailtrack_kalman::{KalmanFilter, FilterConfig, StateSpaceModel};
//!
//! let model = StateSpaceModel::builder(
//!     DMatrix::identity(1, 1),
//!     DMatrix::identity(1, 1),
//!     DMatrix::from_element(1, 1, 0.01),
//! )
//! .measurement_noise(DMatrix::identity(1, 1))
//! .build()?;
//!
//! let mut filter = KalmanFilter::new(Arc::new(model), DVector::zeros(1), None, FilterConfig::default())?;
//! filter.predict(None, None)?;
//! filter.correct(&DVector::from_vec(vec![1.0]))?;
//! let estimate = filter.estimate();
//! ```

// Internal numerical kernels
pub mod linalg;

// Public modules
pub mod model;
pub mod filter;
pub mod presets;
pub mod config;

// Re-exports for convenience
pub use model::{StateSpaceModel, StateSpaceModelBuilder};
pub use filter::{
    CovarianceUpdate, Estimate, Estimator, EstimatorFactory, FilterState, KalmanFilter,
    KalmanFilterFactory,
};
pub use config::{FilterConfig, ModelConfig};

// Error types
pub use crate::error::{Error, Result};

mod error {
    use thiserror::Error;

    /// Errors that can occur while building or running a filter
    #[derive(Error, Debug, Clone, PartialEq)]
    pub enum Error {
        #[error("Dimension mismatch between {lhs} and {rhs}: {detail}")]
        DimensionMismatch {
            lhs: String,
            rhs: String,
            detail: String,
        },

        #[error("Singular matrix: {0}")]
        SingularMatrix(String),

        #[error("Configuration error: {0}")]
        ConfigurationError(String),

        #[error("Non-finite state: {0}")]
        NonFiniteState(String),

        #[error("Inconsistent covariance: {0}")]
        InconsistentCovariance(String),
    }

    impl Error {
        pub(crate) fn dimension(
            lhs: impl Into<String>,
            rhs: impl Into<String>,
            detail: impl Into<String>,
        ) -> Self {
            Error::DimensionMismatch {
                lhs: lhs.into(),
                rhs: rhs.into(),
                detail: detail.into(),
            }
        }
    }

    /// Result type for filter operations
    pub type Result<T> = std::result::Result<T, Error>;
}
