//! Filter and model configuration.
//!
//! The core never reads files or the environment. These types are plain data
//! the caller fills in directly or deserializes from its own configuration
//! source (JSON, TOML, ...) before starting a session.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::filter::CovarianceUpdate;
use crate::linalg::DEFAULT_CONSISTENCY_TOLERANCE;
use crate::model::StateSpaceModel;
use crate::{Error, Result};

/// Runtime options of a [`KalmanFilter`](crate::KalmanFilter).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Covariance update form used by `correct`.
    pub covariance_update: CovarianceUpdate,

    /// Run the covariance consistency check after every step and log a warning
    /// on violation. Defaults to on in debug builds.
    pub verify_consistency: bool,

    /// Relative tolerance for the consistency check.
    pub consistency_tolerance: f64,
}

impl FilterConfig {
    /// Create a configuration with the given covariance update form.
    pub fn new(covariance_update: CovarianceUpdate) -> Self {
        Self {
            covariance_update,
            ..Self::default()
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            covariance_update: CovarianceUpdate::Simple,
            verify_consistency: cfg!(debug_assertions),
            consistency_tolerance: DEFAULT_CONSISTENCY_TOLERANCE,
        }
    }
}

/// Serializable description of a [`StateSpaceModel`].
///
/// Matrices are given row by row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// State transition F (n x n)
    pub transition: Vec<Vec<f64>>,

    /// Control input G (n x m)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control: Option<Vec<Vec<f64>>>,

    /// Observation H (k x n)
    pub observation: Vec<Vec<f64>>,

    /// Feedthrough D (k x m)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedthrough: Option<Vec<Vec<f64>>>,

    /// Process noise Q (n x n)
    pub process_noise: Vec<Vec<f64>>,

    /// Measurement noise R (k x k)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement_noise: Option<Vec<Vec<f64>>>,

    /// Cross-covariance S (n x k)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross_covariance: Option<Vec<Vec<f64>>>,
}

impl ModelConfig {
    /// Convert into a validated model.
    pub fn build(&self) -> Result<StateSpaceModel> {
        let mut builder = StateSpaceModel::builder(
            rows_to_matrix("transition", &self.transition)?,
            rows_to_matrix("observation", &self.observation)?,
            rows_to_matrix("process_noise", &self.process_noise)?,
        );
        if let Some(rows) = &self.control {
            builder = builder.control(rows_to_matrix("control", rows)?);
        }
        if let Some(rows) = &self.feedthrough {
            builder = builder.feedthrough(rows_to_matrix("feedthrough", rows)?);
        }
        if let Some(rows) = &self.measurement_noise {
            builder = builder.measurement_noise(rows_to_matrix("measurement_noise", rows)?);
        }
        if let Some(rows) = &self.cross_covariance {
            builder = builder.cross_covariance(rows_to_matrix("cross_covariance", rows)?);
        }
        builder.build()
    }

    /// Describe an existing model.
    pub fn from_model(model: &StateSpaceModel) -> Self {
        Self {
            transition: matrix_to_rows(model.transition()),
            control: model.control().map(matrix_to_rows),
            observation: matrix_to_rows(model.observation()),
            feedthrough: model.feedthrough().map(matrix_to_rows),
            process_noise: matrix_to_rows(model.process_noise()),
            measurement_noise: model.measurement_noise().map(matrix_to_rows),
            cross_covariance: model.cross_covariance().map(matrix_to_rows),
        }
    }
}

fn rows_to_matrix(name: &str, rows: &[Vec<f64>]) -> Result<DMatrix<f64>> {
    let nrows = rows.len();
    let ncols = rows.first().map_or(0, |r| r.len());
    if let Some(bad) = rows.iter().position(|r| r.len() != ncols) {
        return Err(Error::ConfigurationError(format!(
            "{}: row {} has {} entries, expected {}",
            name,
            bad,
            rows[bad].len(),
            ncols
        )));
    }
    let data: Vec<f64> = rows.iter().flatten().copied().collect();
    Ok(DMatrix::from_row_slice(nrows, ncols, &data))
}

fn matrix_to_rows(m: &DMatrix<f64>) -> Vec<Vec<f64>> {
    m.row_iter().map(|row| row.iter().copied().collect()).collect()
}
