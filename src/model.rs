//! State-space model of the tracked process.
//!
//! ```text
//! x[t+1] = F·x[t] + G·u[t] + w,   w ~ N(0, Q)
//! z[t]   = H·x[t] + D·u[t] + v,   v ~ N(0, R),   E[w·vᵗ] = S
//! ```
//!
//! A model is validated once by [`StateSpaceModelBuilder::build`] and is
//! read-only afterwards, so it can be shared (`Arc<StateSpaceModel>`) between
//! any number of filters tracking independent sessions.

use log::debug;
use nalgebra::DMatrix;

use crate::linalg::{invert, is_finite};
use crate::{Error, Result};

/// Immutable, validated state-space model.
#[derive(Clone, Debug, PartialEq)]
pub struct StateSpaceModel {
    f: DMatrix<f64>,
    g: Option<DMatrix<f64>>,
    h: DMatrix<f64>,
    d: Option<DMatrix<f64>>,
    q: DMatrix<f64>,
    r: Option<DMatrix<f64>>,
    s: Option<DMatrix<f64>>,
}

impl StateSpaceModel {
    /// Start building a model from its mandatory matrices.
    ///
    /// # Arguments
    /// * `f` - State transition matrix (n x n)
    /// * `h` - Observation matrix (k x n)
    /// * `q` - Process noise covariance (n x n)
    pub fn builder(f: DMatrix<f64>, h: DMatrix<f64>, q: DMatrix<f64>) -> StateSpaceModelBuilder {
        StateSpaceModelBuilder {
            f,
            g: None,
            h,
            d: None,
            q,
            r: None,
            s: None,
        }
    }

    /// State dimension n.
    #[inline(always)]
    pub fn dim_x(&self) -> usize {
        self.f.nrows()
    }

    /// Measurement dimension k.
    #[inline(always)]
    pub fn dim_z(&self) -> usize {
        self.h.nrows()
    }

    /// Control dimension m, if the model has a control matrix.
    #[inline(always)]
    pub fn dim_u(&self) -> Option<usize> {
        self.g.as_ref().map(|g| g.ncols())
    }

    pub fn has_control(&self) -> bool {
        self.g.is_some()
    }

    pub fn has_feedthrough(&self) -> bool {
        self.d.is_some()
    }

    pub fn has_measurement_noise(&self) -> bool {
        self.r.is_some()
    }

    pub fn has_cross_covariance(&self) -> bool {
        self.s.is_some()
    }

    /// State transition matrix F.
    pub fn transition(&self) -> &DMatrix<f64> {
        &self.f
    }

    /// Control input matrix G.
    pub fn control(&self) -> Option<&DMatrix<f64>> {
        self.g.as_ref()
    }

    /// Observation matrix H.
    pub fn observation(&self) -> &DMatrix<f64> {
        &self.h
    }

    /// Direct feedthrough matrix D.
    pub fn feedthrough(&self) -> Option<&DMatrix<f64>> {
        self.d.as_ref()
    }

    /// Process noise covariance Q.
    pub fn process_noise(&self) -> &DMatrix<f64> {
        &self.q
    }

    /// Measurement noise covariance R.
    pub fn measurement_noise(&self) -> Option<&DMatrix<f64>> {
        self.r.as_ref()
    }

    /// Process/measurement noise cross-covariance S.
    pub fn cross_covariance(&self) -> Option<&DMatrix<f64>> {
        self.s.as_ref()
    }
}

/// Builder for [`StateSpaceModel`].
#[derive(Clone, Debug)]
pub struct StateSpaceModelBuilder {
    f: DMatrix<f64>,
    g: Option<DMatrix<f64>>,
    h: DMatrix<f64>,
    d: Option<DMatrix<f64>>,
    q: DMatrix<f64>,
    r: Option<DMatrix<f64>>,
    s: Option<DMatrix<f64>>,
}

impl StateSpaceModelBuilder {
    /// Control input matrix G (n x m).
    pub fn control(mut self, g: DMatrix<f64>) -> Self {
        self.g = Some(g);
        self
    }

    /// Direct feedthrough matrix D (k x m). Requires a control matrix.
    pub fn feedthrough(mut self, d: DMatrix<f64>) -> Self {
        self.d = Some(d);
        self
    }

    /// Measurement noise covariance R (k x k).
    ///
    /// May be left out when the filter receives R at runtime instead.
    pub fn measurement_noise(mut self, r: DMatrix<f64>) -> Self {
        self.r = Some(r);
        self
    }

    /// Process/measurement noise cross-covariance S (n x k). Requires R.
    pub fn cross_covariance(mut self, s: DMatrix<f64>) -> Self {
        self.s = Some(s);
        self
    }

    /// Validate every matrix and produce the model.
    pub fn build(self) -> Result<StateSpaceModel> {
        if self.s.is_some() && self.r.is_none() {
            return Err(Error::ConfigurationError(
                "cross-covariance S requires a measurement noise covariance R".to_string(),
            ));
        }
        if self.d.is_some() && self.g.is_none() {
            return Err(Error::ConfigurationError(
                "feedthrough D requires a control matrix G".to_string(),
            ));
        }

        let n = self.f.nrows();
        if n == 0 || !self.f.is_square() {
            return Err(Error::dimension(
                "F",
                "F",
                format!("transition must be non-empty and square, got {}x{}", n, self.f.ncols()),
            ));
        }
        expect_shape("F", "Q", &self.q, n, n)?;

        let k = self.h.nrows();
        if k == 0 || self.h.ncols() != n {
            return Err(Error::dimension(
                "F",
                "H",
                format!("H must be k x {} with k >= 1, got {}x{}", n, k, self.h.ncols()),
            ));
        }
        if let Some(r) = &self.r {
            expect_shape("H", "R", r, k, k)?;
        }

        if let Some(g) = &self.g {
            if g.nrows() != n || g.ncols() == 0 {
                return Err(Error::dimension(
                    "F",
                    "G",
                    format!("G must be {} x m with m >= 1, got {}x{}", n, g.nrows(), g.ncols()),
                ));
            }
        }
        if let (Some(d), Some(g)) = (&self.d, &self.g) {
            if d.nrows() != k {
                return Err(Error::dimension(
                    "H",
                    "D",
                    format!("D must have {} rows, got {}", k, d.nrows()),
                ));
            }
            if d.ncols() != g.ncols() {
                return Err(Error::dimension(
                    "G",
                    "D",
                    format!("D must have {} columns, got {}", g.ncols(), d.ncols()),
                ));
            }
        }
        if let Some(s) = &self.s {
            if s.nrows() != n {
                return Err(Error::dimension(
                    "F",
                    "S",
                    format!("S must have {} rows, got {}", n, s.nrows()),
                ));
            }
            if s.ncols() != k {
                return Err(Error::dimension(
                    "H",
                    "S",
                    format!("S must have {} columns, got {}", k, s.ncols()),
                ));
            }
        }

        let named = [
            ("F", Some(&self.f)),
            ("G", self.g.as_ref()),
            ("H", Some(&self.h)),
            ("D", self.d.as_ref()),
            ("Q", Some(&self.q)),
            ("R", self.r.as_ref()),
            ("S", self.s.as_ref()),
        ];
        for (name, matrix) in named {
            if let Some(m) = matrix {
                if !is_finite(m) {
                    return Err(Error::ConfigurationError(format!(
                        "matrix {} has non-finite entries",
                        name
                    )));
                }
            }
        }

        if let Some(r) = &self.r {
            invert(r).map_err(|e| match e {
                Error::SingularMatrix(msg) => {
                    Error::SingularMatrix(format!("measurement noise covariance R: {}", msg))
                }
                other => other,
            })?;
        }

        debug!(
            "built state-space model: n={}, k={}, m={:?}, R={}, S={}",
            n,
            k,
            self.g.as_ref().map(|g| g.ncols()),
            self.r.is_some(),
            self.s.is_some()
        );

        Ok(StateSpaceModel {
            f: self.f,
            g: self.g,
            h: self.h,
            d: self.d,
            q: self.q,
            r: self.r,
            s: self.s,
        })
    }
}

fn expect_shape(
    reference: &str,
    name: &str,
    m: &DMatrix<f64>,
    rows: usize,
    cols: usize,
) -> Result<()> {
    if m.shape() != (rows, cols) {
        return Err(Error::dimension(
            reference,
            name,
            format!("{} must be {}x{}, got {}x{}", name, rows, cols, m.nrows(), m.ncols()),
        ));
    }
    Ok(())
}
