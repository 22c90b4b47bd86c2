//! Dense linear algebra kernels used by the estimator.
//!
//! Thin, shape-checked wrappers around nalgebra:
//! - `ops`: multiply, transpose, add/subtract, condition-checked inversion
//! - `consistency`: covariance symmetry / positive semi-definiteness checks
//!
//! Every function is pure: arguments are borrowed and results freshly allocated.

pub mod ops;
pub mod consistency;

pub use ops::{
    add, add_vectors, apply, invert, is_finite, multiply, reciprocal_condition, subtract,
    subtract_vectors, transpose, SINGULARITY_TOLERANCE,
};
pub use consistency::{asymmetry, check_covariance, symmetrize, DEFAULT_CONSISTENCY_TOLERANCE};
