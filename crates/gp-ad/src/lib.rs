//! # gp-ad
//!
//! Forward-mode automatic differentiation for parameter objectives.
//!
//! Provides:
//! - [`dual::Dual`] numbers carrying one tangent direction
//! - [`Scalar`] trait for writing transforms and densities once, generic over
//!   `f64` (evaluation) and `Dual` (evaluation + derivative)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dual;
pub mod scalar;

pub use dual::Dual;
pub use scalar::Scalar;
