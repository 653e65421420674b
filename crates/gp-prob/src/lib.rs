//! Constrained parameters and Bayesian priors for Gaussian-process models.
//!
//! An optimizer works on unconstrained `raw` tensors; a [`Transform`] maps them
//! to the constrained values the model consumes and supplies the log-Jacobian
//! correction. A [`Prior`] attached to a [`Parameter`] turns that correction
//! plus its log-density into the log-prior term of a MAP objective.
//!
//! - [`math`]: stable softplus / log-sigmoid primitives
//! - [`densities`]: elementwise log-densities, generic over [`gp_ad::Scalar`]
//! - [`transforms`]: Identity / Positive / LowerTriangular bijections
//! - [`priors`]: Gaussian, LogNormal, Gamma, Laplace, Beta, Uniform
//! - [`param`]: parameters and the [`ParamStore`] arena
//! - [`config`]: serde model descriptions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod densities;
pub mod math;
pub mod param;
pub mod priors;
pub mod transforms;

pub use config::{ModelSpec, ParamSpec, PriorSpec};
pub use param::{ParamId, ParamStore, Parameter};
pub use priors::Prior;
pub use transforms::Transform;
