//! Serde model descriptions.
//!
//! Priors are declared once by name and shared by every parameter that refers
//! to them:
//!
//! ```json
//! {
//!   "priors": { "ls": { "kind": "gamma", "shape": 2.0, "scale": 0.5 } },
//!   "params": [
//!     { "name": "lengthscale", "transform": "positive", "value": [1.0, 2.0], "prior": "ls" },
//!     { "name": "q_sqrt", "transform": "lower_triangular", "value": [[1.0, 0.0], [0.5, 1.0]] }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use gp_core::{Error, Result, Value};
use serde::{Deserialize, Serialize};

use crate::param::{ParamStore, Parameter};
use crate::priors::Prior;
use crate::transforms::Transform;

fn zero() -> Value {
    Value::Scalar(0.0)
}

fn one() -> Value {
    Value::Scalar(1.0)
}

/// Prior declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PriorSpec {
    /// `N(mu, var)`.
    Gaussian {
        /// Mean.
        mu: Value,
        /// Variance.
        var: Value,
    },
    /// Log-normal.
    #[serde(rename = "lognormal")]
    LogNormal {
        /// Mean of `ln x`.
        mu: Value,
        /// Variance of `ln x`.
        var: Value,
    },
    /// Gamma(shape, scale).
    Gamma {
        /// Shape.
        shape: Value,
        /// Scale.
        scale: Value,
    },
    /// Laplace(mu, sigma).
    Laplace {
        /// Location.
        mu: Value,
        /// Scale.
        sigma: Value,
    },
    /// Beta(a, b).
    Beta {
        /// First shape parameter.
        a: Value,
        /// Second shape parameter.
        b: Value,
    },
    /// Uniform(lower, upper), defaulting to `[0, 1]`.
    Uniform {
        /// Lower bound.
        #[serde(default = "zero")]
        lower: Value,
        /// Upper bound.
        #[serde(default = "one")]
        upper: Value,
    },
}

impl PriorSpec {
    /// Build the prior.
    pub fn build(&self) -> Result<Prior> {
        match self {
            PriorSpec::Gaussian { mu, var } => Prior::gaussian(mu.clone(), var.clone()),
            PriorSpec::LogNormal { mu, var } => Prior::lognormal(mu.clone(), var.clone()),
            PriorSpec::Gamma { shape, scale } => Prior::gamma(shape.clone(), scale.clone()),
            PriorSpec::Laplace { mu, sigma } => Prior::laplace(mu.clone(), sigma.clone()),
            PriorSpec::Beta { a, b } => Prior::beta(a.clone(), b.clone()),
            PriorSpec::Uniform { lower, upper } => Prior::uniform(lower.clone(), upper.clone()),
        }
    }
}

/// Parameter declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Unique parameter name.
    pub name: String,
    /// Constraint; unconstrained when omitted.
    #[serde(default = "default_transform")]
    pub transform: Transform,
    /// Initial constrained value.
    pub value: Value,
    /// Name of a prior declared in [`ModelSpec::priors`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior: Option<String>,
}

fn default_transform() -> Transform {
    Transform::Identity
}

/// A set of named priors and the parameters that use them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Named prior declarations.
    #[serde(default)]
    pub priors: BTreeMap<String, PriorSpec>,
    /// Parameters in free-state order.
    #[serde(default)]
    pub params: Vec<ParamSpec>,
}

impl ParamStore {
    /// Build a store from a model description.
    pub fn from_spec(spec: &ModelSpec) -> Result<Self> {
        let mut priors: BTreeMap<&str, Arc<Prior>> = BTreeMap::new();
        for (name, p) in &spec.priors {
            priors.insert(name.as_str(), Arc::new(p.build()?));
        }

        let mut store = ParamStore::new();
        for p in &spec.params {
            let prior = match &p.prior {
                None => None,
                Some(name) => Some(priors.get(name.as_str()).cloned().ok_or_else(|| {
                    Error::Validation(format!(
                        "parameter '{}' refers to unknown prior '{}'",
                        p.name, name
                    ))
                })?),
            };
            let param = Parameter::from_value(p.transform, p.value.clone(), prior)?;
            store.insert(p.name.clone(), param)?;
        }
        tracing::debug!(
            n_params = store.len(),
            n_priors = priors.len(),
            n_free = store.n_free(),
            "parameter store built"
        );
        Ok(store)
    }

    /// Parse a JSON model description and build the store.
    pub fn from_json(json: &str) -> Result<Self> {
        let spec: ModelSpec = serde_json::from_str(json)?;
        Self::from_spec(&spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prior_spec_tags() {
        let s: PriorSpec = serde_json::from_str(r#"{"kind": "lognormal", "mu": 0, "var": 1}"#)
            .unwrap();
        assert_eq!(s.build().unwrap().to_string(), "logN(0,1)");

        let s: PriorSpec = serde_json::from_str(r#"{"kind": "uniform"}"#).unwrap();
        assert_eq!(s.build().unwrap().to_string(), "U(0,1)");
    }

    #[test]
    fn test_transform_names() {
        let t: Transform = serde_json::from_str(r#""lower_triangular""#).unwrap();
        assert_eq!(t, Transform::LowerTriangular);
        assert_eq!(serde_json::to_string(&Transform::Positive).unwrap(), r#""positive""#);
    }

    #[test]
    fn test_param_spec_defaults() {
        let p: ParamSpec = serde_json::from_str(r#"{"name": "mean", "value": 0.5}"#).unwrap();
        assert_eq!(p.transform, Transform::Identity);
        assert_eq!(p.prior, None);
    }

    #[test]
    fn test_unknown_prior_is_rejected() {
        let json = r#"{"params": [{"name": "x", "value": 1.0, "prior": "missing"}]}"#;
        let err = ParamStore::from_json(json).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(ParamStore::from_json("{"), Err(Error::Json(_))));
    }
}
