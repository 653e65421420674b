//! Constrained parameters and the parameter arena.
//!
//! A [`Parameter`] owns the unconstrained `raw` tensor an optimizer updates, the
//! [`Transform`] that maps it to the model-visible value, and an optional shared
//! [`Prior`]. A [`ParamStore`] keeps parameters in an arena addressed by stable
//! [`ParamId`] handles and packs every raw tensor into one flat free-state
//! vector for optimizers.

use std::collections::HashMap;
use std::sync::Arc;

use gp_ad::{Dual, Scalar};
use gp_core::{Error, Result, Value};
use ndarray::{ArrayD, ArrayViewD, ArrayViewMutD, IxDyn};

use crate::priors::Prior;
use crate::transforms::Transform;

/// A parameter stored in unconstrained space.
#[derive(Debug, Clone)]
pub struct Parameter {
    transform: Transform,
    raw: ArrayD<f64>,
    prior: Option<Arc<Prior>>,
}

impl Parameter {
    /// Create a parameter from its initial constrained value.
    ///
    /// Zero-dimensional values are treated as scalars and stored with shape `[1]`.
    pub fn new(
        transform: Transform,
        value: ArrayD<f64>,
        prior: Option<Arc<Prior>>,
    ) -> Result<Self> {
        let value = if value.ndim() == 0 {
            ArrayD::from_elem(IxDyn(&[1]), value.iter().next().copied().unwrap_or_default())
        } else {
            value
        };
        let raw = transform.inverse(&value)?;
        Ok(Self { transform, raw, prior })
    }

    /// Create a parameter from a [`Value`] (scalar, vector or matrix).
    pub fn from_value(
        transform: Transform,
        value: impl Into<Value>,
        prior: Option<Arc<Prior>>,
    ) -> Result<Self> {
        Self::new(transform, value.into().to_array()?, prior)
    }

    /// Create a length-1 parameter from a scalar.
    pub fn scalar(transform: Transform, value: f64, prior: Option<Arc<Prior>>) -> Result<Self> {
        Self::from_value(transform, value, prior)
    }

    /// The transform.
    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// The attached prior, if any.
    pub fn prior(&self) -> Option<&Arc<Prior>> {
        self.prior.as_ref()
    }

    /// Attach or detach a prior.
    pub fn set_prior(&mut self, prior: Option<Arc<Prior>>) {
        self.prior = prior;
    }

    /// Unconstrained storage.
    pub fn raw(&self) -> ArrayViewD<'_, f64> {
        self.raw.view()
    }

    /// Mutable unconstrained storage, for optimizers stepping in raw space.
    pub fn raw_mut(&mut self) -> ArrayViewMutD<'_, f64> {
        self.raw.view_mut()
    }

    /// Number of unconstrained elements.
    pub fn n_free(&self) -> usize {
        self.raw.len()
    }

    /// Constrained value.
    pub fn get(&self) -> Result<ArrayD<f64>> {
        self.transform.forward(&self.raw)
    }

    /// Overwrite the raw storage in place from a constrained value.
    ///
    /// A single-element value is broadcast to the full constrained shape;
    /// otherwise the shape must match exactly. The raw buffer is reused, so
    /// views handed out earlier keep addressing the same storage.
    pub fn set(&mut self, value: &ArrayD<f64>) -> Result<()> {
        let shape = self.transform.constrained_shape(self.raw.shape())?;
        let new_raw = if value.shape() == shape.as_slice() {
            self.transform.inverse(value)?
        } else if let (1, Some(&v)) = (value.len(), value.iter().next()) {
            self.broadcast_raw(v)?
        } else {
            return Err(Error::Shape(format!(
                "cannot set parameter of shape {:?} from value of shape {:?}",
                shape,
                value.shape()
            )));
        };
        self.raw.assign(&new_raw);
        Ok(())
    }

    /// Set every constrained element to `value`.
    pub fn set_scalar(&mut self, value: f64) -> Result<()> {
        self.set(&ArrayD::from_elem(IxDyn(&[]), value))
    }

    /// `log|det J|` of the transform at the current raw value.
    pub fn log_jacobian(&self) -> f64 {
        self.transform.log_jacobian(&self.raw)
    }

    /// Log-prior contribution in unconstrained space: `0` without a prior,
    /// otherwise `log_jacobian() + prior.logp(get())`.
    pub fn get_prior(&self) -> Result<f64> {
        self.log_prior_at(&self.raw)
    }

    /// Gradient of [`Self::get_prior`] with respect to the raw storage.
    ///
    /// One forward-mode pass per raw element.
    pub fn grad_log_prior(&self) -> Result<ArrayD<f64>> {
        let dim = self.raw.raw_dim();
        if self.prior.is_none() {
            return Ok(ArrayD::zeros(dim));
        }
        let mut seeded: Vec<Dual> = self.raw.iter().map(|&x| Dual::constant(x)).collect();
        let mut grad = Vec::with_capacity(seeded.len());
        for k in 0..seeded.len() {
            seeded[k].dot = 1.0;
            let raw = ArrayD::from_shape_vec(dim.clone(), seeded.clone())
                .map_err(|e| Error::Shape(e.to_string()))?;
            grad.push(self.log_prior_at(&raw)?.dot);
            seeded[k].dot = 0.0;
        }
        ArrayD::from_shape_vec(dim, grad).map_err(|e| Error::Shape(e.to_string()))
    }

    fn log_prior_at<S: Scalar>(&self, raw: &ArrayD<S>) -> Result<S> {
        match &self.prior {
            None => Ok(S::from_f64(0.0)),
            Some(prior) => {
                let value = self.transform.forward(raw)?;
                Ok(self.transform.log_jacobian(raw) + prior.logp(&value)?)
            }
        }
    }

    /// Raw tensor whose constrained image is `value` everywhere
    /// (lower triangle only for [`Transform::LowerTriangular`]).
    fn broadcast_raw(&self, value: f64) -> Result<ArrayD<f64>> {
        let unit = ArrayD::from_elem(IxDyn(&[1]), value);
        let z = match self.transform {
            // triangular entries map one-to-one onto raw entries
            Transform::LowerTriangular => value,
            t => t.inverse(&unit)?[IxDyn(&[0])],
        };
        Ok(ArrayD::from_elem(self.raw.raw_dim(), z))
    }
}

/// Stable handle to a parameter inside a [`ParamStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId(usize);

impl ParamId {
    /// Position in insertion order.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Arena of named parameters.
///
/// Free-state order is insertion order, each parameter contributing its raw
/// tensor in row-major order.
#[derive(Debug, Clone, Default)]
pub struct ParamStore {
    params: Vec<Parameter>,
    names: Vec<String>,
    index: HashMap<String, ParamId>,
}

impl ParamStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parameter under a unique name.
    pub fn insert(&mut self, name: impl Into<String>, param: Parameter) -> Result<ParamId> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(Error::Validation(format!("duplicate parameter name '{}'", name)));
        }
        let id = ParamId(self.params.len());
        tracing::debug!(
            param = %name,
            transform = %param.transform(),
            n_free = param.n_free(),
            prior = ?param.prior().map(|p| p.to_string()),
            "parameter registered"
        );
        self.index.insert(name.clone(), id);
        self.names.push(name);
        self.params.push(param);
        Ok(id)
    }

    /// Look up a parameter handle by name.
    pub fn id(&self, name: &str) -> Option<ParamId> {
        self.index.get(name).copied()
    }

    /// Name of a parameter.
    pub fn name(&self, id: ParamId) -> Result<&str> {
        self.names.get(id.0).map(String::as_str).ok_or_else(|| unknown(id))
    }

    /// Borrow a parameter.
    pub fn param(&self, id: ParamId) -> Result<&Parameter> {
        self.params.get(id.0).ok_or_else(|| unknown(id))
    }

    /// Mutably borrow a parameter.
    pub fn param_mut(&mut self, id: ParamId) -> Result<&mut Parameter> {
        self.params.get_mut(id.0).ok_or_else(|| unknown(id))
    }

    /// Constrained value of a parameter.
    pub fn value(&self, id: ParamId) -> Result<ArrayD<f64>> {
        self.param(id)?.get()
    }

    /// Set a parameter from a constrained value (see [`Parameter::set`]).
    pub fn set(&mut self, id: ParamId, value: &ArrayD<f64>) -> Result<()> {
        self.param_mut(id)?.set(value)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether the store holds no parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Parameter names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// `(id, name, parameter)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (ParamId, &str, &Parameter)> {
        self.params
            .iter()
            .zip(&self.names)
            .enumerate()
            .map(|(i, (p, n))| (ParamId(i), n.as_str(), p))
    }

    /// Total number of unconstrained elements.
    pub fn n_free(&self) -> usize {
        self.params.iter().map(Parameter::n_free).sum()
    }

    /// Concatenated raw storage of every parameter.
    pub fn free_state(&self) -> Vec<f64> {
        self.params.iter().flat_map(|p| p.raw.iter().copied()).collect()
    }

    /// Overwrite every raw tensor from a flat vector produced by [`Self::free_state`].
    pub fn set_free_state(&mut self, state: &[f64]) -> Result<()> {
        let n_free = self.n_free();
        if state.len() != n_free {
            return Err(Error::Validation(format!(
                "free state has length {}, expected {}",
                state.len(),
                n_free
            )));
        }
        let mut offset = 0;
        for p in &mut self.params {
            let n = p.n_free();
            for (dst, src) in p.raw.iter_mut().zip(&state[offset..offset + n]) {
                *dst = *src;
            }
            offset += n;
        }
        tracing::debug!(n_free, "free state updated");
        Ok(())
    }

    /// Sum of [`Parameter::get_prior`] over all parameters.
    pub fn log_prior(&self) -> Result<f64> {
        self.params.iter().map(Parameter::get_prior).sum()
    }

    /// Gradient of [`Self::log_prior`] in free-state order.
    pub fn grad_log_prior(&self) -> Result<Vec<f64>> {
        let mut grad = Vec::with_capacity(self.n_free());
        for p in &self.params {
            grad.extend(p.grad_log_prior()?.iter().copied());
        }
        Ok(grad)
    }
}

fn unknown(id: ParamId) -> Error {
    Error::Validation(format!("unknown parameter id {}", id.0))
}
