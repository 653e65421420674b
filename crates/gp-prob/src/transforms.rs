//! Bijective transforms between unconstrained `raw` tensors and constrained values.
//!
//! Optimizers operate on `raw ∈ R^n`. A [`Transform`] maps it to the value the
//! model consumes (`forward`), maps a constrained value back (`inverse`), and
//! supplies `log|det d forward / d raw|`, the change-of-variables term that turns
//! a prior on the constrained value into a density on `raw`.

use gp_ad::Scalar;
use gp_core::{Error, Result};
use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};

use crate::math::{inverse_softplus, log_sigmoid, softplus};

/// Constraint applied to a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    /// `(-inf, inf) -> (-inf, inf)`, `y = x`.
    Identity,
    /// `(-inf, inf) -> (0, inf)`, `y = softplus(x)`.
    Positive,
    /// Flat vector of length `N(N+1)/2` (optionally `× D`) scattered into the lower
    /// triangle of an `N×N` (`N×N×D`) matrix, row by row.
    LowerTriangular,
}

impl Transform {
    /// Map unconstrained -> constrained.
    pub fn forward<S: Scalar>(&self, raw: &ArrayD<S>) -> Result<ArrayD<S>> {
        match self {
            Transform::Identity => Ok(raw.clone()),
            Transform::Positive => Ok(raw.mapv(softplus)),
            Transform::LowerTriangular => vec_to_tril(raw),
        }
    }

    /// Map constrained -> unconstrained.
    ///
    /// `Positive` raises [`Error::Domain`] for any value that is not finite and
    /// strictly positive rather than storing a NaN / -inf raw value.
    pub fn inverse(&self, value: &ArrayD<f64>) -> Result<ArrayD<f64>> {
        match self {
            Transform::Identity => Ok(value.clone()),
            Transform::Positive => {
                if let Some(bad) = value.iter().find(|v| !(v.is_finite() && **v > 0.0)) {
                    return Err(Error::Domain(format!(
                        "positive transform requires finite values > 0, got {}",
                        bad
                    )));
                }
                Ok(value.mapv(inverse_softplus))
            }
            Transform::LowerTriangular => tril_to_vec(value),
        }
    }

    /// `log|det J|` of `forward` at `raw`, summed over all elements.
    pub fn log_jacobian<S: Scalar>(&self, raw: &ArrayD<S>) -> S {
        match self {
            Transform::Identity | Transform::LowerTriangular => S::from_f64(0.0),
            // d/dx softplus(x) = sigmoid(x)
            Transform::Positive => raw.iter().map(|&x| log_sigmoid(x)).sum(),
        }
    }

    /// Shape of `forward(raw)` for a raw tensor of shape `raw_shape`.
    pub fn constrained_shape(&self, raw_shape: &[usize]) -> Result<Vec<usize>> {
        match self {
            Transform::Identity | Transform::Positive => Ok(raw_shape.to_vec()),
            Transform::LowerTriangular => {
                let (n, depth) = tril_raw_dims(raw_shape)?;
                Ok(match depth {
                    Some(d) => vec![n, n, d],
                    None => vec![n, n],
                })
            }
        }
    }
}

impl std::fmt::Display for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Transform::Identity => "identity",
            Transform::Positive => "+ve",
            Transform::LowerTriangular => "lower_tri",
        };
        f.write_str(name)
    }
}

/// Solve `numel = N(N+1)/2` for `N`.
pub fn triangular_size(numel: usize) -> Result<usize> {
    if numel == 0 {
        return Err(Error::Shape("lower-triangular storage must be non-empty".to_string()));
    }
    let n = ((((8 * numel + 1) as f64).sqrt() - 1.0) / 2.0).round() as usize;
    if n * (n + 1) / 2 != numel {
        return Err(Error::Shape(format!(
            "lower-triangular storage length {} is not a triangular number",
            numel
        )));
    }
    Ok(n)
}

/// Row-major `(i, j)` pairs with `i >= j`.
fn tril_indices(n: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..n).flat_map(|i| (0..=i).map(move |j| (i, j)))
}

fn tril_raw_dims(raw_shape: &[usize]) -> Result<(usize, Option<usize>)> {
    match *raw_shape {
        [numel] => Ok((triangular_size(numel)?, None)),
        [numel, depth] => Ok((triangular_size(numel)?, Some(depth))),
        _ => Err(Error::Shape(format!(
            "lower-triangular storage must be 1-D or 2-D, got shape {:?}",
            raw_shape
        ))),
    }
}

fn vec_to_tril<S: Scalar>(raw: &ArrayD<S>) -> Result<ArrayD<S>> {
    let (n, depth) = tril_raw_dims(raw.shape())?;
    let zero = S::from_f64(0.0);
    match depth {
        None => {
            let mut mat = ArrayD::from_elem(IxDyn(&[n, n]), zero);
            for (k, (i, j)) in tril_indices(n).enumerate() {
                mat[IxDyn(&[i, j])] = raw[IxDyn(&[k])];
            }
            Ok(mat)
        }
        Some(d) => {
            let mut mat = ArrayD::from_elem(IxDyn(&[n, n, d]), zero);
            for (k, (i, j)) in tril_indices(n).enumerate() {
                for c in 0..d {
                    mat[IxDyn(&[i, j, c])] = raw[IxDyn(&[k, c])];
                }
            }
            Ok(mat)
        }
    }
}

fn tril_to_vec(value: &ArrayD<f64>) -> Result<ArrayD<f64>> {
    let shape = value.shape();
    let (n, depth) = match *shape {
        [r, c] if r == c => (r, None),
        [r, c, d] if r == c => (r, Some(d)),
        _ => {
            return Err(Error::Shape(format!(
                "lower-triangular value must be N×N or N×N×D, got shape {:?}",
                shape
            )))
        }
    };
    if n == 0 {
        return Err(Error::Shape("lower-triangular value must be non-empty".to_string()));
    }
    for (ix, v) in value.indexed_iter() {
        let (i, j) = (ix[0], ix[1]);
        if j > i && *v != 0.0 {
            return Err(Error::Domain(format!(
                "lower-triangular value has non-zero entry {} above the diagonal at ({}, {})",
                v, i, j
            )));
        }
    }

    let numel = n * (n + 1) / 2;
    match depth {
        None => {
            let flat: Vec<f64> = tril_indices(n).map(|(i, j)| value[IxDyn(&[i, j])]).collect();
            ArrayD::from_shape_vec(IxDyn(&[numel]), flat).map_err(|e| Error::Shape(e.to_string()))
        }
        Some(d) => {
            let flat: Vec<f64> = tril_indices(n)
                .flat_map(|(i, j)| (0..d).map(move |c| (i, j, c)))
                .map(|(i, j, c)| value[IxDyn(&[i, j, c])])
                .collect();
            ArrayD::from_shape_vec(IxDyn(&[numel, d]), flat)
                .map_err(|e| Error::Shape(e.to_string()))
        }
    }
}
