//! Input value types.

use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A constrained value as supplied by a caller or a configuration file.
///
/// Scalars are broadcast to a length-1 vector when converted to a tensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Single number.
    Scalar(f64),
    /// Flat vector.
    Vector(Vec<f64>),
    /// Row-major matrix (rows must have equal length).
    Matrix(Vec<Vec<f64>>),
}

impl Value {
    /// Convert into a dynamic-rank tensor.
    pub fn to_array(&self) -> Result<ArrayD<f64>> {
        match self {
            Value::Scalar(v) => Ok(ArrayD::from_elem(IxDyn(&[1]), *v)),
            Value::Vector(v) => Ok(ArrayD::from_shape_vec(IxDyn(&[v.len()]), v.clone())
                .map_err(|e| Error::Shape(e.to_string()))?),
            Value::Matrix(rows) => {
                let n_rows = rows.len();
                let n_cols = rows.first().map_or(0, Vec::len);
                if let Some(bad) = rows.iter().position(|r| r.len() != n_cols) {
                    return Err(Error::Shape(format!(
                        "ragged matrix: row {} has length {}, expected {}",
                        bad,
                        rows[bad].len(),
                        n_cols
                    )));
                }
                let flat: Vec<f64> = rows.iter().flatten().copied().collect();
                ArrayD::from_shape_vec(IxDyn(&[n_rows, n_cols]), flat)
                    .map_err(|e| Error::Shape(e.to_string()))
            }
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Scalar(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::Vector(v)
    }
}

impl From<&[f64]> for Value {
    fn from(v: &[f64]) -> Self {
        Value::Vector(v.to_vec())
    }
}

impl From<Vec<Vec<f64>>> for Value {
    fn from(v: Vec<Vec<f64>>) -> Self {
        Value::Matrix(v)
    }
}
