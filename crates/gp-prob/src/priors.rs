//! Prior distributions over constrained parameter values.
//!
//! A [`Prior`] is immutable after construction. Parameters are stored as tensors
//! (scalars as shape `[1]`) and broadcast against the evaluation point with
//! numpy rules, so a scalar prior applies independently to every element.

use std::fmt;

use gp_ad::Scalar;
use gp_core::{Error, Result, Value};
use ndarray::{ArrayD, ArrayViewD, IxDyn};
use rand::distr::{Distribution, Open01, StandardUniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Gamma as GammaDist, StandardNormal};

use crate::densities;

/// Prior distribution family with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Prior {
    /// Normal with mean `mu` and variance `var`.
    Gaussian {
        /// Mean.
        mu: ArrayD<f64>,
        /// Variance.
        var: ArrayD<f64>,
    },
    /// `ln x ~ N(mu, var)`.
    LogNormal {
        /// Mean of `ln x`.
        mu: ArrayD<f64>,
        /// Variance of `ln x`.
        var: ArrayD<f64>,
    },
    /// Gamma with `shape` and `scale`.
    Gamma {
        /// Shape `k > 0`.
        shape: ArrayD<f64>,
        /// Scale `theta > 0`.
        scale: ArrayD<f64>,
    },
    /// Laplace with location `mu` and scale `sigma`.
    Laplace {
        /// Location.
        mu: ArrayD<f64>,
        /// Scale.
        sigma: ArrayD<f64>,
    },
    /// Beta(`a`, `b`). Neither `logp` nor `sample` is available yet.
    Beta {
        /// First shape parameter.
        a: ArrayD<f64>,
        /// Second shape parameter.
        b: ArrayD<f64>,
    },
    /// Uniform on `[lower, upper]`.
    Uniform {
        /// Lower bound.
        lower: ArrayD<f64>,
        /// Upper bound.
        upper: ArrayD<f64>,
    },
}

impl Prior {
    /// Normal prior `N(mu, var)`.
    pub fn gaussian(mu: impl Into<Value>, var: impl Into<Value>) -> Result<Self> {
        Ok(Prior::Gaussian { mu: mu.into().to_array()?, var: var.into().to_array()? })
    }

    /// Log-normal prior.
    pub fn lognormal(mu: impl Into<Value>, var: impl Into<Value>) -> Result<Self> {
        Ok(Prior::LogNormal { mu: mu.into().to_array()?, var: var.into().to_array()? })
    }

    /// Gamma prior with shape / scale parameterization.
    pub fn gamma(shape: impl Into<Value>, scale: impl Into<Value>) -> Result<Self> {
        Ok(Prior::Gamma { shape: shape.into().to_array()?, scale: scale.into().to_array()? })
    }

    /// Laplace prior.
    pub fn laplace(mu: impl Into<Value>, sigma: impl Into<Value>) -> Result<Self> {
        Ok(Prior::Laplace { mu: mu.into().to_array()?, sigma: sigma.into().to_array()? })
    }

    /// Beta prior.
    pub fn beta(a: impl Into<Value>, b: impl Into<Value>) -> Result<Self> {
        Ok(Prior::Beta { a: a.into().to_array()?, b: b.into().to_array()? })
    }

    /// Uniform prior on `[lower, upper]`.
    pub fn uniform(lower: impl Into<Value>, upper: impl Into<Value>) -> Result<Self> {
        Ok(Prior::Uniform { lower: lower.into().to_array()?, upper: upper.into().to_array()? })
    }

    /// Sum of the elementwise log-density of `x`.
    ///
    /// `Uniform` only accepts 1-D `x` and contributes `-ln(upper - lower)` per
    /// element without checking that `x` lies inside the bounds.
    pub fn logp<S: Scalar>(&self, x: &ArrayD<S>) -> Result<S> {
        match self {
            Prior::Gaussian { mu, var } => sum_elementwise(x, mu, var, densities::gaussian),
            Prior::LogNormal { mu, var } => sum_elementwise(x, mu, var, densities::lognormal),
            Prior::Gamma { shape, scale } => {
                sum_elementwise(x, shape, scale, |xi, k, theta| densities::gamma(k, theta, xi))
            }
            Prior::Laplace { mu, sigma } => {
                sum_elementwise(x, mu, sigma, |xi, m, s| densities::laplace(m, s, xi))
            }
            Prior::Beta { .. } => {
                Err(Error::NotImplemented("Beta prior log-density is not available".to_string()))
            }
            Prior::Uniform { lower, upper } => {
                if x.ndim() != 1 {
                    return Err(Error::Shape(format!(
                        "uniform prior expects a 1-D value, got shape {:?}",
                        x.shape()
                    )));
                }
                let lo = broadcast(lower, x.shape(), "lower")?;
                let hi = broadcast(upper, x.shape(), "upper")?;
                let log_height: f64 = lo.iter().zip(hi.iter()).map(|(&l, &u)| -(u - l).ln()).sum();
                Ok(S::from_f64(log_height))
            }
        }
    }

    /// Draw independent samples with the given shape.
    pub fn sample<R: Rng + ?Sized>(&self, shape: &[usize], rng: &mut R) -> Result<ArrayD<f64>> {
        let draws: Vec<f64> = match self {
            Prior::Gaussian { mu, var } => {
                let (mu, var) = (broadcast(mu, shape, "mu")?, broadcast(var, shape, "var")?);
                mu.iter()
                    .zip(var.iter())
                    .map(|(&m, &v)| {
                        let z: f64 = StandardNormal.sample(&mut *rng);
                        m + v.sqrt() * z
                    })
                    .collect()
            }
            Prior::LogNormal { mu, var } => {
                let (mu, var) = (broadcast(mu, shape, "mu")?, broadcast(var, shape, "var")?);
                mu.iter()
                    .zip(var.iter())
                    .map(|(&m, &v)| {
                        let z: f64 = StandardNormal.sample(&mut *rng);
                        (m + v.sqrt() * z).exp()
                    })
                    .collect()
            }
            Prior::Gamma { shape: k, scale } => {
                let (k, scale) = (broadcast(k, shape, "shape")?, broadcast(scale, shape, "scale")?);
                k.iter()
                    .zip(scale.iter())
                    .map(|(&k, &theta)| {
                        let dist = GammaDist::new(k, theta).map_err(|e| {
                            Error::Validation(format!("gamma(shape={}, scale={}): {}", k, theta, e))
                        })?;
                        Ok(dist.sample(&mut *rng))
                    })
                    .collect::<Result<Vec<f64>>>()?
            }
            Prior::Laplace { mu, sigma } => {
                let (mu, sigma) = (broadcast(mu, shape, "mu")?, broadcast(sigma, shape, "sigma")?);
                mu.iter()
                    .zip(sigma.iter())
                    .map(|(&m, &s)| {
                        // Inverse CDF on u in (-1/2, 1/2).
                        let u: f64 = Open01.sample(&mut *rng);
                        let u = u - 0.5;
                        m - s * u.signum() * (1.0 - 2.0 * u.abs()).ln()
                    })
                    .collect()
            }
            Prior::Beta { .. } => {
                return Err(Error::NotImplemented("Beta prior sampling is not available".to_string()));
            }
            Prior::Uniform { lower, upper } => {
                let (lo, hi) = (broadcast(lower, shape, "lower")?, broadcast(upper, shape, "upper")?);
                lo.iter()
                    .zip(hi.iter())
                    .map(|(&l, &u)| {
                        let r: f64 = StandardUniform.sample(&mut *rng);
                        l + (u - l) * r
                    })
                    .collect()
            }
        };
        ArrayD::from_shape_vec(IxDyn(shape), draws).map_err(|e| Error::Shape(e.to_string()))
    }

    /// [`Self::sample`] with a `StdRng` seeded from `seed`.
    pub fn sample_seeded(&self, shape: &[usize], seed: u64) -> Result<ArrayD<f64>> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.sample(shape, &mut rng)
    }
}

impl fmt::Display for Prior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, p, q) = match self {
            Prior::Gaussian { mu, var } => ("N", mu, var),
            Prior::LogNormal { mu, var } => ("logN", mu, var),
            Prior::Gamma { shape, scale } => ("Ga", shape, scale),
            Prior::Laplace { mu, sigma } => ("Lap.", mu, sigma),
            Prior::Beta { a, b } => ("Beta", a, b),
            Prior::Uniform { lower, upper } => ("U", lower, upper),
        };
        write!(f, "{}({},{})", name, FmtParam(p), FmtParam(q))
    }
}

struct FmtParam<'a>(&'a ArrayD<f64>);

impl fmt::Display for FmtParam<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.len() == 1 {
            if let Some(v) = self.0.iter().next() {
                return write!(f, "{}", v);
            }
        }
        f.write_str("[")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", v)?;
        }
        f.write_str("]")
    }
}

fn broadcast<'a>(p: &'a ArrayD<f64>, shape: &[usize], name: &str) -> Result<ArrayViewD<'a, f64>> {
    p.broadcast(shape).ok_or_else(|| {
        Error::Shape(format!(
            "prior parameter `{}` of shape {:?} does not broadcast to {:?}",
            name,
            p.shape(),
            shape
        ))
    })
}

fn sum_elementwise<S, F>(x: &ArrayD<S>, p: &ArrayD<f64>, q: &ArrayD<f64>, f: F) -> Result<S>
where
    S: Scalar,
    F: Fn(S, f64, f64) -> S,
{
    let p = broadcast(p, x.shape(), "first")?;
    let q = broadcast(q, x.shape(), "second")?;
    Ok(x.iter().zip(p.iter()).zip(q.iter()).map(|((&xi, &a), &b)| f(xi, a, b)).sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use gp_ad::Dual;
    use ndarray::arr1;

    fn vec1(xs: &[f64]) -> ArrayD<f64> {
        arr1(xs).into_dyn()
    }

    #[test]
    fn test_gaussian_standard_at_zero() {
        let p = Prior::gaussian(0.0, 1.0).unwrap();
        assert_relative_eq!(p.logp(&vec1(&[0.0])).unwrap(), -0.918_938_533_204_672_7, epsilon = 1e-12);
    }

    #[test]
    fn test_logp_sums_over_elements() {
        let p = Prior::gaussian(1.0, 2.0).unwrap();
        let xs = [0.5, 1.0, 3.0];
        let expected: f64 = xs.iter().map(|&x| densities::gaussian(x, 1.0, 2.0)).sum();
        assert_relative_eq!(p.logp(&vec1(&xs)).unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_vector_parameters_broadcast() {
        let p = Prior::gaussian(vec![0.0, 1.0], 1.0).unwrap();
        let lp = p.logp(&vec1(&[0.0, 1.0])).unwrap();
        assert_relative_eq!(lp, 2.0 * densities::gaussian(0.0, 0.0, 1.0), epsilon = 1e-12);

        let err = p.logp(&vec1(&[0.0, 1.0, 2.0])).unwrap_err();
        assert!(matches!(err, Error::Shape(_)));
    }

    #[test]
    fn test_gamma_and_laplace_argument_order() {
        let g = Prior::gamma(2.0, 3.0).unwrap();
        assert_relative_eq!(
            g.logp(&vec1(&[1.5])).unwrap(),
            densities::gamma(2.0, 3.0, 1.5),
            epsilon = 1e-12
        );
        let l = Prior::laplace(0.5, 2.0).unwrap();
        assert_relative_eq!(
            l.logp(&vec1(&[-1.0])).unwrap(),
            densities::laplace(0.5, 2.0, -1.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_uniform_constant_height() {
        let p = Prior::uniform(0.0, 1.0).unwrap();
        assert_eq!(p.logp(&vec1(&[0.1, 0.5, 0.9])).unwrap(), 0.0);

        let p = Prior::uniform(-1.0, 3.0).unwrap();
        assert_relative_eq!(
            p.logp(&vec1(&[0.0, 2.0])).unwrap(),
            -2.0 * 4.0_f64.ln(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_uniform_rejects_matrix() {
        let p = Prior::uniform(0.0, 1.0).unwrap();
        let m = ArrayD::<f64>::zeros(IxDyn(&[2, 2]));
        assert!(matches!(p.logp(&m), Err(Error::Shape(_))));
    }

    #[test]
    fn test_beta_is_not_implemented() {
        let p = Prior::beta(2.0, 2.0).unwrap();
        assert!(matches!(p.logp(&vec1(&[0.5])), Err(Error::NotImplemented(_))));
        assert!(matches!(p.sample_seeded(&[3], 0), Err(Error::NotImplemented(_))));
    }

    #[test]
    fn test_sample_shapes_and_support() {
        let shape = [4, 5];
        for prior in [
            Prior::gaussian(0.0, 1.0).unwrap(),
            Prior::lognormal(0.0, 1.0).unwrap(),
            Prior::gamma(2.0, 0.5).unwrap(),
            Prior::laplace(0.0, 1.0).unwrap(),
            Prior::uniform(2.0, 3.0).unwrap(),
        ] {
            let s = prior.sample_seeded(&shape, 7).unwrap();
            assert_eq!(s.shape(), &shape, "{}", prior);
            assert!(s.iter().all(|v| v.is_finite()), "{}", prior);
        }
        let pos = Prior::lognormal(0.0, 1.0).unwrap().sample_seeded(&[100], 1).unwrap();
        assert!(pos.iter().all(|&v| v > 0.0));
        let g = Prior::gamma(2.0, 0.5).unwrap().sample_seeded(&[100], 1).unwrap();
        assert!(g.iter().all(|&v| v > 0.0));
        let u = Prior::uniform(2.0, 3.0).unwrap().sample_seeded(&[100], 1).unwrap();
        assert!(u.iter().all(|&v| (2.0..=3.0).contains(&v)));
    }

    #[test]
    fn test_sample_moments() {
        let n = 20_000;
        let s = Prior::gaussian(2.0, 4.0).unwrap().sample_seeded(&[n], 42).unwrap();
        let mean = s.sum() / n as f64;
        let var = s.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
        assert!((mean - 2.0).abs() < 0.1, "mean={}", mean);
        assert!((var - 4.0).abs() < 0.3, "var={}", var);

        let s = Prior::laplace(1.0, 0.5).unwrap().sample_seeded(&[n], 43).unwrap();
        let mean = s.sum() / n as f64;
        assert!((mean - 1.0).abs() < 0.05, "mean={}", mean);

        let s = Prior::uniform(0.0, 1.0).unwrap().sample_seeded(&[n], 44).unwrap();
        let mean = s.sum() / n as f64;
        assert!((mean - 0.5).abs() < 0.02, "mean={}", mean);
    }

    #[test]
    fn test_sample_seeded_is_deterministic() {
        let p = Prior::gamma(3.0, 1.0).unwrap();
        assert_eq!(p.sample_seeded(&[8], 9).unwrap(), p.sample_seeded(&[8], 9).unwrap());
    }

    #[test]
    fn test_gamma_sample_invalid_params() {
        let p = Prior::gamma(-1.0, 1.0).unwrap();
        assert!(matches!(p.sample_seeded(&[2], 0), Err(Error::Validation(_))));
    }

    #[test]
    fn test_display() {
        assert_eq!(Prior::gaussian(0.0, 1.0).unwrap().to_string(), "N(0,1)");
        assert_eq!(Prior::lognormal(0.5, 2.0).unwrap().to_string(), "logN(0.5,2)");
        assert_eq!(Prior::gamma(2.0, 0.5).unwrap().to_string(), "Ga(2,0.5)");
        assert_eq!(Prior::laplace(0.0, 1.0).unwrap().to_string(), "Lap.(0,1)");
        assert_eq!(Prior::beta(1.0, 3.0).unwrap().to_string(), "Beta(1,3)");
        assert_eq!(Prior::uniform(vec![0.0, 1.0], 2.0).unwrap().to_string(), "U([0, 1],2)");
    }

    #[test]
    fn test_logp_gradient_through_dual() {
        let p = Prior::gaussian(1.0, 2.0).unwrap();
        let x = arr1(&[Dual::var(3.0)]).into_dyn();
        let lp = p.logp(&x).unwrap();
        assert_relative_eq!(lp.dot, -1.0, epsilon = 1e-12);
    }
}
