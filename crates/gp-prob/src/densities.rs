//! Elementwise log-densities.
//!
//! Each function evaluates the log-density of one element. Distribution
//! parameters are plain `f64` (priors are never differentiated with respect to
//! their own parameters); the evaluation point is generic so that gradients
//! flow back to the unconstrained parameter through [`gp_ad::Dual`].

use gp_ad::Scalar;
use statrs::function::gamma::ln_gamma;

/// `0.5 * ln(2π)`.
pub const LN_SQRT_2PI: f64 = 0.918_938_533_204_672_7;

/// Smallest / largest admissible Beta evaluation point.
const BETA_EPS: f64 = 1e-6;

/// Normal with mean `mu` and variance `var`.
#[inline]
pub fn gaussian<S: Scalar>(x: S, mu: f64, var: f64) -> S {
    let d = x - S::from_f64(mu);
    S::from_f64(-LN_SQRT_2PI - 0.5 * var.ln()) - S::from_f64(0.5) * d * d / S::from_f64(var)
}

/// Log-normal: `ln x ~ N(mu, var)`.
#[inline]
pub fn lognormal<S: Scalar>(x: S, mu: f64, var: f64) -> S {
    let lx = x.ln();
    let d = lx - S::from_f64(mu);
    S::from_f64(-LN_SQRT_2PI - 0.5 * var.ln()) - lx - S::from_f64(0.5) * d * d / S::from_f64(var)
}

/// Gamma with `shape` and `scale` (mean `shape * scale`).
#[inline]
pub fn gamma<S: Scalar>(shape: f64, scale: f64, x: S) -> S {
    let norm = -shape * scale.ln() - ln_gamma(shape);
    S::from_f64(norm) + S::from_f64(shape - 1.0) * x.ln() - x / S::from_f64(scale)
}

/// Laplace with location `mu` and scale `sigma`.
#[inline]
pub fn laplace<S: Scalar>(mu: f64, sigma: f64, x: S) -> S {
    -(S::from_f64(mu) - x).abs() / S::from_f64(sigma) - S::from_f64((2.0 * sigma).ln())
}

/// Beta(`a`, `b`) evaluated at `y` clamped to `[1e-6, 1 - 1e-6]`.
#[inline]
pub fn beta<S: Scalar>(a: f64, b: f64, y: S) -> S {
    let lo = S::from_f64(BETA_EPS);
    let hi = S::from_f64(1.0 - BETA_EPS);
    let y = if y < lo {
        lo
    } else if y > hi {
        hi
    } else {
        y
    };
    let norm = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b);
    S::from_f64(norm)
        + S::from_f64(a - 1.0) * y.ln()
        + S::from_f64(b - 1.0) * (S::from_f64(1.0) - y).ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use gp_ad::Dual;

    #[test]
    fn test_standard_normal_at_zero() {
        assert_relative_eq!(gaussian(0.0, 0.0, 1.0), -LN_SQRT_2PI, epsilon = 1e-12);
        assert_relative_eq!(gaussian(0.0, 0.0, 1.0), -0.9189385332, epsilon = 1e-9);
    }

    #[test]
    fn test_gaussian_variance_parameterization() {
        // var = 4 => sigma = 2
        let x = 1.3;
        let sigma = 2.0_f64;
        let expected = -0.5 * (x / sigma).powi(2) - sigma.ln() - LN_SQRT_2PI;
        assert_relative_eq!(gaussian(x, 0.0, 4.0), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_lognormal_change_of_variables() {
        let x = 2.5_f64;
        assert_relative_eq!(
            lognormal(x, 0.3, 0.7),
            gaussian(x.ln(), 0.3, 0.7) - x.ln(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_gamma_shape_one_is_exponential() {
        // Gamma(1, scale) = Exponential(rate = 1/scale)
        let x = 0.7;
        let scale = 0.5_f64;
        let rate = 1.0 / scale;
        assert_relative_eq!(gamma(1.0, scale, x), rate.ln() - rate * x, epsilon = 1e-12);
    }

    #[test]
    fn test_laplace_peak() {
        assert_relative_eq!(laplace(1.0, 2.0, 1.0), -(4.0_f64).ln(), epsilon = 1e-12);
        assert_relative_eq!(laplace(0.0, 1.0, 2.0), laplace(0.0, 1.0, -2.0), epsilon = 1e-12);
    }

    #[test]
    fn test_beta_uniform_case() {
        for y in [0.1, 0.5, 0.9] {
            assert_relative_eq!(beta(1.0, 1.0, y), 0.0, epsilon = 1e-12);
        }
        assert!(beta(2.0, 2.0, 0.0).is_finite());
    }

    #[test]
    fn test_gaussian_gradient() {
        // d/dx log N(x | mu, var) = -(x - mu) / var
        let d = gaussian(Dual::var(3.0), 1.0, 2.0);
        assert_relative_eq!(d.dot, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_gamma_gradient() {
        // d/dx = (shape - 1)/x - 1/scale
        let d = gamma(3.0, 2.0, Dual::var(1.5));
        assert_relative_eq!(d.dot, 2.0 / 1.5 - 0.5, epsilon = 1e-12);
    }
}
