//! Small numerically-stable math utilities used by transforms and densities.

use gp_ad::Scalar;

/// Stable softplus `log(1 + exp(x))`.
///
/// Shifted form: `max(x, 0) + log(1 + exp(-|x|))`, so `exp` never overflows.
#[inline]
pub fn softplus<S: Scalar>(x: S) -> S {
    x.max_s(S::from_f64(0.0)) + (-x.abs()).exp().ln_1p()
}

/// Stable `log(sigmoid(x)) = -softplus(-x)`.
#[inline]
pub fn log_sigmoid<S: Scalar>(x: S) -> S {
    -softplus(-x)
}

/// Inverse softplus `log(exp(y) - 1)` for `y > 0`.
///
/// Returns `-inf` at `y = 0` and NaN for `y < 0`; callers check the domain first.
#[inline]
pub fn inverse_softplus(y: f64) -> f64 {
    if y > 20.0 {
        // log(exp(y) - 1) = y + log(1 - exp(-y))
        y + (-(-y).exp()).ln_1p()
    } else {
        y.exp_m1().ln()
    }
}
