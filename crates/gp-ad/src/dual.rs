//! Forward-mode automatic differentiation via dual numbers.
//!
//! A `Dual` carries a primal value and the derivative of that value along a
//! single seeded direction. Seeding one raw parameter element with `dot = 1`
//! and evaluating an objective yields that element's partial derivative.

use std::iter::Sum;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// A dual number `val + dot·ε` with `ε² = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dual {
    /// Primal (function) value.
    pub val: f64,
    /// Tangent (derivative) value.
    pub dot: f64,
}

impl Dual {
    /// Create a constant (derivative = 0).
    #[inline]
    pub fn constant(val: f64) -> Self {
        Self { val, dot: 0.0 }
    }

    /// Create an independent variable (derivative = 1).
    #[inline]
    pub fn var(val: f64) -> Self {
        Self { val, dot: 1.0 }
    }

    /// `d/dx ln(x) = 1/x`
    #[inline]
    pub fn ln(self) -> Self {
        Self { val: self.val.ln(), dot: self.dot / self.val }
    }

    /// `d/dx ln(1 + x) = 1/(1 + x)`
    #[inline]
    pub fn ln_1p(self) -> Self {
        Self { val: self.val.ln_1p(), dot: self.dot / (1.0 + self.val) }
    }

    /// `d/dx exp(x) = exp(x)`
    #[inline]
    pub fn exp(self) -> Self {
        let e = self.val.exp();
        Self { val: e, dot: self.dot * e }
    }

    /// `d/dx |x| = sign(x)`, with `+1` at both `+0.0` and `-0.0`.
    ///
    /// The zero case must break the same way as [`Dual::max`] so that
    /// `max(x, 0) + ln(1 + exp(-|x|))` differentiates to `0.5` at either zero.
    #[inline]
    pub fn abs(self) -> Self {
        let sign = if self.val >= 0.0 { 1.0 } else { -1.0 };
        Self { val: self.val.abs(), dot: self.dot * sign }
    }

    /// Maximum of two duals. Derivative follows the larger operand.
    #[inline]
    pub fn max(self, other: Self) -> Self {
        if self.val >= other.val { self } else { other }
    }
}

impl Add for Dual {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self { val: self.val + rhs.val, dot: self.dot + rhs.dot }
    }
}

impl Sub for Dual {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self { val: self.val - rhs.val, dot: self.dot - rhs.dot }
    }
}

impl Mul for Dual {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self { val: self.val * rhs.val, dot: self.dot * rhs.val + self.val * rhs.dot }
    }
}

impl Div for Dual {
    type Output = Self;
    #[inline]
    fn div(self, rhs: Self) -> Self {
        Self {
            val: self.val / rhs.val,
            dot: (self.dot * rhs.val - self.val * rhs.dot) / (rhs.val * rhs.val),
        }
    }
}

impl Neg for Dual {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self { val: -self.val, dot: -self.dot }
    }
}

impl Sum for Dual {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Dual::constant(0.0), |acc, x| acc + x)
    }
}

impl From<f64> for Dual {
    fn from(val: f64) -> Self {
        Self::constant(val)
    }
}

impl PartialOrd for Dual {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.val.partial_cmp(&other.val)
    }
}
