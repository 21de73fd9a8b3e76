//! Scalar types of coefficient vectors.

use std::fmt::Debug;

use num_complex::Complex64;
use num_traits::Num;

/// Scalar stored in a coefficient vector.
///
/// Implemented for real (`f64`) and complex (`Complex64`) coefficients. Complex
/// vectors are treated as real vector spaces of twice the dimension, so every
/// inner product in the crate is `Re(<a, b>)`.
pub trait Coefficient: Num + Copy + Send + Sync + Debug + 'static {
    /// Absolute value.
    fn modulus(self) -> f64;

    /// Multiplication by a real factor.
    fn scale(self, factor: f64) -> Self;

    /// `Re(conj(self) * other)`.
    fn re_dot(self, other: Self) -> f64;

    /// Embeds a real value.
    fn from_real(value: f64) -> Self;
}

impl Coefficient for f64 {
    #[inline]
    fn modulus(self) -> f64 {
        self.abs()
    }

    #[inline]
    fn scale(self, factor: f64) -> Self {
        self * factor
    }

    #[inline]
    fn re_dot(self, other: Self) -> f64 {
        self * other
    }

    #[inline]
    fn from_real(value: f64) -> Self {
        value
    }
}

impl Coefficient for Complex64 {
    #[inline]
    fn modulus(self) -> f64 {
        self.norm()
    }

    #[inline]
    fn scale(self, factor: f64) -> Self {
        self * factor
    }

    #[inline]
    fn re_dot(self, other: Self) -> f64 {
        self.re * other.re + self.im * other.im
    }

    #[inline]
    fn from_real(value: f64) -> Self {
        Complex64::new(value, 0.0)
    }
}

/// Real inner product of two coefficient vectors.
pub fn inner<T: Coefficient>(a: &[T], b: &[T]) -> f64 {
    a.iter().zip(b).map(|(&a, &b)| a.re_dot(b)).sum()
}

/// Squared euclidean norm.
pub fn norm_sq<T: Coefficient>(a: &[T]) -> f64 {
    inner(a, a)
}
