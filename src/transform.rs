//! Transformations between the harmonic, pixel and wavelet domains.

use std::marker::PhantomData;

use crate::{coefficient::Coefficient, error::Error};

mod spherical;
mod wavelet;

pub use spherical::HarmonicTransform;
pub use wavelet::{SphericalWaveletTransform, WaveletSpace};

/// A pair of transformations between a field and its coefficients.
///
/// `forwards` decomposes a field, `backwards` reconstructs it and
/// `backwards_adjoint` is the exact adjoint of `backwards` under the real
/// inner products of both spaces.
pub trait TransformPair: Send + Sync {
    type Field: Coefficient;
    type Coeff: Coefficient;

    /// Length of a field.
    fn field_len(&self) -> usize;

    /// Length of a coefficient vector.
    fn coeff_len(&self) -> usize;

    fn forwards(&self, field: &[Self::Field]) -> Result<Vec<Self::Coeff>, Error>;

    fn backwards(&self, coeffs: &[Self::Coeff]) -> Result<Vec<Self::Field>, Error>;

    fn backwards_adjoint(&self, field: &[Self::Field]) -> Result<Vec<Self::Coeff>, Error>;
}

/// Transformation leaving vectors of a fixed length unchanged.
#[derive(Debug, Clone, Copy)]
pub struct Identity<T> {
    len: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Identity<T> {
    /// Constructs a new `Identity` on vectors of length `len`.
    pub fn new(len: usize) -> Self {
        Self {
            len,
            _marker: PhantomData,
        }
    }
}

impl<T: Coefficient> TransformPair for Identity<T> {
    type Field = T;
    type Coeff = T;

    fn field_len(&self) -> usize {
        self.len
    }

    fn coeff_len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    fn forwards(&self, field: &[T]) -> Result<Vec<T>, Error> {
        Error::check_len("identity transform", field.len(), self.len)?;
        Ok(field.to_vec())
    }

    #[inline(always)]
    fn backwards(&self, coeffs: &[T]) -> Result<Vec<T>, Error> {
        Error::check_len("identity transform", coeffs.len(), self.len)?;
        Ok(coeffs.to_vec())
    }

    #[inline(always)]
    fn backwards_adjoint(&self, field: &[T]) -> Result<Vec<T>, Error> {
        self.forwards(field)
    }
}
