//! Sparsity-promoting L1 priors and their proximal operators.

use std::marker::PhantomData;

use crate::{coefficient::Coefficient, error::Error, transform::TransformPair};

/// Soft thresholding `sign(x) max(|x| - threshold, 0)`.
///
/// Returns exactly zero when `|x| <= threshold`.
#[inline]
pub fn soft<T: Coefficient>(x: T, threshold: f64) -> T {
    let modulus = x.modulus();
    if modulus <= threshold {
        T::zero()
    } else {
        x.scale(1.0 - threshold / modulus)
    }
}

/// Soft thresholding of every element.
pub fn soft_all<T: Coefficient>(x: &[T], threshold: f64) -> Vec<T> {
    x.iter().map(|&x| soft(x, threshold)).collect()
}

/// Keeps the `floor(fraction * len)` elements of largest modulus and zeroes
/// the rest. Elements tied with the smallest kept modulus are kept as well.
pub fn hard<T: Coefficient>(x: &[T], fraction: f64) -> Result<Vec<T>, Error> {
    if !(0.0..=1.0).contains(&fraction) {
        return Err(Error::Configuration(format!(
            "kept fraction must lie in [0, 1], got {fraction}"
        )));
    }

    let keep = (fraction * x.len() as f64).floor() as usize;
    if keep == 0 {
        return Ok(vec![T::zero(); x.len()]);
    }

    let mut moduli: Vec<f64> = x.iter().map(|x| x.modulus()).collect();
    moduli.sort_unstable_by(|a, b| b.total_cmp(a));
    let cutoff = moduli[keep - 1];

    Ok(x.iter()
        .map(|&x| if x.modulus() < cutoff { T::zero() } else { x })
        .collect())
}

/// A log-prior `-log p(X) = mu * prior(X)` with a proximal operator.
pub trait Regularizer: Send + Sync {
    type Param: Coefficient;

    /// Value of the penalty.
    fn prior(&self, x: &[Self::Param]) -> Result<f64, Error>;

    /// Proximal operator of the penalty.
    fn proxf(&self, x: &[Self::Param]) -> Result<Vec<Self::Param>, Error>;
}

/// Checks a threshold and optional per-coefficient weights.
fn validate(threshold: f64, weights: Option<&[f64]>) -> Result<(), Error> {
    if !(threshold.is_finite() && threshold >= 0.0) {
        return Err(Error::Configuration(format!(
            "threshold must be non-negative, got {threshold}"
        )));
    }
    if let Some(weights) = weights {
        if weights.iter().any(|&w| !(w.is_finite() && w > 0.0)) {
            return Err(Error::Configuration("weights must be positive".into()));
        }
    }
    Ok(())
}

/// `sum_i |w_i x_i|`.
fn weighted_l1<T: Coefficient>(x: &[T], weights: Option<&[f64]>) -> Result<f64, Error> {
    match weights {
        None => Ok(x.iter().map(|x| x.modulus()).sum()),
        Some(weights) => {
            Error::check_len("weighted prior", x.len(), weights.len())?;
            Ok(x.iter().zip(weights).map(|(x, w)| w * x.modulus()).sum())
        }
    }
}

/// L1 prior on the sampled coefficients themselves.
///
/// The weighted variant evens out the contribution of coefficients sampled at
/// different densities, e.g. the crowded polar pixels of an equiangular grid.
#[derive(Debug, Clone)]
pub struct SynthesisL1<T> {
    threshold: f64,
    weights: Option<Vec<f64>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Coefficient> SynthesisL1<T> {
    pub fn new(threshold: f64) -> Result<Self, Error> {
        validate(threshold, None)?;
        Ok(Self {
            threshold,
            weights: None,
            _marker: PhantomData,
        })
    }

    /// Weighted prior `sum_i |w_i x_i|`.
    pub fn weighted(threshold: f64, weights: Vec<f64>) -> Result<Self, Error> {
        validate(threshold, Some(&weights))?;
        Ok(Self {
            threshold,
            weights: Some(weights),
            _marker: PhantomData,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn weights(&self) -> Option<&[f64]> {
        self.weights.as_deref()
    }
}

impl<T: Coefficient> Regularizer for SynthesisL1<T> {
    type Param = T;

    fn prior(&self, x: &[T]) -> Result<f64, Error> {
        weighted_l1(x, self.weights())
    }

    fn proxf(&self, x: &[T]) -> Result<Vec<T>, Error> {
        match &self.weights {
            None => Ok(soft_all(x, self.threshold)),
            Some(weights) => {
                Error::check_len("weighted proximal operator", x.len(), weights.len())?;
                // X + (soft(wX, T w^2) - wX) / w
                Ok(x.iter()
                    .zip(weights)
                    .map(|(&x, &w)| {
                        let wx = x.scale(w);
                        x + (soft(wx, self.threshold * w * w) - wx).scale(1.0 / w)
                    })
                    .collect())
            }
        }
    }
}

/// L1 prior of analysis mode, where the sampled parameters are the field
/// itself.
///
/// `prior` is the L1 norm of the field. The proximal operator shrinks the
/// transform coefficients instead, `X + backwards(soft(forwards(X)) -
/// forwards(X))`, and borrows the transform of the forward operator for it.
#[derive(Debug, Clone)]
pub struct AnalysisL1<'a, P> {
    transform: &'a P,
    threshold: f64,
    weights: Option<Vec<f64>>,
}

impl<'a, P: TransformPair> AnalysisL1<'a, P> {
    pub fn new(transform: &'a P, threshold: f64) -> Result<Self, Error> {
        validate(threshold, None)?;
        Ok(Self {
            transform,
            threshold,
            weights: None,
        })
    }

    /// Weighted prior. Its proximal operator has no closed form and is not
    /// available.
    pub fn weighted(transform: &'a P, threshold: f64, weights: Vec<f64>) -> Result<Self, Error> {
        validate(threshold, Some(&weights))?;
        Ok(Self {
            transform,
            threshold,
            weights: Some(weights),
        })
    }

    pub fn transform(&self) -> &'a P {
        self.transform
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl<P: TransformPair> Regularizer for AnalysisL1<'_, P> {
    type Param = P::Field;

    fn prior(&self, x: &[P::Field]) -> Result<f64, Error> {
        weighted_l1(x, self.weights.as_deref())
    }

    fn proxf(&self, x: &[P::Field]) -> Result<Vec<P::Field>, Error> {
        if self.weights.is_some() {
            return Err(Error::NotImplemented(
                "proximal operator of the weighted analysis prior",
            ));
        }

        let coeffs = self.transform.forwards(x)?;
        let correction: Vec<P::Coeff> = coeffs
            .iter()
            .map(|&c| soft(c, self.threshold) - c)
            .collect();
        let correction = self.transform.backwards(&correction)?;
        Ok(x.iter().zip(correction).map(|(&x, c)| x + c).collect())
    }
}
