//! Spectral filters expanded in Chebyshev polynomials.

use std::f64::consts::PI;

use num_complex::Complex64;

use crate::{
    error::Error,
    harmonic::{lm_size, scale_by_degree},
};

/// Value of the Chebyshev polynomial `T_n(x)`.
pub fn chebyshev_t(n: usize, x: f64) -> f64 {
    let (mut prev, mut current) = (1.0, x);
    if n == 0 {
        return prev;
    }

    for _ in 1..n {
        let next = 2.0 * x * current - prev;
        prev = current;
        current = next;
    }
    current
}

/// Harmonic filter `g(ell) = sum_k c_k T_k(2 ell / ell_max - 1)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChebyshevFilter {
    coeffs: Vec<f64>,
    ell_max: f64,
}

impl ChebyshevFilter {
    /// Constructs a filter from its Chebyshev coefficients.
    pub fn new(coeffs: Vec<f64>, ell_max: usize) -> Result<Self, Error> {
        if coeffs.is_empty() {
            return Err(Error::Configuration("empty Chebyshev series".into()));
        }
        if ell_max == 0 {
            return Err(Error::Configuration("filter degree range must be positive".into()));
        }

        Ok(Self {
            coeffs,
            ell_max: ell_max as f64,
        })
    }

    /// Interpolates `response` at the `order + 1` Chebyshev nodes of
    /// `[0, ell_max]`.
    pub fn fit(response: impl Fn(f64) -> f64, order: usize, ell_max: usize) -> Result<Self, Error> {
        let n = order + 1;
        let samples: Vec<(f64, f64)> = (0..n)
            .map(|j| {
                let x = (PI * (j as f64 + 0.5) / n as f64).cos();
                (x, response((x + 1.0) * ell_max as f64 / 2.0))
            })
            .collect();

        let coeffs = (0..n)
            .map(|k| {
                let sum: f64 = samples.iter().map(|&(x, f)| f * chebyshev_t(k, x)).sum();
                let c = 2.0 * sum / n as f64;
                if k == 0 {
                    c / 2.0
                } else {
                    c
                }
            })
            .collect();

        Self::new(coeffs, ell_max)
    }

    /// Chebyshev coefficients.
    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    /// Filter response at degree `ell`, by Clenshaw's recurrence.
    pub fn response(&self, ell: f64) -> f64 {
        let x = 2.0 * ell / self.ell_max - 1.0;
        let (mut b1, mut b2) = (0.0, 0.0);
        for &c in self.coeffs[1..].iter().rev() {
            let b0 = c + 2.0 * x * b1 - b2;
            b2 = b1;
            b1 = b0;
        }
        self.coeffs[0] + x * b1 - b2
    }

    /// Responses of the degrees below `l`.
    pub fn kernel(&self, l: usize) -> Vec<f64> {
        (0..l).map(|ell| self.response(ell as f64)).collect()
    }

    /// Filters full-ordered harmonic coefficients of bandlimit `l`. The filter
    /// is diagonal and real, hence its own adjoint.
    pub fn apply(&self, lm: &[Complex64], l: usize) -> Result<Vec<Complex64>, Error> {
        Error::check_len("spectral filter", lm.len(), lm_size(l))?;
        let mut filtered = lm.to_vec();
        scale_by_degree(&mut filtered, &self.kernel(l));
        Ok(filtered)
    }
}
