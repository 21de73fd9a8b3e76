//! Spherical harmonic index conventions and Legendre recurrences.
//!
//! Two orderings of the coefficients of a field with bandlimit `L` (degrees
//! `0 <= ell < L`) are in use:
//!
//! * the full ordering, `ell * ell + ell + m` for `-ell <= m <= ell`, holding
//!   `L * L` coefficients of an arbitrary complex field;
//! * the hp ordering, m-major with `m >= 0` only, holding `L * (L + 1) / 2`
//!   coefficients of a real field. The negative orders of a real field follow
//!   from `a(ell, -m) = (-1)^m conj(a(ell, m))`.

use std::f64::consts::PI;

use num_complex::Complex64;

use crate::error::Error;

/// Number of coefficients in the full ordering.
#[inline]
pub fn lm_size(l: usize) -> usize {
    l * l
}

/// Index of `(ell, m)` in the full ordering.
#[inline]
pub fn lm_index(ell: usize, m: i64) -> usize {
    debug_assert!(m.unsigned_abs() as usize <= ell);
    ((ell * ell + ell) as i64 + m) as usize
}

/// Number of coefficients in the hp ordering.
#[inline]
pub fn hp_size(l: usize) -> usize {
    l * (l + 1) / 2
}

/// Index of `(ell, m)`, `m >= 0`, in the hp ordering.
#[inline]
pub fn hp_index(l: usize, ell: usize, m: usize) -> usize {
    debug_assert!(m <= ell && ell < l);
    m * (2 * l - 1 - m) / 2 + ell
}

#[inline]
fn triangle_index(ell: usize, m: usize) -> usize {
    ell * (ell + 1) / 2 + m
}

/// Converts a full-ordering vector to the hp ordering by keeping `m >= 0`.
///
/// Lossless for the coefficients of real fields.
pub fn lm_to_hp(lm: &[Complex64], l: usize) -> Result<Vec<Complex64>, Error> {
    Error::check_len("lm_to_hp", lm.len(), lm_size(l))?;

    let mut hp = vec![Complex64::default(); hp_size(l)];
    for ell in 0..l {
        for m in 0..=ell {
            hp[hp_index(l, ell, m)] = lm[lm_index(ell, m as i64)];
        }
    }
    Ok(hp)
}

/// Adjoint of [`lm_to_hp`]: embeds the `m >= 0` coefficients and zero-fills
/// the negative orders.
pub fn lm_to_hp_adjoint(hp: &[Complex64], l: usize) -> Result<Vec<Complex64>, Error> {
    Error::check_len("lm_to_hp_adjoint", hp.len(), hp_size(l))?;

    let mut lm = vec![Complex64::default(); lm_size(l)];
    for ell in 0..l {
        for m in 0..=ell {
            lm[lm_index(ell, m as i64)] = hp[hp_index(l, ell, m)];
        }
    }
    Ok(lm)
}

/// Converts an hp-ordering vector of a real field to the full ordering.
pub fn hp_to_lm(hp: &[Complex64], l: usize) -> Result<Vec<Complex64>, Error> {
    let mut lm = lm_to_hp_adjoint(hp, l)?;
    for ell in 1..l {
        for m in 1..=ell {
            let positive = lm[lm_index(ell, m as i64)].conj();
            let sign = if m % 2 == 0 { 1.0 } else { -1.0 };
            lm[lm_index(ell, -(m as i64))] = positive * sign;
        }
    }
    Ok(lm)
}

/// Multiplies every coefficient of degree `ell` by `kernel[ell]`.
pub fn scale_by_degree(lm: &mut [Complex64], kernel: &[f64]) {
    let l = kernel.len();
    debug_assert_eq!(lm.len(), lm_size(l));
    for (ell, &k) in kernel.iter().enumerate() {
        for x in &mut lm[ell * ell..(ell + 1) * (ell + 1)] {
            *x *= k;
        }
    }
}

/// Orthonormalized associated Legendre functions `lambda(ell, m)` for
/// `0 <= m <= ell < L`, including the Condon-Shortley phase, so that
/// `Y(ell, m)(theta, phi) = lambda(ell, m)(cos theta) * exp(i m phi)`.
#[derive(Debug, Clone)]
pub struct Legendre {
    l: usize,
    values: Vec<f64>,
}

impl Legendre {
    /// Evaluates the table at colatitude `theta`.
    pub fn new(l: usize, theta: f64) -> Self {
        let (s, x) = theta.sin_cos();
        let mut values = vec![0.0; triangle_index(l, 0)];
        if l == 0 {
            return Self { l, values };
        }

        let mut diagonal = (1.0 / (4.0 * PI)).sqrt();
        for m in 0..l {
            if m > 0 {
                let m_f = m as f64;
                diagonal *= -((2.0 * m_f + 1.0) / (2.0 * m_f)).sqrt() * s;
            }
            values[triangle_index(m, m)] = diagonal;

            if m + 1 < l {
                values[triangle_index(m + 1, m)] = x * (2.0 * m as f64 + 3.0).sqrt() * diagonal;
            }

            for ell in m + 2..l {
                let ell_f = ell as f64;
                let m_f = m as f64;
                let a = ((4.0 * ell_f * ell_f - 1.0) / (ell_f * ell_f - m_f * m_f)).sqrt();
                let prev = ell_f - 1.0;
                let b = ((prev * prev - m_f * m_f) / (4.0 * prev * prev - 1.0)).sqrt();
                values[triangle_index(ell, m)] = a
                    * (x * values[triangle_index(ell - 1, m)] - b * values[triangle_index(ell - 2, m)]);
            }
        }

        Self { l, values }
    }

    /// Bandlimit of the table.
    pub fn bandlimit(&self) -> usize {
        self.l
    }

    /// `lambda(ell, m)` for `m >= 0`.
    #[inline]
    pub fn get(&self, ell: usize, m: usize) -> f64 {
        self.values[triangle_index(ell, m)]
    }
}
