use num_complex::Complex64;

use crate::{
    error::Error,
    harmonic::{hp_index, hp_size, lm_index, lm_size, Legendre},
    sampling::{Ring, Sampling},
};

/// Spherical harmonic transform on a sampling, for bandlimit `L`.
///
/// Real fields are paired with hp-ordered coefficients, complex fields with
/// full-ordered coefficients, see [`crate::harmonic`].
#[derive(Debug, Clone)]
pub struct HarmonicTransform<S> {
    l: usize,
    sampling: S,
    legendre: Vec<Legendre>,
}

impl<S: Sampling> HarmonicTransform<S> {
    /// Constructs a new transform, precomputing the Legendre tables of every
    /// ring.
    pub fn new(sampling: S, l: usize) -> Result<Self, Error> {
        if l == 0 || l > sampling.max_bandlimit() {
            return Err(Error::Configuration(format!(
                "bandlimit {l} is not resolved by {} (max {})",
                sampling.describe(),
                sampling.max_bandlimit()
            )));
        }

        let legendre = sampling
            .rings()
            .iter()
            .map(|ring| Legendre::new(l, ring.theta))
            .collect();

        Ok(Self {
            l,
            sampling,
            legendre,
        })
    }

    /// Bandlimit of the transform.
    pub fn bandlimit(&self) -> usize {
        self.l
    }

    /// Underlying sampling.
    pub fn sampling(&self) -> &S {
        &self.sampling
    }

    /// Number of pixels of a field.
    pub fn npix(&self) -> usize {
        self.sampling.npix()
    }

    fn rings(&self) -> impl Iterator<Item = (&Ring, &Legendre)> {
        self.sampling.rings().iter().zip(&self.legendre)
    }

    /// Real field from hp-ordered coefficients:
    /// `f(p) = sum_ell sum_{m >= 0} w_m Re(a(ell, m) Y(ell, m)(p))` with
    /// `w_0 = 1` and `w_m = 2` otherwise.
    pub fn to_pixel(&self, hp: &[Complex64]) -> Result<Vec<f64>, Error> {
        Error::check_len("to_pixel", hp.len(), hp_size(self.l))?;

        let mut field = vec![0.0; self.npix()];
        let mut ring_coeffs = vec![Complex64::default(); self.l];
        for (ring, legendre) in self.rings() {
            for (m, c) in ring_coeffs.iter_mut().enumerate() {
                *c = (m..self.l)
                    .map(|ell| hp[hp_index(self.l, ell, m)] * legendre.get(ell, m))
                    .sum::<Complex64>()
                    * order_weight(m);
            }

            for k in 0..ring.nphi {
                let phi = ring.phi(k);
                field[ring.start + k] = ring_coeffs
                    .iter()
                    .enumerate()
                    .map(|(m, c)| (c * Complex64::from_polar(1.0, m as f64 * phi)).re)
                    .sum();
            }
        }

        Ok(field)
    }

    /// Exact adjoint of [`HarmonicTransform::to_pixel`] under the real inner
    /// products of both domains.
    pub fn to_pixel_adjoint(&self, field: &[f64]) -> Result<Vec<Complex64>, Error> {
        Error::check_len("to_pixel_adjoint", field.len(), self.npix())?;
        Ok(self.project_real(field, |m, _| order_weight(m)))
    }

    /// hp-ordered coefficients of a real field by quadrature.
    pub fn to_harmonic(&self, field: &[f64]) -> Result<Vec<Complex64>, Error> {
        Error::check_len("to_harmonic", field.len(), self.npix())?;
        Ok(self.project_real(field, |_, p| self.sampling.quadrature_weight(p)))
    }

    fn project_real(&self, field: &[f64], weight: impl Fn(usize, usize) -> f64) -> Vec<Complex64> {
        let mut hp = vec![Complex64::default(); hp_size(self.l)];
        for (ring, legendre) in self.rings() {
            for m in 0..self.l {
                let sum: Complex64 = (0..ring.nphi)
                    .map(|k| {
                        let p = ring.start + k;
                        Complex64::from_polar(field[p] * weight(m, p), -(m as f64) * ring.phi(k))
                    })
                    .sum();
                for ell in m..self.l {
                    hp[hp_index(self.l, ell, m)] += sum * legendre.get(ell, m);
                }
            }
        }
        hp
    }

    /// Complex field from full-ordered coefficients:
    /// `f(p) = sum_{ell, m} a(ell, m) Y(ell, m)(p)`.
    pub fn to_pixel_complex(&self, lm: &[Complex64]) -> Result<Vec<Complex64>, Error> {
        Error::check_len("to_pixel_complex", lm.len(), lm_size(self.l))?;

        let l = self.l as i64;
        let mut field = vec![Complex64::default(); self.npix()];
        let mut ring_coeffs = vec![Complex64::default(); 2 * self.l - 1];
        for (ring, legendre) in self.rings() {
            for m in -(l - 1)..l {
                let m_abs = m.unsigned_abs() as usize;
                ring_coeffs[(m + l - 1) as usize] = (m_abs..self.l)
                    .map(|ell| lm[lm_index(ell, m)] * signed_legendre(legendre, ell, m))
                    .sum();
            }

            for k in 0..ring.nphi {
                let phi = ring.phi(k);
                field[ring.start + k] = ring_coeffs
                    .iter()
                    .enumerate()
                    .map(|(i, c)| c * Complex64::from_polar(1.0, (i as i64 - l + 1) as f64 * phi))
                    .sum();
            }
        }

        Ok(field)
    }

    /// Hermitian adjoint of [`HarmonicTransform::to_pixel_complex`].
    pub fn to_pixel_complex_adjoint(&self, field: &[Complex64]) -> Result<Vec<Complex64>, Error> {
        Error::check_len("to_pixel_complex_adjoint", field.len(), self.npix())?;
        Ok(self.project_complex(field, |_| 1.0))
    }

    /// Full-ordered coefficients of a complex field by quadrature.
    pub fn to_harmonic_complex(&self, field: &[Complex64]) -> Result<Vec<Complex64>, Error> {
        Error::check_len("to_harmonic_complex", field.len(), self.npix())?;
        Ok(self.project_complex(field, |p| self.sampling.quadrature_weight(p)))
    }

    /// Hermitian adjoint of [`HarmonicTransform::to_harmonic_complex`].
    pub fn to_harmonic_complex_adjoint(&self, lm: &[Complex64]) -> Result<Vec<Complex64>, Error> {
        let mut field = self.to_pixel_complex(lm)?;
        for (p, x) in field.iter_mut().enumerate() {
            *x *= self.sampling.quadrature_weight(p);
        }
        Ok(field)
    }

    fn project_complex(&self, field: &[Complex64], weight: impl Fn(usize) -> f64) -> Vec<Complex64> {
        let l = self.l as i64;
        let mut lm = vec![Complex64::default(); lm_size(self.l)];
        for (ring, legendre) in self.rings() {
            for m in -(l - 1)..l {
                let sum: Complex64 = (0..ring.nphi)
                    .map(|k| {
                        let p = ring.start + k;
                        field[p] * weight(p) * Complex64::from_polar(1.0, -(m as f64) * ring.phi(k))
                    })
                    .sum();
                for ell in m.unsigned_abs() as usize..self.l {
                    lm[lm_index(ell, m)] += sum * signed_legendre(legendre, ell, m);
                }
            }
        }
        lm
    }

    /// Re-samples a real field onto another sampling through the harmonic
    /// domain.
    pub fn resample<T: Sampling>(
        &self,
        field: &[f64],
        target: &HarmonicTransform<T>,
    ) -> Result<Vec<f64>, Error> {
        Error::check_len("resample bandlimit", target.bandlimit(), self.l)?;
        let hp = self.to_harmonic(field)?;
        target.to_pixel(&hp)
    }
}

#[inline]
fn order_weight(m: usize) -> f64 {
    if m == 0 {
        1.0
    } else {
        2.0
    }
}

/// `lambda(ell, m)` extended to negative orders.
#[inline]
fn signed_legendre(legendre: &Legendre, ell: usize, m: i64) -> f64 {
    let value = legendre.get(ell, m.unsigned_abs() as usize);
    if m < 0 && m % 2 != 0 {
        -value
    } else {
        value
    }
}
