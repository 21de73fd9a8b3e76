//! Pixelizations of the sphere.
//!
//! Every sampling is made of iso-latitude rings of equally spaced pixels,
//! which is all the harmonic transforms need to know about it.

use std::{f64::consts::PI, fmt::Debug};

mod gauss_legendre;
mod healpix;

pub use gauss_legendre::GaussLegendre;
pub use healpix::Healpix;

/// An iso-latitude ring of pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ring {
    /// Colatitude of the ring in radians.
    pub theta: f64,
    /// Longitude of the first pixel in radians.
    pub phi0: f64,
    /// Index of the first pixel of the ring.
    pub start: usize,
    /// Number of pixels in the ring.
    pub nphi: usize,
}

impl Ring {
    /// Longitude of the `k`-th pixel of the ring.
    #[inline]
    pub fn phi(&self, k: usize) -> f64 {
        self.phi0 + 2.0 * PI * k as f64 / self.nphi as f64
    }
}

/// A discretization of the sphere into pixels.
pub trait Sampling: Send + Sync + Debug {
    /// Number of pixels.
    fn npix(&self) -> usize;

    /// Rings ordered from north to south, covering the pixels in order.
    fn rings(&self) -> &[Ring];

    /// Quadrature weight (area element) of a pixel; the weights sum to `4 pi`.
    fn quadrature_weight(&self, pixel: usize) -> f64;

    /// Pixel containing the point at colatitude `theta` and longitude `phi`.
    fn ang_to_pix(&self, theta: f64, phi: f64) -> usize;

    /// Largest bandlimit the sampling resolves.
    fn max_bandlimit(&self) -> usize;

    /// Stable description of the sampling, used in cache keys.
    fn describe(&self) -> String;

    /// Colatitude and longitude of a pixel centre.
    fn pix_to_ang(&self, pixel: usize) -> (f64, f64) {
        let rings = self.rings();
        let ring = &rings[rings.partition_point(|r| r.start <= pixel) - 1];
        (ring.theta, ring.phi(pixel - ring.start))
    }

    /// Sampling-density weights `sqrt(dA / (4 pi / npix))` of every pixel,
    /// equal to one for an equal-area sampling.
    fn density_weights(&self) -> Vec<f64> {
        let mean_area = 4.0 * PI / self.npix() as f64;
        (0..self.npix())
            .map(|p| (self.quadrature_weight(p) / mean_area).sqrt())
            .collect()
    }
}

/// Wraps a longitude into `[0, 2 pi)`.
#[inline]
pub(crate) fn wrap_longitude(phi: f64) -> f64 {
    let wrapped = phi.rem_euclid(2.0 * PI);
    if wrapped >= 2.0 * PI {
        0.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use super::{GaussLegendre, Healpix, Sampling};

    fn check_rings(sampling: &impl Sampling) {
        let mut next = 0;
        for ring in sampling.rings() {
            assert_eq!(ring.start, next);
            next += ring.nphi;
        }
        assert_eq!(next, sampling.npix());

        let total: f64 = (0..sampling.npix())
            .map(|p| sampling.quadrature_weight(p))
            .sum();
        assert!((total - 4.0 * PI).abs() < 1e-10);
    }

    fn check_pixel_centres(sampling: &impl Sampling) {
        for p in 0..sampling.npix() {
            let (theta, phi) = sampling.pix_to_ang(p);
            assert_eq!(sampling.ang_to_pix(theta, phi), p, "pixel {p}");
        }
    }

    #[test]
    fn healpix_structure() {
        for nside in [1, 2, 3, 4, 8] {
            let hpx = Healpix::new(nside).unwrap();
            assert_eq!(hpx.npix(), 12 * nside * nside);
            check_rings(&hpx);
            check_pixel_centres(&hpx);
        }
    }

    #[test]
    fn gauss_legendre_structure() {
        for l in [1, 2, 5, 9] {
            let grid = GaussLegendre::new(l).unwrap();
            assert_eq!(grid.npix(), l * (2 * l - 1));
            check_rings(&grid);
            check_pixel_centres(&grid);
        }
    }

    #[test]
    fn equal_area_density_weights() {
        let hpx = Healpix::new(4).unwrap();
        assert!(hpx
            .density_weights()
            .iter()
            .all(|w| (w - 1.0).abs() < 1e-12));

        let grid = GaussLegendre::new(6).unwrap();
        let weights = grid.density_weights();
        let (polar, equatorial) = (weights[0], weights[grid.npix() / 2]);
        assert!(polar < equatorial);
    }
}
