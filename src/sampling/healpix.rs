use std::f64::consts::{FRAC_PI_2, PI};

use crate::error::Error;

use super::{wrap_longitude, Ring, Sampling};

/// HEALPix pixelization in RING ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct Healpix {
    nside: usize,
    rings: Vec<Ring>,
}

impl Healpix {
    /// Constructs the pixelization with resolution parameter `nside`.
    pub fn new(nside: usize) -> Result<Self, Error> {
        if nside == 0 {
            return Err(Error::Configuration("nside must be positive".into()));
        }

        let n = nside as f64;
        let npix = 12 * nside * nside;
        let ncap = 2 * nside * (nside - 1);

        let rings = (1..4 * nside)
            .map(|i| {
                if i < nside {
                    let z = 1.0 - (i * i) as f64 / (3.0 * n * n);
                    Ring {
                        theta: z.acos(),
                        phi0: PI / (4.0 * i as f64),
                        start: 2 * i * (i - 1),
                        nphi: 4 * i,
                    }
                } else if i <= 3 * nside {
                    let z = 4.0 / 3.0 - 2.0 * i as f64 / (3.0 * n);
                    let phi0 = if (i + nside) % 2 == 1 {
                        0.0
                    } else {
                        PI / (4.0 * n)
                    };
                    Ring {
                        theta: z.acos(),
                        phi0,
                        start: ncap + (i - nside) * 4 * nside,
                        nphi: 4 * nside,
                    }
                } else {
                    let j = 4 * nside - i;
                    let z = (j * j) as f64 / (3.0 * n * n) - 1.0;
                    Ring {
                        theta: z.acos(),
                        phi0: PI / (4.0 * j as f64),
                        start: npix - 2 * j * (j + 1),
                        nphi: 4 * j,
                    }
                }
            })
            .collect();

        Ok(Self { nside, rings })
    }

    /// Resolution parameter.
    pub fn nside(&self) -> usize {
        self.nside
    }
}

impl Sampling for Healpix {
    fn npix(&self) -> usize {
        12 * self.nside * self.nside
    }

    fn rings(&self) -> &[Ring] {
        &self.rings
    }

    fn quadrature_weight(&self, _pixel: usize) -> f64 {
        4.0 * PI / self.npix() as f64
    }

    fn ang_to_pix(&self, theta: f64, phi: f64) -> usize {
        let nside = self.nside as i64;
        let n = self.nside as f64;
        let z = theta.cos();
        let za = z.abs();
        let mut tt = wrap_longitude(phi) / FRAC_PI_2;
        if tt >= 4.0 {
            tt = 0.0;
        }

        let pixel = if za <= 2.0 / 3.0 {
            let temp1 = n * (0.5 + tt);
            let temp2 = n * z * 0.75;
            let jp = (temp1 - temp2).floor() as i64;
            let jm = (temp1 + temp2).floor() as i64;

            let ir = nside + 1 + jp - jm;
            let kshift = 1 - (ir & 1);
            let ip = (jp + jm - nside + kshift + 1).div_euclid(2).rem_euclid(4 * nside);

            2 * nside * (nside - 1) + (ir - 1) * 4 * nside + ip
        } else {
            let tp = tt - tt.floor();
            let tmp = n * (3.0 * (1.0 - za)).sqrt();
            let jp = (tp * tmp).floor() as i64;
            let jm = ((1.0 - tp) * tmp).floor() as i64;

            let ir = (jp + jm + 1).min(nside);
            let ip = ((tt * ir as f64).floor() as i64).rem_euclid(4 * ir);

            if z > 0.0 {
                2 * ir * (ir - 1) + ip
            } else {
                12 * nside * nside - 2 * ir * (ir + 1) + ip
            }
        };

        pixel as usize
    }

    fn max_bandlimit(&self) -> usize {
        3 * self.nside
    }

    fn describe(&self) -> String {
        format!("healpix:nside={}", self.nside)
    }
}
