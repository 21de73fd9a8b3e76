//! Cells crossed by great-circle paths.
//!
//! A path is given by its endpoints in geographic degrees (latitude,
//! longitude) and follows the minor arc between them. Besides the sampled
//! points, the path exposes the navigation quantities of its great circle:
//! courses at both ends, the ascending node (where the circle crosses the
//! equator northwards) and the epicentral distance.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::{
    error::Error,
    sampling::{wrap_longitude, Sampling},
};

/// Smallest epicentral distance, and smallest distance from the antipode, of
/// a well-defined path in radians.
const DEGENERACY_TOLERANCE: f64 = 1e-9;

/// `sin(colatitude)` below which a start point counts as a pole.
const POLAR_TOLERANCE: f64 = 1e-6;

/// Fraction of the mean pixel size separating consecutive path samples.
const SAMPLES_PER_PIXEL: f64 = 4.0;

/// Great-circle arc between two points of the sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GreatCirclePath {
    /// Colatitude and longitude of the start point in radians.
    start: (f64, f64),
    /// Colatitude and longitude of the stop point in radians.
    stop: (f64, f64),
    /// Longitude difference normalized into `(-pi, pi]`.
    dlon: f64,
}

impl GreatCirclePath {
    /// Constructs the path between `start` and `stop`, both `(lat, lon)` in
    /// degrees.
    ///
    /// Coincident and antipodal endpoints do not define a unique arc and are
    /// rejected.
    pub fn new(start: (f64, f64), stop: (f64, f64)) -> Result<Self, Error> {
        for (lat, lon) in [start, stop] {
            if !lat.is_finite() || !lon.is_finite() || lat.abs() > 90.0 {
                return Err(Error::Configuration(format!(
                    "invalid path endpoint ({lat}, {lon})"
                )));
            }
        }

        let to_rad = |(lat, lon): (f64, f64)| ((90.0 - lat).to_radians(), lon.to_radians());
        let (start_rad, stop_rad) = (to_rad(start), to_rad(stop));

        let path = Self {
            start: start_rad,
            stop: stop_rad,
            dlon: normalize_longitude_difference(stop.1 - start.1).to_radians(),
        };

        let distance = path.epicentral_distance();
        if distance < DEGENERACY_TOLERANCE || PI - distance < DEGENERACY_TOLERANCE {
            return Err(Error::DegeneratePath { start, stop });
        }
        Ok(path)
    }

    /// Colatitude and longitude of the start point in radians.
    pub fn start(&self) -> (f64, f64) {
        self.start
    }

    /// Colatitude and longitude of the stop point in radians.
    pub fn stop(&self) -> (f64, f64) {
        self.stop
    }

    /// Course (azimuth from north) at the start point, by the four-parts
    /// formula.
    pub fn course_at_start(&self) -> f64 {
        let (theta1, theta2) = (self.start.0, self.stop.0);
        let numerator = theta2.sin() * self.dlon.sin();
        let denominator =
            theta1.sin() * theta2.cos() - theta1.cos() * theta2.sin() * self.dlon.cos();
        numerator.atan2(denominator)
    }

    /// Course at the stop point.
    pub fn course_at_end(&self) -> f64 {
        let (theta1, theta2) = (self.start.0, self.stop.0);
        let numerator = theta1.sin() * self.dlon.sin();
        let denominator =
            theta2.cos() * theta1.sin() * self.dlon.cos() - theta1.cos() * theta2.sin();
        numerator.atan2(denominator)
    }

    /// Course at the ascending node.
    pub fn course_at_node(&self) -> f64 {
        let alpha1 = self.course_at_start();
        let theta1 = self.start.0;
        let numerator = alpha1.sin() * theta1.sin();
        let denominator = (alpha1.cos().powi(2) + (alpha1.sin() * theta1.cos()).powi(2)).sqrt();
        numerator.atan2(denominator)
    }

    /// Angular length of the arc in radians.
    pub fn epicentral_distance(&self) -> f64 {
        let (theta1, theta2) = (self.start.0, self.stop.0);
        let numerator = ((theta1.sin() * theta2.cos()
            - theta1.cos() * theta2.sin() * self.dlon.cos())
        .powi(2)
            + (theta2.sin() * self.dlon.sin()).powi(2))
        .sqrt();
        let denominator =
            theta1.cos() * theta2.cos() + theta1.sin() * theta2.sin() * self.dlon.cos();
        numerator.atan2(denominator)
    }

    /// Angular distance from the ascending node to the start point.
    pub fn node_to_start(&self) -> f64 {
        let latitude = FRAC_PI_2 - self.start.0;
        // tan(lat) of a polar start point is large but finite.
        latitude.tan().atan2(self.course_at_start().cos())
    }

    /// Longitude of the ascending node.
    pub fn node_lon(&self) -> f64 {
        let alpha0 = self.course_at_node();
        let sigma01 = self.node_to_start();
        let phi01 = (alpha0.sin() * sigma01.sin()).atan2(sigma01.cos());
        self.start.1 - phi01
    }

    /// Colatitude and longitude of the point a fraction `frac` along the arc.
    pub fn point_at_fraction(&self, frac: f64) -> (f64, f64) {
        self.parametrization().point(frac)
    }

    /// Points are measured from the ascending node along the course at the
    /// node. The node is undefined for a start point on a pole, where points
    /// are interpolated between the endpoint unit vectors instead.
    fn parametrization(&self) -> Parametrization {
        let distance = self.epicentral_distance();
        if self.start.0.sin() < POLAR_TOLERANCE {
            Parametrization::Chord {
                start: unit_vector(self.start),
                stop: unit_vector(self.stop),
                distance,
            }
        } else {
            Parametrization::Node {
                course: self.course_at_node(),
                node_lon: self.node_lon(),
                node_to_start: self.node_to_start(),
                distance,
            }
        }
    }

    /// `n` equally spaced points from the start to the stop point inclusive.
    pub fn points(&self, n: usize) -> Vec<(f64, f64)> {
        let parametrization = self.parametrization();
        let last = n.saturating_sub(1).max(1) as f64;
        (0..n)
            .map(|i| parametrization.point(i as f64 / last))
            .collect()
    }

    /// Number of samples needed to visit every cell of `sampling` the path
    /// crosses.
    pub fn default_npoints(&self, sampling: &impl Sampling) -> usize {
        let pixel_size = (4.0 * PI / sampling.npix() as f64).sqrt();
        let spacing = pixel_size / SAMPLES_PER_PIXEL;
        ((self.epicentral_distance() / spacing).ceil() as usize + 1).max(2)
    }

    /// Sorted, unique cells of `sampling` containing one of `npoints` samples
    /// of the path.
    pub fn footprint(&self, sampling: &impl Sampling, npoints: usize) -> Vec<usize> {
        let mut cells: Vec<usize> = self
            .points(npoints)
            .into_iter()
            .map(|(theta, phi)| sampling.ang_to_pix(theta, phi))
            .collect();
        cells.sort_unstable();
        cells.dedup();
        cells
    }
}

/// Position along a path as a function of the travelled fraction.
#[derive(Debug, Clone, Copy)]
enum Parametrization {
    Node {
        course: f64,
        node_lon: f64,
        node_to_start: f64,
        distance: f64,
    },
    Chord {
        start: [f64; 3],
        stop: [f64; 3],
        distance: f64,
    },
}

impl Parametrization {
    fn point(&self, frac: f64) -> (f64, f64) {
        match *self {
            Parametrization::Node {
                course,
                node_lon,
                node_to_start,
                distance,
            } => {
                let sigma = node_to_start + frac * distance;
                let (sin_sigma, cos_sigma) = sigma.sin_cos();
                let latitude = (course.cos() * sin_sigma)
                    .atan2(cos_sigma.hypot(course.sin() * sin_sigma));
                let lon = (course.sin() * sin_sigma).atan2(cos_sigma) + node_lon;
                (FRAC_PI_2 - latitude, wrap_longitude(lon))
            }
            Parametrization::Chord {
                start,
                stop,
                distance,
            } => {
                let wa = ((1.0 - frac) * distance).sin() / distance.sin();
                let wb = (frac * distance).sin() / distance.sin();
                let [x, y, z] = [0, 1, 2].map(|i| wa * start[i] + wb * stop[i]);
                (x.hypot(y).atan2(z), wrap_longitude(y.atan2(x)))
            }
        }
    }
}

fn unit_vector((theta, phi): (f64, f64)) -> [f64; 3] {
    [theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos()]
}

/// Normalizes a longitude difference in degrees into `(-180, 180]`.
fn normalize_longitude_difference(dlon: f64) -> f64 {
    let wrapped = dlon.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}
