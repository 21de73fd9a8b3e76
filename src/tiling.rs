//! Axisymmetric spherical wavelet tiling.
//!
//! The harmonic kernels `Phi(ell)` (scaling function) and `Psi_j(ell)`
//! (wavelets, `J_min <= j <= J_max`) satisfy the admissibility condition
//! `Phi(ell)^2 + sum_j Psi_j(ell)^2 = 1` for every `ell < L`, which makes
//! wavelet synthesis the exact inverse of wavelet analysis.

use std::f64::consts::PI;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    cache::{cached, Cache, CacheKey},
    error::Error,
    harmonic::{lm_index, lm_size},
    packing::CoefficientBlock,
    stream::{Deserializable, DeserializeStream, Serializable, SerializeStream},
};

/// Number of subintervals of the kernel quadrature.
const KERNEL_QUADRATURE_STEPS: usize = 2000;

/// Parameters a tiling is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveletParams {
    /// Harmonic bandlimit `L`; degrees `0 <= ell < L`.
    pub l: usize,
    /// Dilation factor `B > 1`.
    pub b: f64,
    /// First wavelet scale.
    pub j_min: usize,
    /// Number of directions; only axisymmetric wavelets (1) are supported.
    #[serde(default = "default_dirs")]
    pub dirs: usize,
    /// Spin of the wavelets; only scalar wavelets (0) are supported.
    #[serde(default)]
    pub spin: i32,
}

fn default_dirs() -> usize {
    1
}

impl WaveletParams {
    /// Axisymmetric scalar wavelet parameters.
    pub fn new(l: usize, b: f64, j_min: usize) -> Self {
        Self {
            l,
            b,
            j_min,
            dirs: 1,
            spin: 0,
        }
    }

    /// Stable description of the parameters, used in cache keys.
    pub fn describe(&self) -> String {
        format!(
            "wavelet:l={},b={:?},j_min={},dirs={},spin={}",
            self.l, self.b, self.j_min, self.dirs, self.spin
        )
    }
}

/// Largest scale index `j` with `B^j <= L`.
pub fn j_max(b: f64, l: usize) -> Result<usize, Error> {
    if !(b.is_finite() && b > 1.0) {
        return Err(Error::Configuration(format!("dilation factor {b} must exceed 1")));
    }
    if l == 0 {
        return Err(Error::Configuration("bandlimit must be positive".into()));
    }

    let mut j = 0;
    let mut power = b;
    while power <= l as f64 {
        j += 1;
        power *= b;
    }
    Ok(j)
}

/// Number of wavelet scales, `J_max - J_min + 1`.
pub fn nscales(b: f64, l: usize, j_min: usize) -> Result<usize, Error> {
    let j_max = j_max(b, l)?;
    if j_min > j_max {
        return Err(Error::Configuration(format!(
            "J_min = {j_min} exceeds J_max = {j_max} for B = {b}, L = {l}"
        )));
    }
    Ok(j_max - j_min + 1)
}

/// Smooth decreasing cut-off: one below `1 / B`, zero above one.
#[derive(Debug, Clone, Copy)]
struct Kappa {
    b: f64,
    norm: f64,
}

impl Kappa {
    fn new(b: f64) -> Self {
        let mut kappa = Self { b, norm: 1.0 };
        kappa.norm = kappa.integral(1.0 / b);
        kappa
    }

    fn integrand(&self, t: f64) -> f64 {
        let lower = 1.0 / self.b;
        if t <= lower || t >= 1.0 {
            return 0.0;
        }
        let u = 2.0 * self.b / (self.b - 1.0) * (t - lower) - 1.0;
        (-1.0 / (1.0 - u * u)).exp() / t
    }

    /// Simpson quadrature of the integrand over `[from, 1]`.
    fn integral(&self, from: f64) -> f64 {
        let h = (1.0 - from) / KERNEL_QUADRATURE_STEPS as f64;
        let inner: f64 = (1..KERNEL_QUADRATURE_STEPS)
            .map(|i| {
                let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
                weight * self.integrand(from + i as f64 * h)
            })
            .sum();
        h / 3.0 * (self.integrand(from) + inner + self.integrand(1.0))
    }

    fn eval(&self, t: f64) -> f64 {
        if t <= 1.0 / self.b {
            1.0
        } else if t >= 1.0 {
            0.0
        } else {
            self.integral(t) / self.norm
        }
    }
}

/// Harmonic kernels of a wavelet tiling, scaling function first.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveletBasis {
    params: WaveletParams,
    j_max: usize,
    kernels: CoefficientBlock<f64>,
}

impl WaveletBasis {
    /// Derives the tiling for the given parameters.
    pub fn new(params: WaveletParams) -> Result<Self, Error> {
        if params.dirs != 1 || params.spin != 0 {
            return Err(Error::Configuration(format!(
                "only axisymmetric scalar wavelets are supported (dirs = {}, spin = {})",
                params.dirs, params.spin
            )));
        }

        let l = params.l;
        let b = params.b;
        let nscales = nscales(b, l, params.j_min)?;
        let j_max = params.j_min + nscales - 1;

        let kappa = Kappa::new(b);
        let cutoff = |ell: usize, j: usize| kappa.eval(ell as f64 / b.powi(j as i32));

        let mut kernels = CoefficientBlock::new_zero(l, nscales + 1)?;
        for (s, j) in (params.j_min..=j_max).enumerate() {
            let column = kernels.column_mut(s + 1);
            for (ell, psi) in column.iter_mut().enumerate() {
                let squared = if j == j_max {
                    1.0 - cutoff(ell, j)
                } else {
                    cutoff(ell, j + 1) - cutoff(ell, j)
                };
                *psi = squared.max(0.0).sqrt();
            }
        }

        // The scaling function takes whatever the wavelets leave of a flat
        // response.
        for ell in 0..l {
            let wavelets: f64 = (1..=nscales).map(|s| kernels[[ell, s]].powi(2)).sum();
            kernels[[ell, 0]] = (1.0 - wavelets).max(0.0).sqrt();
        }

        let basis = Self {
            params,
            j_max,
            kernels,
        };
        debug!(
            "Derived wavelet basis {} with {} scales (J_max = {}), bandlimits {:?}",
            params.describe(),
            nscales,
            j_max,
            basis.bandlimits()
        );
        Ok(basis)
    }

    /// Loads the tiling of `params` from `cache`, deriving and storing it on a
    /// miss.
    pub fn load_or_new(params: WaveletParams, cache: &dyn Cache) -> Result<Self, Error> {
        let key = CacheKey::new("basis", &[params.describe().as_bytes()]);
        cached(cache, &key, || Self::new(params))
    }

    /// Parameters of the tiling.
    pub fn params(&self) -> &WaveletParams {
        &self.params
    }

    /// Harmonic bandlimit.
    pub fn bandlimit(&self) -> usize {
        self.params.l
    }

    /// Largest scale index.
    pub fn j_max(&self) -> usize {
        self.j_max
    }

    /// Number of wavelet scales.
    pub fn nscales(&self) -> usize {
        self.kernels.nscales() - 1
    }

    /// Number of kernels, the scaling function included.
    pub fn nbases(&self) -> usize {
        self.kernels.nscales()
    }

    /// Kernel `b` (0 = scaling function) as a function of `ell`.
    pub fn kernel(&self, b: usize) -> &[f64] {
        self.kernels.column(b)
    }

    /// Basis table indexed by the full harmonic ordering and kernel, holding
    /// `sqrt((2 ell + 1) / (4 pi)) kernel(ell)` at `m = 0`.
    pub fn table(&self) -> Result<CoefficientBlock<f64>, Error> {
        let l = self.bandlimit();
        let mut table = CoefficientBlock::new_zero(lm_size(l), self.nbases())?;
        for b in 0..self.nbases() {
            for (ell, k) in self.kernel(b).iter().enumerate() {
                table[[lm_index(ell, 0), b]] = ((2 * ell + 1) as f64 / (4.0 * PI)).sqrt() * k;
            }
        }
        Ok(table)
    }

    /// Smallest bandlimit of every kernel, one past its largest non-zero
    /// degree.
    pub fn bandlimits(&self) -> Vec<usize> {
        self.kernels
            .columns()
            .map(|kernel| kernel.iter().rposition(|&k| k != 0.0).map_or(0, |ell| ell + 1))
            .collect()
    }

    /// Largest deviation of the summed squared kernels from one.
    pub fn tiling_error(&self) -> f64 {
        (0..self.bandlimit())
            .map(|ell| {
                let sum: f64 = self.kernels.columns().map(|k| k[ell] * k[ell]).sum();
                (sum - 1.0).abs()
            })
            .fold(0.0, f64::max)
    }
}

impl Serializable for WaveletBasis {
    fn serialize(&self, stream: &mut SerializeStream) {
        // `serde::Serialize` is in scope as well.
        Serializable::serialize(&self.params.l, stream);
        Serializable::serialize(&self.params.b, stream);
        Serializable::serialize(&self.params.j_min, stream);
        Serializable::serialize(&self.params.dirs, stream);
        Serializable::serialize(&self.params.spin, stream);
        Serializable::serialize(&self.j_max, stream);
        Serializable::serialize(self.kernels.flatten(), stream);
    }
}

impl Deserializable for WaveletBasis {
    fn deserialize(stream: &mut DeserializeStream<'_>) -> Result<Self, Error> {
        let params = WaveletParams {
            l: Deserializable::deserialize(stream)?,
            b: Deserializable::deserialize(stream)?,
            j_min: Deserializable::deserialize(stream)?,
            dirs: Deserializable::deserialize(stream)?,
            spin: Deserializable::deserialize(stream)?,
        };
        let j_max: usize = Deserializable::deserialize(stream)?;
        let data: Vec<f64> = Deserializable::deserialize(stream)?;

        let nbases = j_max
            .checked_sub(params.j_min)
            .map(|n| n + 2)
            .ok_or_else(|| Error::Cache("J_max below J_min".into()))?;
        let kernels = CoefficientBlock::new_with_data(params.l, nbases, data)
            .map_err(|e| Error::Cache(e.to_string()))?;

        Ok(Self {
            params,
            j_max,
            kernels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{j_max, nscales, Kappa, WaveletBasis, WaveletParams};
    use crate::{
        cache::MemoryCache,
        error::Error,
        harmonic::lm_index,
        stream::{Deserializable, DeserializeStream, Serializable, SerializeStream},
    };

    const TILING_ERROR: f64 = 1e-12;

    #[test]
    fn scale_count() {
        assert_eq!(j_max(1.5, 4).unwrap(), 3);
        assert_eq!(nscales(1.5, 4, 1).unwrap(), 3);
        assert_eq!(j_max(2.0, 16).unwrap(), 4);
        assert_eq!(nscales(2.0, 16, 2).unwrap(), 3);
        assert_eq!(j_max(2.0, 15).unwrap(), 3);
    }

    #[test]
    fn invalid_parameters() {
        assert!(matches!(j_max(1.0, 8), Err(Error::Configuration(_))));
        assert!(matches!(nscales(2.0, 8, 4), Err(Error::Configuration(_))));

        let mut params = WaveletParams::new(8, 2.0, 1);
        params.dirs = 3;
        assert!(matches!(
            WaveletBasis::new(params),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn kappa_is_a_smooth_step() {
        let kappa = Kappa::new(2.0);
        assert_eq!(kappa.eval(0.4), 1.0);
        assert_eq!(kappa.eval(1.2), 0.0);

        let mut last = 1.0;
        for i in 1..50 {
            let value = kappa.eval(0.5 + i as f64 / 100.0);
            assert!(value <= last && value >= 0.0);
            last = value;
        }
    }

    #[test]
    fn admissibility() {
        for (l, b, j_min) in [(4, 1.5, 1), (8, 2.0, 0), (10, 2.0, 1), (16, 1.8, 2)] {
            let basis = WaveletBasis::new(WaveletParams::new(l, b, j_min)).unwrap();
            println!("L = {l}, B = {b}, J_min = {j_min}: {:?}", basis.bandlimits());
            assert!(basis.tiling_error() < TILING_ERROR);
            assert_eq!(basis.kernel(0)[0], 1.0);
        }
    }

    #[test]
    fn table_is_axisymmetric() {
        let basis = WaveletBasis::new(WaveletParams::new(6, 2.0, 1)).unwrap();
        let table = basis.table().unwrap();
        for b in 0..basis.nbases() {
            for ell in 0..6 {
                for m in -(ell as i64)..=ell as i64 {
                    let value = table[[lm_index(ell, m), b]];
                    if m != 0 {
                        assert_eq!(value, 0.0);
                    }
                }
            }
        }
    }

    #[test]
    fn serialization() {
        let basis = WaveletBasis::new(WaveletParams::new(8, 1.5, 1)).unwrap();
        let mut stream = SerializeStream::new();
        basis.serialize(&mut stream);
        let bytes = stream.into_bytes();

        let mut stream = DeserializeStream::new(&bytes);
        let decoded = WaveletBasis::deserialize(&mut stream).unwrap();
        assert_eq!(decoded, basis);
    }

    #[test]
    fn cached_basis_matches_derived() {
        let cache = MemoryCache::new();
        let params = WaveletParams::new(12, 2.0, 1);
        let derived = WaveletBasis::load_or_new(params, &cache).unwrap();
        let loaded = WaveletBasis::load_or_new(params, &cache).unwrap();
        assert_eq!(derived, loaded);
        assert_eq!(derived, WaveletBasis::new(params).unwrap());
        assert_eq!(cache.len(), 1);

        WaveletBasis::load_or_new(WaveletParams::new(12, 2.0, 2), &cache).unwrap();
        assert_eq!(cache.len(), 2);
    }
}
