use log::debug;
use num_complex::Complex64;

use crate::{
    error::Error,
    harmonic::{hp_to_lm, lm_size, lm_to_hp, lm_to_hp_adjoint, scale_by_degree},
    packing::{expand, flatten, CoefficientBlock},
    sampling::{GaussLegendre, Sampling},
    tiling::WaveletBasis,
};

use super::{HarmonicTransform, TransformPair};

/// Domain the wavelet coefficient blocks live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaveletSpace {
    /// Full-ordered harmonic coefficients, `L^2` per scale.
    Harmonic,
    /// Complex maps on the Gauss-Legendre grid of the bandlimit,
    /// `L (2L - 1)` per scale.
    Pixel,
}

/// Axisymmetric spherical wavelet transform of real fields sampled on `S`.
///
/// Wavelet coefficients of scale `j` are `W_j(ell, m) = Psi_j(ell) f(ell, m)`
/// and the scaling coefficients are `S(ell, m) = Phi(ell) f(ell, m)`; the
/// coefficients are packed scaling block first.
#[derive(Debug, Clone)]
pub struct SphericalWaveletTransform<S> {
    basis: WaveletBasis,
    space: WaveletSpace,
    field: HarmonicTransform<S>,
    grid: HarmonicTransform<GaussLegendre>,
}

impl<S: Sampling> SphericalWaveletTransform<S> {
    /// Constructs a new transform for fields on `sampling`.
    pub fn new(basis: WaveletBasis, sampling: S, space: WaveletSpace) -> Result<Self, Error> {
        let l = basis.bandlimit();
        let field = HarmonicTransform::new(sampling, l)?;
        let grid = HarmonicTransform::new(GaussLegendre::new(l)?, l)?;

        let transform = Self {
            basis,
            space,
            field,
            grid,
        };
        debug!(
            "Wavelet transform on {} with {:?} coefficients: {} parameters for {} pixels",
            transform.field.sampling().describe(),
            space,
            transform.nparams(),
            transform.npix()
        );
        Ok(transform)
    }

    /// Wavelet tiling.
    pub fn basis(&self) -> &WaveletBasis {
        &self.basis
    }

    /// Domain of the coefficient blocks.
    pub fn space(&self) -> WaveletSpace {
        self.space
    }

    /// Number of wavelet scales.
    pub fn nscales(&self) -> usize {
        self.basis.nscales()
    }

    /// Number of coefficients per block.
    pub fn block_len(&self) -> usize {
        match self.space {
            WaveletSpace::Harmonic => lm_size(self.basis.bandlimit()),
            WaveletSpace::Pixel => self.grid.npix(),
        }
    }

    /// Length of a packed coefficient vector.
    pub fn nparams(&self) -> usize {
        self.block_len() * self.basis.nbases()
    }

    /// Number of pixels of a field.
    pub fn npix(&self) -> usize {
        self.field.npix()
    }

    /// Harmonic transform of the fields.
    pub fn field_transform(&self) -> &HarmonicTransform<S> {
        &self.field
    }

    /// Real field from hp-ordered harmonic coefficients.
    pub fn to_pixel(&self, hp: &[Complex64]) -> Result<Vec<f64>, Error> {
        self.field.to_pixel(hp)
    }

    /// hp-ordered harmonic coefficients of a real field.
    pub fn to_harmonic(&self, field: &[f64]) -> Result<Vec<Complex64>, Error> {
        self.field.to_harmonic(field)
    }

    /// Converts a packed stack of harmonic blocks to Gauss-Legendre maps.
    pub fn stack_to_pixel(&self, packed_lm: &[Complex64]) -> Result<Vec<Complex64>, Error> {
        let l = self.basis.bandlimit();
        Error::check_len("stack_to_pixel", packed_lm.len(), lm_size(l) * self.basis.nbases())?;
        self.map_blocks(packed_lm, lm_size(l), |block| self.grid.to_pixel_complex(block))
    }

    /// Converts a packed stack of Gauss-Legendre maps to harmonic blocks.
    pub fn stack_to_harmonic(&self, packed_maps: &[Complex64]) -> Result<Vec<Complex64>, Error> {
        Error::check_len(
            "stack_to_harmonic",
            packed_maps.len(),
            self.grid.npix() * self.basis.nbases(),
        )?;
        self.map_blocks(packed_maps, self.grid.npix(), |block| {
            self.grid.to_harmonic_complex(block)
        })
    }

    /// Adjoint of [`SphericalWaveletTransform::stack_to_harmonic`].
    pub fn stack_to_harmonic_adjoint(&self, packed_lm: &[Complex64]) -> Result<Vec<Complex64>, Error> {
        let l = self.basis.bandlimit();
        Error::check_len(
            "stack_to_harmonic_adjoint",
            packed_lm.len(),
            lm_size(l) * self.basis.nbases(),
        )?;
        self.map_blocks(packed_lm, lm_size(l), |block| {
            self.grid.to_harmonic_complex_adjoint(block)
        })
    }

    fn map_blocks(
        &self,
        packed: &[Complex64],
        block_len: usize,
        f: impl Fn(&[Complex64]) -> Result<Vec<Complex64>, Error>,
    ) -> Result<Vec<Complex64>, Error> {
        let mut out = Vec::new();
        for block in packed.chunks_exact(block_len) {
            out.extend(f(block)?);
        }
        Ok(out)
    }

    /// Sum of the kernel-weighted harmonic blocks.
    fn combine_blocks(&self, packed_lm: &[Complex64]) -> Result<Vec<Complex64>, Error> {
        let (wavelets, scaling) = expand(packed_lm, self.nscales())?;
        Error::check_len("wavelet synthesis", scaling.len(), lm_size(self.basis.bandlimit()))?;

        let mut lm = scaling;
        scale_by_degree(&mut lm, self.basis.kernel(0));
        for (j, block) in wavelets.columns().enumerate() {
            let mut block = block.to_vec();
            scale_by_degree(&mut block, self.basis.kernel(j + 1));
            for (x, w) in lm.iter_mut().zip(block) {
                *x += w;
            }
        }
        Ok(lm)
    }

    /// Kernel-weighted copies of a harmonic field, packed. This is both the
    /// harmonic wavelet analysis and the adjoint of [`Self::combine_blocks`].
    fn split_blocks(&self, lm: &[Complex64]) -> Result<Vec<Complex64>, Error> {
        let v = lm_size(self.basis.bandlimit());
        Error::check_len("wavelet analysis", lm.len(), v)?;

        let mut scaling = lm.to_vec();
        scale_by_degree(&mut scaling, self.basis.kernel(0));

        let mut wavelets = CoefficientBlock::new_zero(v, self.nscales())?;
        for j in 0..self.nscales() {
            let column = wavelets.column_mut(j);
            column.copy_from_slice(lm);
            scale_by_degree(column, self.basis.kernel(j + 1));
        }
        flatten(&wavelets, &scaling)
    }

    /// Decomposes a real field into packed wavelet coefficients.
    pub fn analyze(&self, field: &[f64]) -> Result<Vec<Complex64>, Error> {
        let l = self.basis.bandlimit();
        let lm = hp_to_lm(&self.field.to_harmonic(field)?, l)?;
        let packed_lm = self.split_blocks(&lm)?;
        match self.space {
            WaveletSpace::Harmonic => Ok(packed_lm),
            WaveletSpace::Pixel => self.stack_to_pixel(&packed_lm),
        }
    }

    /// Reconstructs a real field from packed wavelet coefficients.
    pub fn synthesize(&self, coeffs: &[Complex64]) -> Result<Vec<f64>, Error> {
        Error::check_len("synthesize", coeffs.len(), self.nparams())?;
        let l = self.basis.bandlimit();
        let lm = match self.space {
            WaveletSpace::Harmonic => self.combine_blocks(coeffs)?,
            WaveletSpace::Pixel => self.combine_blocks(&self.stack_to_harmonic(coeffs)?)?,
        };
        self.field.to_pixel(&lm_to_hp(&lm, l)?)
    }

    /// Exact adjoint of [`SphericalWaveletTransform::synthesize`]:
    /// `<synthesize(x), y> == Re <x, synthesize_adjoint(y)>`.
    pub fn synthesize_adjoint(&self, field: &[f64]) -> Result<Vec<Complex64>, Error> {
        Error::check_len("synthesize_adjoint", field.len(), self.npix())?;
        let l = self.basis.bandlimit();
        let lm = lm_to_hp_adjoint(&self.field.to_pixel_adjoint(field)?, l)?;
        let packed_lm = self.split_blocks(&lm)?;
        match self.space {
            WaveletSpace::Harmonic => Ok(packed_lm),
            WaveletSpace::Pixel => self.stack_to_harmonic_adjoint(&packed_lm),
        }
    }

    /// Sampling-density weights of every coefficient, available for
    /// coefficients in the pixel domain.
    pub fn density_weights(&self) -> Option<Vec<f64>> {
        match self.space {
            WaveletSpace::Harmonic => None,
            WaveletSpace::Pixel => {
                let block = self.grid.sampling().density_weights();
                Some(block.repeat(self.basis.nbases()))
            }
        }
    }
}

impl<S: Sampling> TransformPair for SphericalWaveletTransform<S> {
    type Field = f64;
    type Coeff = Complex64;

    fn field_len(&self) -> usize {
        self.npix()
    }

    fn coeff_len(&self) -> usize {
        self.nparams()
    }

    fn forwards(&self, field: &[f64]) -> Result<Vec<Complex64>, Error> {
        self.analyze(field)
    }

    fn backwards(&self, coeffs: &[Complex64]) -> Result<Vec<f64>, Error> {
        self.synthesize(coeffs)
    }

    fn backwards_adjoint(&self, field: &[f64]) -> Result<Vec<Complex64>, Error> {
        self.synthesize_adjoint(field)
    }
}
