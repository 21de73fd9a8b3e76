//! Packing of multiresolution coefficient sets into a single vector.
//!
//! A packed vector is laid out as `[scaling | wavelet_1 | ... | wavelet_n]`,
//! with every block holding the same number of coefficients.

use std::ops::{Index, IndexMut};

use num_traits::Zero;

use crate::error::Error;

/// Column-major block of wavelet coefficients with one column per scale.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientBlock<T> {
    data: Vec<T>,
    block_len: usize,
    nscales: usize,
}

impl<T: Zero + Clone> CoefficientBlock<T> {
    /// Constructs a new zeroed block.
    ///
    /// # Examples
    ///
    /// ```
    /// use pxmcmc_rs::packing::CoefficientBlock;
    ///
    /// let block = CoefficientBlock::<f64>::new_zero(4, 2).unwrap();
    ///
    /// assert_eq!(block.column(1), &[0.0; 4]);
    /// ```
    pub fn new_zero(block_len: usize, nscales: usize) -> Result<Self, Error> {
        let data = vec![T::zero(); block_len * nscales];
        Self::new_with_data(block_len, nscales, data)
    }
}

impl<T> CoefficientBlock<T> {
    /// Constructs a new block from column-major data.
    ///
    /// # Examples
    ///
    /// ```
    /// use pxmcmc_rs::packing::CoefficientBlock;
    ///
    /// let data = vec![1.0, 2.0, 3.0, 4.0];
    /// let block = CoefficientBlock::new_with_data(2, 2, data).unwrap();
    ///
    /// assert_eq!(block[[1, 0]], 2.0);
    /// assert_eq!(block[[0, 1]], 3.0);
    /// ```
    pub fn new_with_data(block_len: usize, nscales: usize, data: Vec<T>) -> Result<Self, Error> {
        if block_len == 0 || nscales == 0 {
            Err(Error::Shape {
                len: data.len(),
                blocks: nscales,
            })
        } else {
            Error::check_len("coefficient block", data.len(), block_len * nscales)?;
            Ok(Self {
                data,
                block_len,
                nscales,
            })
        }
    }

    /// Number of coefficients per scale.
    pub fn block_len(&self) -> usize {
        self.block_len
    }

    /// Number of wavelet scales.
    pub fn nscales(&self) -> usize {
        self.nscales
    }

    /// Coefficients of scale `j`.
    pub fn column(&self, j: usize) -> &[T] {
        &self.data[j * self.block_len..(j + 1) * self.block_len]
    }

    /// Mutable coefficients of scale `j`.
    pub fn column_mut(&mut self, j: usize) -> &mut [T] {
        &mut self.data[j * self.block_len..(j + 1) * self.block_len]
    }

    /// Iterates over the scales in order.
    pub fn columns(&self) -> impl Iterator<Item = &[T]> + '_ {
        self.data.chunks_exact(self.block_len)
    }

    /// Returns a slice to the flat column-major representation.
    pub fn flatten(&self) -> &[T] {
        &self.data
    }

    /// Consumes the block returning its column-major data.
    pub fn into_inner(self) -> Vec<T> {
        self.data
    }
}

impl<T> Index<[usize; 2]> for CoefficientBlock<T> {
    type Output = T;

    fn index(&self, [i, j]: [usize; 2]) -> &Self::Output {
        assert!(i < self.block_len, "out of bounds");
        &self.data[i + j * self.block_len]
    }
}

impl<T> IndexMut<[usize; 2]> for CoefficientBlock<T> {
    fn index_mut(&mut self, [i, j]: [usize; 2]) -> &mut Self::Output {
        assert!(i < self.block_len, "out of bounds");
        &mut self.data[i + j * self.block_len]
    }
}

/// Concatenates the scaling block followed by the wavelet scales.
pub fn flatten<T: Clone>(wavelets: &CoefficientBlock<T>, scaling: &[T]) -> Result<Vec<T>, Error> {
    Error::check_len("scaling block", scaling.len(), wavelets.block_len())?;

    let mut packed = Vec::with_capacity(scaling.len() * (wavelets.nscales() + 1));
    packed.extend_from_slice(scaling);
    packed.extend_from_slice(wavelets.flatten());
    Ok(packed)
}

/// Splits a packed vector into its wavelet scales and scaling block.
pub fn expand<T: Clone>(packed: &[T], nscales: usize) -> Result<(CoefficientBlock<T>, Vec<T>), Error> {
    let blocks = nscales + 1;
    let block_len = packed.len() / blocks;
    if block_len == 0 || packed.len() % blocks != 0 {
        return Err(Error::Shape {
            len: packed.len(),
            blocks,
        });
    }

    let (scaling, wavelets) = packed.split_at(block_len);
    let wavelets = CoefficientBlock::new_with_data(block_len, nscales, wavelets.to_vec())?;
    Ok((wavelets, scaling.to_vec()))
}

/// Length of a single block of a packed vector.
pub fn block_len(packed_len: usize, nscales: usize) -> Result<usize, Error> {
    let blocks = nscales + 1;
    match packed_len / blocks {
        0 => Err(Error::Shape {
            len: packed_len,
            blocks,
        }),
        len if len * blocks == packed_len => Ok(len),
        _ => Err(Error::Shape {
            len: packed_len,
            blocks,
        }),
    }
}
