//! Linear maps from pixel fields to observed data.

use log::debug;

use crate::{
    cache::Cache,
    error::Error,
    routing::{PathDataset, PathRoutingMatrix},
    sampling::Sampling,
};

/// A linear measurement `y = M f` of a real field.
pub trait Measurement: Send + Sync {
    /// Length of a field.
    fn nfield(&self) -> usize;

    /// Number of observations.
    fn ndata(&self) -> usize;

    /// Predicted observations of `field`.
    fn forward(&self, field: &[f64]) -> Result<Vec<f64>, Error>;

    /// Adjoint map `M^T` of a data-space vector.
    fn adjoint(&self, residual: &[f64]) -> Result<Vec<f64>, Error>;
}

/// The field itself is observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    n: usize,
}

impl Identity {
    pub fn new(n: usize) -> Self {
        Self { n }
    }
}

impl Measurement for Identity {
    fn nfield(&self) -> usize {
        self.n
    }

    fn ndata(&self) -> usize {
        self.n
    }

    fn forward(&self, field: &[f64]) -> Result<Vec<f64>, Error> {
        Error::check_len("identity measurement", field.len(), self.n)?;
        Ok(field.to_vec())
    }

    fn adjoint(&self, residual: &[f64]) -> Result<Vec<f64>, Error> {
        Error::check_len("identity measurement adjoint", residual.len(), self.n)?;
        Ok(residual.to_vec())
    }
}

/// Sums of the field along great-circle paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathIntegral {
    matrix: PathRoutingMatrix,
}

impl PathIntegral {
    pub fn new(matrix: PathRoutingMatrix) -> Self {
        Self { matrix }
    }

    /// Routes the paths of `dataset` through `sampling`, reusing the matrix
    /// stored in `cache` when present. `npoints` overrides the number of
    /// samples per path.
    pub fn from_dataset(
        dataset: &PathDataset,
        sampling: &impl Sampling,
        npoints: Option<usize>,
        cache: &dyn Cache,
    ) -> Result<Self, Error> {
        let matrix = PathRoutingMatrix::load_or_build(dataset, sampling, npoints, cache)?;
        debug!(
            "Path integral over {} paths and {} cells",
            matrix.nrows(),
            matrix.ncols()
        );
        Ok(Self::new(matrix))
    }

    pub fn matrix(&self) -> &PathRoutingMatrix {
        &self.matrix
    }
}

impl Measurement for PathIntegral {
    fn nfield(&self) -> usize {
        self.matrix.ncols()
    }

    fn ndata(&self) -> usize {
        self.matrix.nrows()
    }

    fn forward(&self, field: &[f64]) -> Result<Vec<f64>, Error> {
        self.matrix.forward(field)
    }

    fn adjoint(&self, residual: &[f64]) -> Result<Vec<f64>, Error> {
        self.matrix.transpose(residual)
    }
}
