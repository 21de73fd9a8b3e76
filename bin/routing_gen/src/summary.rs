use log::info;
use pxmcmc_rs::{
    cache::{Cache, DirectoryCache, MemoryCache},
    coefficient::Coefficient,
    config::Config,
    measurement::{Measurement, PathIntegral},
    operator::{AnalysisOperator, ForwardOperator, Mode, SynthesisOperator},
    routing::PathDataset,
    sampling::Sampling,
    tiling::WaveletBasis,
    transform::{SphericalWaveletTransform, WaveletSpace},
};
use serde::{Deserialize, Serialize};
use std::{error::Error, path::Path};

/// Shape of the routing matrix and the problem it sets up.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RoutingSummary {
    sampling: String,
    paths: usize,
    cells: usize,
    nonzeros: usize,
    mean_cells_per_path: f64,
    uncovered_cells: usize,
    mode: String,
    nparams: usize,
    sig_d: f64,
    misfit_at_zero: f64,
}

pub fn summarize(
    config: &Config,
    base: &Path,
    use_cache: bool,
) -> Result<RoutingSummary, Box<dyn Error>> {
    let routing = config
        .routing
        .as_ref()
        .ok_or("configuration has no [routing] section")?;

    let dataset = PathDataset::from_path(base.join(&routing.dataset))?;
    let sampling = config.healpix()?;
    let cache: Box<dyn Cache> = if use_cache {
        Box::new(DirectoryCache::new(base.join(&routing.cache_dir))?)
    } else {
        Box::new(MemoryCache::new())
    };

    let measurement =
        PathIntegral::from_dataset(&dataset, &sampling, routing.npoints, cache.as_ref())?;
    let matrix = measurement.matrix();
    let coverage = matrix.transpose(&vec![1.0; matrix.nrows()])?;
    let uncovered_cells = coverage.iter().filter(|&&hits| hits == 0.0).count();
    info!(
        "{} of {} cells are crossed by no path",
        uncovered_cells,
        matrix.ncols()
    );

    let basis = WaveletBasis::load_or_new(config.wavelet, cache.as_ref())?;
    let sig_d = config.noise_level(&dataset);
    let transform =
        SphericalWaveletTransform::new(basis, sampling.clone(), WaveletSpace::Harmonic)?;

    let mode = config.mode()?;
    let (nparams, misfit_at_zero) = match mode {
        Mode::Analysis => {
            let op = AnalysisOperator::new(transform, measurement.clone(), dataset.data(), sig_d)?;
            (op.nparams(), misfit_at_zero(&op)?)
        }
        Mode::Synthesis => {
            let op =
                SynthesisOperator::new(transform, measurement.clone(), dataset.data(), sig_d)?;
            (op.nparams(), misfit_at_zero(&op)?)
        }
    };
    info!("{mode} problem with {nparams} parameters, misfit {misfit_at_zero} at zero");

    Ok(RoutingSummary {
        sampling: sampling.describe(),
        paths: measurement.ndata(),
        cells: measurement.nfield(),
        nonzeros: matrix.nnz(),
        mean_cells_per_path: matrix.nnz() as f64 / matrix.nrows() as f64,
        uncovered_cells,
        mode: mode.to_string(),
        nparams,
        sig_d,
        misfit_at_zero,
    })
}

fn misfit_at_zero<F: ForwardOperator>(op: &F) -> Result<f64, pxmcmc_rs::Error> {
    op.data_fidelity(&vec![F::Param::from_real(0.0); op.nparams()])
}
