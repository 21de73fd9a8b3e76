//! Path datasets and the sparse routing matrix of their great-circle paths.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use log::{debug, info};
use rayon::prelude::*;

use crate::{
    cache::{cached, Cache, CacheKey},
    error::Error,
    geodesic::GreatCirclePath,
    sampling::Sampling,
    stream::{Deserializable, DeserializeStream, Serializable, SerializeStream},
};

/// One observation along a great-circle path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathRecord {
    /// Start point `(lat, lon)` in degrees.
    pub start: (f64, f64),
    /// Stop point `(lat, lon)` in degrees.
    pub stop: (f64, f64),
    /// Observed value.
    pub value: f64,
    /// Standard deviation of the observation.
    pub uncertainty: f64,
}

impl Serializable for PathRecord {
    fn serialize(&self, stream: &mut SerializeStream) {
        self.start.0.serialize(stream);
        self.start.1.serialize(stream);
        self.stop.0.serialize(stream);
        self.stop.1.serialize(stream);
        self.value.serialize(stream);
        self.uncertainty.serialize(stream);
    }
}

/// Observations along great-circle paths.
///
/// The text format has one path per line with the six columns
/// `start_lat start_lon stop_lat stop_lon value uncertainty`, separated by
/// whitespace or commas. Everything after a `#` is ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct PathDataset {
    records: Vec<PathRecord>,
}

impl PathDataset {
    pub fn new(records: Vec<PathRecord>) -> Result<Self, Error> {
        if records.is_empty() {
            return Err(Error::Configuration("path dataset is empty".into()));
        }
        Ok(Self { records })
    }

    /// Parses a dataset in the text format.
    pub fn from_reader(reader: impl BufRead) -> Result<Self, Error> {
        let mut records = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let line_number = i + 1;
            let content = line.split('#').next().unwrap_or_default();

            let fields = content
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|field| !field.is_empty())
                .map(|field| {
                    field.parse::<f64>().map_err(|e| Error::Parse {
                        line: line_number,
                        message: format!("invalid number {field:?}: {e}"),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            match fields[..] {
                [] => continue,
                [start_lat, start_lon, stop_lat, stop_lon, value, uncertainty] => {
                    if uncertainty.is_nan() || uncertainty <= 0.0 {
                        return Err(Error::Parse {
                            line: line_number,
                            message: format!("uncertainty must be positive, got {uncertainty}"),
                        });
                    }
                    records.push(PathRecord {
                        start: (start_lat, start_lon),
                        stop: (stop_lat, stop_lon),
                        value,
                        uncertainty,
                    });
                }
                _ => {
                    return Err(Error::Parse {
                        line: line_number,
                        message: format!("expected 6 columns, found {}", fields.len()),
                    })
                }
            }
        }

        debug!("Parsed {} paths", records.len());
        Self::new(records)
    }

    /// Reads a dataset file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        info!("Reading path dataset {path:?}");
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    pub fn records(&self) -> &[PathRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Endpoints of every path.
    pub fn endpoints(&self) -> Vec<((f64, f64), (f64, f64))> {
        self.records.iter().map(|r| (r.start, r.stop)).collect()
    }

    /// Observed values.
    pub fn data(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.value).collect()
    }

    pub fn uncertainties(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.uncertainty).collect()
    }

    /// Noise level of the dataset, the largest uncertainty.
    pub fn sig_d(&self) -> f64 {
        self.records
            .iter()
            .map(|r| r.uncertainty)
            .fold(0.0, f64::max)
    }

    /// Bytes identifying the dataset in cache keys.
    pub fn digest_bytes(&self) -> Vec<u8> {
        let mut stream = SerializeStream::new();
        self.records.serialize(&mut stream);
        stream.into_bytes()
    }
}

/// Sparse observations x cells matrix with unit entries where a path crosses
/// a cell, in compressed row storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRoutingMatrix {
    ncols: usize,
    row_offsets: Vec<usize>,
    columns: Vec<usize>,
}

impl PathRoutingMatrix {
    /// Constructs the matrix from the sorted cells of every row.
    pub fn from_rows(rows: Vec<Vec<usize>>, ncols: usize) -> Result<Self, Error> {
        let mut row_offsets = Vec::with_capacity(rows.len() + 1);
        let mut columns = Vec::with_capacity(rows.iter().map(Vec::len).sum());
        row_offsets.push(0);
        for row in rows {
            if let Some(&col) = row.iter().find(|&&col| col >= ncols) {
                return Err(Error::Configuration(format!(
                    "cell {col} out of range for {ncols} cells"
                )));
            }
            if row.windows(2).any(|w| w[0] >= w[1]) {
                return Err(Error::Configuration(
                    "routing rows must hold sorted unique cells".into(),
                ));
            }
            columns.extend(row);
            row_offsets.push(columns.len());
        }

        Ok(Self {
            ncols,
            row_offsets,
            columns,
        })
    }

    /// Rasterizes every path of `dataset` on `sampling` in parallel.
    ///
    /// `npoints` overrides the number of samples per path, which defaults to
    /// [`GreatCirclePath::default_npoints`]. The first degenerate path aborts
    /// the build.
    pub fn build(
        dataset: &PathDataset,
        sampling: &impl Sampling,
        npoints: Option<usize>,
    ) -> Result<Self, Error> {
        check_npoints(npoints)?;
        info!(
            "Building routing matrix of {} paths on {}",
            dataset.len(),
            sampling.describe()
        );

        let rows = dataset
            .records()
            .par_iter()
            .map(|record| -> Result<Vec<usize>, Error> {
                let path = GreatCirclePath::new(record.start, record.stop)?;
                let n = npoints.unwrap_or_else(|| path.default_npoints(sampling));
                Ok(path.footprint(sampling, n))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let matrix = Self::from_rows(rows, sampling.npix())?;
        info!(
            "Routing matrix: {} x {} with {} non-zero entries",
            matrix.nrows(),
            matrix.ncols(),
            matrix.nnz()
        );
        Ok(matrix)
    }

    /// Loads the matrix of `dataset` on `sampling` from `cache`, building and
    /// storing it on a miss.
    pub fn load_or_build(
        dataset: &PathDataset,
        sampling: &impl Sampling,
        npoints: Option<usize>,
        cache: &dyn Cache,
    ) -> Result<Self, Error> {
        check_npoints(npoints)?;
        let key = Self::cache_key(dataset, sampling, npoints);
        cached(cache, &key, || Self::build(dataset, sampling, npoints))
    }

    /// Key of the matrix of `dataset` on `sampling`.
    pub fn cache_key(
        dataset: &PathDataset,
        sampling: &impl Sampling,
        npoints: Option<usize>,
    ) -> CacheKey {
        let samples = match npoints {
            Some(n) => format!("npoints={n}"),
            None => "npoints=default".to_string(),
        };
        CacheKey::new(
            "routing",
            &[
                sampling.describe().as_bytes(),
                samples.as_bytes(),
                dataset.digest_bytes().as_slice(),
            ],
        )
    }

    /// Number of observations.
    pub fn nrows(&self) -> usize {
        self.row_offsets.len() - 1
    }

    /// Number of cells.
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Number of non-zero entries.
    pub fn nnz(&self) -> usize {
        self.columns.len()
    }

    /// Cells crossed by path `row`.
    pub fn row(&self, row: usize) -> &[usize] {
        &self.columns[self.row_offsets[row]..self.row_offsets[row + 1]]
    }

    /// `A x`, the sum of the field over the cells of every path.
    pub fn forward(&self, field: &[f64]) -> Result<Vec<f64>, Error> {
        Error::check_len("routing matrix product", field.len(), self.ncols)?;
        Ok((0..self.nrows())
            .map(|row| self.row(row).iter().map(|&col| field[col]).sum())
            .collect())
    }

    /// `A^T y`.
    pub fn transpose(&self, residual: &[f64]) -> Result<Vec<f64>, Error> {
        Error::check_len("routing matrix transpose", residual.len(), self.nrows())?;
        let mut field = vec![0.0; self.ncols];
        for (row, &value) in residual.iter().enumerate() {
            for &col in self.row(row) {
                field[col] += value;
            }
        }
        Ok(field)
    }
}

/// A path needs both endpoints among its samples.
fn check_npoints(npoints: Option<usize>) -> Result<(), Error> {
    match npoints {
        Some(n) if n < 2 => Err(Error::Configuration(format!(
            "paths need at least two samples, got {n}"
        ))),
        _ => Ok(()),
    }
}

impl Serializable for PathRoutingMatrix {
    fn serialize(&self, stream: &mut SerializeStream) {
        self.ncols.serialize(stream);
        self.row_offsets.serialize(stream);
        self.columns.serialize(stream);
    }
}

impl Deserializable for PathRoutingMatrix {
    fn deserialize(stream: &mut DeserializeStream<'_>) -> Result<Self, Error> {
        let ncols: usize = Deserializable::deserialize(stream)?;
        let row_offsets: Vec<usize> = Deserializable::deserialize(stream)?;
        let columns: Vec<usize> = Deserializable::deserialize(stream)?;

        let valid = row_offsets.first() == Some(&0)
            && row_offsets.last() == Some(&columns.len())
            && row_offsets.windows(2).all(|w| w[0] <= w[1])
            && columns.iter().all(|&col| col < ncols);
        if !valid {
            return Err(Error::Cache("inconsistent routing matrix".into()));
        }

        Ok(Self {
            ncols,
            row_offsets,
            columns,
        })
    }
}
