//! Forward operators: predictions and data-fidelity gradients for the
//! samplers.
//!
//! In analysis mode the sampled parameters are the pixel field itself and the
//! wavelet transform only enters through the prior. In synthesis mode the
//! parameters are wavelet coefficients and every prediction goes through
//! wavelet synthesis first.

use std::{fmt, str::FromStr};

use log::debug;

use crate::{
    coefficient::Coefficient,
    error::Error,
    measurement::Measurement,
    transform::TransformPair,
};

/// Space the sampled parameters live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Analysis,
    Synthesis,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Analysis => "analysis",
            Mode::Synthesis => "synthesis",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "analysis" => Ok(Mode::Analysis),
            "synthesis" => Ok(Mode::Synthesis),
            _ => Err(Error::Configuration(format!(
                "unknown mode {s:?}, expected \"analysis\" or \"synthesis\""
            ))),
        }
    }
}

/// Predicts data from parameters and differentiates the misfit
/// `g(X) = |forward(X) - data|^2 / (2 sig_d^2)`.
pub trait ForwardOperator: Send + Sync {
    type Param: Coefficient;

    fn mode(&self) -> Mode;

    /// Length of a parameter vector.
    fn nparams(&self) -> usize;

    /// Noise standard deviation.
    fn sig_d(&self) -> f64;

    /// Observed data.
    fn data(&self) -> &[f64];

    /// Predicted data of the parameters `x`.
    fn forward(&self, x: &[Self::Param]) -> Result<Vec<f64>, Error>;

    /// Gradient of the misfit at the parameters whose prediction is
    /// `prediction`.
    fn calc_gradg(&self, prediction: &[f64]) -> Result<Vec<Self::Param>, Error>;

    /// Misfit `g(x)`.
    fn data_fidelity(&self, x: &[Self::Param]) -> Result<f64, Error> {
        let prediction = self.forward(x)?;
        let sq: f64 = prediction
            .iter()
            .zip(self.data())
            .map(|(p, d)| (p - d) * (p - d))
            .sum();
        Ok(sq / (2.0 * self.sig_d() * self.sig_d()))
    }
}

/// Data, noise level and the scaled residual shared by both modes.
#[derive(Debug, Clone)]
struct Observations {
    data: Vec<f64>,
    sig_d: f64,
}

impl Observations {
    fn new(data: Vec<f64>, sig_d: f64, ndata: usize) -> Result<Self, Error> {
        if !(sig_d.is_finite() && sig_d > 0.0) {
            return Err(Error::Configuration(format!(
                "noise level must be positive, got {sig_d}"
            )));
        }
        if data.len() != ndata {
            return Err(Error::Configuration(format!(
                "{} observations for a measurement of {ndata}",
                data.len()
            )));
        }
        Ok(Self { data, sig_d })
    }

    /// `(prediction - data) / sig_d^2`.
    fn scaled_residual(&self, prediction: &[f64]) -> Result<Vec<f64>, Error> {
        Error::check_len("calc_gradg", prediction.len(), self.data.len())?;
        let scale = 1.0 / (self.sig_d * self.sig_d);
        Ok(prediction
            .iter()
            .zip(&self.data)
            .map(|(p, d)| (p - d) * scale)
            .collect())
    }
}

/// Forward operator sampling pixel fields directly.
///
/// The transform is only held for the analysis-mode prior, which borrows it
/// through [`AnalysisOperator::transform`].
#[derive(Debug, Clone)]
pub struct AnalysisOperator<P, M> {
    transform: P,
    measurement: M,
    observations: Observations,
}

impl<P, M> AnalysisOperator<P, M>
where
    P: TransformPair<Field = f64>,
    M: Measurement,
{
    pub fn new(transform: P, measurement: M, data: Vec<f64>, sig_d: f64) -> Result<Self, Error> {
        if transform.field_len() != measurement.nfield() {
            return Err(Error::Configuration(format!(
                "transform fields of {} pixels, measurement of {}",
                transform.field_len(),
                measurement.nfield()
            )));
        }
        let observations = Observations::new(data, sig_d, measurement.ndata())?;
        debug!(
            "Analysis operator with {} parameters and {} observations",
            measurement.nfield(),
            measurement.ndata()
        );

        Ok(Self {
            transform,
            measurement,
            observations,
        })
    }

    pub fn transform(&self) -> &P {
        &self.transform
    }

    pub fn measurement(&self) -> &M {
        &self.measurement
    }
}

impl<P, M> ForwardOperator for AnalysisOperator<P, M>
where
    P: TransformPair<Field = f64>,
    M: Measurement,
{
    type Param = f64;

    fn mode(&self) -> Mode {
        Mode::Analysis
    }

    fn nparams(&self) -> usize {
        self.measurement.nfield()
    }

    fn sig_d(&self) -> f64 {
        self.observations.sig_d
    }

    fn data(&self) -> &[f64] {
        &self.observations.data
    }

    fn forward(&self, x: &[f64]) -> Result<Vec<f64>, Error> {
        Error::check_len("forward", x.len(), self.nparams())?;
        self.measurement.forward(x)
    }

    fn calc_gradg(&self, prediction: &[f64]) -> Result<Vec<f64>, Error> {
        let residual = self.observations.scaled_residual(prediction)?;
        self.measurement.adjoint(&residual)
    }
}

/// Forward operator sampling the coefficients of the transform.
#[derive(Debug, Clone)]
pub struct SynthesisOperator<P, M> {
    transform: P,
    measurement: M,
    observations: Observations,
}

impl<P, M> SynthesisOperator<P, M>
where
    P: TransformPair<Field = f64>,
    M: Measurement,
{
    pub fn new(transform: P, measurement: M, data: Vec<f64>, sig_d: f64) -> Result<Self, Error> {
        if transform.field_len() != measurement.nfield() {
            return Err(Error::Configuration(format!(
                "transform fields of {} pixels, measurement of {}",
                transform.field_len(),
                measurement.nfield()
            )));
        }
        let observations = Observations::new(data, sig_d, measurement.ndata())?;
        debug!(
            "Synthesis operator with {} parameters and {} observations",
            transform.coeff_len(),
            measurement.ndata()
        );

        Ok(Self {
            transform,
            measurement,
            observations,
        })
    }

    pub fn transform(&self) -> &P {
        &self.transform
    }

    pub fn measurement(&self) -> &M {
        &self.measurement
    }
}

impl<P, M> ForwardOperator for SynthesisOperator<P, M>
where
    P: TransformPair<Field = f64>,
    M: Measurement,
{
    type Param = P::Coeff;

    fn mode(&self) -> Mode {
        Mode::Synthesis
    }

    fn nparams(&self) -> usize {
        self.transform.coeff_len()
    }

    fn sig_d(&self) -> f64 {
        self.observations.sig_d
    }

    fn data(&self) -> &[f64] {
        &self.observations.data
    }

    fn forward(&self, x: &[P::Coeff]) -> Result<Vec<f64>, Error> {
        Error::check_len("forward", x.len(), self.nparams())?;
        let field = self.transform.backwards(x)?;
        self.measurement.forward(&field)
    }

    fn calc_gradg(&self, prediction: &[f64]) -> Result<Vec<P::Coeff>, Error> {
        let residual = self.observations.scaled_residual(prediction)?;
        let field = self.measurement.adjoint(&residual)?;
        self.transform.backwards_adjoint(&field)
    }
}
