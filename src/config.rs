//! TOML configuration of a reconstruction.
//!
//! ```toml
//! mode = "synthesis"
//! sig_d = 0.1
//!
//! [wavelet]
//! l = 16
//! b = 2.0
//! j_min = 2
//!
//! [sampling]
//! nside = 8
//!
//! [routing]
//! dataset = "paths.txt"
//! cache_dir = "cache"
//! ```

use std::path::{Path, PathBuf};

use log::{info, trace};
use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    operator::Mode,
    routing::PathDataset,
    sampling::{Healpix, Sampling},
    tiling::{nscales, WaveletParams},
};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    /// Parameter space of the samplers, `"analysis"` or `"synthesis"`.
    pub mode: String,
    /// Noise level of the data; defaults to the largest uncertainty of the
    /// path dataset when absent.
    #[serde(default)]
    pub sig_d: Option<f64>,
    pub wavelet: WaveletParams,
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub routing: Option<RoutingConfig>,
}

/// HEALPix sampling of the fields.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingConfig {
    pub nside: usize,
}

/// Path dataset and routing matrix cache.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RoutingConfig {
    pub dataset: PathBuf,
    pub cache_dir: PathBuf,
    /// Samples per path; derived from the pixel size when absent.
    #[serde(default)]
    pub npoints: Option<usize>,
}

impl Config {
    /// Checks every parameter.
    pub fn validate(&self) -> Result<(), Error> {
        self.mode()?;
        if let Some(sig_d) = self.sig_d {
            if !(sig_d.is_finite() && sig_d > 0.0) {
                return Err(Error::Configuration(format!(
                    "sig_d must be positive, got {sig_d}"
                )));
            }
        }

        let sampling = self.healpix()?;
        let w = &self.wavelet;
        nscales(w.b, w.l, w.j_min)?;
        if w.l == 0 || w.l > sampling.max_bandlimit() {
            return Err(Error::Configuration(format!(
                "bandlimit {} not resolved by {}",
                w.l,
                sampling.describe()
            )));
        }
        if w.dirs != 1 || w.spin != 0 {
            return Err(Error::Configuration(
                "only axisymmetric scalar wavelets are supported".into(),
            ));
        }

        if let Some(routing) = &self.routing {
            if routing.npoints.map_or(false, |n| n < 2) {
                return Err(Error::Configuration(
                    "paths need at least two samples".into(),
                ));
            }
        }
        Ok(())
    }

    pub fn mode(&self) -> Result<Mode, Error> {
        self.mode.parse()
    }

    pub fn healpix(&self) -> Result<Healpix, Error> {
        Healpix::new(self.sampling.nside)
    }

    /// Configured noise level, or the largest uncertainty of `dataset`.
    pub fn noise_level(&self, dataset: &PathDataset) -> f64 {
        self.sig_d.unwrap_or_else(|| dataset.sig_d())
    }
}

/// Parses and validates a configuration.
pub fn parse_config(text: &str) -> Result<Config, Error> {
    let config: Config =
        toml::from_str(text).map_err(|e| Error::Configuration(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Reads, parses and validates a configuration file.
pub fn load_config(path: &Path) -> Result<Config, Error> {
    info!("Loading config from path {path:?}");

    let text = std::fs::read_to_string(path)?;
    trace!("Loaded config {path:?}");

    let config = parse_config(&text)?;
    trace!("Parsed config {path:?}");

    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{parse_config, Config};
    use crate::{error::Error, operator::Mode, routing::PathDataset};

    const CONFIG: &str = r#"
mode = "analysis"
sig_d = 0.5

[wavelet]
l = 8
b = 2.0
j_min = 1

[sampling]
nside = 4

[routing]
dataset = "paths.txt"
cache_dir = "cache"
"#;

    #[test]
    fn parse_full_config() {
        let config = parse_config(CONFIG).unwrap();
        assert_eq!(config.mode().unwrap(), Mode::Analysis);
        assert_eq!(config.sig_d, Some(0.5));
        assert_eq!(config.wavelet.l, 8);
        assert_eq!(config.wavelet.dirs, 1);
        assert_eq!(config.wavelet.spin, 0);
        assert_eq!(config.healpix().unwrap().nside(), 4);

        let routing = config.routing.unwrap();
        assert_eq!(routing.dataset, PathBuf::from("paths.txt"));
        assert_eq!(routing.npoints, None);
    }

    #[test]
    fn optional_sections() {
        let text = "mode = \"synthesis\"\n[wavelet]\nl = 4\nb = 1.5\nj_min = 1\n[sampling]\nnside = 2\n";
        let config = parse_config(text).unwrap();
        assert_eq!(config.mode().unwrap(), Mode::Synthesis);
        assert!(config.routing.is_none());
        assert!(config.sig_d.is_none());
    }

    #[test]
    fn noise_level_precedence() {
        let text = "0 0 10 10 1.0 0.2\n0 0 -10 20 2.0 0.7\n";
        let dataset = PathDataset::from_reader(text.as_bytes()).unwrap();
        let config = parse_config(CONFIG).unwrap();
        assert_eq!(config.noise_level(&dataset), 0.5);

        let unset = Config {
            sig_d: None,
            ..config
        };
        assert_eq!(unset.noise_level(&dataset), 0.7);
    }

    #[test]
    fn invalid_configs() {
        let bad_mode = CONFIG.replace("\"analysis\"", "\"bayesian\"");
        assert!(matches!(parse_config(&bad_mode), Err(Error::Configuration(_))));

        let unresolved = CONFIG.replace("nside = 4", "nside = 2");
        assert!(matches!(parse_config(&unresolved), Err(Error::Configuration(_))));

        let directional = CONFIG.replace("j_min = 1", "j_min = 1\ndirs = 2");
        assert!(matches!(parse_config(&directional), Err(Error::Configuration(_))));

        let negative = CONFIG.replace("sig_d = 0.5", "sig_d = -0.5");
        assert!(matches!(parse_config(&negative), Err(Error::Configuration(_))));

        assert!(matches!(parse_config("mode = 3"), Err(Error::Configuration(_))));
    }
}
