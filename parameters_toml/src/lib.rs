//! Default plate and volume settings for robotic_plate_transfer, read from a
//! `parameters.toml` file.
// Warning groups (as of rust 1.55)
#![deny(
    future_incompatible,
    nonstandard_style,
    rust_2018_compatibility,
    rust_2021_compatibility,
    rust_2018_idioms,
    unused
)]

use anyhow::{ensure, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the parameters file looked up next to the running executable.
pub const PARAMETERS_FILE_NAME: &str = "parameters.toml";

/// Settings that a run uses unless they are overridden on the command line.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Parameters {
    /// Volume (ul) moved from a sample into each of its pools.
    pub volume_per_transfer: f64,
    /// Largest volume (ul) a single pipetting operation may move.
    pub max_volume_per_transfer: Option<f64>,
    /// Wells per sample plate.
    pub sample_plate_size: usize,
    /// Sample plate IDs, in fill order.
    pub sample_plate_ids: Vec<String>,
    /// Wells per pool plate.
    pub pool_plate_size: usize,
    /// Pool plate IDs, in fill order. Mirror plates get a `_mirror` suffix.
    pub pool_plate_ids: Vec<String>,
}

impl Default for Parameters {
    fn default() -> Self {
        Parameters {
            volume_per_transfer: 20.0,
            max_volume_per_transfer: None,
            sample_plate_size: 96,
            sample_plate_ids: vec!["Source".to_string()],
            pool_plate_size: 96,
            pool_plate_ids: vec!["Destination".to_string()],
        }
    }
}

macro_rules! warn_non_default {
    ($params:expr, $defaults:expr, $($a:ident),+) => {
        $(
            if $defaults.$a != $params.$a {
                warn!("using non-default {} = {:?}", stringify!($a), $params.$a);
            }
        )+
    };
}

impl Parameters {
    /// Parse parameters from TOML text. Missing keys take their default values.
    pub fn from_toml_str(s: &str) -> Result<Parameters> {
        let params: Parameters = toml::from_str(s)?;
        ensure!(
            !params.sample_plate_ids.is_empty() && !params.pool_plate_ids.is_empty(),
            "sample_plate_ids and pool_plate_ids must each name at least one plate"
        );
        Ok(params)
    }

    /// Read parameters from `path`.
    pub fn from_file(path: &Path) -> Result<Parameters> {
        let s = std::fs::read_to_string(path).with_context(|| path.display().to_string())?;
        Self::from_toml_str(&s).with_context(|| path.display().to_string())
    }

    fn warn_non_defaults(&self) {
        let defaults = Parameters::default();
        warn_non_default!(
            self,
            defaults,
            volume_per_transfer,
            max_volume_per_transfer,
            sample_plate_size,
            sample_plate_ids,
            pool_plate_size,
            pool_plate_ids
        );
    }
}

fn default_parameters_path() -> Result<PathBuf> {
    Ok(std::env::current_exe()
        .context("Unable to locate the running executable")?
        .with_file_name(PARAMETERS_FILE_NAME))
}

/// Load the run parameters. An explicit `path` must exist; otherwise `parameters.toml`
/// next to the executable is used if present, falling back to the defaults.
pub fn load_parameters(path: Option<&Path>) -> Result<Parameters> {
    let params = match path {
        Some(path) => Parameters::from_file(path)?,
        None => {
            let path = default_parameters_path()?;
            if path.exists() {
                Parameters::from_file(&path)?
            } else {
                warn!(
                    "could not find {} at {}, falling back to defaults",
                    PARAMETERS_FILE_NAME,
                    path.display()
                );
                Parameters::default()
            }
        }
    };
    params.warn_non_defaults();
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let params = Parameters::from_toml_str(
            r#"
            volume_per_transfer = 10.5
            pool_plate_ids = ["PoolsA", "PoolsB"]
            "#,
        )
        .unwrap();
        assert_eq!(params.volume_per_transfer, 10.5);
        assert_eq!(params.pool_plate_ids, vec!["PoolsA", "PoolsB"]);
        assert_eq!(params.sample_plate_size, 96);
        assert_eq!(params.max_volume_per_transfer, None);
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(Parameters::from_toml_str("").unwrap(), Parameters::default());
    }

    #[test]
    fn test_rejects_unknown_and_empty() {
        assert!(Parameters::from_toml_str("volume = 3").is_err());
        assert!(Parameters::from_toml_str("sample_plate_ids = []").is_err());
        assert!(Parameters::from_toml_str("sample_plate_size = \"big\"").is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_volume_per_transfer = 20.0").unwrap();
        let params = load_parameters(Some(file.path())).unwrap();
        assert_eq!(params.max_volume_per_transfer, Some(20.0));

        let missing = file.path().with_extension("missing");
        assert!(load_parameters(Some(&missing)).is_err());
    }
}
