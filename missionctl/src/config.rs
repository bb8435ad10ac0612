//! Configuration module
//!
//! Version History:
//!
//! - v1 has `max_size`, `output` and `check_ranges`
//!

use std::path::Path;

use eyre::Result;
use serde::Deserialize;
use strum::EnumString;
use tracing::debug;

use wpmz_common::{ConfigFile, Versioned};

/// Config filename
const CONFIG: &str = "missionctl.hcl";

/// Default limit for the size of a mission file
const MAX_SIZE: u64 = 16 * 1024 * 1024;

/// How do we display a mission
///
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, strum::Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Output {
    #[default]
    Table,
    Json,
}

/// Configuration for the CLI tool
///
#[derive(Debug, Deserialize)]
pub struct Config {
    /// File version
    pub version: usize,
    /// Mission files larger than this are refused, in bytes
    #[serde(default = "default_max_size")]
    pub max_size: u64,
    /// Default output
    #[serde(default)]
    pub output: Output,
    /// Reject imported waypoints outside of the lat/lon ranges
    #[serde(default)]
    pub check_ranges: bool,
}

fn default_max_size() -> u64 {
    MAX_SIZE
}

impl Default for Config {
    fn default() -> Self {
        Config {
            version: Self::VERSION,
            max_size: MAX_SIZE,
            output: Output::default(),
            check_ranges: false,
        }
    }
}

impl Versioned for Config {
    const VERSION: usize = 1;

    fn version(&self) -> usize {
        self.version
    }
}

impl Config {
    /// Load either the specified file or the default one, if any.
    ///
    #[tracing::instrument]
    pub fn load(fname: Option<&Path>) -> Result<Config> {
        let cfg = ConfigFile::<Config>::load(CONFIG, fname)?.into_inner();
        debug!("config = {cfg:?}");
        Ok(cfg)
    }
}
