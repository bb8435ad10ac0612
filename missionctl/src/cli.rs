//! Module describing all possible commands and sub-commands to the `missionctl` main driver
//!
//! We have two main commands:
//!
//! - `parse`
//! - `check`
//!
//! `parse` reads a mission file, creates the mission and displays its waypoints in flight
//! order, either as a table or as JSON.
//!
//! `check` is for looking at a file before importing it: it lists the placemarks which would
//! be dropped and the waypoints outside of the valid lat/lon ranges.
//!
//! `completion` is here just to configure the various shells completion system.
//!

use std::path::PathBuf;

use clap::{crate_authors, crate_description, crate_name, crate_version, Parser};
use clap_complete::shells::Shell;

use crate::Output;

/// CLI options
#[derive(Parser)]
#[command(disable_version_flag = true)]
#[clap(name = crate_name!(), about = crate_description!())]
#[clap(version = crate_version!(), author = crate_authors!())]
pub struct Opts {
    /// configuration file.
    #[clap(short = 'c', long)]
    pub config: Option<PathBuf>,
    /// Hierarchical output for the logs.
    #[clap(short = 'T', long)]
    pub use_tree: bool,
    /// Also log into this directory.
    #[clap(short = 'L', long)]
    pub use_file: Option<String>,
    /// Sub-commands (see below).
    #[clap(subcommand)]
    pub subcmd: SubCommand,
}

// ------

/// All sub-commands:
///
/// `check FILE`
/// `completion SHELL`
/// `parse [-n NAME] [-f FORMAT] [-o FILE] FILE`
/// `version`
///
#[derive(Debug, Parser)]
pub enum SubCommand {
    /// Look for problems in a mission file
    Check(CheckOpts),
    /// Generate Completion stuff
    Completion(ComplOpts),
    /// Create a mission from a file and display it
    Parse(ParseOpts),
    /// List all package versions
    Version,
}

// ------

/// Options for `parse`.
///
#[derive(Debug, Parser)]
pub struct ParseOpts {
    /// Mission name (default is the file name without extension).
    #[clap(short = 'n', long)]
    pub name: Option<String>,
    /// Output format, `table` or `json` (default from config).
    #[clap(short = 'f', long)]
    pub format: Option<Output>,
    /// Output file (default is stdout).
    #[clap(short = 'o', long)]
    pub output: Option<PathBuf>,
    /// KML file.
    pub file: PathBuf,
}

// ------

/// Options for `check`.
///
#[derive(Debug, Parser)]
pub struct CheckOpts {
    /// KML file.
    pub file: PathBuf,
}

// ------

#[derive(Debug, Parser)]
pub struct ComplOpts {
    #[clap(value_parser)]
    pub shell: Shell,
}
