//! Library part of `missionctl`, everything except `main()`.
//!

pub use cli::*;
pub use cmds::*;
pub use config::*;

mod cli;
mod cmds;
mod config;
