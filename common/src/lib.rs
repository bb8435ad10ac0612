//! This library is there to share some common code amongst all wpmz modules.
//!

mod config;
mod error;
mod logging;

use clap::{crate_name, crate_version};
pub use config::*;
pub use error::*;
pub use logging::*;

const NAME: &str = crate_name!();
const VERSION: &str = crate_version!();

pub fn version() -> String {
    format!("{}/{}", NAME, VERSION)
}

/// Build a `PathBuf` out of a list of components.
///
#[macro_export]
macro_rules! makepath {
    ($($item:expr),+) => {
        [
        $(::std::path::PathBuf::from($item),)+
        ]
        .iter()
        .collect::<::std::path::PathBuf>()
    };
}
