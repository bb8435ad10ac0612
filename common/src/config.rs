//! This is the `ConfigFile` struct.
//!
//! This is for finding the right default locations for the configuration files of the various
//! `wpmz` binaries.  It is a configuration file/struct neutral loading engine, storing only the
//! base directory and, with `load()`, reading the proper file or falling back to the default one.
//!
//! The loaded configuration is available with `.inner()` or `.into_inner()`.
//!

use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use eyre::Result;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::{makepath, Status};

/// Main name for the directory base
const TAG: &str = "wpmz";

/// Every configuration file carries a `version` field we check against the one the binary knows.
///
pub trait Versioned {
    /// Version of the file format understood by this binary.
    const VERSION: usize;

    fn version(&self) -> usize;
}

/// Configuration for a CLI tool, found either in the per-user config directory or at an
/// explicit path.
///
#[derive(Debug)]
pub struct ConfigFile<T: Debug + Default + DeserializeOwned + Versioned> {
    /// This is the base directory for all files.
    basedir: PathBuf,
    inner: T,
}

impl<T> ConfigFile<T>
where
    T: Debug + Default + DeserializeOwned + Versioned,
{
    /// Returns the path of the default config directory
    ///
    pub fn config_path(&self) -> PathBuf {
        self.basedir.clone()
    }

    /// Load the file and return a struct T in the right format.
    ///
    /// Use the following search path:
    /// - file specified on CLI, which must exist
    /// - `filename` in the default basedir (based on $HOME or $LOCALAPPDATA)
    ///
    /// If there is no explicit file and no default one, `T::default()` is used.
    ///
    #[tracing::instrument]
    pub fn load(filename: &str, fname: Option<&Path>) -> Result<ConfigFile<T>> {
        let basedir = default_basedir(TAG)?;
        Self::load_from(basedir, filename, fname)
    }

    #[tracing::instrument]
    fn load_from(basedir: PathBuf, filename: &str, fname: Option<&Path>) -> Result<ConfigFile<T>> {
        let fname = match fname {
            Some(fname) => {
                if !fname.exists() {
                    return Err(Status::MissingConfig(fname.to_string_lossy().to_string()).into());
                }
                fname.to_path_buf()
            }
            None => {
                let def = basedir.join(filename);
                if !def.exists() {
                    debug!("no {def:?}, using defaults");
                    return Ok(ConfigFile {
                        basedir,
                        inner: T::default(),
                    });
                }
                def
            }
        };

        trace!("Loading config file {fname:?} from {basedir:?}");

        let data = fs::read_to_string(&fname)?;
        debug!("string data = {data}");

        let data: T = hcl::from_str(&data)?;
        debug!("struct data = {data:?}");

        if data.version() != T::VERSION {
            return Err(Status::BadFileVersion(data.version(), T::VERSION).into());
        }

        Ok(ConfigFile {
            basedir,
            inner: data,
        })
    }

    /// Return the inner configuration file
    ///
    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

/// Find the per-user configuration directory for `tag`.
///
#[tracing::instrument]
fn default_basedir(tag: &str) -> Result<PathBuf> {
    let base = BaseDirs::new().ok_or(Status::NoHomeDir)?;

    #[cfg(unix)]
    let base = base.home_dir().join(".config");

    #[cfg(windows)]
    let base = base.data_local_dir().to_path_buf();

    debug!("base = {base:?}");
    Ok(makepath!(base, tag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Foo {
        version: usize,
        name: String,
    }

    impl Default for Foo {
        fn default() -> Self {
            Foo {
                version: Self::VERSION,
                name: String::from("default"),
            }
        }
    }

    impl Versioned for Foo {
        const VERSION: usize = 1;

        fn version(&self) -> usize {
            self.version
        }
    }

    #[test]
    fn test_config_load_missing_default() -> Result<()> {
        let dir = tempdir()?;
        let cfg = ConfigFile::<Foo>::load_from(dir.path().to_path_buf(), "foo.hcl", None)?;
        assert_eq!(&Foo::default(), cfg.inner());
        assert_eq!(dir.path(), cfg.config_path());
        Ok(())
    }

    #[test]
    fn test_config_load_default_file() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("foo.hcl"), "version = 1\nname = \"local\"\n")?;

        let cfg = ConfigFile::<Foo>::load_from(dir.path().to_path_buf(), "foo.hcl", None)?;
        assert_eq!("local", cfg.inner().name);
        Ok(())
    }

    #[test]
    fn test_config_load_explicit_missing() -> Result<()> {
        let dir = tempdir()?;
        let fname = dir.path().join("nope.hcl");

        let cfg = ConfigFile::<Foo>::load_from(dir.path().to_path_buf(), "foo.hcl", Some(&fname));
        assert!(cfg.is_err());
        Ok(())
    }

    #[test]
    fn test_config_load_bad_version() -> Result<()> {
        let dir = tempdir()?;
        let fname = dir.path().join("other.hcl");
        fs::write(&fname, "version = 42\nname = \"other\"\n")?;

        let cfg = ConfigFile::<Foo>::load_from(dir.path().to_path_buf(), "foo.hcl", Some(&fname));
        let err = cfg.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Status>(),
            Some(Status::BadFileVersion(42, 1))
        ));
        Ok(())
    }
}
