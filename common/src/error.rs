use thiserror::Error;

#[derive(Debug, Error)]
pub enum Status {
    #[error("Bad file version {0}, expected {1}")]
    BadFileVersion(usize, usize),
    #[error("Unknown config file {0}")]
    MissingConfig(String),
    #[error("Can not find a home directory")]
    NoHomeDir,
}
