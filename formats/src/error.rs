//! Errors returned by the parser, the mission builder and the ingestion entry point.
//!
//! Per-record problems found while extracting waypoints are not errors, see `SkipReason`.
//!

use thiserror::Error;

/// Whole-document failure.
///
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("Malformed document: {0}")]
    Malformed(String),
}

/// Precondition violated when building or editing a `Mission`.
///
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Mission name is required")]
    MissingName,
    #[error("Mission source document is required")]
    MissingSource,
    #[error("No-fly zone coordinates are required")]
    MissingZone,
    #[error("Waypoint {index} out of range (lat {latitude}, lon {longitude})")]
    OutOfRange {
        index: i64,
        latitude: f64,
        longitude: f64,
    },
}

/// Everything `ingest()` can fail with.
///
#[derive(Clone, Debug, Error, PartialEq)]
pub enum IngestError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
