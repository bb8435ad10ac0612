//! Drone mission files.
//!
//! This crate turns a KML mission file as exported by waypoint planners into a `Mission`
//! with its waypoints in flight order.  There are two steps:
//!
//! - `kml::parse()` extracts the waypoints from the document,
//! - `Mission::build()` checks the metadata and creates the aggregate.
//!
//! `ingest()` does both and is what callers should use.  Nothing here does any I/O, storing
//! the mission is the caller's job.
//!
//! Example:
//! ```
//! # fn main() -> Result<(), wpmz_formats::IngestError> {
//! use wpmz_formats::ingest;
//!
//! let doc = r#"<kml xmlns="http://www.opengis.net/kml/2.2" xmlns:wpml="http://www.dji.com/wpmz/1.0.6">
//!   <Placemark><Point><coordinates>174.76,-36.85</coordinates></Point><wpml:index>0</wpml:index></Placemark>
//! </kml>"#;
//!
//! let mission = ingest("Harbour", doc)?;
//! assert_eq!(1, mission.waypoint_count());
//! assert_eq!(-36.85, mission.waypoints()[0].latitude);
//! # Ok(())
//! # }
//! ```
//!

use tracing::info;

// Re-export for convenience
//
pub use error::*;
pub use mission::*;
pub use waypoint::*;

mod error;
pub mod kml;
mod mission;
mod waypoint;
pub mod xml;

pub fn version() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Create a mission named `name` out of the `raw` document.
///
/// The name is checked first, then the document is checked for emptiness before being
/// parsed, so the error always tells which input to fix.
///
#[tracing::instrument(skip(raw), fields(len = raw.len()))]
pub fn ingest(name: &str, raw: &str) -> Result<Mission, IngestError> {
    if name.trim().is_empty() {
        return Err(ValidationError::MissingName.into());
    }
    if raw.trim().is_empty() {
        return Err(ValidationError::MissingSource.into());
    }

    let waypoints = kml::parse(raw)?;
    let mission = Mission::build(name, raw, waypoints)?;

    info!(
        "mission {:?} created with {} waypoints",
        mission.name(),
        mission.waypoint_count()
    );
    Ok(mission)
}

/// `ingest()` for raw bytes, which must be UTF-8.
///
pub fn ingest_bytes(name: &str, raw: &[u8]) -> Result<Mission, IngestError> {
    let raw = xml::decode(raw)?;
    ingest(name, raw)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const DOC: &str = r#"<kml xmlns="http://www.opengis.net/kml/2.2"><Document/></kml>"#;

    #[rstest]
    #[case("", DOC, IngestError::Validation(ValidationError::MissingName))]
    #[case("  ", "<kml><unclosed></kml>", IngestError::Validation(ValidationError::MissingName))]
    #[case("A", "", IngestError::Validation(ValidationError::MissingSource))]
    #[case("A", " \n ", IngestError::Validation(ValidationError::MissingSource))]
    fn test_ingest_validation(#[case] name: &str, #[case] raw: &str, #[case] err: IngestError) {
        assert_eq!(Err(err), ingest(name, raw));
    }

    #[test]
    fn test_ingest_malformed() {
        let res = ingest("A", "<kml><Document><unclosed></Document></kml>");
        assert!(matches!(res, Err(IngestError::Parse(ParseError::Malformed(_)))));
    }

    #[test]
    fn test_ingest_empty_mission() {
        let m = ingest(" Mission A ", DOC).unwrap();

        assert_eq!("Mission A", m.name());
        assert_eq!(DOC, m.raw_source());
        assert_eq!(0, m.waypoint_count());
    }

    #[test]
    fn test_ingest_bytes_bad_encoding() {
        let res = ingest_bytes("A", b"<kml>\xff</kml>");
        assert!(matches!(res, Err(IngestError::Parse(ParseError::Malformed(_)))));
    }

    #[test]
    fn test_error_messages_name_the_problem() {
        assert_eq!(
            "Mission name is required",
            IngestError::from(ValidationError::MissingName).to_string()
        );
        assert!(IngestError::from(ParseError::Malformed("eof".into()))
            .to_string()
            .starts_with("Malformed document"));
    }
}
