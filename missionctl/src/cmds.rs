//! Implementation of the `parse` and `check` sub-commands.
//!
//! Both return the text to display, `main()` decides where it goes.
//!

use std::fs;
use std::path::Path;

use eyre::{eyre, Result};
use tabled::builder::Builder;
use tabled::settings::Style;
use tracing::{info, trace};

use wpmz_formats::kml::parse_detailed_bytes;
use wpmz_formats::{ingest_bytes, Mission, Waypoint};

use crate::{CheckOpts, Config, Output, ParseOpts};

/// Read a mission file, refusing anything larger than the configured limit.
///
#[tracing::instrument(skip(cfg))]
fn read_mission(cfg: &Config, path: &Path) -> Result<Vec<u8>> {
    let size = fs::metadata(path)?.len();
    if size > cfg.max_size {
        return Err(eyre!(
            "{} is too large ({size} bytes, max is {})",
            path.display(),
            cfg.max_size
        ));
    }
    Ok(fs::read(path)?)
}

/// Handle `parse`: create the mission and render it.
///
#[tracing::instrument(skip(cfg))]
pub fn parse_file(cfg: &Config, opts: &ParseOpts) -> Result<String> {
    trace!("parse_file");

    let data = read_mission(cfg, &opts.file)?;
    let name = match &opts.name {
        Some(name) => name.clone(),
        None => opts
            .file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default(),
    };

    let mission = ingest_bytes(&name, &data)?;
    if cfg.check_ranges {
        mission
            .waypoints()
            .iter()
            .try_for_each(|wp| wp.check_range())?;
    }
    info!("{} waypoints", mission.waypoint_count());

    match opts.format.unwrap_or(cfg.output) {
        Output::Table => Ok(mission_table(&mission)),
        Output::Json => Ok(serde_json::to_string_pretty(&mission)?),
    }
}

/// Handle `check`: report what would be dropped or look suspicious.  Only a malformed
/// document is an error.
///
#[tracing::instrument(skip(cfg))]
pub fn check_file(cfg: &Config, opts: &CheckOpts) -> Result<String> {
    trace!("check_file");

    let data = read_mission(cfg, &opts.file)?;
    let res = parse_detailed_bytes(&data)?;

    let mut report = format!(
        "{}: {} waypoints, {} placemarks skipped\n",
        opts.file.display(),
        res.waypoints.len(),
        res.skipped.len()
    );

    if !res.skipped.is_empty() {
        let mut builder = Builder::default();
        builder.push_record(["Placemark", "Reason"]);
        res.skipped.iter().for_each(|s| {
            builder.push_record([s.position.to_string(), s.reason.to_string()]);
        });
        let table = builder.build().with(Style::modern()).to_string();
        report.push_str(&format!("Skipped:\n{table}\n"));
    }

    let bad: Vec<Waypoint> = res
        .waypoints
        .into_iter()
        .filter(|wp| wp.check_range().is_err())
        .collect();
    if !bad.is_empty() {
        report.push_str(&format!("Out of range:\n{}\n", waypoint_table(&bad)));
    }
    Ok(report)
}

fn mission_table(mission: &Mission) -> String {
    format!(
        "Mission {:?} ({} waypoints):\n{}",
        mission.name(),
        mission.waypoint_count(),
        waypoint_table(mission.waypoints())
    )
}

fn waypoint_table(waypoints: &[Waypoint]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Index", "Latitude", "Longitude", "Altitude"]);

    waypoints.iter().for_each(|wp| {
        let altitude = wp
            .altitude
            .map(|a| format!("{a:.1}"))
            .unwrap_or_else(|| "-".to_string());
        builder.push_record([
            wp.index.to_string(),
            format!("{:.6}", wp.latitude),
            format!("{:.6}", wp.longitude),
            altitude,
        ]);
    });
    builder.build().with(Style::modern()).to_string()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tempfile::tempdir;

    use wpmz_formats::{IngestError, ValidationError};

    use super::*;

    const FIXTURE: &str = "../formats/tests/fixtures/harbour.kml";

    fn popts(file: PathBuf, format: Option<Output>) -> ParseOpts {
        ParseOpts {
            name: None,
            format,
            output: None,
            file,
        }
    }

    #[test]
    fn test_parse_file_table() -> Result<()> {
        let out = parse_file(&Config::default(), &popts(FIXTURE.into(), None))?;

        assert!(out.starts_with("Mission \"harbour\" (12 waypoints):"));
        assert!(out.contains("-36.848500"));
        Ok(())
    }

    #[test]
    fn test_parse_file_json() -> Result<()> {
        let out = parse_file(&Config::default(), &popts(FIXTURE.into(), Some(Output::Json)))?;

        let json: serde_json::Value = serde_json::from_str(&out)?;
        assert_eq!("harbour", json["name"]);
        assert_eq!(12, json["waypoint_count"]);
        assert_eq!(0, json["waypoints"][0]["index"]);
        Ok(())
    }

    #[test]
    fn test_parse_file_too_large() {
        let cfg = Config {
            max_size: 10,
            ..Default::default()
        };
        assert!(parse_file(&cfg, &popts(FIXTURE.into(), None)).is_err());
    }

    #[test]
    fn test_parse_file_out_of_range() -> Result<()> {
        let dir = tempdir()?;
        let fname = dir.path().join("swapped.kml");
        fs::write(
            &fname,
            r#"<kml xmlns="http://www.opengis.net/kml/2.2"><Placemark><Point><coordinates>-36.8,174.7</coordinates></Point></Placemark></kml>"#,
        )?;

        // Accepted as-is by default
        //
        assert!(parse_file(&Config::default(), &popts(fname.clone(), None)).is_ok());

        let cfg = Config {
            check_ranges: true,
            ..Default::default()
        };
        let err = parse_file(&cfg, &popts(fname, None)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ValidationError>(),
            Some(ValidationError::OutOfRange { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_parse_file_empty() -> Result<()> {
        let dir = tempdir()?;
        let fname = dir.path().join("empty.kml");
        fs::write(&fname, "")?;

        let err = parse_file(&Config::default(), &popts(fname, None)).unwrap_err();
        assert_eq!(
            Some(&IngestError::Validation(ValidationError::MissingSource)),
            err.downcast_ref::<IngestError>()
        );
        Ok(())
    }

    #[test]
    fn test_check_file() -> Result<()> {
        let opts = CheckOpts {
            file: FIXTURE.into(),
        };
        let out = check_file(&Config::default(), &opts)?;

        assert!(out.contains("12 waypoints, 2 placemarks skipped"));
        assert!(out.contains("no Point"));
        assert!(out.contains("invalid coordinates"));
        assert!(!out.contains("Out of range"));
        Ok(())
    }
}
