//! The `Mission` aggregate: a name, the source document and the waypoints parsed from it.
//!
//! Annotations and no-fly zones are added by the user after the import and only ever
//! appended.  Waypoints can not be changed once the mission is built.
//!

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use tracing::debug;

use crate::{ValidationError, Waypoint};

/// User note pinned on the map.
///
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Annotation {
    pub latitude: f64,
    pub longitude: f64,
    pub note: Option<String>,
}

impl Annotation {
    pub fn new(latitude: f64, longitude: f64, note: Option<String>) -> Self {
        Annotation {
            latitude,
            longitude,
            note,
        }
    }
}

/// Area the flight must avoid, `coordinates` is kept as entered.
///
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct NoFlyZone {
    pub coordinates: String,
    pub note: Option<String>,
}

impl NoFlyZone {
    pub fn new(coordinates: &str, note: Option<String>) -> Result<Self, ValidationError> {
        if coordinates.trim().is_empty() {
            return Err(ValidationError::MissingZone);
        }
        Ok(NoFlyZone {
            coordinates: coordinates.to_string(),
            note,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Mission {
    name: String,
    raw_source: String,
    waypoints: Vec<Waypoint>,
    annotations: Vec<Annotation>,
    no_fly_zones: Vec<NoFlyZone>,
}

impl Mission {
    /// Create the aggregate from already parsed (and sorted) waypoints.
    ///
    /// `name` is stored trimmed, `raw_source` verbatim.  No waypoint is required.
    ///
    #[tracing::instrument(skip(raw_source, waypoints), fields(count = waypoints.len()))]
    pub fn build(
        name: &str,
        raw_source: &str,
        waypoints: Vec<Waypoint>,
    ) -> Result<Mission, ValidationError> {
        let name = check_name(name)?;
        check_source(raw_source)?;

        debug!("new mission {name:?}");
        Ok(Mission {
            name: name.to_string(),
            raw_source: raw_source.to_string(),
            waypoints,
            annotations: vec![],
            no_fly_zones: vec![],
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn raw_source(&self) -> &str {
        &self.raw_source
    }

    /// Waypoints in flight order.
    ///
    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    #[inline]
    pub fn waypoint_count(&self) -> usize {
        self.waypoints.len()
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn no_fly_zones(&self) -> &[NoFlyZone] {
        &self.no_fly_zones
    }

    pub fn add_annotation(&mut self, annotation: Annotation) {
        self.annotations.push(annotation);
    }

    pub fn add_no_fly_zone(&mut self, zone: NoFlyZone) {
        self.no_fly_zones.push(zone);
    }

    /// Change the name, same rules as in `build()`.
    ///
    pub fn rename(&mut self, name: &str) -> Result<(), ValidationError> {
        self.name = check_name(name)?.to_string();
        Ok(())
    }

    /// Replace the stored document.  Waypoints are NOT parsed again.
    ///
    pub fn replace_source(&mut self, raw_source: &str) -> Result<(), ValidationError> {
        check_source(raw_source)?;
        self.raw_source = raw_source.to_string();
        Ok(())
    }
}

/// Serialised with the waypoint count, ready to be sent to a client.
///
impl Serialize for Mission {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Mission", 6)?;
        s.serialize_field("name", &self.name)?;
        s.serialize_field("raw_source", &self.raw_source)?;
        s.serialize_field("waypoints", &self.waypoints)?;
        s.serialize_field("waypoint_count", &self.waypoints.len())?;
        s.serialize_field("annotations", &self.annotations)?;
        s.serialize_field("no_fly_zones", &self.no_fly_zones)?;
        s.end()
    }
}

#[inline]
fn check_name(name: &str) -> Result<&str, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::MissingName);
    }
    Ok(name)
}

#[inline]
fn check_source(raw_source: &str) -> Result<(), ValidationError> {
    if raw_source.trim().is_empty() {
        return Err(ValidationError::MissingSource);
    }
    Ok(())
}
