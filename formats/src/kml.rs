//! KML waypoint mission parser.
//!
//! Drone planners export missions as KML where every waypoint is a `Placemark` holding a
//! `Point`.  The vendor-specific WPML namespace adds the declared order of the waypoint
//! (`wpml:index`) and its height (`wpml:executeHeight`).
//!
//! ```xml
//! <kml xmlns="http://www.opengis.net/kml/2.2" xmlns:wpml="http://www.dji.com/wpmz/1.0.6">
//!   <Document>
//!     <Folder>
//!       <Placemark>
//!         <Point><coordinates>174.7633,-36.8485</coordinates></Point>
//!         <wpml:index>0</wpml:index>
//!         <wpml:executeHeight>50</wpml:executeHeight>
//!       </Placemark>
//!     </Folder>
//!   </Document>
//! </kml>
//! ```
//!
//! Only a document which is not well-formed is an error.  A `Placemark` we can not get a
//! position from is skipped and reported through `Extraction::skipped` and the logs, the
//! others are still returned.
//!

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use nom::{
    character::complete::{char, multispace0},
    combinator::all_consuming,
    number::complete::double,
    sequence::{delimited, separated_pair},
    IResult,
};
use tracing::{error, info, trace, warn};

use crate::xml::Element;
use crate::{ParseError, Waypoint};

/// Geographic namespace for the document and the `Placemark`/`Point` records
pub const KML_NS: &str = "http://www.opengis.net/kml/2.2";
/// Vendor namespace for the flight metadata
pub const WPML_NS: &str = "http://www.dji.com/wpmz/1.0.6";

/// Why a `Placemark` did not give us a waypoint.
///
#[derive(Clone, Debug, PartialEq)]
pub enum SkipReason {
    /// No `Point` anywhere in the record
    MissingPoint,
    /// `Point` without `coordinates` or with an empty one
    MissingCoordinates,
    /// Not a `lon,lat` pair
    BadCoordinates(String),
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingPoint => write!(f, "no Point"),
            SkipReason::MissingCoordinates => write!(f, "no coordinates"),
            SkipReason::BadCoordinates(s) => write!(f, "invalid coordinates {s:?}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SkippedRecord {
    /// Position of the `Placemark` in the document, starting at 0
    pub position: usize,
    pub reason: SkipReason,
}

/// Result of a parse along with the records we had to drop.
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Extraction {
    /// Sorted by `index`
    pub waypoints: Vec<Waypoint>,
    pub skipped: Vec<SkippedRecord>,
}

/// Extract all waypoints from `input`, sorted by their declared index.
///
/// Placemarks sharing an index keep their document order.
///
pub fn parse(input: &str) -> Result<Vec<Waypoint>, ParseError> {
    Ok(parse_detailed(input)?.waypoints)
}

/// Same as `parse()` but also returns the skipped records.
///
#[tracing::instrument(skip(input), fields(len = input.len()))]
pub fn parse_detailed(input: &str) -> Result<Extraction, ParseError> {
    let root = Element::parse(input).inspect_err(|e| error!("{e}"))?;
    Ok(extract(&root))
}

/// `parse_detailed()` for raw bytes, which must be UTF-8.
///
#[tracing::instrument(skip(input), fields(len = input.len()))]
pub fn parse_detailed_bytes(input: &[u8]) -> Result<Extraction, ParseError> {
    let root = Element::parse_bytes(input).inspect_err(|e| error!("{e}"))?;
    Ok(extract(&root))
}

fn extract(root: &Element) -> Extraction {
    let mut res = Extraction::default();

    root.descendants()
        .filter(|e| e.is(KML_NS, "Placemark"))
        .enumerate()
        .for_each(|(position, pm)| match placemark(pm) {
            Ok(wp) => {
                trace!("placemark #{position} = {wp:?}");
                res.waypoints.push(wp)
            }
            Err(reason) => {
                warn!("skipping placemark #{position}: {reason}");
                res.skipped.push(SkippedRecord { position, reason });
            }
        });

    // `sort_by_key` is stable
    //
    res.waypoints.sort_by_key(|wp| wp.index);

    info!(
        "{} waypoints found, {} placemarks skipped",
        res.waypoints.len(),
        res.skipped.len()
    );
    res
}

fn placemark(pm: &Element) -> Result<Waypoint, SkipReason> {
    let point = pm.find(KML_NS, "Point").ok_or(SkipReason::MissingPoint)?;
    let coords = point
        .child(KML_NS, "coordinates")
        .map(|e| e.text.trim())
        .filter(|s| !s.is_empty())
        .ok_or(SkipReason::MissingCoordinates)?;

    let (_, (longitude, latitude)) =
        parse_coordinates(coords).map_err(|_| SkipReason::BadCoordinates(coords.to_string()))?;

    let index = pm
        .child(WPML_NS, "index")
        .and_then(value::<i64>)
        .unwrap_or(0);
    let altitude = pm.child(WPML_NS, "executeHeight").and_then(value::<f64>);

    Ok(Waypoint {
        latitude,
        longitude,
        altitude,
        index,
    })
}

/// Optional numeric field, an empty one is the same as a missing one.
///
fn value<T: FromStr>(elem: &Element) -> Option<T> {
    let text = elem.text.trim();
    if text.is_empty() {
        return None;
    }
    match text.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("ignoring invalid {} value {text:?}", elem.name);
            None
        }
    }
}

#[inline]
fn field(input: &str) -> IResult<&str, f64> {
    delimited(multispace0, double, multispace0)(input)
}

/// Parse `"<lon>,<lat>"` into `(lon, lat)`, the whole string must be consumed.
///
pub fn parse_coordinates(input: &str) -> IResult<&str, (f64, f64)> {
    all_consuming(separated_pair(field, char(','), field))(input)
}
