use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// One flight-plan point extracted from a single `Placemark`.
///
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Waypoint {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Execution height in meters, `None` when the record has none
    pub altitude: Option<f64>,
    /// Declared position in the flight plan
    pub index: i64,
}

impl Waypoint {
    /// Check that the position is a valid geographic one.
    ///
    /// The parser never calls this, it only requires parsable numbers.
    ///
    pub fn check_range(&self) -> Result<(), ValidationError> {
        if (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude) {
            Ok(())
        } else {
            Err(ValidationError::OutOfRange {
                index: self.index,
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }
}
