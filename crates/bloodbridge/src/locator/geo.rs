//! Coordinates and great-circle distance.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::LocatorError;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl Coordinates {
    /// Build a position, rejecting non-finite or out-of-range values.
    ///
    /// # Errors
    ///
    /// Returns [`LocatorError::InvalidRequest`] if the latitude is outside
    /// `[-90, 90]` or the longitude outside `[-180, 180]`.
    pub fn new(lat: f64, lon: f64) -> Result<Self, LocatorError> {
        let coordinates = Self { lat, lon };
        coordinates.validate()?;
        Ok(coordinates)
    }

    /// Check that this position is finite and within WGS84 ranges.
    ///
    /// # Errors
    ///
    /// Returns [`LocatorError::InvalidRequest`] describing the bad component.
    pub fn validate(&self) -> Result<(), LocatorError> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(LocatorError::invalid_request(format!(
                "latitude {} is outside [-90, 90]",
                self.lat
            )));
        }
        if !self.lon.is_finite() || !(-180.0..=180.0).contains(&self.lon) {
            return Err(LocatorError::invalid_request(format!(
                "longitude {} is outside [-180, 180]",
                self.lon
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}

/// Haversine distance between two positions in kilometres.
#[must_use]
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lon - a.lon).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    EARTH_RADIUS_KM * 2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}
