//! Choosing a hospital and carrying it into a record.

use serde::Serialize;
use serde_json::{Map, Value};

use super::address::escape_html;
use super::{Coordinates, Hospital};

/// Build a Google Maps search link for a position.
#[must_use]
pub fn maps_link(coordinates: Coordinates) -> String {
    format!(
        "https://www.google.com/maps/search/?api=1&query={},{}",
        coordinates.lat, coordinates.lon
    )
}

/// Render the HTML popup shown for a hospital marker.
///
/// Name and address are escaped; the distance is shown to two decimals.
#[must_use]
pub fn render_popup_html(hospital: &Hospital) -> String {
    format!(
        concat!(
            "<div class=\"hospital-popup\">",
            "<div class=\"popup-hospital-name\">{}</div>",
            "<div class=\"popup-hospital-address\">{}</div>",
            "<div class=\"suggestion-distance\">{:.2} km away</div>",
            "<a class=\"map-link\" href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">View on Google Maps</a>",
            "</div>"
        ),
        escape_html(&hospital.name),
        escape_html(&hospital.address),
        hospital.distance_km,
        escape_html(&maps_link(hospital.coordinates)),
    )
}

/// The hospital a user picked, ready to be merged into a form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HospitalSelection {
    /// Hospital name.
    pub name: String,
    /// Hospital address.
    pub address: String,
    /// Hospital position.
    pub coordinates: Coordinates,
    /// Link to the position on a map.
    pub maps_link: String,
}

impl HospitalSelection {
    /// Select `hospital`.
    #[must_use]
    pub fn select(hospital: &Hospital) -> Self {
        Self {
            name: hospital.name.clone(),
            address: hospital.address.clone(),
            coordinates: hospital.coordinates,
            maps_link: maps_link(hospital.coordinates),
        }
    }

    /// Record fields carrying this selection: `hospitalName`, `location`,
    /// `lat` and `lng`.
    #[must_use]
    pub fn into_fields(self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("hospitalName".to_string(), Value::String(self.name));
        fields.insert("location".to_string(), Value::String(self.address));
        fields.insert("lat".to_string(), Value::from(self.coordinates.lat));
        fields.insert("lng".to_string(), Value::from(self.coordinates.lon));
        fields
    }
}
