//! Finding donors who can answer an emergency request.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use super::dashboard::ANY_BLOOD_TYPE;
use super::RecordStore;
use crate::locator::{haversine_km, Coordinates};
use crate::record::{ApplicationStatus, DonorRecord, Record, Status};
use crate::storage::KeyValueBackend;

/// Default search radius around the requesting hospital.
pub const DEFAULT_MATCH_RADIUS_KM: f64 = 30.0;

/// A donor eligible for a request, with their distance from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorMatch {
    /// The donor application.
    pub donor: DonorRecord,
    /// Distance from the request's location in kilometres.
    pub distance_km: f64,
}

/// Position from `lat`/`lng` fields; zero or missing values mean unknown.
fn position_of<S: Status>(record: &Record<S>) -> Option<Coordinates> {
    let lat = record.f64_field("lat")?;
    let lon = record.f64_field("lng")?;
    if lat == 0.0 || lon == 0.0 {
        return None;
    }
    Coordinates::new(lat, lon).ok()
}

/// Whether the donor's `cooldownUntil` date is still ahead of (or is) `today`.
fn on_cooldown(donor: &DonorRecord, today: NaiveDate) -> bool {
    donor
        .str_field("cooldownUntil")
        .and_then(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok())
        .is_some_and(|until| until >= today)
}

impl<B: KeyValueBackend> RecordStore<B> {
    /// Approved donors who could answer the emergency request `emergency_id`.
    ///
    /// A donor matches when their `bloodGroup` equals the request's
    /// `bloodType` (any group matches `"Any"`), both sides have coordinates,
    /// the donor is within `radius_km`, and any `cooldownUntil` date lies
    /// before `today`. Results are nearest first.
    ///
    /// Returns an empty list for an unknown request or one without
    /// coordinates.
    #[must_use]
    pub fn matching_donors(
        &self,
        emergency_id: &str,
        radius_km: f64,
        today: NaiveDate,
    ) -> Vec<DonorMatch> {
        let Some(request) = self.emergencies().get(emergency_id) else {
            debug!("No emergency request {} to match", emergency_id);
            return Vec::new();
        };
        let Some(origin) = position_of(&request) else {
            debug!("Emergency request {} has no coordinates", emergency_id);
            return Vec::new();
        };
        let blood_type = request.str_field("bloodType").unwrap_or(ANY_BLOOD_TYPE);

        let mut matches: Vec<DonorMatch> = self
            .donors()
            .get_all()
            .into_iter()
            .filter(|d| d.status == ApplicationStatus::Approved)
            .filter(|d| !on_cooldown(d, today))
            .filter(|d| blood_type == ANY_BLOOD_TYPE || d.str_field("bloodGroup") == Some(blood_type))
            .filter_map(|donor| {
                let distance_km = haversine_km(origin, position_of(&donor)?);
                (distance_km <= radius_km).then_some(DonorMatch { donor, distance_km })
            })
            .collect();

        matches.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        debug!(
            "{} donors match emergency request {} within {} km",
            matches.len(),
            emergency_id,
            radius_km
        );
        matches
    }
}
