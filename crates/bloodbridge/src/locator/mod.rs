//! Nearby-hospital search.
//!
//! The locator chains four collaborators:
//!
//! 1. a [`Geolocator`] for the user's position,
//! 2. a [`HospitalSource`] returning hospital POIs around it (Overpass),
//! 3. haversine ranking and truncation to the configured result count,
//! 4. a [`ReverseGeocoder`] resolving each hospital's address (Nominatim).
//!
//! Geolocation and POI failures abort the search. Address lookups never do:
//! each one is bounded by a timeout, retried on transient errors, and falls
//! back to an address built from the POI's OSM tags.
//!
//! # Example
//!
//! ```no_run
//! use bloodbridge::locator::{
//!     Coordinates, FixedLocation, HospitalLocator, LocatorOptions, NominatimGeocoder,
//!     OverpassSource, DEFAULT_USER_AGENT,
//! };
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let options = LocatorOptions::default();
//! let source = OverpassSource::new(
//!     "https://overpass-api.de/api/interpreter".parse()?,
//!     options.request_timeout,
//!     DEFAULT_USER_AGENT,
//! )?;
//! let geocoder = NominatimGeocoder::new(
//!     "https://nominatim.openstreetmap.org/reverse".parse()?,
//!     options.request_timeout,
//!     DEFAULT_USER_AGENT,
//! )?;
//! let locator = HospitalLocator::new(source, geocoder, options);
//!
//! let here = FixedLocation::new(Coordinates::new(28.6139, 77.2090)?);
//! for hospital in locator.search(&here).await? {
//!     println!("{} ({:.2} km): {}", hospital.name, hospital.distance_km, hospital.address);
//! }
//! # Ok(())
//! # }
//! ```

mod address;
mod geo;
mod nominatim;
mod overpass;
mod selection;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use address::{address_from_tags, escape_html, ADDRESS_NOT_AVAILABLE};
pub use geo::{haversine_km, Coordinates, EARTH_RADIUS_KM};
pub use nominatim::NominatimGeocoder;
pub use overpass::{build_hospital_query, OverpassSource, DEFAULT_USER_AGENT};
pub use selection::{maps_link, render_popup_html, HospitalSelection};

/// Errors that can occur while locating hospitals.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocatorError {
    /// The current position could not be determined.
    #[error("unable to retrieve your location: {0}")]
    Geolocation(String),

    /// The network request failed before a response arrived.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The request exceeded its time budget.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The remote service rate-limited the request.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The response body could not be decoded.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// The request was rejected before or by the remote service.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl LocatorError {
    /// Create a geolocation error.
    #[must_use]
    pub fn geolocation(message: impl Into<String>) -> Self {
        Self::Geolocation(message.into())
    }

    /// Create a transport error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Create a timeout error.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout(message.into())
    }

    /// Create a rate-limited error.
    #[must_use]
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited(message.into())
    }

    /// Create a decode error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Whether retrying the same request could succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Timeout(_) | Self::RateLimited(_)
        )
    }
}

/// Source of the user's current position.
#[async_trait]
pub trait Geolocator: Send + Sync {
    /// Determine the current position.
    ///
    /// # Errors
    ///
    /// Returns [`LocatorError::Geolocation`] if the position is unavailable.
    async fn current_position(&self) -> Result<Coordinates, LocatorError>;
}

/// A geolocator that always reports the same position, or none at all.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedLocation(Option<Coordinates>);

impl FixedLocation {
    /// Report `coordinates` as the current position.
    #[must_use]
    pub fn new(coordinates: Coordinates) -> Self {
        Self(Some(coordinates))
    }

    /// A geolocator with no position available.
    #[must_use]
    pub fn unavailable() -> Self {
        Self(None)
    }
}

impl From<Option<Coordinates>> for FixedLocation {
    fn from(coordinates: Option<Coordinates>) -> Self {
        Self(coordinates)
    }
}

#[async_trait]
impl Geolocator for FixedLocation {
    async fn current_position(&self) -> Result<Coordinates, LocatorError> {
        let coordinates = self
            .0
            .ok_or_else(|| LocatorError::geolocation("no position available"))?;
        coordinates
            .validate()
            .map_err(|e| LocatorError::geolocation(e.to_string()))?;
        Ok(coordinates)
    }
}

/// A hospital point of interest as returned by the POI service.
#[derive(Debug, Clone, PartialEq)]
pub struct HospitalPoi {
    /// Display name (`"Unnamed Hospital"` when the POI has none).
    pub name: String,
    /// Position of the node, or the centre of a way or relation.
    pub coordinates: Coordinates,
    /// Raw OSM tags.
    pub tags: BTreeMap<String, String>,
}

/// Service that finds hospitals around a position.
#[async_trait]
pub trait HospitalSource: Send + Sync {
    /// Return hospitals within `radius_m` metres of `origin`, in any order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query cannot be executed or decoded.
    async fn hospitals_near(
        &self,
        origin: Coordinates,
        radius_m: u32,
    ) -> Result<Vec<HospitalPoi>, LocatorError>;
}

/// Service that turns a position into a postal address.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// Return the display address for `position`, or `None` if the service
    /// has no address for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    async fn display_name(&self, position: Coordinates) -> Result<Option<String>, LocatorError>;
}

/// A ranked hospital with its resolved address.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hospital {
    /// Display name.
    pub name: String,
    /// Postal address, or a fallback string.
    pub address: String,
    /// Position.
    pub coordinates: Coordinates,
    /// Distance from the search origin in kilometres.
    pub distance_km: f64,
    /// Raw OSM tags.
    #[serde(skip)]
    pub tags: BTreeMap<String, String>,
}

/// Tuning for [`HospitalLocator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorOptions {
    /// Search radius around the origin in metres.
    pub radius_m: u32,
    /// Maximum number of hospitals returned.
    pub max_results: usize,
    /// Time budget for each reverse-geocoding attempt.
    pub request_timeout: Duration,
    /// Time budget for resolving all addresses together.
    pub enrichment_deadline: Duration,
    /// Extra attempts after a retryable reverse-geocoding failure.
    pub max_retries: u32,
    /// Pause before the first retry; doubles with each further attempt.
    pub retry_backoff: Duration,
}

impl Default for LocatorOptions {
    fn default() -> Self {
        Self {
            radius_m: 5000,
            max_results: 10,
            request_timeout: Duration::from_secs(10),
            enrichment_deadline: Duration::from_secs(30),
            max_retries: 1,
            retry_backoff: Duration::from_millis(250),
        }
    }
}

/// Finds, ranks and annotates nearby hospitals.
#[derive(Debug)]
pub struct HospitalLocator<S, G> {
    source: S,
    geocoder: G,
    options: LocatorOptions,
}

impl<S: HospitalSource, G: ReverseGeocoder> HospitalLocator<S, G> {
    /// Create a locator from its collaborators.
    #[must_use]
    pub fn new(source: S, geocoder: G, options: LocatorOptions) -> Self {
        Self {
            source,
            geocoder,
            options,
        }
    }

    /// The options this locator runs with.
    #[must_use]
    pub fn options(&self) -> &LocatorOptions {
        &self.options
    }

    /// Determine the current position, then find hospitals around it.
    ///
    /// # Errors
    ///
    /// Returns an error if geolocation or the POI query fails.
    pub async fn search(&self, geolocator: &dyn Geolocator) -> Result<Vec<Hospital>, LocatorError> {
        let origin = geolocator.current_position().await?;
        self.find_nearby(origin).await
    }

    /// Find hospitals around `origin`, nearest first.
    ///
    /// # Errors
    ///
    /// Returns an error if `origin` is invalid or the POI query fails.
    /// Address lookup failures are absorbed into fallback addresses.
    pub async fn find_nearby(&self, origin: Coordinates) -> Result<Vec<Hospital>, LocatorError> {
        origin.validate()?;

        let pois = self
            .source
            .hospitals_near(origin, self.options.radius_m)
            .await?;
        let found = pois.len();

        let mut ranked: Vec<(HospitalPoi, f64)> = pois
            .into_iter()
            .map(|poi| {
                let distance = haversine_km(origin, poi.coordinates);
                (poi, distance)
            })
            .collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
        ranked.truncate(self.options.max_results);

        info!(
            "Found {} hospitals near {}, resolving {} addresses",
            found,
            origin,
            ranked.len()
        );

        let addresses = self.resolve_addresses(&ranked).await;

        Ok(ranked
            .into_iter()
            .zip(addresses)
            .map(|((poi, distance_km), address)| Hospital {
                name: poi.name,
                address,
                coordinates: poi.coordinates,
                distance_km,
                tags: poi.tags,
            })
            .collect())
    }

    /// Resolve every address concurrently under the overall deadline.
    async fn resolve_addresses(&self, ranked: &[(HospitalPoi, f64)]) -> Vec<String> {
        let lookups = join_all(ranked.iter().map(|(poi, _)| self.resolve_address(poi)));

        match tokio::time::timeout(self.options.enrichment_deadline, lookups).await {
            Ok(addresses) => addresses,
            Err(_) => {
                warn!(
                    "Address lookups exceeded {:?}, using tag addresses",
                    self.options.enrichment_deadline
                );
                ranked
                    .iter()
                    .map(|(poi, _)| address_from_tags(&poi.tags))
                    .collect()
            }
        }
    }

    async fn resolve_address(&self, poi: &HospitalPoi) -> String {
        match self.lookup_with_retry(poi.coordinates).await {
            Ok(Some(address)) => address,
            Ok(None) => ADDRESS_NOT_AVAILABLE.to_string(),
            Err(e) => {
                debug!("Address lookup for {} failed: {}", poi.name, e);
                address_from_tags(&poi.tags)
            }
        }
    }

    async fn lookup_with_retry(&self, position: Coordinates) -> Result<Option<String>, LocatorError> {
        let mut attempt = 0;
        loop {
            let outcome =
                tokio::time::timeout(self.options.request_timeout, self.geocoder.display_name(position))
                    .await
                    .unwrap_or_else(|_| {
                        Err(LocatorError::timeout(format!(
                            "reverse geocoding {position} took longer than {:?}",
                            self.options.request_timeout
                        )))
                    });

            match outcome {
                Err(e) if e.is_retryable() && attempt < self.options.max_retries => {
                    let pause = self.options.retry_backoff * 2u32.saturating_pow(attempt);
                    debug!("Retrying address lookup for {} in {:?}: {}", position, pause, e);
                    tokio::time::sleep(pause).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}
