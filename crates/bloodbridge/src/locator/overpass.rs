//! Reqwest-backed Overpass hospital source.
//!
//! Owns transport details only: query construction, HTTP error mapping and
//! decoding `elements[]` into [`HospitalPoi`]s.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use super::{Coordinates, HospitalPoi, HospitalSource, LocatorError};

/// Server-side timeout directive embedded in the query, in seconds.
const QUERY_TIMEOUT_SECONDS: u32 = 25;

/// Name used for POIs without a `name` tag.
const UNNAMED_HOSPITAL: &str = "Unnamed Hospital";

/// `User-Agent` sent to OSM services unless configured otherwise.
pub const DEFAULT_USER_AGENT: &str = concat!("bloodbridge/", env!("CARGO_PKG_VERSION"));

/// Build the Overpass QL query for hospitals within `radius_m` of `origin`.
///
/// Nodes, ways and relations tagged `amenity=hospital` are matched; `out
/// center` makes ways and relations report a centre point.
#[must_use]
pub fn build_hospital_query(origin: Coordinates, radius_m: u32) -> String {
    let around = format!("(around:{radius_m},{},{})", origin.lat, origin.lon);
    format!(
        "[out:json][timeout:{QUERY_TIMEOUT_SECONDS}];(\
         node[\"amenity\"=\"hospital\"]{around};\
         way[\"amenity\"=\"hospital\"]{around};\
         relation[\"amenity\"=\"hospital\"]{around};\
         );out center;"
    )
}

/// Hospital source that POSTs queries to one Overpass endpoint.
#[derive(Debug)]
pub struct OverpassSource {
    client: Client,
    endpoint: Url,
}

impl OverpassSource {
    /// Build a source using a client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`LocatorError::InvalidRequest`] if the HTTP client cannot be
    /// constructed.
    pub fn new(endpoint: Url, timeout: Duration, user_agent: &str) -> Result<Self, LocatorError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| LocatorError::invalid_request(e.to_string()))?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl HospitalSource for OverpassSource {
    async fn hospitals_near(
        &self,
        origin: Coordinates,
        radius_m: u32,
    ) -> Result<Vec<HospitalPoi>, LocatorError> {
        origin.validate()?;
        let query = build_hospital_query(origin, radius_m);
        debug!("Querying Overpass at {}", self.endpoint);

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .body(query)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }

        parse_hospitals(body.as_ref())
    }
}

#[derive(Debug, Deserialize)]
struct OverpassResponseDto {
    #[serde(default)]
    elements: Vec<OverpassElementDto>,
}

#[derive(Debug, Deserialize)]
struct OverpassElementDto {
    #[serde(rename = "type", default)]
    element_type: String,
    #[serde(default)]
    id: i64,
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<CenterDto>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct CenterDto {
    lat: f64,
    lon: f64,
}

impl OverpassElementDto {
    fn coordinates(&self) -> Option<Coordinates> {
        let (lat, lon) = match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => self.center.as_ref().map(|c| (c.lat, c.lon))?,
        };
        Coordinates::new(lat, lon).ok()
    }

    fn into_poi(self) -> Option<HospitalPoi> {
        let Some(coordinates) = self.coordinates() else {
            debug!(
                "Skipping {} {} without usable coordinates",
                self.element_type, self.id
            );
            return None;
        };
        let name = self
            .tags
            .get("name")
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .unwrap_or(UNNAMED_HOSPITAL)
            .to_string();
        Some(HospitalPoi {
            name,
            coordinates,
            tags: self.tags,
        })
    }
}

fn parse_hospitals(body: &[u8]) -> Result<Vec<HospitalPoi>, LocatorError> {
    let decoded: OverpassResponseDto = serde_json::from_slice(body)
        .map_err(|e| LocatorError::decode(format!("invalid Overpass JSON payload: {e}")))?;
    Ok(decoded
        .elements
        .into_iter()
        .filter_map(OverpassElementDto::into_poi)
        .collect())
}

pub(super) fn map_transport_error(error: reqwest::Error) -> LocatorError {
    if error.is_timeout() {
        LocatorError::timeout(error.to_string())
    } else {
        LocatorError::transport(error.to_string())
    }
}

pub(super) fn map_status_error(status: StatusCode, body: &[u8]) -> LocatorError {
    let preview = body_preview(body);
    let message = if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), preview)
    };

    match status {
        StatusCode::TOO_MANY_REQUESTS => LocatorError::rate_limited(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => LocatorError::timeout(message),
        _ if status.is_client_error() => LocatorError::invalid_request(message),
        _ => LocatorError::transport(message),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview: String = compact.chars().take(PREVIEW_CHAR_LIMIT).collect();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_contains_all_element_kinds() {
        let query = build_hospital_query(
            Coordinates {
                lat: 28.61,
                lon: 77.2,
            },
            5000,
        );

        assert!(query.starts_with("[out:json][timeout:25];"));
        assert!(query.contains("node[\"amenity\"=\"hospital\"](around:5000,28.61,77.2);"));
        assert!(query.contains("way[\"amenity\"=\"hospital\"](around:5000,28.61,77.2);"));
        assert!(query.contains("relation[\"amenity\"=\"hospital\"](around:5000,28.61,77.2);"));
        assert!(query.ends_with("out center;"));
    }

    #[test]
    fn test_parses_nodes_and_centres() {
        let body = r#"{
            "elements": [
                {
                    "type": "node",
                    "id": 1,
                    "lat": 18.52,
                    "lon": 73.85,
                    "tags": { "amenity": "hospital", "name": "Ruby Hall Clinic" }
                },
                {
                    "type": "way",
                    "id": 2,
                    "center": { "lat": 18.53, "lon": 73.87 },
                    "tags": { "amenity": "hospital" }
                }
            ]
        }"#;

        let pois = parse_hospitals(body.as_bytes()).unwrap();
        assert_eq!(pois.len(), 2);
        assert_eq!(pois[0].name, "Ruby Hall Clinic");
        assert_eq!(pois[0].coordinates.lat, 18.52);
        assert_eq!(pois[1].name, UNNAMED_HOSPITAL);
        assert_eq!(pois[1].coordinates.lon, 73.87);
        assert_eq!(
            pois[1].tags.get("amenity").map(String::as_str),
            Some("hospital")
        );
    }

    #[test]
    fn test_skips_elements_without_coordinates() {
        let body = r#"{ "elements": [ { "type": "relation", "id": 3, "tags": {} } ] }"#;
        assert!(parse_hospitals(body.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_elements_is_empty() {
        assert!(parse_hospitals(b"{}").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_json_is_decode_error() {
        let err = parse_hospitals(b"<html>busy</html>").unwrap_err();
        assert!(matches!(err, LocatorError::Decode(_)));
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            map_status_error(StatusCode::TOO_MANY_REQUESTS, b""),
            LocatorError::RateLimited(_)
        ));
        assert!(matches!(
            map_status_error(StatusCode::GATEWAY_TIMEOUT, b""),
            LocatorError::Timeout(_)
        ));
        assert!(matches!(
            map_status_error(StatusCode::BAD_REQUEST, b"bad query"),
            LocatorError::InvalidRequest(_)
        ));
        assert!(matches!(
            map_status_error(StatusCode::INTERNAL_SERVER_ERROR, b""),
            LocatorError::Transport(_)
        ));
    }

    #[test]
    fn test_body_preview_truncates() {
        let long = "x".repeat(500);
        let preview = body_preview(long.as_bytes());
        assert_eq!(preview.len(), 163);
        assert!(preview.ends_with("..."));

        assert_eq!(body_preview(b"  a \n  b  "), "a b");
    }
}
