//! Reqwest-backed Nominatim reverse geocoder.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::trace;

use super::overpass::{map_status_error, map_transport_error};
use super::{Coordinates, LocatorError, ReverseGeocoder};

/// Reverse geocoder calling a Nominatim `reverse` endpoint.
#[derive(Debug)]
pub struct NominatimGeocoder {
    client: Client,
    endpoint: Url,
}

#[derive(Debug, Deserialize)]
struct ReverseResponseDto {
    display_name: Option<String>,
}

impl NominatimGeocoder {
    /// Build a geocoder using a client with an explicit request timeout.
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
impl ReverseGeocoder for NominatimGeocoder {
    async fn display_name(&self, position: Coordinates) -> Result<Option<String>, LocatorError> {
        let lat = position.lat.to_string();
        let lon = position.lon.to_string();

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[
                ("format", "json"),
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("addressdetails", "1"),
            ])
            .header(reqwest::header::ACCEPT_LANGUAGE, "en")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }

        trace!("Reverse geocoded {} ({} bytes)", position, body.len());
        parse_display_name(body.as_ref())
    }
}

fn parse_display_name(body: &[u8]) -> Result<Option<String>, LocatorError> {
    let decoded: ReverseResponseDto = serde_json::from_slice(body)
        .map_err(|e| LocatorError::decode(format!("invalid Nominatim JSON payload: {e}")))?;
    Ok(decoded
        .display_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_display_name() {
        let body = r#"{"place_id": 1, "display_name": "Sassoon Hospital, Pune, Maharashtra, India"}"#;
        assert_eq!(
            parse_display_name(body.as_bytes()).unwrap().as_deref(),
            Some("Sassoon Hospital, Pune, Maharashtra, India")
        );
    }

    #[test]
    fn test_missing_display_name_is_none() {
        let body = r#"{"error": "Unable to geocode"}"#;
        assert_eq!(parse_display_name(body.as_bytes()).unwrap(), None);
    }

    #[test]
    fn test_blank_display_name_is_none() {
        assert_eq!(
            parse_display_name(br#"{"display_name": "  "}"#).unwrap(),
            None
        );
    }

    #[test]
    fn test_invalid_json_is_decode_error() {
        let err = parse_display_name(b"not json").unwrap_err();
        assert!(matches!(err, LocatorError::Decode(_)));
    }

    #[test]
    fn test_new_builds_client() {
        let endpoint: Url = "https://nominatim.openstreetmap.org/reverse".parse().unwrap();
        assert!(NominatimGeocoder::new(endpoint, Duration::from_secs(5), "bloodbridge-test").is_ok());
    }
}
