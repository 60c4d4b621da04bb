use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::core::config::GeocodingConfig;
use crate::core::error::{AppError, Result};

#[derive(Debug, thiserror::Error)]
pub enum GeocodingError {
    #[error("Geocoding request failed: {0}")]
    Request(String),

    #[error("Invalid geocoding response: {0}")]
    InvalidResponse(String),
}

/// Turns coordinates into a human-readable address.
///
/// `Ok(None)` means the service answered but knows no address there.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse(&self, lat: f64, lng: f64) -> std::result::Result<Option<String>, GeocodingError>;
}

/// Nominatim reverse lookup response; error replies carry no `display_name`
#[derive(Debug, Deserialize)]
struct NominatimReverseResponse {
    display_name: Option<String>,
}

/// Reverse geocoding via OpenStreetMap Nominatim
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocodingConfig) -> std::result::Result<Self, GeocodingError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()
            .map_err(|e| GeocodingError::Request(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn reverse(&self, lat: f64, lng: f64) -> std::result::Result<Option<String>, GeocodingError> {
        let url = format!("{}/reverse", self.base_url);
        tracing::debug!("Reverse geocoding ({}, {}) -> {}", lat, lng, url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", lat.to_string()),
                ("lon", lng.to_string()),
            ])
            .send()
            .await
            .map_err(|e| GeocodingError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GeocodingError::Request(format!(
                "Nominatim returned status {}",
                response.status()
            )));
        }

        let body: NominatimReverseResponse = response
            .json()
            .await
            .map_err(|e| GeocodingError::InvalidResponse(e.to_string()))?;

        Ok(body.display_name.filter(|name| !name.trim().is_empty()))
    }
}

/// Raw location hints from a submission
#[derive(Debug, Clone, Copy, Default)]
pub struct LocationInput<'a> {
    pub latitude: Option<&'a str>,
    pub longitude: Option<&'a str>,
    pub manual_address: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLocation {
    pub location: String,
    /// `(lat, lng)`, present only when the device supplied both
    pub coordinates: Option<(f64, f64)>,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_coordinate(raw: &str, name: &str, limit: f64) -> Result<f64> {
    let value: f64 = raw
        .parse()
        .map_err(|_| AppError::Validation(format!("{} must be a number", name)))?;

    if !value.is_finite() || value.abs() > limit {
        return Err(AppError::Validation(format!(
            "{} must be between -{} and {}",
            name, limit, limit
        )));
    }

    Ok(value)
}

/// Device coordinates, when both are present. A lone coordinate counts as none.
pub fn parse_device_coordinates(
    latitude: Option<&str>,
    longitude: Option<&str>,
) -> Result<Option<(f64, f64)>> {
    match (non_blank(latitude), non_blank(longitude)) {
        (Some(lat), Some(lng)) => Ok(Some((
            parse_coordinate(lat, "device_latitude", 90.0)?,
            parse_coordinate(lng, "device_longitude", 180.0)?,
        ))),
        _ => Ok(None),
    }
}

pub struct LocationService {
    geocoder: Arc<dyn ReverseGeocoder>,
}

impl LocationService {
    pub fn new(geocoder: Arc<dyn ReverseGeocoder>) -> Self {
        Self { geocoder }
    }

    /// Device GPS wins over a manual address. Geocoding problems never fail
    /// the resolution; they produce a string embedding the raw coordinates.
    pub async fn resolve(&self, input: LocationInput<'_>) -> Result<ResolvedLocation> {
        if let Some((lat, lng)) = parse_device_coordinates(input.latitude, input.longitude)? {
            let location = match self.geocoder.reverse(lat, lng).await {
                Ok(Some(address)) => address,
                Ok(None) => {
                    tracing::warn!("No address found for ({}, {})", lat, lng);
                    format!(
                        "Could not determine address from coordinates. Lat/Lng: ({:.4}, {:.4})",
                        lat, lng
                    )
                }
                Err(e) => {
                    tracing::warn!("Reverse geocoding failed: {}", e);
                    format!("Geocoding failed. Lat/Lng: ({:.4}, {:.4})", lat, lng)
                }
            };

            return Ok(ResolvedLocation {
                location,
                coordinates: Some((lat, lng)),
            });
        }

        match non_blank(input.manual_address) {
            Some(address) => Ok(ResolvedLocation {
                location: address.to_string(),
                coordinates: None,
            }),
            None => Err(AppError::Validation(
                "Location is required: enable device location or enter an address".to_string(),
            )),
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Geocoder with a fixed answer that counts its calls
    pub struct FixedGeocoder {
        answer: std::result::Result<Option<String>, String>,
        calls: AtomicUsize,
    }

    impl FixedGeocoder {
        pub fn address(address: &str) -> Self {
            Self {
                answer: Ok(Some(address.to_string())),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn unknown() -> Self {
            Self {
                answer: Ok(None),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing() -> Self {
            Self {
                answer: Err("connection refused".to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReverseGeocoder for FixedGeocoder {
        async fn reverse(
            &self,
            _lat: f64,
            _lng: f64,
        ) -> std::result::Result<Option<String>, GeocodingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.clone().map_err(GeocodingError::Request)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FixedGeocoder;
    use super::*;

    fn input<'a>(lat: Option<&'a str>, lng: Option<&'a str>, addr: Option<&'a str>) -> LocationInput<'a> {
        LocationInput {
            latitude: lat,
            longitude: lng,
            manual_address: addr,
        }
    }

    #[tokio::test]
    async fn test_gps_takes_priority_over_manual_address() {
        let geocoder = Arc::new(FixedGeocoder::address("Charminar, Hyderabad, Telangana"));
        let service = LocationService::new(geocoder.clone());

        let resolved = service
            .resolve(input(Some("17.3616"), Some("78.4747"), Some("Old City")))
            .await
            .unwrap();

        assert_eq!(resolved.location, "Charminar, Hyderabad, Telangana");
        assert_eq!(resolved.coordinates, Some((17.3616, 78.4747)));
        assert_eq!(geocoder.calls(), 1);
    }

    #[tokio::test]
    async fn test_manual_address_without_gps() {
        let geocoder = Arc::new(FixedGeocoder::address("unused"));
        let service = LocationService::new(geocoder.clone());

        let resolved = service
            .resolve(input(None, Some("78.4"), Some("  Road No. 12, Banjara Hills ")))
            .await
            .unwrap();

        assert_eq!(resolved.location, "Road No. 12, Banjara Hills");
        assert_eq!(resolved.coordinates, None);
        assert_eq!(geocoder.calls(), 0);
    }

    #[tokio::test]
    async fn test_no_location_is_validation_error() {
        let service = LocationService::new(Arc::new(FixedGeocoder::address("unused")));

        let result = service.resolve(input(Some(" "), None, Some(""))).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_failed_geocoding_embeds_coordinates() {
        let service = LocationService::new(Arc::new(FixedGeocoder::failing()));

        let resolved = service
            .resolve(input(Some("17.38"), Some("78.48"), None))
            .await
            .unwrap();

        assert_eq!(resolved.location, "Geocoding failed. Lat/Lng: (17.3800, 78.4800)");
        assert_eq!(resolved.coordinates, Some((17.38, 78.48)));
    }

    #[tokio::test]
    async fn test_unknown_address_embeds_coordinates() {
        let service = LocationService::new(Arc::new(FixedGeocoder::unknown()));

        let resolved = service
            .resolve(input(Some("17.4"), Some("78.5"), None))
            .await
            .unwrap();

        assert!(resolved
            .location
            .starts_with("Could not determine address from coordinates"));
        assert!(resolved.location.contains("(17.4000, 78.5000)"));
    }

    #[test]
    fn test_invalid_coordinates_are_rejected() {
        assert!(parse_device_coordinates(Some("north"), Some("78.4")).is_err());
        assert!(parse_device_coordinates(Some("91"), Some("78.4")).is_err());
        assert!(parse_device_coordinates(Some("17.3"), Some("-180.5")).is_err());
        assert!(parse_device_coordinates(Some("NaN"), Some("78.4")).is_err());
        assert_eq!(parse_device_coordinates(Some("17.3"), None).unwrap(), None);
    }

    #[tokio::test]
    async fn test_nominatim_reads_display_name() {
        use axum::{extract::Query, routing::get, Json, Router};
        use std::collections::HashMap;
        use std::time::Duration;

        let router = Router::new().route(
            "/reverse",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                assert_eq!(q.get("format").map(String::as_str), Some("jsonv2"));
                Json(serde_json::json!({ "display_name": format!("Near {},{}", q["lat"], q["lon"]) }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let geocoder = NominatimGeocoder::new(&GeocodingConfig {
            base_url: format!("http://{}", addr),
            user_agent: "fixmyhyd_app".to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap();

        let address = geocoder.reverse(17.5, 78.25).await.unwrap();
        assert_eq!(address.as_deref(), Some("Near 17.5,78.25"));
    }
}
