// file: src/geocode/client.rs
// description: Google Maps Geocoding API client normalising results to latitude/longitude
// reference: https://developers.google.com/maps/documentation/geocoding/requests-geocoding

use crate::config::GeocodingConfig;
use crate::error::{Result, ServiceError};
use crate::geocode::states::expand_state_abbreviation;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeocodeFailure {
    #[error("Google Maps API key not configured")]
    NotConfigured,

    #[error("no results for location '{address}'")]
    NotFound { address: String },

    #[error("quota exceeded ({status}): {message}")]
    QuotaExceeded { status: String, message: String },

    #[error("request denied: {message}")]
    RequestDenied { message: String },

    #[error("malformed address '{address}': {message}")]
    InvalidRequest { address: String, message: String },

    #[error("geocoding service error ({status}): {message}")]
    Upstream { status: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeocodeResult {
    pub location: String,
    pub resolved_query: String,
    pub formatted_address: Option<String>,
    #[serde(flatten)]
    pub point: GeoPoint,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeCandidate>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeCandidate {
    formatted_address: Option<String>,
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

enum Lookup {
    Found(GeocodeCandidate),
    ZeroResults,
}

#[derive(Clone)]
pub struct GeocodingClient {
    client: Client,
    base_url: String,
    api_key: String,
    region: String,
}

impl GeocodingClient {
    pub fn new(config: &GeocodingConfig) -> Result<Self> {
        let api_key = config.api_key().ok_or(GeocodeFailure::NotConfigured)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: api_key.to_string(),
            region: config.region.clone(),
        })
    }

    pub async fn geocode(&self, location: &str) -> Result<GeocodeResult> {
        let location = location.trim();
        if location.is_empty() {
            return Err(GeocodeFailure::InvalidRequest {
                address: location.to_string(),
                message: "location must not be empty".to_string(),
            }
            .into());
        }

        info!("Attempting to geocode: '{}'", location);

        let (resolved_query, candidate) = match self.lookup(location).await? {
            Lookup::Found(candidate) => (location.to_string(), candidate),
            Lookup::ZeroResults => {
                let fallback = expand_state_abbreviation(location)
                    .filter(|fallback| fallback != location)
                    .ok_or_else(|| GeocodeFailure::NotFound {
                        address: location.to_string(),
                    })?;

                info!("No results found, trying fallback: '{}'", fallback);
                match self.lookup(&fallback).await? {
                    Lookup::Found(candidate) => (fallback, candidate),
                    Lookup::ZeroResults => {
                        error!("No geocoding results found after all attempts");
                        return Err(GeocodeFailure::NotFound {
                            address: location.to_string(),
                        }
                        .into());
                    }
                }
            }
        };

        let geometry = candidate.geometry.ok_or_else(|| GeocodeFailure::NotFound {
            address: location.to_string(),
        })?;

        let result = GeocodeResult {
            location: location.to_string(),
            resolved_query,
            formatted_address: candidate.formatted_address,
            point: GeoPoint {
                latitude: geometry.location.lat,
                longitude: geometry.location.lng,
            },
        };

        info!(
            "Successfully geocoded to: lat={}, lon={}",
            result.point.latitude, result.point.longitude
        );
        Ok(result)
    }

    async fn lookup(&self, address: &str) -> Result<Lookup> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("address", address),
                ("region", self.region.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let http_status = response.status();
        if !http_status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GeocodeFailure::Upstream {
                status: http_status.to_string(),
                message: body,
            }
            .into());
        }

        let body: GeocodeResponse = response.json().await?;
        debug!("Geocoding status: {}", body.status);

        classify(address, body)
    }
}

fn classify(address: &str, body: GeocodeResponse) -> Result<Lookup> {
    let message = body
        .error_message
        .unwrap_or_else(|| "No detailed error message".to_string());

    let failure = match body.status.as_str() {
        "OK" => {
            return match body.results.into_iter().next() {
                Some(candidate) => Ok(Lookup::Found(candidate)),
                None => Ok(Lookup::ZeroResults),
            };
        }
        "ZERO_RESULTS" => return Ok(Lookup::ZeroResults),
        "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => GeocodeFailure::QuotaExceeded {
            status: body.status,
            message,
        },
        "REQUEST_DENIED" => GeocodeFailure::RequestDenied { message },
        "INVALID_REQUEST" => GeocodeFailure::InvalidRequest {
            address: address.to_string(),
            message,
        },
        _ => GeocodeFailure::Upstream {
            status: body.status,
            message,
        },
    };

    error!("Google API error: {}", failure);
    Err(ServiceError::Geocoding(failure))
}
