//! HTTP client for the GreenGuard backend REST API.
//!
//! Covers current conditions, forecasts, server-side recommendations, travel
//! exposure, history and geocoding. Current-AQI and forecast responses go
//! through a shared [`ResponseCache`] so repeated lookups within five minutes
//! do not hit the network.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use greenguard_core::api_client::ApiClient;
//! use greenguard_core::ResponseCache;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ApiClient::new("http://localhost:8020", Arc::new(ResponseCache::new()))?;
//!
//! let current = client.current_aqi(40.7128, -74.006).await?;
//! println!("AQI {} ({})", current.aqi, current.status.as_deref().unwrap_or("-"));
//!
//! let week = client.forecast(40.7128, -74.006, 7).await?;
//! println!("{} forecast days", week.len());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, warn};

use greenguard_types::{Coordinates, EnvironmentalSnapshot, UserType};

use crate::cache::ResponseCache;
use crate::config::{ClientConfig, DEFAULT_REQUEST_TIMEOUT};

/// Number of forecast days requested when the caller has no preference.
pub const DEFAULT_FORECAST_DAYS: u8 = 7;

/// Largest forecast window the backend accepts.
pub const MAX_FORECAST_DAYS: u8 = 7;

/// Travel mode sent when none is given.
pub const DEFAULT_TRAVEL_MODE: &str = "driving";

/// HTTP client for the backend API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    cache: Arc<ResponseCache>,
}

/// Error type for API client operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ApiClientError {
    /// The backend is not reachable.
    #[error("Backend not reachable at {url}: {source}")]
    NotReachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A request argument is out of range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// API returned an error response.
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    /// A cached payload no longer matches the expected shape.
    #[error("Malformed response: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for API client operations.
pub type Result<T> = std::result::Result<T, ApiClientError>;

// ==========================================================================
// Request and Response Types
// ==========================================================================

/// Current conditions at a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentAqi {
    pub aqi: f64,
    #[serde(default)]
    pub pm25: Option<f64>,
    #[serde(default)]
    pub pm10: Option<f64>,
    #[serde(default)]
    pub co2: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub wind_speed: Option<f64>,
    /// Backend status label, e.g. "Moderate".
    #[serde(default)]
    pub status: Option<String>,
    /// Timestamp as sent by the backend.
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl CurrentAqi {
    /// Convert to a snapshot for the classification pipeline.
    ///
    /// The backend timestamp is used when it parses; `fetched_at` otherwise.
    pub fn to_snapshot(
        &self,
        location: Coordinates,
        fetched_at: OffsetDateTime,
    ) -> EnvironmentalSnapshot {
        let timestamp = self
            .timestamp
            .as_deref()
            .and_then(crate::messages::parse_timestamp)
            .unwrap_or(fetched_at);
        let mut snapshot = EnvironmentalSnapshot::new(self.aqi, location, timestamp);
        snapshot.pm25 = self.pm25;
        snapshot.pm10 = self.pm10;
        snapshot.co2 = self.co2;
        snapshot.temperature_c = self.temperature;
        snapshot.humidity_pct = self.humidity;
        snapshot.wind_speed_ms = self.wind_speed;
        snapshot
    }
}

/// One day of forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
    pub aqi: f64,
    #[serde(default)]
    pub pm25: Option<f64>,
    #[serde(default)]
    pub pm10: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub wind_speed: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ForecastEnvelope {
    forecast: Vec<ForecastDay>,
}

#[derive(Debug, Deserialize)]
struct HistoricalEnvelope {
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct RecommendationRequest {
    aqi: f64,
    user_type: UserType,
}

/// Server-side recommendation response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub recommendations: Vec<String>,
    pub risk_level: String,
    pub outdoor_activity: String,
    pub mask_required: bool,
    pub air_purifier: bool,
}

/// Route for a travel-exposure estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelRequest {
    pub source_lat: f64,
    pub source_lon: f64,
    pub dest_lat: f64,
    pub dest_lon: f64,
    #[serde(default = "default_travel_mode")]
    pub travel_mode: String,
}

fn default_travel_mode() -> String {
    DEFAULT_TRAVEL_MODE.to_string()
}

impl TravelRequest {
    /// A driving route between two points.
    pub fn new(source: Coordinates, destination: Coordinates) -> Self {
        Self {
            source_lat: source.latitude,
            source_lon: source.longitude,
            dest_lat: destination.latitude,
            dest_lon: destination.longitude,
            travel_mode: default_travel_mode(),
        }
    }

    /// Set the travel mode, e.g. "walking" or "cycling".
    #[must_use]
    pub fn travel_mode(mut self, mode: impl Into<String>) -> Self {
        self.travel_mode = mode.into();
        self
    }
}

/// Exposure along one administrative region of a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateAnalysis {
    pub state: String,
    pub distance_km: f64,
    pub average_aqi: f64,
    pub risk_level: String,
}

/// Travel-exposure estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelResponse {
    pub source_aqi: f64,
    pub dest_aqi: f64,
    pub route_average_aqi: f64,
    pub exposure_level: String,
    pub risk_assessment: String,
    pub recommendations: Vec<String>,
    pub total_distance_km: f64,
    #[serde(default)]
    pub state_breakdown: Vec<StateAnalysis>,
    #[serde(default = "default_travel_mode")]
    pub travel_mode: String,
}

/// A resolved place name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub city: String,
    pub country: String,
}

impl GeocodeResult {
    /// A result that only labels raw coordinates.
    pub fn from_coordinates(location: &str, coords: Coordinates) -> Self {
        Self {
            location: location.to_string(),
            latitude: coords.latitude,
            longitude: coords.longitude,
            city: format!("{:.2}, {:.2}", coords.latitude, coords.longitude),
            country: String::new(),
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// Cache key for a current-AQI lookup.
pub fn current_aqi_key(latitude: f64, longitude: f64) -> String {
    format!("current-aqi-{}-{}", latitude, longitude)
}

/// Cache key for a forecast lookup.
pub fn forecast_key(latitude: f64, longitude: f64, days: u8) -> String {
    format!("forecast-{}-{}-{}", latitude, longitude, days)
}

// ==========================================================================
// ApiClient Implementation
// ==========================================================================

impl ApiClient {
    /// Create a client with the default 10-second request timeout.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Backend URL (e.g., "http://localhost:8020")
    /// * `cache` - Cache shared with other clients, or a fresh one
    pub fn new(base_url: &str, cache: Arc<ResponseCache>) -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .map_err(ApiClientError::Request)?;
        Self::with_client(base_url, client, cache)
    }

    /// Create a client from configuration.
    pub fn from_config(config: &ClientConfig, cache: Arc<ResponseCache>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(ApiClientError::Request)?;
        Self::with_client(config.base_url(), client, cache)
    }

    /// Create a client with a custom reqwest Client.
    pub fn with_client(
        base_url: &str,
        client: Client,
        cache: Arc<ResponseCache>,
    ) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ApiClientError::InvalidUrl(format!(
                "URL must start with http:// or https://, got: {}",
                base_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            cache,
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The response cache backing this client.
    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Current conditions. Served from the cache for five minutes.
    pub async fn current_aqi(&self, latitude: f64, longitude: f64) -> Result<CurrentAqi> {
        let key = current_aqi_key(latitude, longitude);
        let url = format!(
            "{}/api/current-aqi?latitude={}&longitude={}",
            self.base_url, latitude, longitude
        );
        self.get_cached(&key, &url).await
    }

    /// Daily forecast for `days` days (1 to 7). Served from the cache for
    /// five minutes.
    pub async fn forecast(
        &self,
        latitude: f64,
        longitude: f64,
        days: u8,
    ) -> Result<Vec<ForecastDay>> {
        if !(1..=MAX_FORECAST_DAYS).contains(&days) {
            return Err(ApiClientError::InvalidArgument(format!(
                "forecast days must be between 1 and {}, got {}",
                MAX_FORECAST_DAYS, days
            )));
        }
        let key = forecast_key(latitude, longitude, days);
        let url = format!(
            "{}/api/forecast?latitude={}&longitude={}&days={}",
            self.base_url, latitude, longitude, days
        );
        let envelope: ForecastEnvelope = self.get_cached(&key, &url).await?;
        Ok(envelope.forecast)
    }

    /// Server-side recommendations for an AQI value and rider category.
    pub async fn recommendations(
        &self,
        aqi: f64,
        user_type: UserType,
    ) -> Result<RecommendationResponse> {
        let url = format!("{}/api/recommendations", self.base_url);
        self.post_json(&url, &RecommendationRequest { aqi, user_type })
            .await
    }

    /// Exposure estimate for a route.
    pub async fn travel_exposure(&self, request: &TravelRequest) -> Result<TravelResponse> {
        let url = format!("{}/api/travel-exposure", self.base_url);
        self.post_json(&url, request).await
    }

    /// Historical records for a location, as returned by the backend.
    pub async fn historical(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Vec<serde_json::Value>> {
        let url = format!(
            "{}/api/historical?latitude={}&longitude={}",
            self.base_url, latitude, longitude
        );
        let envelope: HistoricalEnvelope = self.get(&url).await?;
        Ok(envelope.data)
    }

    /// Resolve a place name to coordinates.
    pub async fn geocode(&self, location: &str) -> Result<GeocodeResult> {
        let response = self
            .client
            .get(format!("{}/api/geocode", self.base_url))
            .query(&[("location", location)])
            .send()
            .await
            .map_err(|e| ApiClientError::NotReachable {
                url: format!("{}/api/geocode", self.base_url),
                source: e,
            })?;
        self.handle_response(response).await
    }

    /// Resolve a place name, labelling `fallback` with its coordinates when
    /// the lookup fails.
    pub async fn geocode_or_fallback(
        &self,
        location: &str,
        fallback: Coordinates,
    ) -> GeocodeResult {
        match self.geocode(location).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Geocoding '{}' failed, using coordinates: {}", location, e);
                GeocodeResult::from_coordinates(location, fallback)
            }
        }
    }

    // ======================================================================
    // Internal HTTP helpers
    // ======================================================================

    async fn get_cached<T: DeserializeOwned + Serialize>(
        &self,
        key: &str,
        url: &str,
    ) -> Result<T> {
        if let Some(cached) = self.cache.get(key) {
            debug!("Cache hit for '{}'", key);
            return Ok(serde_json::from_value(cached)?);
        }
        let value: T = self.get(url).await?;
        self.cache.set(key, serde_json::to_value(&value)?);
        Ok(value)
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response =
            self.client
                .get(url)
                .send()
                .await
                .map_err(|e| ApiClientError::NotReachable {
                    url: url.to_string(),
                    source: e,
                })?;

        self.handle_response(response).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.client.post(url).json(body).send().await.map_err(|e| {
            ApiClientError::NotReachable {
                url: url.to_string(),
                source: e,
            }
        })?;

        self.handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            response.json().await.map_err(ApiClientError::Request)
        } else {
            let message = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(String::from))
                .unwrap_or_else(|| status.to_string());

            Err(ApiClientError::ApiError {
                status: status.as_u16(),
                message,
            })
        }
    }
}
