//! Stream message decoding.
//!
//! The backend pushes JSON envelopes over the realtime socket:
//!
//! ```text
//! {
//!   "type": "realtime_update",
//!   "timestamp": "2025-03-01T10:15:00.123456",
//!   "location": {"latitude": 40.71, "longitude": -74.0},
//!   "aqi": {"value": 87, "status": "Moderate", "pm25": 30, ...},
//!   "weather": {"temperature": 22, "humidity": 60, "wind_speed": 5, "description": "Clear sky"},
//!   "alerts": [{"level": "warning", "message": "..."}]
//! }
//! ```
//!
//! Only `realtime_update` envelopes carry data. Every other `type` decodes
//! to [`StreamMessage::Other`] so the caller can ignore it explicitly.

use serde::{Deserialize, Serialize};
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::{OffsetDateTime, PrimitiveDateTime};

use greenguard_types::{Coordinates, EnvironmentalSnapshot};

use crate::error::{Error, Result};

/// Envelope type that carries a snapshot.
pub const REALTIME_UPDATE: &str = "realtime_update";

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUpdate {
    timestamp: Option<String>,
    location: Option<Coordinates>,
    aqi: WireAqi,
    #[serde(default)]
    weather: WireWeather,
    #[serde(default)]
    alerts: Vec<ServerAlert>,
}

#[derive(Debug, Deserialize)]
struct WireAqi {
    value: f64,
    status: Option<String>,
    pm25: Option<f64>,
    pm10: Option<f64>,
    co: Option<f64>,
    co2: Option<f64>,
    no2: Option<f64>,
    o3: Option<f64>,
    so2: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct WireWeather {
    temperature: Option<f64>,
    humidity: Option<f64>,
    wind_speed: Option<f64>,
    description: Option<String>,
}

/// An alert as computed by the backend.
///
/// Decoded for completeness; the channel derives its own alerts from the
/// snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerAlert {
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub message: String,
}

/// A decoded `realtime_update`.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveUpdate {
    pub snapshot: EnvironmentalSnapshot,
    /// Backend's own status wording for the AQI.
    pub status: Option<String>,
    /// Free-text weather description.
    pub weather_description: Option<String>,
    pub server_alerts: Vec<ServerAlert>,
}

/// A decoded stream message.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    /// A new snapshot.
    Update(Box<LiveUpdate>),
    /// Any other envelope type, carried by name.
    Other(String),
}

/// Parse a backend timestamp.
///
/// The backend sends naive ISO-8601 times that are implicitly UTC; RFC 3339
/// with an offset is accepted too. Returns `None` if neither parses.
pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(raw, &Rfc3339)
        .or_else(|_| PrimitiveDateTime::parse(raw, &Iso8601::DEFAULT).map(|t| t.assume_utc()))
        .ok()
}

/// Decode one text frame.
///
/// `fallback` supplies the coordinates when the envelope has no `location`,
/// normally the coordinates the channel subscribed with.
///
/// # Errors
///
/// Returns [`Error::Json`] for text that is not JSON or does not match the
/// update shape, and [`Error::InvalidMessage`] for an envelope with no
/// `type` or a non-finite AQI.
pub fn parse_message(text: &str, fallback: Coordinates) -> Result<StreamMessage> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let envelope: Envelope = serde_json::from_value(value.clone())?;
    let kind = envelope
        .kind
        .ok_or_else(|| Error::InvalidMessage("envelope has no type".to_string()))?;

    if kind != REALTIME_UPDATE {
        return Ok(StreamMessage::Other(kind));
    }

    let wire: WireUpdate = serde_json::from_value(value)?;
    if !wire.aqi.value.is_finite() {
        return Err(Error::InvalidMessage(format!(
            "aqi value {} is not finite",
            wire.aqi.value
        )));
    }

    let timestamp = wire
        .timestamp
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or_else(OffsetDateTime::now_utc);
    let location = wire.location.unwrap_or(fallback);

    let mut snapshot = EnvironmentalSnapshot::new(wire.aqi.value, location, timestamp);
    snapshot.pm25 = wire.aqi.pm25;
    snapshot.pm10 = wire.aqi.pm10;
    snapshot.co = wire.aqi.co;
    snapshot.co2 = wire.aqi.co2;
    snapshot.no2 = wire.aqi.no2;
    snapshot.o3 = wire.aqi.o3;
    snapshot.so2 = wire.aqi.so2;
    snapshot.temperature_c = wire.weather.temperature;
    snapshot.humidity_pct = wire.weather.humidity;
    snapshot.wind_speed_ms = wire.weather.wind_speed;

    Ok(StreamMessage::Update(Box::new(LiveUpdate {
        snapshot,
        status: wire.aqi.status,
        weather_description: wire.weather.description,
        server_alerts: wire.alerts,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const NYC: Coordinates = Coordinates {
        latitude: 40.7128,
        longitude: -74.006,
    };

    fn update(msg: StreamMessage) -> LiveUpdate {
        match msg {
            StreamMessage::Update(u) => *u,
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_full_update() {
        let text = r#"{
            "type": "realtime_update",
            "timestamp": "2025-03-01T10:15:00.5",
            "location": {"latitude": 17.385, "longitude": 78.4867},
            "aqi": {"value": 87, "status": "Moderate", "pm25": 30, "pm10": 55, "co": 250, "no2": 18, "o3": 35, "so2": 4},
            "weather": {"temperature": 31, "humidity": 45, "wind_speed": 2.5, "description": "Haze"},
            "alerts": [{"level": "warning", "message": "Unhealthy air quality for sensitive groups"}]
        }"#;
        let u = update(parse_message(text, NYC).unwrap());

        assert_eq!(u.snapshot.aqi, 87.0);
        assert_eq!(u.snapshot.coordinates(), Coordinates::new(17.385, 78.4867));
        assert_eq!(u.snapshot.pm25, Some(30.0));
        assert_eq!(u.snapshot.co, Some(250.0));
        assert_eq!(u.snapshot.co2, None);
        assert_eq!(u.snapshot.wind_speed_ms, Some(2.5));
        assert_eq!(u.snapshot.timestamp_utc, datetime!(2025-03-01 10:15:00.5 UTC));
        assert_eq!(u.status.as_deref(), Some("Moderate"));
        assert_eq!(u.weather_description.as_deref(), Some("Haze"));
        assert_eq!(u.server_alerts.len(), 1);
    }

    #[test]
    fn test_minimal_update_uses_fallback_location() {
        let u = update(
            parse_message(r#"{"type":"realtime_update","aqi":{"value":12}}"#, NYC).unwrap(),
        );
        assert_eq!(u.snapshot.coordinates(), NYC);
        assert!(u.server_alerts.is_empty());
        assert!(u.snapshot.temperature_c.is_none());
    }

    #[test]
    fn test_other_types_are_passed_through() {
        let msg = parse_message(r#"{"type":"heartbeat"}"#, NYC).unwrap();
        assert_eq!(msg, StreamMessage::Other("heartbeat".to_string()));
    }

    #[test]
    fn test_malformed_payloads() {
        assert!(matches!(parse_message("not json", NYC), Err(Error::Json(_))));
        assert!(matches!(
            parse_message(r#"{"aqi":{"value":1}}"#, NYC),
            Err(Error::InvalidMessage(_))
        ));
        assert!(matches!(
            parse_message(r#"{"type":"realtime_update"}"#, NYC),
            Err(Error::Json(_))
        ));
        assert!(matches!(
            parse_message(r#"{"type":"realtime_update","aqi":{"value":"high"}}"#, NYC),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(
            parse_timestamp("2025-03-01T10:15:00Z"),
            Some(datetime!(2025-03-01 10:15:00 UTC))
        );
        assert_eq!(
            parse_timestamp("2025-03-01T12:15:00+02:00"),
            Some(datetime!(2025-03-01 10:15:00 UTC))
        );
        assert_eq!(
            parse_timestamp("2025-03-01T10:15:00"),
            Some(datetime!(2025-03-01 10:15:00 UTC))
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_unparseable_timestamp_falls_back_to_now() {
        let before = OffsetDateTime::now_utc();
        let u = update(
            parse_message(
                r#"{"type":"realtime_update","timestamp":"soon","aqi":{"value":12}}"#,
                NYC,
            )
            .unwrap(),
        );
        assert!(u.snapshot.timestamp_utc >= before);
    }
}
