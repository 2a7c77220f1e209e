//! Platform-agnostic types for GreenGuard air-quality monitoring.
//!
//! This crate provides the shared data model used by the classification
//! pipeline (greenguard-core) and by whatever presentation layer displays
//! its results.
//!
//! # Features
//!
//! - Environmental snapshots with optional pollutant and weather readings
//! - Risk tiers and pollutant levels with labels and color tokens
//! - Rider profiles for personalised recommendations
//! - Alerts raised on tier transitions
//! - Error types for data validation
//!
//! # Example
//!
//! ```
//! use greenguard_types::{Coordinates, EnvironmentalSnapshot, RiskTier};
//!
//! let snapshot = EnvironmentalSnapshot::builder(42.0, Coordinates::new(40.7128, -74.006))
//!     .pm25(12.0)
//!     .build();
//! assert_eq!(snapshot.pm25, Some(12.0));
//! assert_eq!(RiskTier::Good.label(), "Good");
//! ```

pub mod error;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use types::{
    Alert, Coordinates, EnvironmentalSnapshot, EnvironmentalSnapshotBuilder, Pollutant,
    PollutantLevel, RiderProfile, RiskTier, UserType,
};

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_risk_tier_serializes_screaming_snake() {
        let json = serde_json::to_string(&RiskTier::UnhealthySensitive).unwrap();
        assert_eq!(json, "\"UNHEALTHY_SENSITIVE\"");
        let tier: RiskTier = serde_json::from_str("\"VERY_UNHEALTHY\"").unwrap();
        assert_eq!(tier, RiskTier::VeryUnhealthy);
    }

    #[test]
    fn test_user_type_serializes_lowercase() {
        let json = serde_json::to_string(&UserType::Elderly).unwrap();
        assert_eq!(json, "\"elderly\"");
    }

    #[test]
    fn test_rider_profile_missing_fields_default() {
        let profile: RiderProfile = serde_json::from_str(r#"{"has_asthma": true}"#).unwrap();
        assert_eq!(profile.user_type, UserType::Normal);
        assert!(profile.has_asthma);
        assert!(!profile.is_high_altitude_destination);
    }

    #[test]
    fn test_snapshot_skips_absent_readings() {
        let snapshot = EnvironmentalSnapshot::new(
            42.0,
            Coordinates::new(1.0, 2.0),
            datetime!(2025-01-15 12:00 UTC),
        );
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["timestamp_utc"], "2025-01-15T12:00:00Z");
        assert!(json.get("pm25").is_none());
        assert_eq!(json["latitude"], 1.0);
    }

    #[test]
    fn test_snapshot_deserializes_without_optional_fields() {
        let json = r#"{
            "timestamp_utc": "2025-01-15T12:00:00Z",
            "aqi": 155.0,
            "latitude": 28.6139,
            "longitude": 77.209
        }"#;
        let snapshot: EnvironmentalSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.aqi, 155.0);
        assert!(snapshot.wind_speed_ms.is_none());
    }

    #[test]
    fn test_alert_serialization() {
        let alert = Alert {
            severity: RiskTier::Unhealthy,
            message: "Air quality is unhealthy".to_string(),
            recommended_action: "Avoid outdoor activities".to_string(),
            triggered_at: datetime!(2025-01-15 12:00 UTC),
        };
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["severity"], "UNHEALTHY");
        let back: Alert = serde_json::from_value(json).unwrap();
        assert_eq!(back, alert);
    }
}
