//! Core types for GreenGuard environmental data.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::ParseError;

/// Discrete air-quality risk tier derived from an AQI value.
///
/// # Ordering
///
/// Tiers are ordered by severity: `Good < Moderate < UnhealthySensitive <
/// Unhealthy < VeryUnhealthy < Hazardous`. This allows comparisons like
/// `if tier >= RiskTier::Unhealthy { ... }`.
///
/// # Display vs Serialization
///
/// `Display` returns the human-readable label ("Unhealthy for Sensitive
/// Groups"), while serde uses the screaming-snake variant names
/// ("UNHEALTHY_SENSITIVE").
///
/// ```
/// use greenguard_types::RiskTier;
///
/// assert_eq!(RiskTier::UnhealthySensitive.to_string(), "Unhealthy for Sensitive Groups");
/// assert!(RiskTier::Hazardous > RiskTier::VeryUnhealthy);
/// assert!(!RiskTier::Good.is_alert_worthy());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum RiskTier {
    /// AQI 0-50.
    Good,
    /// AQI 51-100.
    Moderate,
    /// AQI 101-150.
    UnhealthySensitive,
    /// AQI 151-200.
    Unhealthy,
    /// AQI 201-300.
    VeryUnhealthy,
    /// AQI above 300.
    Hazardous,
}

impl RiskTier {
    /// All tiers in ascending order of severity.
    pub const ALL: [RiskTier; 6] = [
        RiskTier::Good,
        RiskTier::Moderate,
        RiskTier::UnhealthySensitive,
        RiskTier::Unhealthy,
        RiskTier::VeryUnhealthy,
        RiskTier::Hazardous,
    ];

    /// Human-readable status label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            RiskTier::Good => "Good",
            RiskTier::Moderate => "Moderate",
            RiskTier::UnhealthySensitive => "Unhealthy for Sensitive Groups",
            RiskTier::Unhealthy => "Unhealthy",
            RiskTier::VeryUnhealthy => "Very Unhealthy",
            RiskTier::Hazardous => "Hazardous",
        }
    }

    /// Display color token used by every presentational consumer.
    #[must_use]
    pub fn color_token(&self) -> &'static str {
        match self {
            RiskTier::Good => "#00ff88",
            RiskTier::Moderate => "#ffff00",
            RiskTier::UnhealthySensitive => "#ff8800",
            RiskTier::Unhealthy => "#ff4444",
            RiskTier::VeryUnhealthy => "#aa00aa",
            RiskTier::Hazardous => "#660000",
        }
    }

    /// Inclusive upper AQI bound of the tier, `None` for [`RiskTier::Hazardous`].
    #[must_use]
    pub fn upper_bound(&self) -> Option<f64> {
        match self {
            RiskTier::Good => Some(50.0),
            RiskTier::Moderate => Some(100.0),
            RiskTier::UnhealthySensitive => Some(150.0),
            RiskTier::Unhealthy => Some(200.0),
            RiskTier::VeryUnhealthy => Some(300.0),
            RiskTier::Hazardous => None,
        }
    }

    /// Whether entering this tier should raise an [`Alert`].
    #[must_use]
    pub fn is_alert_worthy(&self) -> bool {
        *self > RiskTier::Good
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Single-pollutant level relative to its WHO guideline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum PollutantLevel {
    /// At or below half of the WHO limit.
    Good,
    /// At or below the WHO limit.
    Moderate,
    /// Above the WHO limit.
    Poor,
}

impl fmt::Display for PollutantLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollutantLevel::Good => write!(f, "Good"),
            PollutantLevel::Moderate => write!(f, "Moderate"),
            PollutantLevel::Poor => write!(f, "Poor"),
        }
    }
}

/// Pollutants with a guideline-based classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Pollutant {
    /// Fine particulate matter (µg/m³).
    Pm25,
    /// Coarse particulate matter (µg/m³).
    Pm10,
    /// Carbon dioxide (ppm).
    Co2,
    /// Nitrogen dioxide (µg/m³).
    No2,
    /// Sulphur dioxide (µg/m³).
    So2,
    /// Ozone (µg/m³).
    O3,
}

impl Pollutant {
    /// All classified pollutants in display order.
    pub const ALL: [Pollutant; 6] = [
        Pollutant::Pm25,
        Pollutant::Pm10,
        Pollutant::Co2,
        Pollutant::No2,
        Pollutant::So2,
        Pollutant::O3,
    ];

    /// Measurement unit.
    #[must_use]
    pub fn unit(&self) -> &'static str {
        match self {
            Pollutant::Co2 => "ppm",
            _ => "µg/m³",
        }
    }

    /// Read this pollutant's value from a snapshot, if present.
    #[must_use]
    pub fn value_in(&self, snapshot: &EnvironmentalSnapshot) -> Option<f64> {
        match self {
            Pollutant::Pm25 => snapshot.pm25,
            Pollutant::Pm10 => snapshot.pm10,
            Pollutant::Co2 => snapshot.co2,
            Pollutant::No2 => snapshot.no2,
            Pollutant::So2 => snapshot.so2,
            Pollutant::O3 => snapshot.o3,
        }
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pollutant::Pm25 => write!(f, "PM2.5"),
            Pollutant::Pm10 => write!(f, "PM10"),
            Pollutant::Co2 => write!(f, "CO₂"),
            Pollutant::No2 => write!(f, "NO₂"),
            Pollutant::So2 => write!(f, "SO₂"),
            Pollutant::O3 => write!(f, "O₃"),
        }
    }
}

impl FromStr for Pollutant {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['.', '_'], "").as_str() {
            "pm25" => Ok(Pollutant::Pm25),
            "pm10" => Ok(Pollutant::Pm10),
            "co2" => Ok(Pollutant::Co2),
            "no2" => Ok(Pollutant::No2),
            "so2" => Ok(Pollutant::So2),
            "o3" => Ok(Pollutant::O3),
            _ => Err(ParseError::UnknownPollutant(s.to_string())),
        }
    }
}

/// Rider age/health category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum UserType {
    /// Child rider.
    Child,
    /// Elderly rider.
    Elderly,
    /// Rider sensitive to pollution.
    Sensitive,
    /// No special category.
    #[default]
    Normal,
}

impl UserType {
    /// Wire representation used by the backend API.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Child => "child",
            UserType::Elderly => "elderly",
            UserType::Sensitive => "sensitive",
            UserType::Normal => "normal",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserType {
    type Err = ParseError;

    /// Parse a user type (case-insensitive).
    ///
    /// ```
    /// use greenguard_types::UserType;
    ///
    /// assert_eq!("Child".parse::<UserType>().unwrap(), UserType::Child);
    /// assert!("toddler".parse::<UserType>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "child" => Ok(UserType::Child),
            "elderly" => Ok(UserType::Elderly),
            "sensitive" => Ok(UserType::Sensitive),
            "normal" => Ok(UserType::Normal),
            _ => Err(ParseError::UnknownUserType(s.to_string())),
        }
    }
}

/// Rider attributes supplied by the consumer.
///
/// Read-only input to the recommendation engine; set once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RiderProfile {
    /// Age/health category.
    #[cfg_attr(feature = "serde", serde(default))]
    pub user_type: UserType,
    /// Whether the rider has asthma.
    #[cfg_attr(feature = "serde", serde(default))]
    pub has_asthma: bool,
    /// Whether the destination is at high altitude.
    #[cfg_attr(feature = "serde", serde(default))]
    pub is_high_altitude_destination: bool,
}

impl RiderProfile {
    /// Create a profile for the given user type with no health flags.
    pub fn new(user_type: UserType) -> Self {
        Self {
            user_type,
            ..Default::default()
        }
    }

    /// Set the asthma flag.
    #[must_use]
    pub fn with_asthma(mut self, has_asthma: bool) -> Self {
        self.has_asthma = has_asthma;
        self
    }

    /// Set the high-altitude destination flag.
    #[must_use]
    pub fn with_high_altitude(mut self, high_altitude: bool) -> Self {
        self.is_high_altitude_destination = high_altitude;
        self
    }
}

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Coordinates {
    /// Latitude (-90 to 90).
    pub latitude: f64,
    /// Longitude (-180 to 180).
    pub longitude: f64,
}

impl Coordinates {
    /// Create a coordinate pair.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check that both components are finite and in range.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidValue`] describing the first bad component.
    pub fn validate(&self) -> Result<(), ParseError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ParseError::InvalidValue(format!(
                "latitude {} is outside valid range (-90 to 90)",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ParseError::InvalidValue(format!(
                "longitude {} is outside valid range (-180 to 180)",
                self.longitude
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// One point-in-time bundle of environmental readings.
///
/// Snapshots are never mutated once published: each update replaces the
/// previous snapshot wholesale.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnvironmentalSnapshot {
    /// When the readings were taken.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp_utc: OffsetDateTime,
    /// Composite Air Quality Index.
    pub aqi: f64,
    /// PM2.5 concentration in µg/m³.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub pm25: Option<f64>,
    /// PM10 concentration in µg/m³.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub pm10: Option<f64>,
    /// CO2 concentration in ppm.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub co2: Option<f64>,
    /// CO concentration in µg/m³ (display only, not classified).
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub co: Option<f64>,
    /// NO2 concentration in µg/m³.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub no2: Option<f64>,
    /// SO2 concentration in µg/m³.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub so2: Option<f64>,
    /// O3 concentration in µg/m³.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub o3: Option<f64>,
    /// Air temperature in °C.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub temperature_c: Option<f64>,
    /// Relative humidity percentage.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub humidity_pct: Option<f64>,
    /// Wind speed in m/s.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub wind_speed_ms: Option<f64>,
    /// Latitude of the reading.
    pub latitude: f64,
    /// Longitude of the reading.
    pub longitude: f64,
}

impl EnvironmentalSnapshot {
    /// Create a snapshot with only the AQI and location set.
    pub fn new(aqi: f64, location: Coordinates, timestamp_utc: OffsetDateTime) -> Self {
        Self {
            timestamp_utc,
            aqi,
            pm25: None,
            pm10: None,
            co2: None,
            co: None,
            no2: None,
            so2: None,
            o3: None,
            temperature_c: None,
            humidity_pct: None,
            wind_speed_ms: None,
            latitude: location.latitude,
            longitude: location.longitude,
        }
    }

    /// Location of the reading.
    #[must_use]
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    /// Create a builder starting from an AQI value and location.
    pub fn builder(aqi: f64, location: Coordinates) -> EnvironmentalSnapshotBuilder {
        EnvironmentalSnapshotBuilder {
            snapshot: Self::new(aqi, location, OffsetDateTime::now_utc()),
        }
    }
}

/// Builder for [`EnvironmentalSnapshot`] with optional readings.
///
/// Use [`build`](Self::build) for unchecked construction, or
/// [`try_build`](Self::try_build) to validate ranges.
#[derive(Debug)]
#[must_use]
pub struct EnvironmentalSnapshotBuilder {
    snapshot: EnvironmentalSnapshot,
}

impl EnvironmentalSnapshotBuilder {
    /// Set the timestamp.
    pub fn timestamp(mut self, timestamp: OffsetDateTime) -> Self {
        self.snapshot.timestamp_utc = timestamp;
        self
    }

    /// Set PM2.5.
    pub fn pm25(mut self, value: f64) -> Self {
        self.snapshot.pm25 = Some(value);
        self
    }

    /// Set PM10.
    pub fn pm10(mut self, value: f64) -> Self {
        self.snapshot.pm10 = Some(value);
        self
    }

    /// Set CO2.
    pub fn co2(mut self, value: f64) -> Self {
        self.snapshot.co2 = Some(value);
        self
    }

    /// Set CO.
    pub fn co(mut self, value: f64) -> Self {
        self.snapshot.co = Some(value);
        self
    }

    /// Set NO2.
    pub fn no2(mut self, value: f64) -> Self {
        self.snapshot.no2 = Some(value);
        self
    }

    /// Set SO2.
    pub fn so2(mut self, value: f64) -> Self {
        self.snapshot.so2 = Some(value);
        self
    }

    /// Set O3.
    pub fn o3(mut self, value: f64) -> Self {
        self.snapshot.o3 = Some(value);
        self
    }

    /// Set temperature.
    pub fn temperature(mut self, celsius: f64) -> Self {
        self.snapshot.temperature_c = Some(celsius);
        self
    }

    /// Set humidity.
    pub fn humidity(mut self, percent: f64) -> Self {
        self.snapshot.humidity_pct = Some(percent);
        self
    }

    /// Set wind speed.
    pub fn wind_speed(mut self, metres_per_second: f64) -> Self {
        self.snapshot.wind_speed_ms = Some(metres_per_second);
        self
    }

    /// Build the snapshot without validation.
    #[must_use]
    pub fn build(self) -> EnvironmentalSnapshot {
        self.snapshot
    }

    /// Build the snapshot with validation.
    ///
    /// Validates:
    /// - coordinates are in range
    /// - `aqi` is finite
    /// - `humidity_pct` is 0-100
    /// - concentrations and wind speed are not negative
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidValue`] if any field has an invalid value.
    pub fn try_build(self) -> Result<EnvironmentalSnapshot, ParseError> {
        let s = &self.snapshot;
        s.coordinates().validate()?;

        if !s.aqi.is_finite() {
            return Err(ParseError::InvalidValue(format!(
                "aqi {} is not a finite number",
                s.aqi
            )));
        }

        if let Some(h) = s.humidity_pct
            && !(0.0..=100.0).contains(&h)
        {
            return Err(ParseError::InvalidValue(format!(
                "humidity {} is outside valid range (0-100)",
                h
            )));
        }

        let non_negative = [
            ("pm25", s.pm25),
            ("pm10", s.pm10),
            ("co2", s.co2),
            ("co", s.co),
            ("no2", s.no2),
            ("so2", s.so2),
            ("o3", s.o3),
            ("wind_speed", s.wind_speed_ms),
        ];
        for (name, value) in non_negative {
            if let Some(v) = value
                && v < 0.0
            {
                return Err(ParseError::InvalidValue(format!(
                    "{} {} must not be negative",
                    name, v
                )));
            }
        }

        Ok(self.snapshot)
    }
}

/// An edge-triggered air-quality alert.
///
/// Raised when the derived tier changes into a tier above
/// [`RiskTier::Good`]; `severity` is therefore always `Moderate` or worse.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Alert {
    /// Tier that triggered the alert.
    pub severity: RiskTier,
    /// Short description of the condition.
    pub message: String,
    /// What the reader should do about it.
    pub recommended_action: String,
    /// When the alert was raised.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub triggered_at: OffsetDateTime,
}
