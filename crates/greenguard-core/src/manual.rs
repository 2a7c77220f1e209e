//! User-entered readings for manual-override mode.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use greenguard_types::{Coordinates, EnvironmentalSnapshot};

use crate::error::{Error, Result};

/// A single editable manual reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManualField {
    Aqi,
    Temperature,
    Humidity,
    WindSpeed,
    Co,
    Co2,
    No2,
    O3,
    So2,
    Pm25,
    Pm10,
}

impl ManualField {
    /// All fields in form order.
    pub const ALL: [ManualField; 11] = [
        ManualField::Aqi,
        ManualField::Temperature,
        ManualField::Humidity,
        ManualField::WindSpeed,
        ManualField::Co,
        ManualField::Co2,
        ManualField::No2,
        ManualField::O3,
        ManualField::So2,
        ManualField::Pm25,
        ManualField::Pm10,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            ManualField::Aqi => "aqi",
            ManualField::Temperature => "temperature",
            ManualField::Humidity => "humidity",
            ManualField::WindSpeed => "wind_speed",
            ManualField::Co => "co",
            ManualField::Co2 => "co2",
            ManualField::No2 => "no2",
            ManualField::O3 => "o3",
            ManualField::So2 => "so2",
            ManualField::Pm25 => "pm25",
            ManualField::Pm10 => "pm10",
        }
    }
}

impl fmt::Display for ManualField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ManualField {
    type Err = Error;

    /// Accepts snake_case and camelCase names, e.g. `wind_speed` or `windSpeed`.
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', '.'], "");
        ManualField::ALL
            .into_iter()
            .find(|field| field.as_str().replace('_', "") == normalized)
            .ok_or_else(|| Error::InvalidData(format!("unknown manual field '{}'", s)))
    }
}

/// Manual readings, pre-filled with typical urban values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualReadings {
    pub aqi: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub co: f64,
    pub co2: Option<f64>,
    pub no2: f64,
    pub o3: f64,
    pub so2: f64,
    pub pm25: f64,
    pub pm10: f64,
}

impl Default for ManualReadings {
    fn default() -> Self {
        Self {
            aqi: 50.0,
            temperature: 22.0,
            humidity: 65.0,
            wind_speed: 3.5,
            co: 250.0,
            co2: None,
            no2: 15.0,
            o3: 30.0,
            so2: 5.0,
            pm25: 15.0,
            pm10: 25.0,
        }
    }
}

impl ManualReadings {
    /// Update one field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidData`] for a non-finite value, a negative
    /// value in any field other than temperature, or humidity above 100.
    /// The readings are unchanged on error.
    pub fn set(&mut self, field: ManualField, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(Error::InvalidData(format!(
                "{} must be a finite number, got {}",
                field, value
            )));
        }
        if field != ManualField::Temperature && value < 0.0 {
            return Err(Error::InvalidData(format!(
                "{} must not be negative, got {}",
                field, value
            )));
        }
        if field == ManualField::Humidity && value > 100.0 {
            return Err(Error::InvalidData(format!(
                "humidity {} is outside valid range (0-100)",
                value
            )));
        }

        match field {
            ManualField::Aqi => self.aqi = value,
            ManualField::Temperature => self.temperature = value,
            ManualField::Humidity => self.humidity = value,
            ManualField::WindSpeed => self.wind_speed = value,
            ManualField::Co => self.co = value,
            ManualField::Co2 => self.co2 = Some(value),
            ManualField::No2 => self.no2 = value,
            ManualField::O3 => self.o3 = value,
            ManualField::So2 => self.so2 = value,
            ManualField::Pm25 => self.pm25 = value,
            ManualField::Pm10 => self.pm10 = value,
        }
        Ok(())
    }

    /// Build a snapshot from the manual values.
    pub fn to_snapshot(&self, location: Coordinates, at: OffsetDateTime) -> EnvironmentalSnapshot {
        let mut snapshot = EnvironmentalSnapshot::new(self.aqi, location, at);
        snapshot.pm25 = Some(self.pm25);
        snapshot.pm10 = Some(self.pm10);
        snapshot.co = Some(self.co);
        snapshot.co2 = self.co2;
        snapshot.no2 = Some(self.no2);
        snapshot.o3 = Some(self.o3);
        snapshot.so2 = Some(self.so2);
        snapshot.temperature_c = Some(self.temperature);
        snapshot.humidity_pct = Some(self.humidity);
        snapshot.wind_speed_ms = Some(self.wind_speed);
        snapshot
    }
}
