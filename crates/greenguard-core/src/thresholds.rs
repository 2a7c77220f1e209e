//! AQI and pollutant threshold classification.
//!
//! This module is the single source of truth for every breakpoint used to
//! turn a raw reading into a risk tier, a label and a display color. Nothing
//! else in the workspace compares AQI values against literal numbers.
//!
//! # Example
//!
//! ```
//! use greenguard_core::thresholds::classify_aqi;
//! use greenguard_core::types::RiskTier;
//!
//! let c = classify_aqi(42.0);
//! assert_eq!(c.tier, RiskTier::Good);
//! assert_eq!(c.label, "Good");
//!
//! // Boundaries belong to the safer tier
//! assert_eq!(classify_aqi(150.0).tier, RiskTier::UnhealthySensitive);
//! assert_eq!(classify_aqi(151.0).tier, RiskTier::Unhealthy);
//! ```

use serde::{Deserialize, Serialize};

use greenguard_types::{EnvironmentalSnapshot, Pollutant, PollutantLevel, RiskTier};

/// Inclusive upper bounds for every tier below [`RiskTier::Hazardous`].
pub const AQI_BREAKPOINTS: [(f64, RiskTier); 5] = [
    (50.0, RiskTier::Good),
    (100.0, RiskTier::Moderate),
    (150.0, RiskTier::UnhealthySensitive),
    (200.0, RiskTier::Unhealthy),
    (300.0, RiskTier::VeryUnhealthy),
];

/// Result of classifying an AQI reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AqiClassification {
    /// Risk tier.
    pub tier: RiskTier,
    /// Human-readable status label.
    pub label: &'static str,
    /// Display color token.
    pub color_token: &'static str,
}

impl From<RiskTier> for AqiClassification {
    fn from(tier: RiskTier) -> Self {
        Self {
            tier,
            label: tier.label(),
            color_token: tier.color_token(),
        }
    }
}

/// Clamp an AQI reading into the classifiable domain.
///
/// Negative values and NaN become 0; positive infinity stays infinite and
/// classifies as hazardous.
fn sanitize_aqi(aqi: f64) -> f64 {
    if aqi.is_nan() || aqi < 0.0 { 0.0 } else { aqi }
}

/// Map an AQI reading to its risk tier.
///
/// Total and side-effect free: any `f64` is accepted.
pub fn aqi_tier(aqi: f64) -> RiskTier {
    let aqi = sanitize_aqi(aqi);
    AQI_BREAKPOINTS
        .iter()
        .find(|(upper, _)| aqi <= *upper)
        .map_or(RiskTier::Hazardous, |(_, tier)| *tier)
}

/// Classify an AQI reading into tier, label and color token.
pub fn classify_aqi(aqi: f64) -> AqiClassification {
    aqi_tier(aqi).into()
}

/// Check if an AQI reading is above the upper bound of `tier`.
pub fn exceeds_tier(aqi: f64, tier: RiskTier) -> bool {
    match tier.upper_bound() {
        Some(upper) => sanitize_aqi(aqi) > upper,
        None => false, // Nothing is above Hazardous
    }
}

/// WHO and EPA guideline limits for a pollutant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Guideline {
    /// WHO limit, used for classification.
    pub who: f64,
    /// EPA limit, informational.
    pub epa: f64,
}

/// Guideline pair for a pollutant.
pub fn guideline(pollutant: Pollutant) -> Guideline {
    let (who, epa) = match pollutant {
        Pollutant::Pm25 => (25.0, 35.0),
        Pollutant::Pm10 => (50.0, 150.0),
        // Indoor comfort limit; CO2 has no outdoor health guideline
        Pollutant::Co2 => (1000.0, 1000.0),
        Pollutant::No2 => (40.0, 100.0),
        Pollutant::So2 => (20.0, 75.0),
        Pollutant::O3 => (100.0, 70.0),
    };
    Guideline { who, epa }
}

/// Classify a single pollutant concentration against its WHO limit.
///
/// `≤ 50%` of the limit is Good, `≤ 100%` is Moderate, anything else Poor.
/// Negative or NaN values are treated as 0.
pub fn classify_pollutant(pollutant: Pollutant, value: f64) -> PollutantLevel {
    let value = if value.is_nan() || value < 0.0 { 0.0 } else { value };
    let limit = guideline(pollutant).who;
    if value <= limit * 0.5 {
        PollutantLevel::Good
    } else if value <= limit {
        PollutantLevel::Moderate
    } else {
        PollutantLevel::Poor
    }
}

/// A classified pollutant value from a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PollutantReading {
    /// Which pollutant.
    pub pollutant: Pollutant,
    /// Measured concentration.
    pub value: f64,
    /// Level relative to the WHO limit.
    pub level: PollutantLevel,
    /// Value divided by the WHO limit.
    pub who_ratio: f64,
    /// EPA limit for reference.
    pub epa_limit: f64,
}

/// Classify every pollutant present in a snapshot, in [`Pollutant::ALL`] order.
pub fn classify_snapshot_pollutants(snapshot: &EnvironmentalSnapshot) -> Vec<PollutantReading> {
    Pollutant::ALL
        .iter()
        .filter_map(|&pollutant| {
            let value = pollutant.value_in(snapshot)?;
            let g = guideline(pollutant);
            Some(PollutantReading {
                pollutant,
                value,
                level: classify_pollutant(pollutant, value),
                who_ratio: value / g.who,
                epa_limit: g.epa,
            })
        })
        .collect()
}

/// The worst pollutant level in a snapshot, if any pollutant is present.
pub fn worst_pollutant_level(snapshot: &EnvironmentalSnapshot) -> Option<PollutantLevel> {
    classify_snapshot_pollutants(snapshot)
        .into_iter()
        .map(|r| r.level)
        .max()
}
