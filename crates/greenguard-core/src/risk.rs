//! Local travel-risk scoring.
//!
//! Scores a snapshot from three signals: the AQI tier, CO2 concentration and
//! wind dispersion. The score drives a coarse travel recommendation. This is
//! the same assessment the backend agent produces, computed locally so that
//! manually entered values get an answer without a round trip.

use core::fmt;

use serde::{Deserialize, Serialize};

use greenguard_types::{EnvironmentalSnapshot, RiskTier};

use crate::thresholds::aqi_tier;

/// CO2 above this many ppm counts as elevated.
pub const CO2_ELEVATED_PPM: f64 = 450.0;

/// Wind below this speed (m/s) counts as stagnant air.
pub const WIND_STAGNATION_MS: f64 = 2.0;

/// Wind at or below this speed (m/s) only partially disperses pollutants.
pub const WIND_PARTIAL_MS: f64 = 5.0;

/// How well the wind disperses pollutants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindCondition {
    /// Below 2 m/s.
    Stagnation,
    /// 2 to 5 m/s.
    PartialDispersion,
    /// Above 5 m/s.
    GoodDispersion,
}

impl WindCondition {
    /// Classify a wind speed in m/s. Missing wind counts as partial dispersion.
    pub fn from_speed(speed_ms: Option<f64>) -> Self {
        match speed_ms {
            Some(v) if v < WIND_STAGNATION_MS => WindCondition::Stagnation,
            Some(v) if v > WIND_PARTIAL_MS => WindCondition::GoodDispersion,
            _ => WindCondition::PartialDispersion,
        }
    }
}

impl fmt::Display for WindCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindCondition::Stagnation => write!(f, "stagnation"),
            WindCondition::PartialDispersion => write!(f, "partial dispersion"),
            WindCondition::GoodDispersion => write!(f, "good dispersion"),
        }
    }
}

/// Overall freshness of the air.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AirFreshness {
    Good,
    Moderate,
    Poor,
}

/// Travel risk derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TravelRisk {
    Low,
    Medium,
    High,
}

impl TravelRisk {
    /// Map a factor score to a risk: `>= 3` High, `>= 1` Medium, else Low.
    pub fn from_score(score: u8) -> Self {
        match score {
            0 => TravelRisk::Low,
            1 | 2 => TravelRisk::Medium,
            _ => TravelRisk::High,
        }
    }

    /// What to do about the trip.
    pub fn action(&self) -> TravelAction {
        match self {
            TravelRisk::Low => TravelAction::ContinueTravel,
            TravelRisk::Medium => TravelAction::ChangeRoute,
            TravelRisk::High => TravelAction::DelayTravel,
        }
    }
}

impl fmt::Display for TravelRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TravelRisk::Low => write!(f, "low"),
            TravelRisk::Medium => write!(f, "medium"),
            TravelRisk::High => write!(f, "high"),
        }
    }
}

/// Recommended travel action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TravelAction {
    #[serde(rename = "Continue Travel")]
    ContinueTravel,
    #[serde(rename = "Change Route")]
    ChangeRoute,
    #[serde(rename = "Delay Travel")]
    DelayTravel,
}

impl fmt::Display for TravelAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TravelAction::ContinueTravel => write!(f, "Continue Travel"),
            TravelAction::ChangeRoute => write!(f, "Change Route"),
            TravelAction::DelayTravel => write!(f, "Delay Travel"),
        }
    }
}

/// Result of scoring a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub tier: RiskTier,
    pub co2_elevated: bool,
    pub wind: WindCondition,
    /// Sum of the risk factors.
    pub score: u8,
    pub travel_risk: TravelRisk,
    pub air_freshness: AirFreshness,
    pub recommended_action: TravelAction,
    pub precautions: Vec<String>,
    /// One-line explanation of the score.
    pub reasoning: String,
}

/// Score a snapshot.
pub fn assess(snapshot: &EnvironmentalSnapshot) -> RiskAssessment {
    assess_with_context(snapshot, None)
}

/// Score a snapshot with an optional free-text route description.
///
/// A context mentioning traffic adds a precaution but does not change the
/// score.
pub fn assess_with_context(
    snapshot: &EnvironmentalSnapshot,
    travel_context: Option<&str>,
) -> RiskAssessment {
    let tier = aqi_tier(snapshot.aqi);
    let co2_elevated = snapshot.co2.is_some_and(|ppm| ppm > CO2_ELEVATED_PPM);
    let wind = WindCondition::from_speed(snapshot.wind_speed_ms);
    let stagnant = wind == WindCondition::Stagnation;

    let mut score = 0;
    if tier >= RiskTier::UnhealthySensitive {
        score += 2;
    } else if tier == RiskTier::Moderate {
        score += 1;
    }
    if co2_elevated {
        score += 1;
    }
    if stagnant {
        score += 1;
    }
    let travel_risk = TravelRisk::from_score(score);

    let air_freshness = if co2_elevated || stagnant || tier >= RiskTier::Unhealthy {
        AirFreshness::Poor
    } else if tier == RiskTier::UnhealthySensitive {
        AirFreshness::Moderate
    } else {
        AirFreshness::Good
    };

    let mut precautions = Vec::new();
    if tier >= RiskTier::UnhealthySensitive {
        precautions.push("Wear N95 mask".to_string());
        precautions.push("Reduce outdoor exposure".to_string());
    }
    if stagnant {
        precautions.push("Pause in green area for 10 minutes".to_string());
    }
    if travel_context.is_some_and(|ctx| ctx.to_lowercase().contains("traffic")) {
        precautions.push("Avoid high-traffic zones".to_string());
    }
    if precautions.is_empty() {
        precautions.push("Monitor conditions regularly".to_string());
    }

    let co2_text = snapshot
        .co2
        .map_or_else(|| "CO₂ unknown".to_string(), |ppm| format!("CO₂ at {ppm} ppm"));
    let reasoning = format!(
        "AQI {} indicates {} air quality. {} with {}. Overall risk assessment: {}",
        snapshot.aqi,
        tier.label().to_lowercase(),
        co2_text,
        wind,
        travel_risk
    );

    RiskAssessment {
        tier,
        co2_elevated,
        wind,
        score,
        travel_risk,
        air_freshness,
        recommended_action: travel_risk.action(),
        precautions,
        reasoning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use greenguard_types::Coordinates;
    use time::OffsetDateTime;

    fn snapshot(aqi: f64, co2: Option<f64>, wind: Option<f64>) -> EnvironmentalSnapshot {
        let mut s = EnvironmentalSnapshot::new(aqi, Coordinates::new(0.0, 0.0), OffsetDateTime::UNIX_EPOCH);
        s.co2 = co2;
        s.wind_speed_ms = wind;
        s
    }

    #[test]
    fn test_wind_condition() {
        assert_eq!(WindCondition::from_speed(Some(1.9)), WindCondition::Stagnation);
        assert_eq!(WindCondition::from_speed(Some(2.0)), WindCondition::PartialDispersion);
        assert_eq!(WindCondition::from_speed(Some(5.0)), WindCondition::PartialDispersion);
        assert_eq!(WindCondition::from_speed(Some(5.1)), WindCondition::GoodDispersion);
        assert_eq!(WindCondition::from_speed(None), WindCondition::PartialDispersion);
    }

    #[test]
    fn test_clean_air_is_low_risk() {
        let a = assess(&snapshot(30.0, Some(410.0), Some(6.0)));
        assert_eq!(a.score, 0);
        assert_eq!(a.travel_risk, TravelRisk::Low);
        assert_eq!(a.recommended_action, TravelAction::ContinueTravel);
        assert_eq!(a.air_freshness, AirFreshness::Good);
        assert_eq!(a.precautions, vec!["Monitor conditions regularly".to_string()]);
    }

    #[test]
    fn test_moderate_aqi_is_medium_risk() {
        let a = assess(&snapshot(75.0, Some(420.0), Some(3.0)));
        assert_eq!(a.score, 1);
        assert_eq!(a.travel_risk, TravelRisk::Medium);
        assert_eq!(a.recommended_action, TravelAction::ChangeRoute);
    }

    #[test]
    fn test_all_factors_is_high_risk() {
        let a = assess(&snapshot(160.0, Some(600.0), Some(1.0)));
        assert_eq!(a.score, 4);
        assert_eq!(a.travel_risk, TravelRisk::High);
        assert_eq!(a.recommended_action, TravelAction::DelayTravel);
        assert_eq!(a.air_freshness, AirFreshness::Poor);
        assert!(a.precautions.iter().any(|p| p == "Wear N95 mask"));
        assert!(a.precautions.iter().any(|p| p.contains("green area")));
    }

    #[test]
    fn test_unhealthy_sensitive_alone() {
        let a = assess(&snapshot(120.0, None, None));
        assert_eq!(a.score, 2);
        assert_eq!(a.travel_risk, TravelRisk::Medium);
        assert_eq!(a.air_freshness, AirFreshness::Moderate);
    }

    #[test]
    fn test_co2_boundary() {
        assert!(!assess(&snapshot(10.0, Some(450.0), None)).co2_elevated);
        assert!(assess(&snapshot(10.0, Some(450.5), None)).co2_elevated);
    }

    #[test]
    fn test_traffic_context() {
        let s = snapshot(10.0, None, None);
        let a = assess_with_context(&s, Some("Heavy Traffic on the ring road"));
        assert_eq!(a.precautions, vec!["Avoid high-traffic zones".to_string()]);
        assert_eq!(a.score, 0);
    }

    #[test]
    fn test_reasoning_mentions_inputs() {
        let a = assess(&snapshot(160.0, Some(600.0), Some(1.0)));
        assert!(a.reasoning.contains("AQI 160"));
        assert!(a.reasoning.contains("600 ppm"));
        assert!(a.reasoning.contains("stagnation"));
        assert!(a.reasoning.ends_with("high"));
    }

    #[test]
    fn test_serialized_action_wording() {
        let json = serde_json::to_value(TravelAction::DelayTravel).unwrap();
        assert_eq!(json, "Delay Travel");
        assert_eq!(TravelAction::ChangeRoute.to_string(), "Change Route");
    }
}
