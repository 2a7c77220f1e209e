//! Personalised health recommendations.
//!
//! Combines a [`RiskTier`] with a [`RiderProfile`] into an ordered list of
//! advice strings plus three flags (mask, air purifier, outdoor activity).
//!
//! Four independent rule groups contribute, always in this order:
//!
//! 1. AQI tier
//! 2. Asthma
//! 3. High-altitude destination
//! 4. Age group / sensitivity
//!
//! Every group is evaluated for every call and their output is concatenated.
//! Groups may give overlapping advice; duplicates are kept.
//!
//! # Example
//!
//! ```
//! use greenguard_core::recommendations::{build_recommendations, OutdoorActivity};
//! use greenguard_core::types::{RiderProfile, RiskTier, UserType};
//!
//! let profile = RiderProfile::new(UserType::Child).with_asthma(true);
//! let set = build_recommendations(Some(RiskTier::UnhealthySensitive), &profile)
//!     .available()
//!     .expect("tier was supplied");
//!
//! assert!(set.mask_required);
//! assert_eq!(set.outdoor_activity, OutdoorActivity::Limited);
//! ```

use core::fmt;

use serde::Serialize;

use greenguard_types::{RiderProfile, RiskTier, UserType};

use crate::thresholds::aqi_tier;

/// How much outdoor activity is advisable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum OutdoorActivity {
    /// No restriction.
    Safe,
    /// Reduce prolonged or strenuous activity.
    Limited,
    /// Stay indoors.
    Avoid,
}

impl OutdoorActivity {
    /// Outdoor activity advice for a tier.
    pub fn for_tier(tier: RiskTier) -> Self {
        match tier {
            RiskTier::Good => OutdoorActivity::Safe,
            RiskTier::Moderate | RiskTier::UnhealthySensitive => OutdoorActivity::Limited,
            _ => OutdoorActivity::Avoid,
        }
    }
}

impl fmt::Display for OutdoorActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutdoorActivity::Safe => write!(f, "Safe"),
            OutdoorActivity::Limited => write!(f, "Limited"),
            OutdoorActivity::Avoid => write!(f, "Avoid"),
        }
    }
}

/// Risk level wording shown next to the recommendations.
pub fn risk_level(tier: RiskTier) -> &'static str {
    match tier {
        RiskTier::Good => "Low",
        RiskTier::Moderate => "Low to Moderate",
        RiskTier::UnhealthySensitive => "Moderate to High",
        RiskTier::Unhealthy => "High",
        RiskTier::VeryUnhealthy => "Very High",
        RiskTier::Hazardous => "Critical",
    }
}

/// A complete recommendation set for one tier and profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecommendationSet {
    /// Tier the set was built for.
    pub tier: RiskTier,
    /// Advice in display order.
    pub recommendations: Vec<String>,
    /// Risk level wording.
    pub risk_level: &'static str,
    /// Outdoor activity advice.
    pub outdoor_activity: OutdoorActivity,
    /// Whether a mask should be worn outdoors.
    pub mask_required: bool,
    /// Whether an indoor air purifier is recommended.
    pub air_purifier: bool,
}

/// Outcome of the recommendation engine.
///
/// Callers must handle [`Recommendations::NoData`] before rendering; the
/// engine never guesses a tier when no AQI is available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Recommendations {
    /// No AQI reading was available.
    NoData,
    /// Recommendations for an observed tier.
    Available(RecommendationSet),
}

impl Recommendations {
    /// The recommendation set, if data was available.
    pub fn available(self) -> Option<RecommendationSet> {
        match self {
            Recommendations::Available(set) => Some(set),
            Recommendations::NoData => None,
        }
    }

    /// Whether this is the no-data sentinel.
    pub fn is_no_data(&self) -> bool {
        matches!(self, Recommendations::NoData)
    }
}

fn tier_rules(tier: RiskTier, out: &mut Vec<String>) {
    let advice: &[&str] = match tier {
        RiskTier::Good => &[
            "Air quality is excellent. Enjoy outdoor activities!",
            "No special precautions needed.",
        ],
        RiskTier::Moderate => &[
            "Air quality is acceptable for most people.",
            "Sensitive individuals may experience minor symptoms.",
        ],
        RiskTier::UnhealthySensitive => &[
            "Sensitive groups should reduce outdoor activities.",
            "Everyone should avoid prolonged outdoor exertion.",
        ],
        RiskTier::Unhealthy => &[
            "Everyone should avoid outdoor activities.",
            "Keep windows and doors closed.",
            "Use air purifiers with HEPA filters.",
        ],
        RiskTier::VeryUnhealthy => &[
            "HEALTH ALERT: Avoid all outdoor activities.",
            "Stay indoors with windows and doors closed.",
            "Use air purifiers continuously.",
            "Wear N95 masks if you must go outside.",
        ],
        RiskTier::Hazardous => &[
            "EMERGENCY: Air quality is hazardous.",
            "Remain indoors at all times.",
            "Use air purifiers and seal all openings.",
            "Wear N95 masks if absolutely necessary to go outside.",
            "Consider temporary relocation.",
        ],
    };
    out.extend(advice.iter().map(|s| s.to_string()));
}

fn asthma_rules(tier: RiskTier, profile: &RiderProfile, out: &mut Vec<String>) {
    if !profile.has_asthma {
        return;
    }
    if tier >= RiskTier::UnhealthySensitive {
        out.push("Carry your rescue inhaler at all times".to_string());
        out.push("Avoid outdoor activities during peak pollution hours".to_string());
        out.push("Wear an N95 mask when going outside".to_string());
    } else if tier == RiskTier::Moderate {
        out.push("Monitor your breathing and have inhaler ready".to_string());
        out.push("Consider wearing a mask if you experience any discomfort".to_string());
    }
}

fn altitude_rules(profile: &RiderProfile, out: &mut Vec<String>) {
    if !profile.is_high_altitude_destination {
        return;
    }
    if profile.has_asthma {
        out.push("Consult your doctor before traveling to high altitude".to_string());
        out.push("Carry extra inhalers and medications".to_string());
        out.push("Consider portable oxygen support".to_string());
        out.push("Avoid strenuous activities for first 2-3 days".to_string());
    } else {
        out.push("Acclimatize for 2-3 days before high-altitude activities".to_string());
        out.push("Stay hydrated - drink 3-4 liters of water daily".to_string());
        out.push(
            "Monitor for symptoms: headache, nausea, dizziness, shortness of breath".to_string(),
        );
    }
}

fn age_group_rules(tier: RiskTier, profile: &RiderProfile, out: &mut Vec<String>) {
    let elevated = tier >= RiskTier::UnhealthySensitive;
    match profile.user_type {
        UserType::Child => {
            out.push("Children are more vulnerable - extra precautions needed".to_string());
            if elevated {
                out.push("Keep children indoors as much as possible".to_string());
                out.push("Cancel outdoor play and sports activities".to_string());
                out.push("Ensure indoor air is filtered with HEPA purifiers".to_string());
            }
        }
        UserType::Elderly => {
            out.push("Elderly individuals should avoid strenuous activities".to_string());
            if elevated {
                out.push("Elderly individuals should avoid all outdoor activities".to_string());
                out.push("Stay in well-ventilated, filtered indoor spaces".to_string());
                out.push("Monitor for chest pain or breathing difficulties".to_string());
            }
        }
        UserType::Sensitive => {
            if tier >= RiskTier::Moderate {
                out.push("Consider reducing prolonged outdoor activities.".to_string());
            }
            if elevated {
                out.push("Stay indoors as much as possible.".to_string());
            }
        }
        UserType::Normal => {}
    }
}

/// Build recommendations for a tier and rider profile.
///
/// `None` means no AQI reading is available and yields
/// [`Recommendations::NoData`].
pub fn build_recommendations(tier: Option<RiskTier>, profile: &RiderProfile) -> Recommendations {
    let Some(tier) = tier else {
        return Recommendations::NoData;
    };

    let mut recommendations = Vec::new();
    tier_rules(tier, &mut recommendations);
    asthma_rules(tier, profile, &mut recommendations);
    altitude_rules(profile, &mut recommendations);
    age_group_rules(tier, profile, &mut recommendations);

    Recommendations::Available(RecommendationSet {
        tier,
        recommendations,
        risk_level: risk_level(tier),
        outdoor_activity: OutdoorActivity::for_tier(tier),
        mask_required: tier >= RiskTier::UnhealthySensitive
            || (profile.has_asthma && tier >= RiskTier::Moderate),
        air_purifier: tier >= RiskTier::Moderate,
    })
}

/// Classify an optional AQI reading and build recommendations for it.
pub fn recommendations_for_aqi(aqi: Option<f64>, profile: &RiderProfile) -> Recommendations {
    build_recommendations(aqi.map(aqi_tier), profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn set(tier: RiskTier, profile: &RiderProfile) -> RecommendationSet {
        build_recommendations(Some(tier), profile)
            .available()
            .unwrap()
    }

    #[test]
    fn test_child_with_asthma_scenario() {
        let profile = RiderProfile::new(UserType::Child).with_asthma(true);
        let s = set(RiskTier::UnhealthySensitive, &profile);

        assert!(s.mask_required);
        assert!(
            s.recommendations
                .iter()
                .any(|r| r == "Wear an N95 mask when going outside")
        );
        assert!(
            s.recommendations
                .iter()
                .any(|r| r == "Keep children indoors as much as possible")
        );
    }

    #[test]
    fn test_no_data_sentinel() {
        let profile = RiderProfile::default();
        assert!(build_recommendations(None, &profile).is_no_data());
        assert!(recommendations_for_aqi(None, &profile).is_no_data());
        assert!(!recommendations_for_aqi(Some(10.0), &profile).is_no_data());
    }

    #[test]
    fn test_outdoor_activity_by_tier() {
        assert_eq!(OutdoorActivity::for_tier(RiskTier::Good), OutdoorActivity::Safe);
        assert_eq!(OutdoorActivity::for_tier(RiskTier::Moderate), OutdoorActivity::Limited);
        assert_eq!(
            OutdoorActivity::for_tier(RiskTier::UnhealthySensitive),
            OutdoorActivity::Limited
        );
        assert_eq!(OutdoorActivity::for_tier(RiskTier::Unhealthy), OutdoorActivity::Avoid);
        assert_eq!(OutdoorActivity::for_tier(RiskTier::Hazardous), OutdoorActivity::Avoid);
    }

    #[test]
    fn test_mask_rules() {
        let normal = RiderProfile::default();
        let asthma = RiderProfile::default().with_asthma(true);

        assert!(!set(RiskTier::Good, &normal).mask_required);
        assert!(!set(RiskTier::Good, &asthma).mask_required);
        assert!(!set(RiskTier::Moderate, &normal).mask_required);
        assert!(set(RiskTier::Moderate, &asthma).mask_required);
        assert!(set(RiskTier::UnhealthySensitive, &normal).mask_required);
    }

    #[test]
    fn test_air_purifier_rule() {
        let p = RiderProfile::default();
        assert!(!set(RiskTier::Good, &p).air_purifier);
        for tier in &RiskTier::ALL[1..] {
            assert!(set(*tier, &p).air_purifier);
        }
    }

    #[test]
    fn test_group_order() {
        let profile = RiderProfile::new(UserType::Elderly)
            .with_asthma(true)
            .with_high_altitude(true);
        let s = set(RiskTier::Unhealthy, &profile);
        let pos = |needle: &str| {
            s.recommendations
                .iter()
                .position(|r| r.contains(needle))
                .unwrap()
        };

        let tier = pos("Everyone should avoid outdoor activities.");
        let asthma = pos("rescue inhaler");
        let altitude = pos("high altitude");
        let age = pos("Elderly individuals should avoid strenuous");
        assert!(tier < asthma && asthma < altitude && altitude < age);
    }

    #[test]
    fn test_overlapping_advice_is_kept() {
        let profile = RiderProfile::new(UserType::Child).with_asthma(true);
        let s = set(RiskTier::VeryUnhealthy, &profile);
        let mask_lines = s
            .recommendations
            .iter()
            .filter(|r| r.contains("N95"))
            .count();
        assert_eq!(mask_lines, 2);
    }

    #[test]
    fn test_altitude_without_asthma() {
        let profile = RiderProfile::default().with_high_altitude(true);
        let s = set(RiskTier::Good, &profile);
        assert!(s.recommendations.iter().any(|r| r.starts_with("Acclimatize")));
        assert!(!s.recommendations.iter().any(|r| r.contains("inhalers")));
    }

    #[test]
    fn test_normal_profile_gets_only_tier_rules() {
        let s = set(RiskTier::Good, &RiderProfile::default());
        assert_eq!(s.recommendations.len(), 2);
        assert_eq!(s.risk_level, "Low");
    }

    #[test]
    fn test_risk_level_wording() {
        assert_eq!(risk_level(RiskTier::Moderate), "Low to Moderate");
        assert_eq!(risk_level(RiskTier::Hazardous), "Critical");
    }

    #[test]
    fn test_serializes_with_status_tag() {
        let json = serde_json::to_value(Recommendations::NoData).unwrap();
        assert_eq!(json["status"], "no_data");

        let json = serde_json::to_value(recommendations_for_aqi(
            Some(180.0),
            &RiderProfile::default(),
        ))
        .unwrap();
        assert_eq!(json["status"], "available");
        assert_eq!(json["outdoor_activity"], "Avoid");
        assert_eq!(json["tier"], "UNHEALTHY");
    }

    fn any_tier() -> impl Strategy<Value = RiskTier> {
        prop::sample::select(RiskTier::ALL.to_vec())
    }

    fn any_user_type() -> impl Strategy<Value = UserType> {
        prop::sample::select(vec![
            UserType::Child,
            UserType::Elderly,
            UserType::Sensitive,
            UserType::Normal,
        ])
    }

    proptest! {
        #[test]
        fn prop_idempotent(
            tier in any_tier(),
            user_type in any_user_type(),
            asthma in any::<bool>(),
            altitude in any::<bool>(),
        ) {
            let profile = RiderProfile::new(user_type)
                .with_asthma(asthma)
                .with_high_altitude(altitude);
            let a = build_recommendations(Some(tier), &profile);
            let b = build_recommendations(Some(tier), &profile);
            prop_assert_eq!(a, b);
        }
    }
}
