//! Air-quality alert derivation.
//!
//! Two views of the same classifier output:
//!
//! - [`current_alerts`] is the level view: the alerts that apply to a single
//!   snapshot right now. The channel republishes this list on every update.
//! - [`AlertTracker`] is the edge view: it remembers the previous tier and
//!   emits an [`Alert`] only when the tier changes into one above
//!   [`RiskTier::Good`]. A run of identical tiers produces one alert, not one
//!   per message.

use time::OffsetDateTime;

use greenguard_types::{Alert, EnvironmentalSnapshot, RiskTier};

use crate::thresholds::aqi_tier;

fn alert_text(tier: RiskTier) -> Option<(&'static str, &'static str)> {
    let text = match tier {
        RiskTier::Good => return None,
        RiskTier::Moderate => (
            "Air quality is moderate",
            "Unusually sensitive people should limit prolonged outdoor exertion",
        ),
        RiskTier::UnhealthySensitive => (
            "Unhealthy air quality for sensitive groups",
            "Sensitive groups should reduce outdoor activities",
        ),
        RiskTier::Unhealthy => (
            "Unhealthy air quality",
            "Avoid outdoor activities and keep windows closed",
        ),
        RiskTier::VeryUnhealthy => (
            "Very unhealthy air quality",
            "Stay indoors and wear an N95 mask if you must go outside",
        ),
        RiskTier::Hazardous => (
            "Hazardous air quality",
            "Remain indoors and seal all openings",
        ),
    };
    Some(text)
}

/// Build the alert for a tier, or `None` for [`RiskTier::Good`].
pub fn alert_for_tier(tier: RiskTier, triggered_at: OffsetDateTime) -> Option<Alert> {
    let (message, action) = alert_text(tier)?;
    Some(Alert {
        severity: tier,
        message: format!("{message} ({})", tier.label()),
        recommended_action: action.to_string(),
        triggered_at,
    })
}

/// Alerts that apply to a snapshot, computed from its AQI.
///
/// Empty when the AQI is in the Good tier.
pub fn current_alerts(snapshot: &EnvironmentalSnapshot) -> Vec<Alert> {
    alert_for_tier(aqi_tier(snapshot.aqi), snapshot.timestamp_utc)
        .into_iter()
        .collect()
}

/// Edge-triggered alert state.
///
/// ```
/// use greenguard_core::alerts::AlertTracker;
/// use greenguard_core::types::RiskTier;
/// use time::OffsetDateTime;
///
/// let mut tracker = AlertTracker::new();
/// let now = OffsetDateTime::UNIX_EPOCH;
/// let emitted = [RiskTier::Good, RiskTier::Good, RiskTier::Moderate, RiskTier::Moderate, RiskTier::Unhealthy]
///     .into_iter()
///     .filter_map(|tier| tracker.observe(tier, now))
///     .count();
/// assert_eq!(emitted, 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AlertTracker {
    last_tier: Option<RiskTier>,
}

impl AlertTracker {
    /// Create a tracker with no previous tier.
    pub fn new() -> Self {
        Self::default()
    }

    /// The last tier observed.
    pub fn last_tier(&self) -> Option<RiskTier> {
        self.last_tier
    }

    /// Record a tier and return an alert if it is a transition into a tier
    /// above Good.
    ///
    /// The first observation counts as a transition. Moving back to Good
    /// updates the state without emitting.
    pub fn observe(&mut self, tier: RiskTier, at: OffsetDateTime) -> Option<Alert> {
        let previous = self.last_tier.replace(tier);
        if previous == Some(tier) {
            return None;
        }
        alert_for_tier(tier, at)
    }

    /// Classify a snapshot and record its tier.
    pub fn observe_snapshot(&mut self, snapshot: &EnvironmentalSnapshot) -> Option<Alert> {
        self.observe(aqi_tier(snapshot.aqi), snapshot.timestamp_utc)
    }

    /// Forget the previous tier.
    pub fn reset(&mut self) {
        self.last_tier = None;
    }
}
