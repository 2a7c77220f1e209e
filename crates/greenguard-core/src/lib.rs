//! Core library for GreenGuard air-quality monitoring.
//!
//! This crate turns environmental readings into the guidance a rider sees:
//! risk tiers, personalised recommendations, tier-change alerts and a travel
//! risk estimate. It also owns the real-time data channel that keeps the
//! latest snapshot current over a WebSocket stream, and a REST client for the
//! backend API.
//!
//! # Features
//!
//! - **Classification**: AQI to risk tier, per-pollutant WHO guideline levels
//! - **Recommendations**: rule groups for tier, asthma, altitude and age
//! - **Alerts**: edge-triggered on tier changes
//! - **Risk scoring**: AQI, CO₂ and wind combined into a travel risk
//! - **Real-time channel**: reconnecting stream with manual override
//! - **REST client**: cached current conditions and forecasts (`api-client` feature)
//!
//! # Risk Tiers
//!
//! | AQI | Tier |
//! |-----|------|
//! | 0-50 | Good |
//! | 51-100 | Moderate |
//! | 101-150 | Unhealthy for Sensitive Groups |
//! | 151-200 | Unhealthy |
//! | 201-300 | Very Unhealthy |
//! | >300 | Hazardous |
//!
//! # Quick Start
//!
//! ```no_run
//! use greenguard_core::{RealtimeChannel, RiderProfile, UserType};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let channel = RealtimeChannel::websocket("http://localhost:8020")?;
//!     channel.connect(28.6139, 77.209)?;
//!
//!     let mut events = channel.subscribe();
//!     while let Ok(event) = events.recv().await {
//!         println!("{:?}", event);
//!         let profile = RiderProfile::new(UserType::Elderly).with_asthma(true);
//!         if let Some(set) = channel.recommendations(&profile).available() {
//!             println!("{}: {:?}", set.risk_level, set.recommendations);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod alerts;
#[cfg(feature = "api-client")]
pub mod api_client;
pub mod cache;
pub mod channel;
pub mod config;
pub mod error;
pub mod events;
pub mod manual;
pub mod messages;
pub mod mock;
pub mod recommendations;
pub mod reconnect;
pub mod risk;
pub mod thresholds;
pub mod transport;

// Re-export the shared data model
pub use greenguard_types::types;

// Core exports
pub use channel::RealtimeChannel;
pub use error::{Error, Result};

pub use alerts::AlertTracker;
pub use cache::ResponseCache;
pub use config::{ChannelOptions, ClientConfig, ConfigError, ValidationError};
pub use events::{
    ChannelEvent, ConnectionStatus, EventDispatcher, EventReceiver, EventSender, SnapshotSource,
};
pub use manual::{ManualField, ManualReadings};
pub use mock::{MockConnector, MockStep};
pub use recommendations::{
    OutdoorActivity, RecommendationSet, Recommendations, build_recommendations,
    recommendations_for_aqi,
};
pub use reconnect::ReconnectPolicy;
pub use risk::{RiskAssessment, TravelRisk, assess};
pub use thresholds::{AqiClassification, aqi_tier, classify_aqi};
pub use transport::{Connector, Session};

#[cfg(feature = "websocket")]
pub use transport::WsConnector;

#[cfg(feature = "api-client")]
pub use api_client::{ApiClient, ApiClientError};

// Re-export from greenguard-types
pub use greenguard_types::{
    Alert, Coordinates, EnvironmentalSnapshot, ParseError, Pollutant, PollutantLevel,
    RiderProfile, RiskTier, UserType,
};

/// Type alias for a channel shared between tasks.
///
/// `RealtimeChannel` is not `Clone`; share it behind an `Arc` so that the UI
/// and background tasks read the same state.
pub type SharedChannel = std::sync::Arc<RealtimeChannel>;
