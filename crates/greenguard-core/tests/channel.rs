//! Integration tests for the real-time channel.
//!
//! These run against `MockConnector` with a paused Tokio clock, so reconnect
//! delays are driven by `tokio::time::advance` rather than wall time.

use std::sync::Arc;
use std::time::Duration;

use greenguard_core::types::RiskTier;
use greenguard_core::{
    ChannelEvent, ConnectionStatus, EventReceiver, ManualField, MockConnector, MockStep,
    RealtimeChannel, RiderProfile, SnapshotSource,
};

/// Route channel logs to the test output when `RUST_LOG` is set.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Let spawned tasks run until they block.
async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

fn drain(events: &mut EventReceiver) -> Vec<ChannelEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

fn statuses(events: &[ChannelEvent]) -> Vec<ConnectionStatus> {
    events
        .iter()
        .filter_map(|event| match event {
            ChannelEvent::StatusChanged { status } => Some(*status),
            _ => None,
        })
        .collect()
}

fn setup() -> (Arc<MockConnector>, RealtimeChannel) {
    init_tracing();
    let connector = Arc::new(MockConnector::new());
    let channel = RealtimeChannel::with_connector(connector.clone());
    (connector, channel)
}

#[tokio::test(start_paused = true)]
async fn test_alerts_fire_only_on_tier_transitions() {
    let (connector, channel) = setup();
    let feed = connector.push_live();
    let mut events = channel.subscribe();

    channel.connect(28.6139, 77.209).unwrap();
    settle().await;

    // Good, Good, Moderate, Moderate, Hazardous
    for aqi in [20.0, 35.0, 70.0, 85.0, 350.0] {
        assert!(feed.send(MockStep::update(aqi)));
    }
    settle().await;

    let events = drain(&mut events);
    let updates = events
        .iter()
        .filter(|e| matches!(e, ChannelEvent::Update { .. }))
        .count();
    let alerts: Vec<RiskTier> = events
        .iter()
        .filter_map(|e| match e {
            ChannelEvent::Alert { alert } => Some(alert.severity),
            _ => None,
        })
        .collect();

    assert_eq!(updates, 5);
    assert_eq!(alerts, vec![RiskTier::Moderate, RiskTier::Hazardous]);
    assert_eq!(channel.latest_snapshot().unwrap().aqi, 350.0);
    assert_eq!(channel.alerts().len(), 1);
    assert_eq!(channel.alerts()[0].severity, RiskTier::Hazardous);
}

#[tokio::test(start_paused = true)]
async fn test_updates_are_not_coalesced() {
    let (connector, channel) = setup();
    connector.push_open_session([
        MockStep::update(40.0),
        MockStep::update(41.0),
        MockStep::update(42.0),
    ]);
    let mut events = channel.subscribe();

    channel.connect(1.0, 1.0).unwrap();
    settle().await;

    let applied: Vec<f64> = drain(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            ChannelEvent::Update {
                source: SnapshotSource::Live,
                snapshot,
                ..
            } => Some(snapshot.aqi),
            _ => None,
        })
        .collect();
    assert_eq!(applied, vec![40.0, 41.0, 42.0]);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_waits_fixed_delay() {
    let (connector, channel) = setup();
    connector.push_session([MockStep::Close]);
    connector.push_session([MockStep::Close]);

    channel.connect(0.0, 0.0).unwrap();
    settle().await;
    assert_eq!(connector.connect_count(), 1);
    assert!(channel.is_reconnect_pending());
    assert_eq!(channel.status(), ConnectionStatus::Disconnected);

    tokio::time::advance(Duration::from_secs(4)).await;
    settle().await;
    assert_eq!(connector.connect_count(), 1);

    tokio::time::advance(Duration::from_secs(1)).await;
    settle().await;
    assert_eq!(connector.connect_count(), 2);

    // Second session closed too; exactly one new retry is waiting
    assert!(channel.is_reconnect_pending());
    tokio::time::advance(Duration::from_secs(5)).await;
    settle().await;
    assert_eq!(connector.connect_count(), 3);
    assert_eq!(channel.connection_attempts(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_single_pending_reconnect() {
    let (connector, channel) = setup();
    connector.push_session([MockStep::Close]);
    let mut events = channel.subscribe();

    channel.connect(0.0, 0.0).unwrap();
    settle().await;

    // Reconnecting to the same place while a retry waits adds nothing
    channel.connect(0.0, 0.0).unwrap();
    channel.connect(0.0, 0.0).unwrap();
    settle().await;

    let scheduled = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e, ChannelEvent::ReconnectScheduled { .. }))
        .count();
    assert_eq!(scheduled, 1);

    tokio::time::advance(Duration::from_secs(5)).await;
    settle().await;
    assert_eq!(connector.connect_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_close_cancels_pending_reconnect() {
    let (connector, channel) = setup();
    connector.push_refusal("connection refused");

    channel.connect(0.0, 0.0).unwrap();
    settle().await;
    assert!(channel.is_reconnect_pending());

    channel.close();
    assert!(!channel.is_reconnect_pending());
    assert_eq!(channel.status(), ConnectionStatus::Disconnected);

    tokio::time::advance(Duration::from_secs(60)).await;
    settle().await;
    assert_eq!(connector.connect_count(), 1);
    assert!(!channel.is_active());
}

#[tokio::test(start_paused = true)]
async fn test_manual_override_needs_no_reconnect() {
    let (connector, channel) = setup();
    connector.push_open_session([MockStep::update(40.0)]);

    channel.connect(12.9716, 77.5946).unwrap();
    settle().await;
    assert_eq!(channel.latest_snapshot().unwrap().aqi, 40.0);

    assert!(channel.toggle_manual_override());
    assert_eq!(channel.latest_snapshot().unwrap().aqi, 50.0);

    channel.set_manual_field(ManualField::Aqi, 175.0).unwrap();
    let snapshot = channel.latest_snapshot().unwrap();
    assert_eq!(snapshot.aqi, 175.0);
    assert_eq!(snapshot.latitude, 12.9716);
    assert_eq!(channel.live_snapshot().unwrap().aqi, 40.0);
    assert_eq!(channel.alerts()[0].severity, RiskTier::Unhealthy);

    let profile = RiderProfile::default().with_asthma(true);
    let set = channel.recommendations(&profile).available().unwrap();
    assert_eq!(set.tier, RiskTier::Unhealthy);
    assert!(set.mask_required);

    assert!(!channel.toggle_manual_override());
    assert_eq!(channel.latest_snapshot().unwrap().aqi, 40.0);
    assert!(channel.alerts().is_empty());

    assert_eq!(connector.connect_count(), 1);
    assert_eq!(channel.status(), ConnectionStatus::Connected);
}

#[tokio::test(start_paused = true)]
async fn test_manual_values_survive_toggles() {
    let (_connector, channel) = setup();
    channel.set_manual_field(ManualField::WindSpeed, 1.0).unwrap();
    channel.set_manual_field(ManualField::Co2, 700.0).unwrap();

    channel.toggle_manual_override();
    channel.toggle_manual_override();
    channel.toggle_manual_override();

    let readings = channel.manual_readings();
    assert_eq!(readings.wind_speed, 1.0);
    assert_eq!(readings.co2, Some(700.0));

    let risk = channel.latest_risk().unwrap();
    assert!(risk.co2_elevated);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_messages_are_dropped() {
    let (connector, channel) = setup();
    connector.push_open_session([
        MockStep::text("not json"),
        MockStep::text(r#"{"type":"heartbeat"}"#),
        MockStep::text(r#"{"aqi":{"value":300}}"#),
        MockStep::text(r#"{"type":"realtime_update","aqi":{"value":"high"}}"#),
        MockStep::update(90.0),
    ]);
    let mut events = channel.subscribe();

    channel.connect(1.0, 2.0).unwrap();
    settle().await;

    let updates = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e, ChannelEvent::Update { .. }))
        .count();
    assert_eq!(updates, 1);
    assert_eq!(channel.latest_snapshot().unwrap().aqi, 90.0);
    assert_eq!(channel.status(), ConnectionStatus::Connected);
    assert_eq!(connector.connect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_transport_error_status_sequence() {
    let (connector, channel) = setup();
    connector.push_session([MockStep::update(60.0), MockStep::Error("reset".into())]);
    let mut events = channel.subscribe();

    channel.connect(1.0, 2.0).unwrap();
    settle().await;

    assert_eq!(
        statuses(&drain(&mut events)),
        vec![
            ConnectionStatus::Connecting,
            ConnectionStatus::Connected,
            ConnectionStatus::Error,
            ConnectionStatus::Disconnected,
        ]
    );
    assert!(channel.is_reconnect_pending());
    // The last snapshot stays visible while disconnected
    assert_eq!(channel.latest_snapshot().unwrap().aqi, 60.0);
}

#[tokio::test(start_paused = true)]
async fn test_switching_location_forgets_alert_history() {
    let (connector, channel) = setup();
    connector.push_open_session([MockStep::update(120.0)]);
    connector.push_open_session([MockStep::update(120.0)]);
    let mut events = channel.subscribe();

    channel.connect(1.0, 1.0).unwrap();
    settle().await;
    channel.connect(2.0, 2.0).unwrap();
    settle().await;

    let alerts = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e, ChannelEvent::Alert { .. }))
        .count();
    assert_eq!(alerts, 2);
    assert_eq!(channel.latest_snapshot().unwrap().longitude, 2.0);
}
