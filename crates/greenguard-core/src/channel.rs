//! Real-time data channel.
//!
//! [`RealtimeChannel`] keeps a streaming connection to the backend open for
//! one location, applies each `realtime_update` it receives and republishes
//! the result as [`ChannelEvent`]s.
//!
//! # Lifecycle
//!
//! ```text
//! connect() ──> Connecting ──> Connected ──> (Error) ──> Disconnected
//!                   ^                                         │
//!                   └──────────── wait reconnect_delay ───────┘
//! ```
//!
//! A single supervisor task owns the transport. When the stream closes, for
//! any reason, it waits a fixed delay and dials again, indefinitely. The wait
//! is raced against a cancellation token, so there is never more than one
//! pending reconnect and [`RealtimeChannel::close`] (or dropping the channel)
//! stops everything at once.
//!
//! Manual override is orthogonal to the connection: while it is on,
//! [`RealtimeChannel::latest_snapshot`] returns the user-entered values but
//! the stream keeps running, so switching back needs no reconnect.
//!
//! # Example
//!
//! ```no_run
//! use greenguard_core::{ChannelEvent, RealtimeChannel};
//!
//! # async fn example() -> greenguard_core::Result<()> {
//! let channel = RealtimeChannel::websocket("http://localhost:8020")?;
//! let mut events = channel.subscribe();
//! channel.connect(40.7128, -74.006)?;
//!
//! while let Ok(event) = events.recv().await {
//!     if let ChannelEvent::Alert { alert } = event {
//!         println!("{}: {}", alert.severity, alert.message);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use greenguard_types::{Alert, Coordinates, EnvironmentalSnapshot, RiderProfile};

use crate::alerts::{AlertTracker, current_alerts};
use crate::config::ChannelOptions;
use crate::error::{Error, Result};
use crate::events::{
    ChannelEvent, ConnectionStatus, EventDispatcher, EventReceiver, SnapshotSource,
};
use crate::manual::{ManualField, ManualReadings};
use crate::messages::{StreamMessage, parse_message};
use crate::reconnect::ReconnectPolicy;
use crate::recommendations::{Recommendations, recommendations_for_aqi};
use crate::risk::{RiskAssessment, assess};
use crate::transport::Connector;

#[derive(Debug, Default)]
struct ChannelState {
    status: ConnectionStatus,
    location: Option<Coordinates>,
    live: Option<EnvironmentalSnapshot>,
    alerts: Vec<Alert>,
    tracker: AlertTracker,
    manual_override: bool,
    manual: ManualReadings,
    reconnect_pending: bool,
    attempts: u32,
}

impl ChannelState {
    fn set_status(&mut self, events: &EventDispatcher, status: ConnectionStatus) {
        if self.status != status {
            self.status = status;
            events.send(ChannelEvent::StatusChanged { status });
        }
    }

    fn manual_snapshot(&self) -> EnvironmentalSnapshot {
        self.manual.to_snapshot(
            self.location.unwrap_or_default(),
            OffsetDateTime::now_utc(),
        )
    }
}

#[derive(Debug)]
struct Shared {
    state: Mutex<ChannelState>,
    events: EventDispatcher,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ChannelState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run a supervisor-side mutation unless that supervisor was cancelled.
    ///
    /// The token is checked under the lock, so once `close()` has taken the
    /// lock after cancelling, a stale supervisor can no longer write.
    fn apply<F>(&self, cancel: &CancellationToken, f: F)
    where
        F: FnOnce(&mut ChannelState, &EventDispatcher),
    {
        let mut state = self.lock();
        if cancel.is_cancelled() {
            return;
        }
        f(&mut state, &self.events);
    }

    fn handle_text(&self, cancel: &CancellationToken, text: &str, location: Coordinates) {
        let update = match parse_message(text, location) {
            Ok(StreamMessage::Update(update)) => update,
            Ok(StreamMessage::Other(kind)) => {
                debug!("Ignoring '{}' message", kind);
                return;
            }
            Err(e) => {
                warn!("Dropping malformed stream message: {}", e);
                return;
            }
        };

        let snapshot = update.snapshot;
        debug!("Applying update: AQI {}", snapshot.aqi);
        self.apply(cancel, |state, events| {
            let alerts = current_alerts(&snapshot);
            let edge = state.tracker.observe_snapshot(&snapshot);
            state.alerts = alerts.clone();
            state.live = Some(snapshot.clone());
            events.send(ChannelEvent::Update {
                source: SnapshotSource::Live,
                snapshot,
                alerts,
            });
            if let Some(alert) = edge {
                info!("Air quality alert: {}", alert.message);
                events.send(ChannelEvent::Alert { alert });
            }
        });
    }
}

struct Supervisor {
    location: Coordinates,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Supervisor {
    fn stop(self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}

async fn supervise(
    shared: Arc<Shared>,
    connector: Arc<dyn Connector>,
    location: Coordinates,
    policy: ReconnectPolicy,
    cancel: CancellationToken,
) {
    let mut attempts: u32 = 0;
    loop {
        attempts = attempts.saturating_add(1);
        shared.apply(&cancel, |state, events| {
            state.attempts = state.attempts.saturating_add(1);
            state.reconnect_pending = false;
            state.set_status(events, ConnectionStatus::Connecting);
        });

        let connected = tokio::select! {
            _ = cancel.cancelled() => return,
            result = connector.connect(location) => result,
        };

        match connected {
            Ok(mut session) => {
                info!("Real-time stream connected at {}", location);
                shared.apply(&cancel, |state, events| {
                    state.set_status(events, ConnectionStatus::Connected);
                });

                loop {
                    let frame = tokio::select! {
                        _ = cancel.cancelled() => None,
                        frame = session.recv() => Some(frame),
                    };
                    let Some(frame) = frame else {
                        session.close().await;
                        return;
                    };
                    match frame {
                        Some(Ok(text)) => shared.handle_text(&cancel, &text, location),
                        Some(Err(e)) => {
                            warn!("Real-time stream error: {}", e);
                            shared.apply(&cancel, |state, events| {
                                state.set_status(events, ConnectionStatus::Error);
                            });
                            session.close().await;
                            break;
                        }
                        None => break,
                    }
                }
            }
            Err(e) => {
                warn!("Real-time connection failed: {}", e);
                shared.apply(&cancel, |state, events| {
                    state.set_status(events, ConnectionStatus::Error);
                });
            }
        }

        if cancel.is_cancelled() {
            return;
        }
        info!("Real-time stream closed");

        if !policy.should_retry(attempts) {
            warn!("Giving up on real-time stream after {} attempts", attempts);
            shared.apply(&cancel, |state, events| {
                state.set_status(events, ConnectionStatus::Disconnected);
            });
            return;
        }

        shared.apply(&cancel, |state, events| {
            state.set_status(events, ConnectionStatus::Disconnected);
            state.reconnect_pending = true;
            events.send(ChannelEvent::ReconnectScheduled {
                attempt: attempts.saturating_add(1),
                delay: policy.delay,
            });
        });
        debug!("Reconnecting in {:?}", policy.delay);

        if !policy.wait(&cancel).await {
            return;
        }
    }
}

/// A reconnecting real-time data channel.
///
/// Share it behind an [`Arc`]; every method takes `&self`. `connect` must be
/// called from within a Tokio runtime.
pub struct RealtimeChannel {
    connector: Arc<dyn Connector>,
    policy: ReconnectPolicy,
    shared: Arc<Shared>,
    supervisor: Mutex<Option<Supervisor>>,
}

impl std::fmt::Debug for RealtimeChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("RealtimeChannel")
            .field("status", &state.status)
            .field("location", &state.location)
            .field("manual_override", &state.manual_override)
            .field("reconnect_pending", &state.reconnect_pending)
            .finish()
    }
}

impl RealtimeChannel {
    /// Create a channel over any [`Connector`].
    pub fn new(connector: Arc<dyn Connector>, options: ChannelOptions) -> Self {
        Self {
            connector,
            policy: options.reconnect_policy(),
            shared: Arc::new(Shared {
                state: Mutex::new(ChannelState::default()),
                events: EventDispatcher::new(options.event_capacity),
            }),
            supervisor: Mutex::new(None),
        }
    }

    /// Create a channel with default options.
    pub fn with_connector(connector: Arc<dyn Connector>) -> Self {
        Self::new(connector, ChannelOptions::default())
    }

    /// Replace the reconnect policy, e.g. to cap attempts.
    #[must_use]
    pub fn reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Create a WebSocket channel for a backend base URL.
    #[cfg(feature = "websocket")]
    pub fn websocket(base_url: &str) -> Result<Self> {
        let connector = crate::transport::WsConnector::new(base_url)?;
        Ok(Self::with_connector(Arc::new(connector)))
    }

    /// Create a WebSocket channel from client configuration.
    #[cfg(feature = "websocket")]
    pub fn from_config(config: &crate::config::ClientConfig) -> Result<Self> {
        if let Some(err) = config.realtime.validate("realtime").into_iter().next() {
            return Err(Error::invalid_config(err.to_string()));
        }
        let connector = crate::transport::WsConnector::new(config.base_url())?;
        Ok(Self::new(Arc::new(connector), config.realtime.clone()))
    }

    fn lock_supervisor(&self) -> MutexGuard<'_, Option<Supervisor>> {
        self.supervisor
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start streaming for a location.
    ///
    /// Calling again with the same coordinates while the stream is running
    /// is a no-op. Other coordinates stop the current stream, forget its
    /// data and start a new one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidData`] for out-of-range coordinates and
    /// [`Error::InvalidConfig`] when called outside a Tokio runtime.
    pub fn connect(&self, latitude: f64, longitude: f64) -> Result<()> {
        let location = Coordinates::new(latitude, longitude);
        location.validate()?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| Error::invalid_config("connect() requires a Tokio runtime"))?;

        let mut slot = self.lock_supervisor();
        if let Some(current) = slot.as_ref()
            && current.location == location
            && !current.handle.is_finished()
        {
            debug!("Already streaming for {}", location);
            return Ok(());
        }
        if let Some(previous) = slot.take() {
            previous.stop();
        }

        {
            let mut state = self.shared.lock();
            if state.location != Some(location) {
                state.live = None;
                state.alerts.clear();
                state.tracker.reset();
            }
            state.location = Some(location);
            state.reconnect_pending = false;
        }

        info!("Opening real-time channel for {}", location);
        let cancel = CancellationToken::new();
        let handle = runtime.spawn(supervise(
            Arc::clone(&self.shared),
            Arc::clone(&self.connector),
            location,
            self.policy,
            cancel.clone(),
        ));
        *slot = Some(Supervisor {
            location,
            cancel,
            handle,
        });
        Ok(())
    }

    /// Stop streaming and cancel any pending reconnect.
    ///
    /// Takes effect before this call returns: no further connection attempt
    /// or state change from the old stream is observable afterwards.
    pub fn close(&self) {
        if let Some(supervisor) = self.lock_supervisor().take() {
            supervisor.stop();
            info!("Real-time channel closed");
        }
        let mut state = self.shared.lock();
        state.reconnect_pending = false;
        state.set_status(&self.shared.events, ConnectionStatus::Disconnected);
    }

    /// Flip manual override and return the new setting.
    pub fn toggle_manual_override(&self) -> bool {
        let mut state = self.shared.lock();
        state.manual_override = !state.manual_override;
        let enabled = state.manual_override;
        info!(
            "Manual override {}",
            if enabled { "enabled" } else { "disabled" }
        );
        self.shared
            .events
            .send(ChannelEvent::ManualOverrideChanged { enabled });
        enabled
    }

    /// Update one manual reading and publish the resulting manual snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidData`] if the value is rejected; nothing is
    /// published in that case.
    pub fn set_manual_field(&self, field: ManualField, value: f64) -> Result<()> {
        let mut state = self.shared.lock();
        state.manual.set(field, value)?;
        let snapshot = state.manual_snapshot();
        let alerts = current_alerts(&snapshot);
        debug!("Manual {} set to {}", field, value);
        self.shared.events.send(ChannelEvent::Update {
            source: SnapshotSource::Manual,
            snapshot,
            alerts,
        });
        Ok(())
    }

    /// The snapshot consumers should display.
    ///
    /// The manual snapshot while override is on, otherwise the last streamed
    /// one (`None` before the first update).
    pub fn latest_snapshot(&self) -> Option<EnvironmentalSnapshot> {
        let state = self.shared.lock();
        if state.manual_override {
            Some(state.manual_snapshot())
        } else {
            state.live.clone()
        }
    }

    /// The last streamed snapshot, regardless of manual override.
    pub fn live_snapshot(&self) -> Option<EnvironmentalSnapshot> {
        self.shared.lock().live.clone()
    }

    /// Risk assessment of [`latest_snapshot`](Self::latest_snapshot).
    pub fn latest_risk(&self) -> Option<RiskAssessment> {
        self.latest_snapshot().map(|snapshot| assess(&snapshot))
    }

    /// Recommendations for [`latest_snapshot`](Self::latest_snapshot).
    pub fn recommendations(&self, profile: &RiderProfile) -> Recommendations {
        recommendations_for_aqi(self.latest_snapshot().map(|s| s.aqi), profile)
    }

    /// Alerts that hold for [`latest_snapshot`](Self::latest_snapshot).
    pub fn alerts(&self) -> Vec<Alert> {
        let state = self.shared.lock();
        if state.manual_override {
            current_alerts(&state.manual_snapshot())
        } else {
            state.alerts.clone()
        }
    }

    /// Subscribe to channel events.
    pub fn subscribe(&self) -> EventReceiver {
        self.shared.events.subscribe()
    }

    /// Current connection status.
    pub fn status(&self) -> ConnectionStatus {
        self.shared.lock().status
    }

    /// Whether a reconnect is waiting for its delay to elapse.
    pub fn is_reconnect_pending(&self) -> bool {
        self.shared.lock().reconnect_pending
    }

    /// Total connection attempts over the channel's lifetime.
    pub fn connection_attempts(&self) -> u32 {
        self.shared.lock().attempts
    }

    /// Whether manual override is on.
    pub fn is_manual_override(&self) -> bool {
        self.shared.lock().manual_override
    }

    /// Current manual readings.
    pub fn manual_readings(&self) -> ManualReadings {
        self.shared.lock().manual.clone()
    }

    /// Coordinates of the current or last stream.
    pub fn location(&self) -> Option<Coordinates> {
        self.shared.lock().location
    }

    /// Whether a supervisor task is running.
    pub fn is_active(&self) -> bool {
        self.lock_supervisor()
            .as_ref()
            .is_some_and(|s| !s.handle.is_finished())
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        let slot = self
            .supervisor
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(supervisor) = slot.take() {
            supervisor.stop();
        }
    }
}
