//! Mock transport for testing.
//!
//! [`MockConnector`] implements [`Connector`] without a network. Each call
//! to `connect` consumes the next scripted outcome; once the script runs
//! out, sessions stay open and silent.
//!
//! # Features
//!
//! - **Scripted sessions**: queue frames, transport errors and delays
//! - **Live sessions**: push frames from the test while the channel runs
//! - **Refusals**: fail a connection attempt
//! - **Connect counting**: observe how often the channel dialled

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use greenguard_types::Coordinates;

use crate::error::{Error, Result};
use crate::transport::{Connector, Session};

/// One step of a mock session.
#[derive(Debug, Clone, PartialEq)]
pub enum MockStep {
    /// Deliver a text frame.
    Text(String),
    /// Fail with a transport error.
    Error(String),
    /// Wait before the next step.
    Delay(Duration),
    /// Close the session from the server side.
    Close,
}

impl MockStep {
    /// A text frame.
    pub fn text(text: impl Into<String>) -> Self {
        MockStep::Text(text.into())
    }

    /// A `realtime_update` frame carrying only an AQI value.
    pub fn update(aqi: f64) -> Self {
        MockStep::Text(format!(
            r#"{{"type":"realtime_update","aqi":{{"value":{}}}}}"#,
            aqi
        ))
    }
}

/// Sends steps into a live mock session.
///
/// Dropping the feed closes the session once queued steps are consumed.
#[derive(Debug, Clone)]
pub struct MockFeed {
    sender: mpsc::UnboundedSender<MockStep>,
}

impl MockFeed {
    /// Queue a step. Returns `false` if the session is gone.
    pub fn send(&self, step: MockStep) -> bool {
        self.sender.send(step).is_ok()
    }
}

enum Outcome {
    Refuse(String),
    Session {
        steps: mpsc::UnboundedReceiver<MockStep>,
        keepalive: Option<mpsc::UnboundedSender<MockStep>>,
    },
}

fn scripted(steps: impl IntoIterator<Item = MockStep>, stay_open: bool) -> Outcome {
    let (tx, rx) = mpsc::unbounded_channel();
    for step in steps {
        let _ = tx.send(step);
    }
    Outcome::Session {
        steps: rx,
        keepalive: stay_open.then_some(tx),
    }
}

/// A scripted [`Connector`].
///
/// # Example
///
/// ```
/// use greenguard_core::mock::{MockConnector, MockStep};
/// use greenguard_core::transport::{Connector, Session};
/// use greenguard_core::types::Coordinates;
///
/// #[tokio::main]
/// async fn main() {
///     let connector = MockConnector::new();
///     connector.push_session([MockStep::update(42.0)]);
///
///     let mut session = connector.connect(Coordinates::new(0.0, 0.0)).await.unwrap();
///     assert!(session.recv().await.unwrap().is_ok());
///     assert!(session.recv().await.is_none());
///     assert_eq!(connector.connect_count(), 1);
/// }
/// ```
#[derive(Default)]
pub struct MockConnector {
    script: Mutex<VecDeque<Outcome>>,
    connects: AtomicU32,
    locations: Mutex<Vec<Coordinates>>,
}

impl std::fmt::Debug for MockConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockConnector")
            .field("connects", &self.connect_count())
            .field("scripted", &self.lock_script().len())
            .finish()
    }
}

impl MockConnector {
    /// Create a connector with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<Outcome>> {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue a session that plays `steps` and then closes.
    pub fn push_session(&self, steps: impl IntoIterator<Item = MockStep>) {
        self.lock_script().push_back(scripted(steps, false));
    }

    /// Queue a session that plays `steps` and then stays open.
    pub fn push_open_session(&self, steps: impl IntoIterator<Item = MockStep>) {
        self.lock_script().push_back(scripted(steps, true));
    }

    /// Queue a session fed by the returned [`MockFeed`].
    pub fn push_live(&self) -> MockFeed {
        let (sender, steps) = mpsc::unbounded_channel();
        self.lock_script().push_back(Outcome::Session {
            steps,
            keepalive: None,
        });
        MockFeed { sender }
    }

    /// Queue a refused connection attempt.
    pub fn push_refusal(&self, reason: impl Into<String>) {
        self.lock_script().push_back(Outcome::Refuse(reason.into()));
    }

    /// Number of `connect` calls so far.
    pub fn connect_count(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }

    /// Locations passed to `connect`, in call order.
    pub fn locations(&self) -> Vec<Coordinates> {
        self.locations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, location: Coordinates) -> Result<Box<dyn Session>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.locations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(location);

        let outcome = self
            .lock_script()
            .pop_front()
            .unwrap_or_else(|| scripted(std::iter::empty(), true));
        match outcome {
            Outcome::Refuse(reason) => Err(Error::connection_failed("mock://", reason)),
            Outcome::Session { steps, keepalive } => Ok(Box::new(MockSession {
                steps,
                _keepalive: keepalive,
            })),
        }
    }
}

struct MockSession {
    steps: mpsc::UnboundedReceiver<MockStep>,
    _keepalive: Option<mpsc::UnboundedSender<MockStep>>,
}

#[async_trait]
impl Session for MockSession {
    async fn recv(&mut self) -> Option<Result<String>> {
        loop {
            match self.steps.recv().await? {
                MockStep::Text(text) => return Some(Ok(text)),
                MockStep::Error(reason) => return Some(Err(Error::Transport(reason))),
                MockStep::Delay(d) => tokio::time::sleep(d).await,
                MockStep::Close => return None,
            }
        }
    }

    async fn close(&mut self) {
        self.steps.close();
    }
}
