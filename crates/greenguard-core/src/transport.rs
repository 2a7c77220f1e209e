//! Transport abstraction for the real-time channel.
//!
//! The channel never talks to a socket directly. It asks a [`Connector`] for
//! a [`Session`] and reads text frames from it. [`WsConnector`] is the
//! WebSocket implementation; [`crate::mock::MockConnector`] drives tests.

use async_trait::async_trait;

use greenguard_types::Coordinates;

use crate::error::{Error, Result};

/// Path of the realtime monitoring endpoint.
pub const STREAM_PATH: &str = "/ws/realtime-monitoring";

/// Opens streaming sessions for a location.
///
/// # Example
///
/// ```ignore
/// use greenguard_core::transport::{Connector, Session};
///
/// async fn first_frame<C: Connector>(c: &C) -> Option<String> {
///     let mut session = c.connect(Coordinates::new(40.7128, -74.006)).await.ok()?;
///     session.recv().await?.ok()
/// }
/// ```
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a session streaming data for `location`.
    async fn connect(&self, location: Coordinates) -> Result<Box<dyn Session>>;
}

/// An open streaming session.
#[async_trait]
pub trait Session: Send {
    /// Wait for the next text frame.
    ///
    /// Returns `None` once the peer has closed the session and
    /// `Some(Err(_))` for a transport failure.
    async fn recv(&mut self) -> Option<Result<String>>;

    /// Close the session. Errors while closing are ignored.
    async fn close(&mut self);
}

/// Build the streaming URL for a backend base URL.
///
/// `http` maps to `ws` and `https` to `wss`; `ws`/`wss` URLs are used as is.
///
/// ```
/// use greenguard_core::transport::stream_url;
/// use greenguard_core::types::Coordinates;
///
/// let url = stream_url("https://api.example.com/", Coordinates::new(40.7128, -74.006)).unwrap();
/// assert_eq!(url, "wss://api.example.com/ws/realtime-monitoring?latitude=40.7128&longitude=-74.006");
/// ```
pub fn stream_url(base_url: &str, location: Coordinates) -> Result<String> {
    let base = base_url.trim().trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if base.starts_with("ws://") || base.starts_with("wss://") {
        base.to_string()
    } else {
        return Err(Error::invalid_config(format!(
            "unsupported base URL scheme in '{}'",
            base_url
        )));
    };
    Ok(format!(
        "{}{}?latitude={}&longitude={}",
        ws_base, STREAM_PATH, location.latitude, location.longitude
    ))
}

#[cfg(feature = "websocket")]
pub use ws::WsConnector;

#[cfg(feature = "websocket")]
mod ws {
    use std::time::Duration;

    use async_trait::async_trait;
    use futures::StreamExt;
    use tokio::net::TcpStream;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
    use tracing::debug;

    use greenguard_types::Coordinates;

    use super::{Connector, Session, stream_url};
    use crate::error::{Error, Result};

    /// Default time allowed for the WebSocket handshake.
    const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Opens WebSocket sessions against the backend.
    #[derive(Debug, Clone)]
    pub struct WsConnector {
        base_url: String,
        connect_timeout: Duration,
    }

    impl WsConnector {
        /// Create a connector for a backend base URL (`http(s)://` or `ws(s)://`).
        pub fn new(base_url: impl Into<String>) -> Result<Self> {
            let base_url = base_url.into();
            // Reject bad schemes up front rather than on every attempt
            stream_url(&base_url, Coordinates::default())?;
            Ok(Self {
                base_url,
                connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            })
        }

        /// Set the handshake timeout.
        #[must_use]
        pub fn connect_timeout(mut self, timeout: Duration) -> Self {
            self.connect_timeout = timeout;
            self
        }

        /// The configured base URL.
        pub fn base_url(&self) -> &str {
            &self.base_url
        }
    }

    #[async_trait]
    impl Connector for WsConnector {
        async fn connect(&self, location: Coordinates) -> Result<Box<dyn Session>> {
            let url = stream_url(&self.base_url, location)?;
            debug!("Opening WebSocket {}", url);
            let (stream, _response) =
                tokio::time::timeout(self.connect_timeout, connect_async(url.as_str()))
                    .await
                    .map_err(|_| Error::timeout("websocket connect", self.connect_timeout))?
                    .map_err(|e| Error::connection_failed(url.as_str(), e.to_string()))?;
            Ok(Box::new(WsSession { stream }))
        }
    }

    struct WsSession {
        stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    }

    #[async_trait]
    impl Session for WsSession {
        async fn recv(&mut self) -> Option<Result<String>> {
            loop {
                match self.stream.next().await? {
                    Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                    Ok(Message::Binary(bytes)) => {
                        return Some(String::from_utf8(bytes.to_vec()).map_err(|e| {
                            Error::InvalidMessage(format!("binary frame is not UTF-8: {}", e))
                        }));
                    }
                    Ok(Message::Close(_)) => return None,
                    // Pings are answered by tungstenite on the next read
                    Ok(_) => continue,
                    Err(e) => return Some(Err(Error::Transport(e.to_string()))),
                }
            }
        }

        async fn close(&mut self) {
            let _ = self.stream.close(None).await;
        }
    }

}
