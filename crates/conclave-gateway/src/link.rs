//! The persistent WebSocket link to the review gateway.
//!
//! One [`GatewayLink`] owns one logical connection. Callers register a
//! correlation id, send their framed request, and suspend on the returned
//! waiter; a single spawned reader task drains every inbound frame and
//! dispatches it into the [`CorrelationTable`]. Frames that reference no
//! pending request are logged and dropped — they never surface to a caller.
//! When the connection closes unexpectedly, every pending slot resolves
//! with [`ConclaveError::ConnectionLost`] instead of being left to time out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use conclave_core::{AgentVerdict, ConclaveError, GatewayConfig};

use crate::auth;
use crate::correlation::{CorrelationTable, VerdictWaiter};
use crate::protocol::{self, GatewayMessage, ReviewRequestFrame, EXPECTED_VERDICTS};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// The single shared connection to the review gateway.
///
/// Cheap to share behind an [`Arc`]; any number of caller tasks may have
/// outstanding requests at once. Outbound sends serialize on an async mutex
/// over the write half; only the reader task touches the read half.
pub struct GatewayLink {
    table: Arc<CorrelationTable>,
    sink: tokio::sync::Mutex<WsSink>,
    connected: Arc<AtomicBool>,
    reader: JoinHandle<()>,
}

impl std::fmt::Debug for GatewayLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayLink")
            .field("connected", &self.connected.load(std::sync::atomic::Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl GatewayLink {
    /// Establish the connection and spawn the reader task.
    ///
    /// Authentication uses the configured app identity, falling back to the
    /// gateway's built-in development identity.
    ///
    /// # Errors
    ///
    /// Returns [`ConclaveError::Connection`] if the WebSocket handshake
    /// fails.
    pub async fn connect(config: &GatewayConfig) -> Result<Self, ConclaveError> {
        let app_id = config.app_id.as_deref().unwrap_or(auth::DEV_APP_ID);
        let app_secret = config.app_secret.as_deref().unwrap_or(auth::DEV_APP_SECRET);
        let token = auth::auth_token(app_id, app_secret, Utc::now().timestamp() as u64);
        let url = auth::authenticated_url(&config.url, app_id, &token);

        tracing::info!(url = %config.url, "connecting to review gateway");
        let (ws, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| {
                ConclaveError::Connection(format!("failed to reach gateway at {}: {e}", config.url))
            })?;

        let (sink, stream) = ws.split();
        let table = Arc::new(CorrelationTable::new(EXPECTED_VERDICTS));
        let connected = Arc::new(AtomicBool::new(true));

        let reader = tokio::spawn(reader_loop(
            stream,
            Arc::clone(&table),
            Arc::clone(&connected),
        ));

        Ok(Self {
            table,
            sink: tokio::sync::Mutex::new(sink),
            connected,
            reader,
        })
    }

    /// Whether the link currently believes it is connected.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Number of requests currently awaiting verdicts.
    pub fn pending(&self) -> usize {
        self.table.len()
    }

    /// Verdicts the gateway delivers per request.
    pub fn expected_verdicts(&self) -> usize {
        self.table.expected()
    }

    /// Register a correlation id and hand back the waiter to suspend on.
    ///
    /// # Errors
    ///
    /// Returns [`ConclaveError::DuplicateId`] if the id already has a live
    /// slot.
    pub fn register(&self, request_id: &str) -> Result<VerdictWaiter, ConclaveError> {
        self.table.register(request_id)
    }

    /// Detach a pending request, returning any verdicts collected so far.
    ///
    /// Used on timeout and on caller cancellation; a frame arriving for the
    /// id afterwards is dropped as unknown.
    pub fn discard(&self, request_id: &str) -> Option<Vec<AgentVerdict>> {
        self.table.remove(request_id)
    }

    /// Serialize and transmit one review request frame.
    ///
    /// # Errors
    ///
    /// Returns [`ConclaveError::Send`] when the link is not connected or the
    /// transport rejects the frame.
    pub async fn send_request(&self, frame: &ReviewRequestFrame) -> Result<(), ConclaveError> {
        if !self.is_connected() {
            return Err(ConclaveError::Send("gateway link is not connected".into()));
        }
        let json = serde_json::to_string(frame)?;
        tracing::debug!(request_id = %frame.request_id, "sending review request");
        let mut sink = self.sink.lock().await;
        sink.send(Message::Text(json)).await.map_err(|e| {
            self.connected.store(false, Ordering::SeqCst);
            ConclaveError::Send(format!("failed to transmit review request: {e}"))
        })
    }

    /// Close the connection and resolve anything still pending.
    pub async fn shutdown(&self) {
        self.connected.store(false, Ordering::SeqCst);
        let mut sink = self.sink.lock().await;
        let _ = sink.send(Message::Close(None)).await;
        self.table.fail_all(|| ConclaveError::ConnectionLost);
    }
}

impl Drop for GatewayLink {
    fn drop(&mut self) {
        self.reader.abort();
        self.table.fail_all(|| ConclaveError::ConnectionLost);
    }
}

/// Drain inbound frames until the stream ends, then broadcast the loss.
async fn reader_loop(
    mut stream: SplitStream<WsStream>,
    table: Arc<CorrelationTable>,
    connected: Arc<AtomicBool>,
) {
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => dispatch_frame(&text, &table),
            Ok(Message::Close(frame)) => {
                tracing::info!(close_frame = ?frame, "gateway closed the connection");
                break;
            }
            Ok(Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_)) => {
                // Ping/pong is handled by tungstenite; the gateway never
                // sends binary frames.
            }
            Err(e) => {
                tracing::error!(error = %e, "gateway transport error");
                break;
            }
        }
    }

    connected.store(false, Ordering::SeqCst);
    table.fail_all(|| ConclaveError::ConnectionLost);
    tracing::debug!("gateway reader task terminated");
}

/// Decode one text frame and route it into the table.
///
/// Every failure mode here is drop-and-log: a malformed frame, an unknown
/// frame type, an unrecognized agent, or an id with no pending slot must not
/// disturb unrelated requests.
fn dispatch_frame(text: &str, table: &CorrelationTable) {
    let message: GatewayMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(error = %e, "dropping malformed gateway frame");
            return;
        }
    };

    match message {
        GatewayMessage::AgentResponse {
            request_id,
            agent_id,
            content,
            status,
        } => {
            let Some(agent) = protocol::agent_name(&agent_id) else {
                tracing::warn!(agent_id = %agent_id, "dropping frame from unknown agent");
                return;
            };
            let completed = status.as_deref() == Some("completed");
            match table.append_chunk(&request_id, agent, &content, completed) {
                Ok(true) => {
                    tracing::debug!(request_id = %request_id, "all verdicts collected");
                }
                Ok(false) => {}
                Err(ConclaveError::UnknownId(id)) => {
                    tracing::warn!(request_id = %id, "dropping response for unknown request id");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to record agent response");
                }
            }
        }
        GatewayMessage::Error {
            request_id: Some(id),
            message,
        } => {
            tracing::warn!(request_id = %id, error = %message, "gateway reported request failure");
            if !table.fail(&id, ConclaveError::Gateway(message)) {
                tracing::debug!(request_id = %id, "error frame for unknown request id");
            }
        }
        GatewayMessage::Error {
            request_id: None,
            message,
        } => {
            tracing::warn!(error = %message, "gateway reported a connection-level error");
        }
        GatewayMessage::Unknown => {
            tracing::debug!("unhandled gateway frame type");
        }
    }
}
