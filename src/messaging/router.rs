use crate::client::{ClientState, EventHandlers, TransportHandle};
use crate::infrastructure::LatencySink;
use crate::messaging::registry;
use crate::types::{FrameKind, LinkError, StreamMessage};
use std::sync::{Arc, Weak};
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Routes each inbound frame to its consumer.
///
/// Heartbeat replies are consumed internally; `error` frames surface through
/// the error handler; data frames fan out to the subscriber registry. A
/// frame that fails to parse is reported and dropped without touching the
/// connection.
pub struct MessageRouter {
    state: Arc<RwLock<ClientState>>,
    handlers: Arc<EventHandlers>,
    connection: Weak<TransportHandle>,
    latency_sink: Option<Arc<dyn LatencySink>>,
}

impl MessageRouter {
    pub fn new(
        state: Arc<RwLock<ClientState>>,
        handlers: Arc<EventHandlers>,
        connection: Weak<TransportHandle>,
        latency_sink: Option<Arc<dyn LatencySink>>,
    ) -> Self {
        Self {
            state,
            handlers,
            connection,
            latency_sink,
        }
    }

    /// Parse and route one raw text frame.
    pub async fn route_raw(&self, text: &str) {
        match serde_json::from_str::<StreamMessage>(text) {
            Ok(frame) => self.route(frame).await,
            Err(e) => {
                tracing::error!("Failed to parse frame: {} - Raw: {}", e, text);
                self.handlers
                    .emit_error(&LinkError::MalformedFrame(e.to_string()));
            }
        }
    }

    pub async fn route(&self, frame: StreamMessage) {
        tracing::debug!(
            "Routing frame: type={}, project={:?}",
            frame.kind,
            frame.project
        );

        match &frame.kind {
            FrameKind::Pong => self.handle_pong(&frame).await,
            FrameKind::Ping => self.reply_pong(&frame).await,
            FrameKind::Error => {
                let detail = frame
                    .payload
                    .get("message")
                    .and_then(|v| v.as_str())
                    .unwrap_or("server reported an error")
                    .to_string();
                tracing::error!("Server error frame: {}", detail);
                self.handlers.emit_error(&LinkError::Connection(detail));
            }
            // Server echoes of our own control frames carry nothing to act on
            FrameKind::ProjectSelect | FrameKind::SettingsUpdate => {
                tracing::debug!("Ignoring control frame echo: {}", frame.kind);
            }
            FrameKind::Data(_) => self.dispatch_data(frame).await,
        }
    }

    /// Match a pong against the pending ping and record the round-trip.
    async fn handle_pong(&self, frame: &StreamMessage) {
        let measured = {
            let mut state = self.state.write().await;
            match state.pending_ping {
                Some(pending) if frame.timestamp == Some(pending.timestamp) => {
                    state.pending_ping = None;
                    let elapsed = Instant::now().duration_since(pending.sent_at);
                    state.latency_ms = Some(elapsed.as_millis() as u64);
                    Some(elapsed)
                }
                _ => {
                    tracing::debug!("Pong does not match a pending ping, ignoring");
                    None
                }
            }
        };

        if let Some(elapsed) = measured {
            tracing::debug!("Heartbeat round-trip: {}ms", elapsed.as_millis());
            if let Some(sink) = &self.latency_sink {
                sink.record(elapsed);
            }
        }
    }

    /// The wire contract is symmetric: answer server probes in kind.
    async fn reply_pong(&self, frame: &StreamMessage) {
        let Some(connection) = self.connection.upgrade() else {
            return;
        };
        let pong = StreamMessage::pong_for(frame);
        if let Err(e) = connection.transmit(&pong).await {
            tracing::warn!("Failed to answer server ping: {}", e);
            self.handlers.emit_error(&e);
        }
    }

    /// Fan a data record out to every matching subscriber, then discard it.
    async fn dispatch_data(&self, frame: StreamMessage) {
        self.handlers.emit_message(&frame);

        let targets = {
            let state = self.state.read().await;
            state.subscribers.matching(frame.project.as_deref())
        };

        registry::deliver(&targets, &frame, |detail| {
            tracing::error!("{}", detail);
            self.handlers.emit_error(&LinkError::Subscriber(detail));
        });
    }
}
