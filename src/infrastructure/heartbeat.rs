use crate::client::{ClientState, EventHandlers, PendingPing, TransportHandle};
use crate::types::StreamMessage;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

/// Push-style receiver for round-trip latency samples, one per answered
/// heartbeat. Injected at construction so telemetry never couples the
/// manager to a global collector.
pub trait LatencySink: Send + Sync {
    fn record(&self, latency: Duration);
}

/// Invoked when a heartbeat goes unanswered. A quiet peer produces no close
/// frame for the read task to observe, so the manager supplies this hook to
/// drive the teardown and reconnection path itself.
pub type StaleLinkFn = Box<dyn Fn() + Send + Sync>;

/// Periodic channel probe.
///
/// Every interval, while the transport is open, sends a `ping` frame stamped
/// with the send time and remembers it as pending. The matching `pong` is
/// consumed by the message router, which measures the round-trip. A ping
/// still pending at the next tick means the link went quiet; the monitor
/// reports it through the stale-link hook and the manager takes the link
/// down.
pub struct HeartbeatMonitor {
    interval: Duration,
    connection: Weak<TransportHandle>,
    state: Arc<RwLock<ClientState>>,
    handlers: Arc<EventHandlers>,
    on_stale: StaleLinkFn,
}

impl HeartbeatMonitor {
    pub fn new(
        connection: Weak<TransportHandle>,
        state: Arc<RwLock<ClientState>>,
        handlers: Arc<EventHandlers>,
        interval: Duration,
        on_stale: StaleLinkFn,
    ) -> Self {
        Self {
            interval,
            connection,
            state,
            handlers,
            on_stale,
        }
    }

    /// Spawns the probe task; runs until the transport handle is dropped or
    /// the task is aborted.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = time::interval(self.interval);
            ticker.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
            // interval fires immediately; the first probe waits a full period
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let connection = match self.connection.upgrade() {
                    Some(conn) => conn,
                    None => break,
                };

                if !connection.is_open().await {
                    continue;
                }

                let stale = self.state.read().await.pending_ping.is_some();
                if stale {
                    tracing::warn!("Heartbeat reply missing, reporting dead link");
                    self.state.write().await.pending_ping = None;
                    (self.on_stale)();
                    continue;
                }

                let ping = StreamMessage::ping();
                let pending = PendingPing {
                    timestamp: ping.timestamp.unwrap_or_default(),
                    sent_at: Instant::now(),
                };

                match connection.transmit(&ping).await {
                    Ok(()) => {
                        self.state.write().await.pending_ping = Some(pending);
                        tracing::debug!("Sent heartbeat ping ({})", pending.timestamp);
                    }
                    Err(e) => {
                        tracing::error!("Failed to send heartbeat: {}", e);
                        self.handlers.emit_error(&e);
                    }
                }
            }
        })
    }
}
