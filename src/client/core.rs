use super::{
    ClientOptions, ClientState, ConnectionState, ConnectionStatus, EventHandlers,
    GestureClientBuilder, TransportHandle,
};
use crate::infrastructure::{ConnectionQuality, HeartbeatMonitor, LatencySink, ReconnectSchedule};
use crate::messaging::MessageRouter;
use crate::transport::{Transport, TransportEvent};
use crate::types::{
    FrameKind, LinkError, Result, StreamMessage, CLOSE_ABNORMAL, CLOSE_NORMAL,
    RECONNECT_SETTLE_DELAY,
};
use futures::future::BoxFuture;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Persistent connection manager for a gesture streaming backend.
///
/// `GestureClient` owns the full-duplex transport, recovers unexpected drops
/// with jittered exponential backoff, buffers outbound messages while the
/// link is down, scores link quality from heartbeat round-trips, and fans
/// inbound data records out to filterable subscribers.
///
/// # Example
///
/// ```no_run
/// use gesture_link::{ClientOptions, GestureClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = GestureClient::new(
///     "wss://gestures.example.dev/stream",
///     ClientOptions::default(),
/// )?;
///
/// client.connect().await?;
/// client.select_project("air-canvas").await;
///
/// let subscription = client
///     .subscribe(|record| println!("tracking data: {}", record.payload), Some("air-canvas"))
///     .await;
///
/// // ...
/// client.unsubscribe(&subscription).await;
/// client.disconnect().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct GestureClient {
    pub(crate) endpoint: String,
    pub(crate) options: ClientOptions,
    pub(crate) schedule: ReconnectSchedule,

    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) connection: Arc<TransportHandle>,

    // Consolidated mutable state
    pub(crate) state: Arc<RwLock<ClientState>>,
    pub(crate) handlers: Arc<EventHandlers>,
    pub(crate) latency_sink: Option<Arc<dyn LatencySink>>,
}

impl GestureClient {
    /// Creates a client over the production WebSocket transport. No
    /// connection is established until [`connect()`](Self::connect).
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::UrlParse`] if the endpoint is malformed or
    /// [`LinkError::Config`] if the options are invalid.
    pub fn new(endpoint: impl Into<String>, options: ClientOptions) -> Result<Self> {
        GestureClientBuilder::new(endpoint, options).map(|builder| builder.build())
    }

    // ---- lifecycle -------------------------------------------------------

    /// Establishes the connection.
    ///
    /// No-op if already open or connecting, so concurrent calls cannot open
    /// a second transport. The attempt races the configured connection
    /// timeout; on timeout it counts as a failure. On success the heartbeat
    /// monitor is armed, the outbound queue drained, and a connection-status
    /// event emitted. A manual call also cancels any armed reconnection
    /// timer and resets the attempt count.
    pub async fn connect(&self) -> Result<()> {
        {
            let state = self.connection.state().await;
            if state == ConnectionState::Open || state == ConnectionState::Connecting {
                return Ok(());
            }
        }

        {
            let mut state = self.state.write().await;
            state.reconnect.cancel_timer();
            state.reconnect.attempts = 0;
        }

        self.open_transport().await
    }

    /// Closes the connection with a normal closure and suppresses
    /// reconnection until `connect`/`reconnect` is called again. Idempotent.
    pub async fn disconnect(&self) -> Result<()> {
        tracing::info!("Disconnecting from {}", self.endpoint);

        {
            let mut state = self.state.write().await;
            state.reconnect.cancel_timer();
            state.abort_link_tasks();
            state.pending_ping = None;
            state.connected_at = None;
        }

        self.connection.close().await?;
        self.emit_status().await;
        Ok(())
    }

    /// Tears the connection down, waits a short settle delay, resets the
    /// reconnection attempt count and connects again.
    pub async fn reconnect(&self) -> Result<()> {
        self.disconnect().await?;
        tokio::time::sleep(Duration::from_millis(RECONNECT_SETTLE_DELAY)).await;
        self.connect().await
    }

    /// Idempotent teardown: disconnects, then clears all subscriptions and
    /// any still-queued outbound messages.
    pub async fn destroy(&self) -> Result<()> {
        self.disconnect().await?;

        let mut state = self.state.write().await;
        state.subscribers.clear();
        state.queue.clear();
        Ok(())
    }

    // ---- outbound --------------------------------------------------------

    /// Transmit a message immediately, or queue it for the next open link.
    ///
    /// Fire-and-forget: a transmission failure is surfaced through the error
    /// handler and the message falls back to the queue; sending while
    /// disconnected queues silently. The queue evicts its oldest entry under
    /// capacity pressure.
    pub async fn send(&self, message: StreamMessage) {
        if self.connection.is_open().await {
            match self.connection.transmit(&message).await {
                Ok(()) => return,
                Err(e) => {
                    tracing::error!("Transmission failed, queueing message: {}", e);
                    self.handlers.emit_error(&e);
                }
            }
        } else {
            tracing::debug!("Not connected, queueing {} message", message.kind);
        }

        let evicted = self.state.write().await.queue.push(message);
        if let Some(old) = evicted {
            tracing::warn!("Outbound queue full, dropped oldest {} message", old.kind);
        }
    }

    /// Records the active project and sends a routing-selection control
    /// message, subject to the same queue-or-send rule as [`send`](Self::send).
    pub async fn select_project(&self, project: impl Into<String>) {
        let project = project.into();
        self.state.write().await.current_project = Some(project.clone());

        tracing::info!("Selecting project {}", project);
        let message =
            StreamMessage::new(FrameKind::ProjectSelect, serde_json::Value::Null).with_project(project);
        self.send(message).await;
    }

    /// Sends a settings-update control message.
    pub async fn update_settings(&self, settings: serde_json::Value) {
        self.send(StreamMessage::new(FrameKind::SettingsUpdate, settings))
            .await;
    }

    // ---- subscriptions and event surface ----------------------------------

    /// Registers a callback for inbound data records, optionally filtered to
    /// one project discriminator. Returns the subscription id.
    ///
    /// Callbacks run in registration order, each isolated: a panicking
    /// subscriber is reported through the error handler and fan-out
    /// continues.
    pub async fn subscribe<F>(&self, callback: F, project_filter: Option<&str>) -> String
    where
        F: Fn(StreamMessage) + Send + Sync + 'static,
    {
        let mut state = self.state.write().await;
        state
            .subscribers
            .add(Arc::new(callback), project_filter.map(str::to_string))
    }

    /// Removes a subscription; returns whether it existed.
    pub async fn unsubscribe(&self, subscription_id: &str) -> bool {
        self.state.write().await.subscribers.remove(subscription_id)
    }

    /// Registers the connection-status handler (at most one; replaces any
    /// previous handler).
    pub async fn on_connection_change<F>(&self, handler: F)
    where
        F: Fn(ConnectionStatus) + Send + Sync + 'static,
    {
        self.handlers.set_connection_change(Arc::new(handler));
    }

    /// Registers the inbound-record handler (at most one).
    pub async fn on_message<F>(&self, handler: F)
    where
        F: Fn(StreamMessage) + Send + Sync + 'static,
    {
        self.handlers.set_message(Arc::new(handler));
    }

    /// Registers the error handler (at most one).
    pub async fn on_error<F>(&self, handler: F)
    where
        F: Fn(&LinkError) + Send + Sync + 'static,
    {
        self.handlers.set_error(Arc::new(handler));
    }

    // ---- read accessors ----------------------------------------------------

    pub async fn is_connected(&self) -> bool {
        self.connection.is_open().await
    }

    /// Current derived status snapshot.
    pub async fn connection_status(&self) -> ConnectionStatus {
        self.build_status().await
    }

    /// Current composite link-quality score.
    pub async fn connection_quality(&self) -> ConnectionQuality {
        let state = self.state.read().await;
        ConnectionQuality::evaluate(
            state.latency_ms,
            state.reconnect.attempts,
            self.options.max_reconnect_attempts,
        )
    }

    /// Last measured heartbeat round-trip, if any.
    pub async fn latency(&self) -> Option<u64> {
        self.state.read().await.latency_ms
    }

    pub async fn current_project(&self) -> Option<String> {
        self.state.read().await.current_project.clone()
    }

    // ---- internals ---------------------------------------------------------

    /// Open the transport and start the link tasks. Shared by manual connect
    /// and the scheduled retry path; attempt-count handling differs and is
    /// done by the callers. Boxed because the retry path re-enters it
    /// through `handle_close`.
    fn open_transport(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let epoch = self.connection.begin_connect().await;
            self.emit_status().await;
            tracing::info!("Connecting to {}", self.endpoint);

            let attempt = self.transport.connect(&self.endpoint);
            let pair = match tokio::time::timeout(self.options.connection_timeout, attempt).await
            {
                Ok(Ok(pair)) => pair,
                Ok(Err(e)) => return self.fail_connect(epoch, e).await,
                Err(_elapsed) => return self.fail_connect(epoch, LinkError::Timeout).await,
            };

            // Read task: parses frames, routes them, and reports closure
            let router = MessageRouter::new(
                Arc::clone(&self.state),
                Arc::clone(&self.handlers),
                Arc::downgrade(&self.connection),
                self.latency_sink.clone(),
            );
            let client = self.clone();
            let mut stream = pair.stream;

            let heartbeat = HeartbeatMonitor::new(
                Arc::downgrade(&self.connection),
                Arc::clone(&self.state),
                Arc::clone(&self.handlers),
                self.options.heartbeat_interval,
                {
                    let client = self.clone();
                    Box::new(move || {
                        let client = client.clone();
                        tokio::spawn(async move {
                            client.handle_link_fault().await;
                        });
                    })
                },
            );

            {
                // Install and task registration share one critical section so
                // a concurrent disconnect sees either nothing or everything.
                let mut state = self.state.write().await;
                if !self.connection.install(pair.sink, epoch).await {
                    // A disconnect superseded this attempt while it was in
                    // flight; its resolution is ignored.
                    tracing::debug!("Connect attempt superseded, discarding transport");
                    return Ok(());
                }

                state.abort_link_tasks();
                state.reconnect.timer = None;
                state.reconnect.attempts = 0;
                state.pending_ping = None;
                state.last_error = None;
                state.connected_at = Some(Instant::now());

                state.read_task = Some(tokio::spawn(async move {
                    tracing::debug!("Starting read task");
                    while let Some(event) = stream.next().await {
                        match event {
                            Ok(TransportEvent::Text(text)) => router.route_raw(&text).await,
                            Ok(TransportEvent::Closed { code, reason }) => {
                                client.handle_close(code, &reason).await;
                                return;
                            }
                            // Transport errors alone do not change connection
                            // state; the closure that follows drives the
                            // transition.
                            Err(e) => {
                                tracing::error!("Transport read error: {}", e);
                                client.handlers.emit_error(&e);
                            }
                        }
                    }
                    client.handle_close(CLOSE_ABNORMAL, "stream ended").await;
                }));
                state.heartbeat_task = Some(heartbeat.spawn());
            }

            tracing::info!("Connected to {}", self.endpoint);
            self.drain_queue().await;
            self.emit_status().await;
            Ok(())
        })
    }

    async fn fail_connect(&self, epoch: u64, error: LinkError) -> Result<()> {
        tracing::error!("Connection attempt failed: {}", error);
        if self.connection.abandon(epoch).await {
            self.state.write().await.last_error = Some(error.to_string());
            self.emit_status().await;
        }
        Err(error)
    }

    /// Pop-and-transmit queued messages in order while the link is open;
    /// a failed send is put back and draining stops.
    async fn drain_queue(&self) {
        while self.connection.is_open().await {
            let Some(message) = self.state.write().await.queue.pop() else {
                break;
            };
            if let Err(e) = self.connection.transmit(&message).await {
                tracing::warn!("Drain interrupted, re-queueing message: {}", e);
                self.state.write().await.queue.requeue_front(message);
                self.handlers.emit_error(&e);
                break;
            }
        }
    }

    /// Stale-heartbeat teardown. A peer that went quiet never sends the
    /// close frame the read task is waiting for, so the reader is aborted
    /// and the closure handled here.
    async fn handle_link_fault(&self) {
        if let Some(task) = self.state.write().await.read_task.take() {
            task.abort();
        }
        self.handle_close(CLOSE_ABNORMAL, "heartbeat timeout").await;
    }

    /// Handles an observed link drop. Exactly one caller wins the takedown
    /// when several paths observe it at once. A normal closure is deliberate
    /// and final; anything else engages the reconnection scheduler.
    async fn handle_close(&self, code: u16, reason: &str) {
        let Some(epoch) = self.connection.take_down().await else {
            tracing::debug!("Closure already handled, ignoring");
            return;
        };
        tracing::warn!("Connection closed: code={}, reason='{}'", code, reason);

        {
            let mut state = self.state.write().await;
            state.pending_ping = None;
            state.connected_at = None;
            if let Some(task) = state.heartbeat_task.take() {
                task.abort();
            }
        }

        if code == CLOSE_NORMAL {
            self.emit_status().await;
            return;
        }

        self.state.write().await.last_error = Some(format!("connection closed: {}", reason));
        self.schedule_reconnect(epoch).await;
    }

    /// Arm one backoff timer for the next attempt, or surface the terminal
    /// error once the attempt budget is spent. `epoch` is the link epoch the
    /// closure was observed on; a disconnect or newer dial in between
    /// refuses the arming.
    async fn schedule_reconnect(&self, epoch: u64) {
        {
            let mut state = self.state.write().await;
            if state.reconnect.attempts >= self.options.max_reconnect_attempts {
                let attempts = state.reconnect.attempts;
                state.last_error = Some(format!(
                    "reconnection attempts exhausted after {} tries",
                    attempts
                ));
                drop(state);

                tracing::error!("Giving up after {} reconnection attempts", attempts);
                self.handlers
                    .emit_error(&LinkError::ReconnectExhausted { attempts });
                self.emit_status().await;
                return;
            }
        }

        if !self.connection.arm_reconnect(epoch).await {
            tracing::debug!("Link superseded, not scheduling a retry");
            return;
        }

        let delay = {
            let mut state = self.state.write().await;
            state.reconnect.attempts += 1;
            self.schedule.jittered_delay_for(state.reconnect.attempts)
        };
        self.emit_status().await;
        tracing::info!("Reconnecting in {:?}", delay);

        let client = self.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            client.retry_connect().await;
        });
        self.state.write().await.reconnect.timer = Some(timer);
    }

    /// Scheduled retry path; a manual `connect`/`disconnect` that raced the
    /// timer has already moved the state on, in which case this does
    /// nothing. Boxed to close the retry cycle through `open_transport`.
    fn retry_connect(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if self.connection.state().await != ConnectionState::Reconnecting {
                tracing::debug!("Reconnect timer superseded, ignoring");
                return;
            }

            tracing::info!("Attempting to reconnect...");
            if let Err(e) = self.open_transport().await {
                tracing::error!("Reconnection attempt failed: {}", e);
                self.handlers.emit_error(&e);
                let epoch = self.connection.epoch().await;
                self.schedule_reconnect(epoch).await;
            }
        })
    }

    async fn build_status(&self) -> ConnectionStatus {
        let connection_state = self.connection.state().await;
        let state = self.state.read().await;

        let connected = connection_state == ConnectionState::Open;
        let uptime_ms = if connected {
            state
                .connected_at
                .map(|t| t.elapsed().as_millis() as u64)
                .unwrap_or(0)
        } else {
            0
        };

        ConnectionStatus {
            connected,
            reconnecting: connection_state == ConnectionState::Reconnecting,
            quality: ConnectionQuality::evaluate(
                state.latency_ms,
                state.reconnect.attempts,
                self.options.max_reconnect_attempts,
            ),
            latency_ms: state.latency_ms,
            uptime_ms,
            last_error: state.last_error.clone(),
        }
    }

    async fn emit_status(&self) {
        let status = self.build_status().await;
        self.handlers.emit_connection_change(status);
    }
}
