use crate::infrastructure::{ConnectionQuality, OutboundQueue};
use crate::messaging::SubscriberRegistry;
use crate::types::LinkError;
use serde::Serialize;
use std::sync::{Arc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Snapshot of the manager's derived state, recomputed on every lifecycle
/// event. `connected` and `reconnecting` are never both true; `uptime_ms`
/// is 0 whenever `connected` is false.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub reconnecting: bool,
    pub quality: ConnectionQuality,
    pub latency_ms: Option<u64>,
    pub uptime_ms: u64,
    pub last_error: Option<String>,
}

/// A heartbeat probe awaiting its reply.
#[derive(Debug, Clone, Copy)]
pub struct PendingPing {
    /// Epoch-millis stamp the pong must echo
    pub timestamp: u64,
    pub sent_at: Instant,
}

/// Reconnection bookkeeping: how many attempts this outage has consumed and
/// the armed timer, if any.
#[derive(Default)]
pub struct ReconnectState {
    pub attempts: u32,
    pub timer: Option<JoinHandle<()>>,
}

impl ReconnectState {
    /// Abort a pending timer so a stale retry cannot fire after a manual
    /// `connect`/`disconnect` has taken over.
    pub fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

/// Consolidated mutable state for the client; one struct keeps lock
/// ordering trivial.
pub struct ClientState {
    pub queue: OutboundQueue,
    pub subscribers: SubscriberRegistry,
    pub reconnect: ReconnectState,
    pub pending_ping: Option<PendingPing>,
    pub latency_ms: Option<u64>,
    pub connected_at: Option<Instant>,
    pub last_error: Option<String>,
    pub current_project: Option<String>,
    pub read_task: Option<JoinHandle<()>>,
    pub heartbeat_task: Option<JoinHandle<()>>,
}

impl ClientState {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            queue: OutboundQueue::new(queue_capacity),
            subscribers: SubscriberRegistry::new(),
            reconnect: ReconnectState::default(),
            pending_ping: None,
            latency_ms: None,
            connected_at: None,
            last_error: None,
            current_project: None,
            read_task: None,
            heartbeat_task: None,
        }
    }

    /// Abort the read and heartbeat tasks of the current link.
    pub fn abort_link_tasks(&mut self) {
        if let Some(task) = self.read_task.take() {
            task.abort();
        }
        if let Some(task) = self.heartbeat_task.take() {
            task.abort();
        }
    }
}

type ConnectionChangeFn = dyn Fn(ConnectionStatus) + Send + Sync;
type MessageFn = dyn Fn(crate::types::StreamMessage) + Send + Sync;
type ErrorFn = dyn Fn(&LinkError) + Send + Sync;

/// Event-notification surface: at most one handler per event. Registering
/// again replaces the previous handler; the manager is an integration seam
/// owned by exactly one caller.
#[derive(Default)]
pub struct EventHandlers {
    connection_change: RwLock<Option<Arc<ConnectionChangeFn>>>,
    message: RwLock<Option<Arc<MessageFn>>>,
    error: RwLock<Option<Arc<ErrorFn>>>,
}

impl EventHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_connection_change(&self, handler: Arc<ConnectionChangeFn>) {
        *self.connection_change.write().unwrap() = Some(handler);
    }

    pub fn set_message(&self, handler: Arc<MessageFn>) {
        *self.message.write().unwrap() = Some(handler);
    }

    pub fn set_error(&self, handler: Arc<ErrorFn>) {
        *self.error.write().unwrap() = Some(handler);
    }

    pub fn emit_connection_change(&self, status: ConnectionStatus) {
        let handler = self.connection_change.read().unwrap().clone();
        if let Some(handler) = handler {
            handler(status);
        }
    }

    pub fn emit_message(&self, record: &crate::types::StreamMessage) {
        let handler = self.message.read().unwrap().clone();
        if let Some(handler) = handler {
            handler(record.clone());
        }
    }

    pub fn emit_error(&self, error: &LinkError) {
        let handler = self.error.read().unwrap().clone();
        if let Some(handler) = handler {
            handler(error);
        }
    }
}
