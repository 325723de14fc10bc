use crate::transport::TransportSink;
use crate::types::{LinkError, Result, StreamMessage};
use tokio::sync::RwLock;

/// Lifecycle state of the underlying channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Connecting,
    Open,
    Closing,
    /// Waiting on an armed backoff timer before the next attempt
    Reconnecting,
}

struct Link {
    state: ConnectionState,
    /// Bumped by every new dial and every deliberate close. Transitions that
    /// were decided on an older link (a slow dial resolving after a
    /// disconnect, a stale fault report) present the epoch they captured and
    /// are refused when it no longer matches.
    epoch: u64,
}

/// Exclusive owner of the live transport sink and its lifecycle state.
///
/// The read half lives in the manager's read task; this handle carries the
/// write half so the heartbeat monitor, router and queue drain can all
/// transmit through one place. State transitions are epoch-checked so that
/// concurrent lifecycle paths (manual disconnects, scheduled retries, fault
/// reports) serialize instead of stomping each other.
pub struct TransportHandle {
    sink: RwLock<Option<Box<dyn TransportSink>>>,
    link: RwLock<Link>,
}

impl TransportHandle {
    pub fn new() -> Self {
        Self {
            sink: RwLock::new(None),
            link: RwLock::new(Link {
                state: ConnectionState::Closed,
                epoch: 0,
            }),
        }
    }

    pub async fn state(&self) -> ConnectionState {
        self.link.read().await.state
    }

    pub async fn epoch(&self) -> u64 {
        self.link.read().await.epoch
    }

    pub async fn is_open(&self) -> bool {
        self.link.read().await.state == ConnectionState::Open
    }

    /// Start a new dial: moves to Connecting and returns the epoch the
    /// attempt must present when it resolves.
    pub async fn begin_connect(&self) -> u64 {
        let mut link = self.link.write().await;
        link.state = ConnectionState::Connecting;
        link.epoch += 1;
        link.epoch
    }

    /// Install the write half of a resolved dial and move to Open. Refused
    /// when the attempt was superseded while in flight.
    pub async fn install(&self, sink: Box<dyn TransportSink>, epoch: u64) -> bool {
        let mut link = self.link.write().await;
        if link.state != ConnectionState::Connecting || link.epoch != epoch {
            return false;
        }
        *self.sink.write().await = Some(sink);
        link.state = ConnectionState::Open;
        true
    }

    /// Record a failed dial: moves back to Closed unless the attempt was
    /// already superseded.
    pub async fn abandon(&self, epoch: u64) -> bool {
        let mut link = self.link.write().await;
        if link.state != ConnectionState::Connecting || link.epoch != epoch {
            return false;
        }
        link.state = ConnectionState::Closed;
        true
    }

    /// Move a downed link to Reconnecting. Refused when the link was
    /// deliberately closed or re-dialed since the closure was observed.
    pub async fn arm_reconnect(&self, epoch: u64) -> bool {
        let mut link = self.link.write().await;
        if link.state != ConnectionState::Closed || link.epoch != epoch {
            return false;
        }
        link.state = ConnectionState::Reconnecting;
        true
    }

    /// Take an open link down without a close handshake, returning its epoch
    /// for the reconnection path. Returns `None` when the link is not open,
    /// so exactly one caller wins when closure is observed on several paths
    /// at once.
    pub async fn take_down(&self) -> Option<u64> {
        let mut link = self.link.write().await;
        if link.state != ConnectionState::Open {
            return None;
        }
        *self.sink.write().await = None;
        link.state = ConnectionState::Closed;
        Some(link.epoch)
    }

    /// Serialize and transmit one frame. Fails with [`LinkError::NotConnected`]
    /// when no sink is installed, so callers can tell the not-open path from
    /// a transmission failure.
    pub async fn transmit(&self, message: &StreamMessage) -> Result<()> {
        let json = serde_json::to_string(message)?;

        let mut guard = self.sink.write().await;
        match guard.as_mut() {
            Some(sink) => sink.transmit(&json).await,
            None => Err(LinkError::NotConnected),
        }
    }

    /// Graceful shutdown with a normal closure. Bumps the epoch so nothing
    /// decided on the old link can arm a retry afterwards.
    pub async fn close(&self) -> Result<()> {
        {
            let mut link = self.link.write().await;
            link.state = ConnectionState::Closing;
            link.epoch += 1;
        }

        let mut guard = self.sink.write().await;
        if let Some(sink) = guard.as_mut() {
            sink.close().await?;
        }
        *guard = None;
        drop(guard);

        self.link.write().await.state = ConnectionState::Closed;
        Ok(())
    }
}

impl Default for TransportHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct NullSink;

    #[async_trait]
    impl TransportSink for NullSink {
        async fn transmit(&mut self, _text: &str) -> Result<()> {
            Ok(())
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn handle_is_shareable_across_tasks() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TransportHandle>();
    }

    #[tokio::test]
    async fn install_refuses_a_superseded_dial() {
        let handle = TransportHandle::new();
        let epoch = handle.begin_connect().await;
        handle.close().await.unwrap();

        assert!(!handle.install(Box::new(NullSink), epoch).await);
        assert_eq!(handle.state().await, ConnectionState::Closed);
    }

    #[tokio::test]
    async fn take_down_has_exactly_one_winner() {
        let handle = TransportHandle::new();
        let epoch = handle.begin_connect().await;
        assert!(handle.install(Box::new(NullSink), epoch).await);

        assert!(handle.take_down().await.is_some());
        assert!(handle.take_down().await.is_none());
        assert!(matches!(
            handle.transmit(&StreamMessage::ping()).await,
            Err(LinkError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn deliberate_close_blocks_a_stale_reconnect_arm() {
        let handle = TransportHandle::new();
        let epoch = handle.begin_connect().await;
        assert!(handle.install(Box::new(NullSink), epoch).await);
        let downed = handle.take_down().await.unwrap();

        // A disconnect lands between the closure and the retry arming
        handle.close().await.unwrap();

        assert!(!handle.arm_reconnect(downed).await);
        assert_eq!(handle.state().await, ConnectionState::Closed);
    }

    #[tokio::test]
    async fn reconnect_arms_from_an_observed_closure() {
        let handle = TransportHandle::new();
        let epoch = handle.begin_connect().await;
        assert!(handle.install(Box::new(NullSink), epoch).await);
        let downed = handle.take_down().await.unwrap();

        assert!(handle.arm_reconnect(downed).await);
        assert_eq!(handle.state().await, ConnectionState::Reconnecting);
    }
}
