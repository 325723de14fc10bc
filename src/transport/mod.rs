// Transport module - the full-duplex channel seam under the manager
mod ws;

#[cfg(test)]
pub(crate) mod mock;

pub use ws::WebSocketTransport;

use crate::types::Result;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// One event observed on the inbound half of the channel.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A complete text frame
    Text(String),
    /// The peer (or the local side) closed the channel
    Closed { code: u16, reason: String },
}

/// Inbound half of an open channel. The stream ending without a close event
/// is treated by the manager as an abnormal closure.
pub type TransportStream = Pin<Box<dyn Stream<Item = Result<TransportEvent>> + Send>>;

/// Outbound half of an open channel. Held behind shared locks by the
/// manager, so implementations must be shareable across tasks.
#[async_trait]
pub trait TransportSink: Send + Sync {
    /// Transmit one text frame.
    async fn transmit(&mut self, text: &str) -> Result<()>;

    /// Close the channel gracefully.
    async fn close(&mut self) -> Result<()>;
}

/// Both halves of a freshly opened channel.
pub struct TransportPair {
    pub sink: Box<dyn TransportSink>,
    pub stream: TransportStream,
}

/// Factory for the underlying full-duplex channel.
///
/// The production implementation is [`WebSocketTransport`]; tests inject a
/// scripted mock. The manager owns the returned halves exclusively.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a new channel to `endpoint`.
    async fn connect(&self, endpoint: &str) -> Result<TransportPair>;
}
