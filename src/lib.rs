//! # gesture-link
//!
//! Persistent connection manager for real-time hand-gesture streaming
//! backends.
//!
//! The client maintains one long-lived bidirectional channel: it recovers
//! unexpected drops with jittered exponential backoff, buffers outbound
//! messages while the link is down, scores link quality from heartbeat
//! round-trips, and fans inbound tracking records out to independent,
//! project-filterable subscribers.
//!
//! ## Example
//!
//! ```no_run
//! use gesture_link::{ClientOptions, GestureClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = GestureClient::new(
//!         "wss://gestures.example.dev/stream",
//!         ClientOptions::default(),
//!     )?;
//!
//!     client.connect().await?;
//!     client.select_project("air-canvas").await;
//!
//!     client
//!         .subscribe(|record| println!("{}", record.payload), Some("air-canvas"))
//!         .await;
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod infrastructure;
pub mod messaging;
pub mod transport;
pub mod types;

pub use client::{
    ClientOptions, ConnectionState, ConnectionStatus, GestureClient, GestureClientBuilder,
};
pub use infrastructure::{
    ConnectionQuality, LatencySink, QualityFactors, QualityStatus, ReconnectSchedule,
};
pub use transport::{Transport, TransportEvent, TransportSink, WebSocketTransport};
pub use types::{FrameKind, LinkError, Result, StreamMessage};
