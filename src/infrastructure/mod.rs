// Infrastructure module - backoff, buffering, probing and scoring leaves
pub mod backoff;
pub mod heartbeat;
pub mod quality;
pub mod queue;

pub use backoff::ReconnectSchedule;
pub use heartbeat::{HeartbeatMonitor, LatencySink, StaleLinkFn};
pub use quality::{ConnectionQuality, QualityFactors, QualityStatus};
pub use queue::OutboundQueue;
