// Messaging module - inbound parsing, routing and subscriber fan-out
pub mod registry;
pub mod router;

pub use registry::{SubscriberCallback, SubscriberRegistry, Subscription};
pub use router::MessageRouter;
