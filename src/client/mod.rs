// Module declarations
mod builder;
mod connection;
mod core;
mod state;


// Public API exports
pub use builder::{ClientOptions, GestureClientBuilder};
pub use connection::{ConnectionState, TransportHandle};
pub use core::GestureClient;
pub use state::{ClientState, ConnectionStatus, EventHandlers, PendingPing, ReconnectState};
