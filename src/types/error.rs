use thiserror::Error;

/// Errors that can occur when using the gesture stream client.
#[derive(Error, Debug)]
pub enum LinkError {
    /// WebSocket protocol error (handshake failed, invalid frame, etc.)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// General connection error with descriptive message
    #[error("Connection error: {0}")]
    Connection(String),

    /// Invalid client configuration (bad duration, zero capacity, ...)
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing error (malformed endpoint URL)
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// A connect attempt exceeded the configured connection timeout
    #[error("Connection attempt timed out")]
    Timeout,

    /// Attempted to transmit while the transport is not open
    #[error("Not connected")]
    NotConnected,

    /// An inbound frame could not be parsed; the frame is dropped
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// A subscriber callback panicked during fan-out
    #[error("Subscriber failure: {0}")]
    Subscriber(String),

    /// The manager exhausted its reconnection attempts and stopped retrying
    #[error("Reconnection attempts exhausted after {attempts} tries")]
    ReconnectExhausted { attempts: u32 },
}

/// Convenience type alias for `Result<T, LinkError>`.
pub type Result<T> = std::result::Result<T, LinkError>;
