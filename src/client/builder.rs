use super::{ClientState, EventHandlers, GestureClient, TransportHandle};
use crate::infrastructure::{LatencySink, ReconnectSchedule};
use crate::transport::{Transport, WebSocketTransport};
use crate::types::{
    LinkError, Result, DEFAULT_BASE_RECONNECT_DELAY, DEFAULT_CONNECTION_TIMEOUT,
    DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_MAX_RECONNECT_ATTEMPTS, DEFAULT_MAX_RECONNECT_DELAY,
    DEFAULT_QUEUE_CAPACITY,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use url::Url;

/// Immutable client configuration, validated at build time.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Retry budget per outage; reaching it surfaces a terminal error
    pub max_reconnect_attempts: u32,
    pub base_reconnect_delay: Duration,
    pub max_reconnect_delay: Duration,
    pub heartbeat_interval: Duration,
    pub connection_timeout: Duration,
    pub outbound_queue_capacity: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            base_reconnect_delay: Duration::from_millis(DEFAULT_BASE_RECONNECT_DELAY),
            max_reconnect_delay: Duration::from_millis(DEFAULT_MAX_RECONNECT_DELAY),
            heartbeat_interval: Duration::from_millis(DEFAULT_HEARTBEAT_INTERVAL),
            connection_timeout: Duration::from_millis(DEFAULT_CONNECTION_TIMEOUT),
            outbound_queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl ClientOptions {
    fn validate(&self) -> Result<()> {
        if self.base_reconnect_delay.is_zero()
            || self.max_reconnect_delay.is_zero()
            || self.heartbeat_interval.is_zero()
            || self.connection_timeout.is_zero()
        {
            return Err(LinkError::Config(
                "all durations must be greater than zero".to_string(),
            ));
        }
        if self.base_reconnect_delay > self.max_reconnect_delay {
            return Err(LinkError::Config(
                "base_reconnect_delay must not exceed max_reconnect_delay".to_string(),
            ));
        }
        if self.outbound_queue_capacity == 0 {
            return Err(LinkError::Config(
                "outbound_queue_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`GestureClient`]: validates the endpoint and configuration
/// and wires in optional injected collaborators.
pub struct GestureClientBuilder {
    endpoint: String,
    options: ClientOptions,
    transport: Arc<dyn Transport>,
    latency_sink: Option<Arc<dyn LatencySink>>,
}

impl GestureClientBuilder {
    /// Create a new builder.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::UrlParse`] for a malformed endpoint and
    /// [`LinkError::Config`] for an invalid option set.
    pub fn new(endpoint: impl Into<String>, options: ClientOptions) -> Result<Self> {
        let endpoint = endpoint.into();
        Url::parse(&endpoint)?;
        options.validate()?;

        Ok(Self {
            endpoint,
            options,
            transport: Arc::new(WebSocketTransport::new()),
            latency_sink: None,
        })
    }

    /// Replace the production WebSocket transport with an injected one.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// Receive one latency sample per answered heartbeat.
    pub fn with_latency_sink(mut self, sink: Arc<dyn LatencySink>) -> Self {
        self.latency_sink = Some(sink);
        self
    }

    /// Build the client. No connection is established until
    /// [`GestureClient::connect`] is called.
    pub fn build(self) -> GestureClient {
        let schedule = ReconnectSchedule::new(
            self.options.base_reconnect_delay,
            self.options.max_reconnect_delay,
        );
        let state = ClientState::new(self.options.outbound_queue_capacity);

        GestureClient {
            endpoint: self.endpoint,
            options: self.options,
            schedule,
            transport: self.transport,
            connection: Arc::new(TransportHandle::new()),
            state: Arc::new(RwLock::new(state)),
            handlers: Arc::new(EventHandlers::new()),
            latency_sink: self.latency_sink,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_valid() {
        assert!(ClientOptions::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_durations_and_capacity() {
        let mut options = ClientOptions::default();
        options.heartbeat_interval = Duration::ZERO;
        assert!(matches!(
            options.validate(),
            Err(LinkError::Config(_))
        ));

        let mut options = ClientOptions::default();
        options.outbound_queue_capacity = 0;
        assert!(matches!(
            options.validate(),
            Err(LinkError::Config(_))
        ));
    }

    #[test]
    fn rejects_base_delay_above_ceiling() {
        let mut options = ClientOptions::default();
        options.base_reconnect_delay = Duration::from_secs(60);
        options.max_reconnect_delay = Duration::from_secs(30);
        assert!(matches!(
            options.validate(),
            Err(LinkError::Config(_))
        ));
    }

    #[test]
    fn rejects_malformed_endpoint() {
        let result = GestureClientBuilder::new("not a url", ClientOptions::default());
        assert!(matches!(result, Err(LinkError::UrlParse(_))));
    }
}
