/// Wire frame type strings (magic strings layer)
pub mod frame_types {
    pub const PROJECT_SELECT: &str = "project_select";
    pub const SETTINGS_UPDATE: &str = "settings_update";
    pub const PING: &str = "ping";
    pub const PONG: &str = "pong";
    pub const ERROR: &str = "error";
}

/// Default maximum reconnection attempts before the manager gives up
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Default base reconnection delay (milliseconds)
pub const DEFAULT_BASE_RECONNECT_DELAY: u64 = 1_000;

/// Default reconnection delay ceiling (milliseconds)
pub const DEFAULT_MAX_RECONNECT_DELAY: u64 = 30_000;

/// Default heartbeat interval (milliseconds)
pub const DEFAULT_HEARTBEAT_INTERVAL: u64 = 15_000;

/// Default connect timeout (milliseconds)
pub const DEFAULT_CONNECTION_TIMEOUT: u64 = 10_000;

/// Default outbound queue capacity (messages)
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Settle delay between disconnect and connect during `reconnect()` (milliseconds)
pub const RECONNECT_SETTLE_DELAY: u64 = 250;

/// Fraction of the computed backoff delay added as uniform jitter
pub const BACKOFF_JITTER_RATIO: f64 = 0.1;

/// WebSocket close codes
pub const CLOSE_NORMAL: u16 = 1000;
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Placeholder throughput factor until real traffic accounting exists
pub const THROUGHPUT_SCORE_BASELINE: u8 = 100;
