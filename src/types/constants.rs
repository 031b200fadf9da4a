use std::time::Duration;

/// Wire topics reserved by the connection manager
pub mod topics {
    pub const PING: &str = "ping";
}

/// Default base delay before the first reconnect attempt (milliseconds)
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 3000;

/// Default number of automatic reconnect attempts per failure episode
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Default heartbeat interval (milliseconds)
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 30000;

/// Hard ceiling on any single backoff delay
pub const MAX_RECONNECT_DELAY: Duration = Duration::from_millis(30000);

/// How long the app may sit in the background before the socket is closed
pub const BACKGROUND_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Max outbound queue size
pub const MAX_OUTBOUND_QUEUE_SIZE: usize = 100;

/// WebSocket close codes
pub const WS_CLOSE_NORMAL: u16 = 1000;
pub const WS_CLOSE_NO_STATUS: u16 = 1005;
pub const WS_CLOSE_ABNORMAL: u16 = 1006;

/// Environment variables read by `ConnectionConfig::from_env`
pub mod env_vars {
    pub const URL: &str = "REALTIME_URL";
    pub const RECONNECT_DELAY_MS: &str = "REALTIME_RECONNECT_DELAY_MS";
    pub const MAX_RECONNECT_ATTEMPTS: &str = "REALTIME_MAX_RECONNECT_ATTEMPTS";
    pub const HEARTBEAT_INTERVAL_MS: &str = "REALTIME_HEARTBEAT_INTERVAL_MS";
}
