use thiserror::Error;

/// Errors that can occur when using the realtime connection manager.
///
/// Most failures (dropped sockets, bad inbound frames, panicking subscribers) are
/// recovered internally and only show up as status transitions or log output. The
/// variants below are the ones that reach a caller.
#[derive(Error, Debug)]
pub enum RealtimeError {
    /// Configuration rejected before any connection attempt
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// URL parsing error (malformed endpoint URL)
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Attempted to write while the transport is not open
    #[error("Not connected")]
    NotConnected,

    /// Transport-level failure reported by the socket implementation
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Convenience type alias for `Result<T, RealtimeError>`.
pub type Result<T> = std::result::Result<T, RealtimeError>;
