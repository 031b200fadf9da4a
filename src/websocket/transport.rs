use crate::types::Result;
use tokio::sync::mpsc;

/// Events a transport reports for one connection, in the order they happen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Open,
    Message(String),
    Error(String),
    Close { code: u16, reason: String },
}

pub type TransportEvents = mpsc::UnboundedSender<TransportEvent>;

/// Opens message-oriented, full-duplex text connections.
///
/// `open` must not block: it returns a handle right away and reports the outcome
/// (`Open`, or `Error` followed by `Close`) on `events`. Every connection ends with
/// exactly one `Close` event.
pub trait Transport: Send + Sync + 'static {
    fn open(&self, address: &str, events: TransportEvents) -> Box<dyn TransportHandle>;
}

/// Write side of a single connection
pub trait TransportHandle: Send + Sync {
    /// Queues one text frame; fails synchronously when the connection cannot write
    fn send(&self, text: String) -> Result<()>;

    /// Starts the close handshake. A `Close` event follows on the event channel.
    fn close(&self, code: u16, reason: &str);
}
