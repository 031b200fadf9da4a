// WebSocket module - Transport seam and the tokio-tungstenite implementation
pub mod factory;
pub mod transport;

pub use factory::WebSocketTransport;
pub use transport::{Transport, TransportEvent, TransportEvents, TransportHandle};
