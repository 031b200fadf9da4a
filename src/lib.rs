//! # Careflow Realtime
//!
//! Connection-lifecycle manager for the Careflow real-time channel: one persistent,
//! bidirectional WebSocket connection per process, with automatic reconnection
//! (capped exponential backoff), a liveness heartbeat, a bounded outbound queue that
//! survives disconnects, topic-based subscriptions, and awareness of the host app's
//! foreground/background transitions.
//!
//! ## Example
//!
//! ```no_run
//! use careflow_realtime::{ConnectionConfig, ConnectionManager};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = ConnectionManager::websocket();
//!
//!     manager.on_status_change(|status| println!("status: {status}"));
//!
//!     manager
//!         .connect(
//!             ConnectionConfig::new("wss://realtime.example.org/socket")
//!                 .with_reconnect_delay(Duration::from_secs(1)),
//!         )
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod infrastructure;
pub mod messaging;
pub mod types;
pub mod websocket;

pub use client::{ConnectionConfig, ConnectionManager};
pub use messaging::Subscription;
pub use types::{AppState, ConnectionStatus, Message, RealtimeError, Result};
pub use websocket::{Transport, TransportEvent, TransportEvents, TransportHandle, WebSocketTransport};
