// Module declarations
mod config;
mod connection;
mod lifecycle;
mod manager;
mod state;

// Public API exports
pub use config::ConnectionConfig;
pub use manager::ConnectionManager;

pub(crate) use connection::Shared;
