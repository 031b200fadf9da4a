// Messaging module - Outbound buffering and subscriber dispatch
pub mod queue;
pub mod registry;

pub use queue::OutboundQueue;
pub use registry::{Registry, Subscription};
