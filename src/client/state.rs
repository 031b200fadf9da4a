use super::config::ConnectionConfig;
use crate::infrastructure::{TaskManager, TimerSlot};
use crate::messaging::OutboundQueue;
use crate::types::{AppState, ConnectionStatus, MAX_OUTBOUND_QUEUE_SIZE};
use crate::websocket::TransportHandle;

/// Consolidated mutable state for the connection manager.
///
/// Every event (transport, timer, lifecycle, caller intent) is handled while holding
/// the single write lock around this struct, with no await in between, which keeps
/// the handlers serialized the same way a single-threaded event loop would.
pub(crate) struct ManagerState {
    pub status: ConnectionStatus,

    /// Last config passed to `connect()`, reused by automatic reconnects
    pub config: Option<ConnectionConfig>,

    /// Write side of the current socket, if one is open or opening
    pub handle: Option<Box<dyn TransportHandle>>,

    /// Bumped for every new socket; events tagged with an older value are stale
    pub generation: u64,

    pub reconnect_attempts: u32,

    /// Set by `disconnect()` and the background grace timer, cleared by `connect()`
    pub manual_disconnect: bool,

    pub app_state: AppState,

    pub queue: OutboundQueue,

    pub reconnect_timer: TimerSlot,
    pub heartbeat_timer: TimerSlot,
    pub background_timer: TimerSlot,

    /// The one host-lifecycle listener; attaching another replaces it
    pub lifecycle_listener: TimerSlot,

    /// Transport event pumps
    pub task_manager: TaskManager,
}

impl ManagerState {
    pub fn new() -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            config: None,
            handle: None,
            generation: 0,
            reconnect_attempts: 0,
            manual_disconnect: false,
            app_state: AppState::Active,
            queue: OutboundQueue::new(MAX_OUTBOUND_QUEUE_SIZE),
            reconnect_timer: TimerSlot::new("reconnect"),
            heartbeat_timer: TimerSlot::new("heartbeat"),
            background_timer: TimerSlot::new("background grace"),
            lifecycle_listener: TimerSlot::new("lifecycle listener"),
            task_manager: TaskManager::new(),
        }
    }

    pub fn address(&self) -> Option<&str> {
        self.config.as_ref().map(|config| config.address.as_str())
    }
}

impl Default for ManagerState {
    fn default() -> Self {
        Self::new()
    }
}
