use super::config::ConnectionConfig;
use super::connection::Shared;
use crate::messaging::Subscription;
use crate::types::{AppState, ConnectionStatus, Message, Result};
use crate::websocket::{Transport, WebSocketTransport};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;

/// Keeps one real-time connection alive for the whole process.
///
/// `ConnectionManager` owns the socket, reconnects with exponential backoff after
/// failures, sends a periodic heartbeat, buffers outbound messages while offline,
/// and routes inbound messages to per-topic subscribers. It is meant to be created
/// once by the application's composition root and shared by cloning (clones share
/// the same connection).
///
/// # Example
///
/// ```no_run
/// use careflow_realtime::{ConnectionConfig, ConnectionManager};
/// use serde_json::json;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let manager = ConnectionManager::websocket();
///
/// let _sub = manager.subscribe("task-assigned", |message| {
///     println!("new task: {}", message.payload);
/// });
///
/// manager.connect(ConnectionConfig::new("wss://realtime.example.org/socket")).await?;
/// manager.send("vitals-update", json!({ "hr": 72 })).await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ConnectionManager {
    pub(crate) shared: Arc<Shared>,
}

impl ConnectionManager {
    /// Creates a manager over a custom transport. No connection is made until
    /// [`connect()`](Self::connect).
    pub fn new(transport: impl Transport) -> Self {
        Self::with_transport(Arc::new(transport))
    }

    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            shared: Arc::new(Shared::new(transport)),
        }
    }

    /// Creates a manager backed by [`WebSocketTransport`]
    pub fn websocket() -> Self {
        Self::new(WebSocketTransport::new())
    }

    /// Starts connecting with `config`, which is also kept for every later automatic
    /// reconnect.
    ///
    /// Returns as soon as the attempt is under way; watch [`status()`](Self::status)
    /// or [`on_status_change()`](Self::on_status_change) for the outcome. Calling
    /// this while already connected or connecting only updates the stored config.
    /// Calling it after the reconnect budget ran out starts a fresh episode.
    ///
    /// # Errors
    ///
    /// Returns [`RealtimeError::InvalidConfig`](crate::RealtimeError::InvalidConfig)
    /// or [`RealtimeError::UrlParse`](crate::RealtimeError::UrlParse) if the config
    /// is rejected; nothing is changed in that case.
    pub async fn connect(&self, config: ConnectionConfig) -> Result<()> {
        config.validate()?;

        let mut state = self.shared.state.write().await;
        state.config = Some(config);
        state.manual_disconnect = false;

        if state.handle.is_some()
            && matches!(
                state.status,
                ConnectionStatus::Connected | ConnectionStatus::Connecting
            )
        {
            tracing::debug!("connect() while {}, nothing to do", state.status);
            return Ok(());
        }

        state.reconnect_attempts = 0;
        state.reconnect_timer.cancel();
        self.shared.open_connection(&mut state);
        Ok(())
    }

    /// Closes the connection with a normal close code. No reconnect is scheduled.
    pub async fn disconnect(&self) {
        let mut state = self.shared.state.write().await;
        self.shared.close_manually(&mut state, "manual disconnect");
    }

    /// Sends `payload` on `topic`.
    ///
    /// Returns `true` if the frame was written immediately. `false` means the message
    /// was queued and will be flushed, in order, on the next successful connection.
    /// The queue holds the 100 most recent messages; older ones are dropped.
    pub async fn send(&self, topic: impl Into<String>, payload: Value) -> bool {
        let message = Message::outbound(topic, payload);
        let mut state = self.shared.state.write().await;
        self.shared.send_message(&mut state, message)
    }

    /// Registers `callback` for inbound messages on `topic`.
    ///
    /// Callbacks for one topic run in registration order on the connection's event
    /// task. A panicking callback is logged and skipped.
    pub fn subscribe<F>(&self, topic: impl Into<String>, callback: F) -> Subscription
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.shared.subscribers.subscribe(topic.into(), callback)
    }

    /// Registers `callback` for status changes. It fires only when the status
    /// actually changes, while the manager's state is locked, so it must not block.
    pub fn on_status_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(ConnectionStatus) + Send + Sync + 'static,
    {
        self.shared
            .status_observers
            .subscribe((), move |status: &ConnectionStatus| callback(*status))
    }

    /// Async alternative to [`on_status_change()`](Self::on_status_change)
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.shared.status_tx.subscribe()
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.shared.status_tx.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    /// Number of messages waiting for a connection
    pub async fn queue_len(&self) -> usize {
        self.shared.state.read().await.queue.len()
    }

    /// Reconnect attempts made in the current failure episode
    pub async fn reconnect_attempts(&self) -> u32 {
        self.shared.state.read().await.reconnect_attempts
    }

    /// Feeds one host foreground/background transition to the manager
    pub async fn handle_app_state(&self, app_state: AppState) {
        let mut state = self.shared.state.write().await;
        self.shared.on_app_state(&mut state, app_state);
    }

    /// Follows the host's lifecycle stream until [`cleanup()`](Self::cleanup).
    ///
    /// Only one stream is followed at a time: attaching again detaches the previous one.
    pub async fn attach_lifecycle(&self, mut app_states: watch::Receiver<AppState>) {
        let shared = Arc::downgrade(&self.shared);
        let mut state = self.shared.state.write().await;
        state.lifecycle_listener.arm_task(async move {
            while app_states.changed().await.is_ok() {
                let next = *app_states.borrow_and_update();
                let Some(shared) = shared.upgrade() else {
                    break;
                };
                let mut state = shared.state.write().await;
                shared.on_app_state(&mut state, next);
            }
            tracing::debug!("Lifecycle listener finished");
        });
    }

    /// Tears down the socket, all timers, the queue, every subscriber and observer,
    /// and detaches the lifecycle listener. Meant to run once at shutdown.
    pub async fn cleanup(&self) {
        {
            let mut state = self.shared.state.write().await;
            self.shared.close_manually(&mut state, "cleanup");
            state.background_timer.cancel();
            state.lifecycle_listener.cancel();
            state.task_manager.abort_all();
            state.queue.clear();
            state.config = None;
            state.reconnect_attempts = 0;
        }
        self.shared.subscribers.clear();
        self.shared.status_observers.clear();
        tracing::info!("Connection manager cleaned up");
    }
}
