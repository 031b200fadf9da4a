use super::state::ManagerState;
use crate::infrastructure::{HeartbeatManager, reconnect_delay};
use crate::messaging::Registry;
use crate::types::{AppState, ConnectionStatus, Message, WS_CLOSE_ABNORMAL, WS_CLOSE_NORMAL};
use crate::websocket::{Transport, TransportEvent};
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc, watch};

/// State shared between the public handle and its background tasks.
///
/// Background tasks (timers, heartbeat, event pumps) only hold a `Weak` to this, so
/// dropping the last `ConnectionManager` tears everything down.
pub(crate) struct Shared {
    pub transport: Arc<dyn Transport>,
    pub state: RwLock<ManagerState>,
    pub subscribers: Registry<String, Message>,
    pub status_observers: Registry<(), ConnectionStatus>,
    pub status_tx: watch::Sender<ConnectionStatus>,
}

impl Shared {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus::Disconnected);
        Self {
            transport,
            state: RwLock::new(ManagerState::new()),
            subscribers: Registry::new(),
            status_observers: Registry::new(),
            status_tx,
        }
    }

    /// Set status and notify observers, only when the value changes
    pub fn set_status(&self, state: &mut ManagerState, next: ConnectionStatus) {
        if state.status == next {
            return;
        }
        tracing::debug!("Connection status: {} -> {}", state.status, next);
        state.status = next;
        self.status_tx.send_replace(next);
        self.status_observers.dispatch(&(), &next);
    }

    /// Opens a new socket to the configured address, superseding any existing one
    pub fn open_connection(self: &Arc<Self>, state: &mut ManagerState) {
        let Some(address) = state.address().map(str::to_owned) else {
            tracing::warn!("No address configured, cannot open connection");
            return;
        };

        if let Some(previous) = state.handle.take() {
            previous.close(WS_CLOSE_NORMAL, "superseded");
        }
        state.heartbeat_timer.cancel();
        state.generation += 1;
        let generation = state.generation;

        self.set_status(state, ConnectionStatus::Connecting);
        tracing::info!("Connecting to {}", address);

        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        state.handle = Some(self.transport.open(&address, events_tx));

        let shared = Arc::downgrade(self);
        state.task_manager.spawn(async move {
            while let Some(event) = events_rx.recv().await {
                let Some(shared) = shared.upgrade() else {
                    break;
                };
                shared.handle_transport_event(generation, event).await;
            }
            if let Some(shared) = shared.upgrade() {
                shared.on_events_closed(generation).await;
            }
            tracing::debug!("Event pump for connection #{} finished", generation);
        });
    }

    async fn handle_transport_event(self: &Arc<Self>, generation: u64, event: TransportEvent) {
        if let TransportEvent::Message(text) = &event {
            if self.state.read().await.generation == generation {
                self.dispatch_frame(text);
            }
            return;
        }

        let mut state = self.state.write().await;
        if state.generation != generation {
            tracing::debug!("Ignoring {:?} from superseded connection #{}", event, generation);
            return;
        }

        match event {
            TransportEvent::Open => self.on_open(&mut state),
            TransportEvent::Error(info) => self.on_error(&mut state, &info),
            TransportEvent::Close { code, reason } => self.on_close(&mut state, code, &reason),
            TransportEvent::Message(_) => {}
        }
    }

    /// The transport dropped its event sender. A socket that is still current and
    /// never reported a close is treated as an abnormal close.
    async fn on_events_closed(self: &Arc<Self>, generation: u64) {
        let mut state = self.state.write().await;
        if state.generation != generation || state.handle.is_none() {
            return;
        }
        tracing::warn!("Transport for connection #{} ended without a close event", generation);
        self.on_close(&mut state, WS_CLOSE_ABNORMAL, "transport ended");
    }

    fn on_open(self: &Arc<Self>, state: &mut ManagerState) {
        tracing::info!("Connected to {}", state.address().unwrap_or_default());

        state.reconnect_attempts = 0;
        state.reconnect_timer.cancel();
        self.set_status(state, ConnectionStatus::Connected);
        self.flush_queue(state);

        let interval = state
            .config
            .as_ref()
            .map(|config| config.heartbeat_interval)
            .unwrap_or_default();
        if !interval.is_zero() {
            let heartbeat = HeartbeatManager::new(Arc::downgrade(self)).with_interval(interval);
            state.heartbeat_timer.arm_task(heartbeat.run());
        }
    }

    fn on_error(&self, state: &mut ManagerState, info: &str) {
        // Recovery is driven by the Close event that follows
        tracing::error!("Transport error: {}", info);
        state.heartbeat_timer.cancel();
        self.set_status(state, ConnectionStatus::Error);
    }

    fn on_close(self: &Arc<Self>, state: &mut ManagerState, code: u16, reason: &str) {
        state.handle = None;
        state.heartbeat_timer.cancel();

        if code == WS_CLOSE_NORMAL || state.manual_disconnect {
            tracing::info!("Connection closed normally");
            self.set_status(state, ConnectionStatus::Disconnected);
            return;
        }

        tracing::warn!("Connection closed abnormally: code={}, reason='{}'", code, reason);
        self.set_status(state, ConnectionStatus::Disconnected);

        if state.app_state == AppState::Background {
            tracing::info!("App is in the background, reconnect deferred until foreground");
            return;
        }

        self.schedule_reconnect(state);
    }

    /// Arms the reconnect timer with exponential backoff, or settles in `Error` once
    /// the attempt budget is spent
    pub fn schedule_reconnect(self: &Arc<Self>, state: &mut ManagerState) {
        let Some((base_delay, max_attempts)) = state
            .config
            .as_ref()
            .map(|config| (config.reconnect_delay, config.max_reconnect_attempts))
        else {
            self.set_status(state, ConnectionStatus::Disconnected);
            return;
        };

        if state.reconnect_attempts >= max_attempts {
            tracing::error!(
                "Giving up after {} reconnect attempts; call connect() to retry",
                state.reconnect_attempts
            );
            state.reconnect_timer.cancel();
            self.set_status(state, ConnectionStatus::Error);
            return;
        }

        let delay = reconnect_delay(state.reconnect_attempts, base_delay);
        state.reconnect_attempts += 1;
        self.set_status(state, ConnectionStatus::Reconnecting);
        tracing::info!(
            "Reconnecting in {:?} (attempt {}/{})",
            delay,
            state.reconnect_attempts,
            max_attempts
        );

        let shared = Arc::downgrade(self);
        state.reconnect_timer.arm_once(delay, async move {
            let Some(shared) = shared.upgrade() else {
                return;
            };
            let mut state = shared.state.write().await;
            state.reconnect_timer.release();
            if state.manual_disconnect {
                return;
            }
            shared.open_connection(&mut state);
        });
    }

    /// Sends now if connected, otherwise queues. Returns whether the frame was written.
    pub fn send_message(&self, state: &mut ManagerState, message: Message) -> bool {
        if state.status == ConnectionStatus::Connected
            && let Some(handle) = state.handle.as_ref()
        {
            let text = match message.encode() {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("Failed to encode message on topic {}: {}", message.topic, e);
                    return false;
                }
            };
            match handle.send(text) {
                Ok(()) => {
                    tracing::debug!("Sent message on topic {}", message.topic);
                    return true;
                }
                Err(e) => {
                    tracing::warn!("Send on topic {} failed, queueing: {}", message.topic, e);
                }
            }
        }

        self.enqueue(state, message);
        false
    }

    fn enqueue(&self, state: &mut ManagerState, message: Message) {
        if let Some(evicted) = state.queue.push(message) {
            tracing::warn!(
                "Outbound queue full ({}), dropped oldest message on topic {}",
                state.queue.capacity(),
                evicted.topic
            );
        }
    }

    /// Drains the outbound queue in FIFO order; stops at the first failed write
    fn flush_queue(&self, state: &mut ManagerState) {
        let Some(handle) = state.handle.as_ref() else {
            return;
        };
        if state.queue.is_empty() {
            return;
        }

        let pending = state.queue.len();
        let mut sent = 0;
        while let Some(message) = state.queue.pop_front() {
            let text = match message.encode() {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("Dropping queued message on topic {}: {}", message.topic, e);
                    continue;
                }
            };
            if let Err(e) = handle.send(text) {
                tracing::warn!("Flush interrupted after {}/{} messages: {}", sent, pending, e);
                state.queue.requeue_front(message);
                break;
            }
            sent += 1;
        }
        tracing::debug!("Flushed {} queued messages", sent);
    }

    fn dispatch_frame(&self, text: &str) {
        match Message::decode(text) {
            Ok(message) => {
                tracing::debug!("Received message on topic {}", message.topic);
                if self.subscribers.dispatch(&message.topic, &message) == 0 {
                    tracing::trace!("No subscribers for topic {}", message.topic);
                }
            }
            Err(e) => {
                tracing::error!("Failed to parse message: {} - Raw: {}", e, text);
            }
        }
    }

    /// Deliberate close: no reconnect until `connect()` or a foreground transition
    pub fn close_manually(&self, state: &mut ManagerState, reason: &str) {
        state.manual_disconnect = true;
        state.reconnect_timer.cancel();
        state.heartbeat_timer.cancel();
        // Late events from the socket being closed must not be acted on
        state.generation += 1;

        if let Some(handle) = state.handle.take() {
            tracing::info!("Closing connection ({})", reason);
            handle.close(WS_CLOSE_NORMAL, reason);
        }
        self.set_status(state, ConnectionStatus::Disconnected);
    }
}
