use crate::client::Shared;
use crate::types::{ConnectionStatus, Message, topics};
use chrono::Utc;
use std::sync::Weak;
use std::time::Duration;
use tokio::time::{self, Instant};

const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(30000);

/// Periodic `ping` sender, alive only while the connection is `Connected`.
///
/// This is a keep-alive for the peer and any idle-timeout proxy in between. No
/// reply is expected; dead sockets are detected by the transport's own close events.
pub struct HeartbeatManager {
    interval: Duration,
    connection: Weak<Shared>,
}

impl HeartbeatManager {
    pub(crate) fn new(connection: Weak<Shared>) -> Self {
        Self {
            interval: DEFAULT_HEARTBEAT_INTERVAL,
            connection,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Heartbeat loop; the first ping goes out one full interval after open
    pub async fn run(self) {
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            // Manager dropped, exit heartbeat task
            let Some(connection) = self.connection.upgrade() else {
                break;
            };

            let ping = Message::outbound(
                topics::PING,
                serde_json::json!({ "timestamp": Utc::now().to_rfc3339() }),
            );

            let mut state = connection.state.write().await;
            if state.status != ConnectionStatus::Connected {
                continue;
            }
            if connection.send_message(&mut state, ping) {
                tracing::debug!("Sent heartbeat");
            } else {
                tracing::warn!("Heartbeat could not be written, queued instead");
            }
        }
    }
}
