#![allow(dead_code)]

use careflow_realtime::{
    ConnectionConfig, ConnectionStatus, Message, RealtimeError, Result, Transport, TransportEvent,
    TransportEvents, TransportHandle,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// What the scripted transport does when `open` is called
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    Accept,
    Refuse,
    /// Never reports anything, the handshake just hangs
    Hang,
    /// Drops the event sender without reporting open or close, like a socket task
    /// that died
    Vanish,
}

struct Connection {
    events: Option<TransportEvents>,
    closed_with: Arc<Mutex<Option<(u16, String)>>>,
}

#[derive(Default)]
struct Inner {
    script: VecDeque<OpenOutcome>,
    opened_at: Vec<Instant>,
    connections: Vec<Connection>,
    sent: Vec<String>,
    close_calls: Vec<(u16, String)>,
}

/// In-memory transport whose connections are driven by the test
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    inner: Arc<Mutex<Inner>>,
    fail_sends: Arc<AtomicBool>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outcomes for the next `open` calls; once exhausted every open is accepted
    pub fn script(&self, outcomes: &[OpenOutcome]) {
        self.inner.lock().unwrap().script.extend(outcomes.iter().copied());
    }

    pub fn open_count(&self) -> usize {
        self.inner.lock().unwrap().opened_at.len()
    }

    /// Gaps between consecutive opens, in milliseconds
    pub fn open_gaps_ms(&self) -> Vec<u64> {
        let inner = self.inner.lock().unwrap();
        inner
            .opened_at
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).as_millis() as u64)
            .collect()
    }

    pub fn sent(&self) -> Vec<Message> {
        self.inner
            .lock()
            .unwrap()
            .sent
            .iter()
            .map(|text| Message::decode(text).unwrap())
            .collect()
    }

    pub fn sent_topics(&self) -> Vec<String> {
        self.sent().into_iter().map(|m| m.topic).collect()
    }

    pub fn close_calls(&self) -> Vec<(u16, String)> {
        self.inner.lock().unwrap().close_calls.clone()
    }

    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Reports `event` on the most recently opened connection
    pub fn emit(&self, event: TransportEvent) {
        let inner = self.inner.lock().unwrap();
        let connection = inner.connections.last().expect("no connection opened yet");
        let events = connection.events.as_ref().expect("connection has no event channel");
        events.send(event).unwrap();
    }

    /// Reports `event` on the `index`-th connection ever opened
    pub fn emit_on(&self, index: usize, event: TransportEvent) {
        let inner = self.inner.lock().unwrap();
        if let Some(events) = &inner.connections[index].events {
            let _ = events.send(event);
        }
    }

    pub fn emit_text(&self, topic: &str, payload: serde_json::Value) {
        let text = Message::new(topic, payload).encode().unwrap();
        self.emit(TransportEvent::Message(text));
    }

    pub fn drop_connection(&self) {
        self.emit(TransportEvent::Error("connection reset".to_string()));
        self.emit(TransportEvent::Close {
            code: 1006,
            reason: "connection reset".to_string(),
        });
    }
}

impl Transport for ScriptedTransport {
    fn open(&self, _address: &str, events: TransportEvents) -> Box<dyn TransportHandle> {
        let mut inner = self.inner.lock().unwrap();
        inner.opened_at.push(Instant::now());
        let outcome = inner.script.pop_front().unwrap_or(OpenOutcome::Accept);

        match outcome {
            OpenOutcome::Accept => {
                let _ = events.send(TransportEvent::Open);
            }
            OpenOutcome::Refuse => {
                let _ = events.send(TransportEvent::Error("connection refused".to_string()));
                let _ = events.send(TransportEvent::Close {
                    code: 1006,
                    reason: "connection refused".to_string(),
                });
            }
            OpenOutcome::Hang | OpenOutcome::Vanish => {}
        }
        let events = (outcome != OpenOutcome::Vanish).then_some(events);

        let closed_with = Arc::new(Mutex::new(None));
        inner.connections.push(Connection {
            events: events.clone(),
            closed_with: Arc::clone(&closed_with),
        });

        Box::new(ScriptedHandle {
            transport: self.clone(),
            events,
            closed_with,
        })
    }
}

struct ScriptedHandle {
    transport: ScriptedTransport,
    events: Option<TransportEvents>,
    closed_with: Arc<Mutex<Option<(u16, String)>>>,
}

impl TransportHandle for ScriptedHandle {
    fn send(&self, text: String) -> Result<()> {
        if self.closed_with.lock().unwrap().is_some() {
            return Err(RealtimeError::NotConnected);
        }
        if self.transport.fail_sends.load(Ordering::SeqCst) {
            return Err(RealtimeError::Transport("write failed".to_string()));
        }
        self.transport.inner.lock().unwrap().sent.push(text);
        Ok(())
    }

    fn close(&self, code: u16, reason: &str) {
        *self.closed_with.lock().unwrap() = Some((code, reason.to_string()));
        self.transport
            .inner
            .lock()
            .unwrap()
            .close_calls
            .push((code, reason.to_string()));
        if let Some(events) = &self.events {
            let _ = events.send(TransportEvent::Close {
                code,
                reason: reason.to_string(),
            });
        }
    }
}

/// Lets spawned tasks drain their queues without advancing the paused clock
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

/// Advances the paused clock by `duration`, running every timer that falls due
pub async fn advance(duration: Duration) {
    tokio::time::sleep(duration).await;
    settle().await;
}

pub fn config() -> ConnectionConfig {
    ConnectionConfig::new("wss://realtime.example.org/socket")
}

pub fn record_statuses(
    manager: &careflow_realtime::ConnectionManager,
) -> Arc<Mutex<Vec<ConnectionStatus>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    manager.on_status_change(move |status| sink.lock().unwrap().push(status));
    log
}
