use super::transport::{Transport, TransportEvent, TransportEvents, TransportHandle};
use crate::types::{RealtimeError, Result, WS_CLOSE_ABNORMAL, WS_CLOSE_NO_STATUS};
use futures::{SinkExt, StreamExt};
use std::sync::Once;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

enum Outbound {
    Text(String),
    Close { code: u16, reason: String },
}

/// WebSocket transport backed by tokio-tungstenite, with rustls (ring) for `wss://`
#[derive(Debug, Clone, Copy)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    pub fn new() -> Self {
        install_crypto_provider();
        Self
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// rustls refuses to pick a provider on its own once more than one is compiled in
fn install_crypto_provider() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        if rustls::crypto::ring::default_provider()
            .install_default()
            .is_err()
        {
            tracing::debug!("A rustls crypto provider is already installed");
        }
    });
}

impl Transport for WebSocketTransport {
    fn open(&self, address: &str, events: TransportEvents) -> Box<dyn TransportHandle> {
        install_crypto_provider();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_socket(address.to_string(), events, outbound_rx));
        Box::new(WebSocketHandle {
            outbound: outbound_tx,
        })
    }
}

struct WebSocketHandle {
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl TransportHandle for WebSocketHandle {
    fn send(&self, text: String) -> Result<()> {
        self.outbound
            .send(Outbound::Text(text))
            .map_err(|_| RealtimeError::NotConnected)
    }

    fn close(&self, code: u16, reason: &str) {
        let close = Outbound::Close {
            code,
            reason: reason.to_string(),
        };
        if self.outbound.send(close).is_err() {
            tracing::debug!("Socket task already finished, nothing to close");
        }
    }
}

fn emit(events: &TransportEvents, event: TransportEvent) {
    if events.send(event).is_err() {
        tracing::debug!("Transport event receiver dropped");
    }
}

async fn run_socket(
    address: String,
    events: TransportEvents,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
) {
    tracing::debug!("Opening WebSocket connection to: {}", address);

    let ws_stream = match connect_async(address.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            emit(&events, TransportEvent::Error(e.to_string()));
            emit(
                &events,
                TransportEvent::Close {
                    code: WS_CLOSE_ABNORMAL,
                    reason: "connection failed".to_string(),
                },
            );
            return;
        }
    };
    emit(&events, TransportEvent::Open);

    let (mut write_half, mut read_half) = ws_stream.split();

    loop {
        tokio::select! {
            command = outbound.recv() => match command {
                Some(Outbound::Text(text)) => {
                    if let Err(e) = write_half.send(WsMessage::Text(text.into())).await {
                        tracing::error!("WebSocket write error: {}", e);
                        emit(&events, TransportEvent::Error(e.to_string()));
                        emit(&events, TransportEvent::Close {
                            code: WS_CLOSE_ABNORMAL,
                            reason: "write failed".to_string(),
                        });
                        break;
                    }
                }
                Some(Outbound::Close { code, reason }) => {
                    let frame = CloseFrame {
                        code: CloseCode::from(code),
                        reason: reason.clone().into(),
                    };
                    if let Err(e) = write_half.send(WsMessage::Close(Some(frame))).await {
                        tracing::debug!("Close frame not delivered: {}", e);
                    }
                    emit(&events, TransportEvent::Close { code, reason });
                    break;
                }
                None => {
                    // Handle dropped without an explicit close
                    if let Err(e) = write_half.close().await {
                        tracing::debug!("Socket not closed cleanly: {}", e);
                    }
                    break;
                }
            },
            inbound = read_half.next() => match inbound {
                Some(Ok(WsMessage::Text(text))) => {
                    emit(&events, TransportEvent::Message(text.as_str().to_owned()));
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    let (code, reason) = match frame {
                        Some(frame) => (u16::from(frame.code), frame.reason.as_str().to_owned()),
                        None => (WS_CLOSE_NO_STATUS, String::new()),
                    };
                    tracing::debug!("Server closed connection: code={}, reason='{}'", code, reason);
                    emit(&events, TransportEvent::Close { code, reason });
                    break;
                }
                Some(Ok(WsMessage::Ping(data))) => {
                    tracing::trace!("Received ping ({} bytes)", data.len());
                }
                Some(Ok(WsMessage::Pong(data))) => {
                    tracing::trace!("Received pong ({} bytes)", data.len());
                }
                Some(Ok(WsMessage::Binary(data))) => {
                    tracing::warn!("Received unexpected binary message ({} bytes)", data.len());
                }
                Some(Ok(WsMessage::Frame(_))) => {
                    tracing::trace!("Received raw frame (internal)");
                }
                Some(Err(e)) => {
                    tracing::error!("WebSocket read error: {}", e);
                    emit(&events, TransportEvent::Error(e.to_string()));
                    emit(&events, TransportEvent::Close {
                        code: WS_CLOSE_ABNORMAL,
                        reason: "read failed".to_string(),
                    });
                    break;
                }
                None => {
                    emit(&events, TransportEvent::Close {
                        code: WS_CLOSE_ABNORMAL,
                        reason: "stream ended".to_string(),
                    });
                    break;
                }
            }
        }
    }
    tracing::debug!("Socket task for {} finished", address);
}
