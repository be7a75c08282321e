// ABOUTME: WebSocket connector for the instance terminal endpoint
// Runs one connection per spawned task and reports its lifecycle as transport events

use crate::terminal::{
    error::BridgeError,
    transport::{Connector, Epoch, TransportEvent, TransportEventKind, TransportEventSender, TransportLink},
};
use futures_util::{SinkExt, StreamExt};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite};
use tracing::{debug, error, info, warn};
use url::Url;

#[derive(Debug)]
enum Outbound {
    Text(String),
    Close,
}

/// Opens terminal transports with `tokio-tungstenite`. Must be used from
/// inside a tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Connector for WebSocketConnector {
    fn open(
        &self,
        url: &Url,
        epoch: Epoch,
        events: TransportEventSender,
    ) -> Result<Box<dyn TransportLink>, BridgeError> {
        let runtime = Handle::try_current()
            .map_err(|e| BridgeError::TransportConstruction(e.to_string()))?;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let task = runtime.spawn(connection_handler(url.to_string(), epoch, events, outbound_rx));

        Ok(Box::new(WebSocketLink {
            outbound: Some(outbound_tx),
            task,
        }))
    }
}

struct WebSocketLink {
    outbound: Option<mpsc::UnboundedSender<Outbound>>,
    task: JoinHandle<()>,
}

impl TransportLink for WebSocketLink {
    fn send(&mut self, text: String) -> Result<(), BridgeError> {
        let outbound = self.outbound.as_ref().ok_or(BridgeError::NotConnected)?;
        outbound
            .send(Outbound::Text(text))
            .map_err(|_| BridgeError::NotConnected)
    }

    fn close(&mut self) {
        let Some(outbound) = self.outbound.take() else {
            return;
        };
        // The task is gone already when the queue is closed
        if outbound.send(Outbound::Close).is_err() {
            self.task.abort();
        }
    }
}

impl Drop for WebSocketLink {
    fn drop(&mut self) {
        self.close();
    }
}

/// Handle a single WebSocket connection from handshake to close
async fn connection_handler(
    url: String,
    epoch: Epoch,
    events: TransportEventSender,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
) {
    let emit = |kind: TransportEventKind| {
        if events.send(TransportEvent::new(epoch, kind)).is_err() {
            debug!("Bridge dropped; discarding transport event");
        }
    };

    info!("Connection handler starting for URL: {}", url);

    let handshake = tokio::select! {
        result = connect_async(url.as_str()) => result,
        _ = outbound.recv() => {
            debug!("Close requested during handshake with {}", url);
            return;
        }
    };

    let ws_stream = match handshake {
        Ok((ws_stream, response)) => {
            info!("WebSocket connected successfully to {}", url);
            debug!("WebSocket response status: {:?}", response.status());
            ws_stream
        }
        Err(e) => {
            error!("WebSocket handshake failed: {}", e);
            let message = e.to_string();
            if message.contains("refused") {
                error!("Connection refused - is the terminal service running for this instance?");
            } else if message.contains("lookup") {
                error!("DNS/hostname lookup failed - check the dashboard origin: {}", url);
            }
            emit(TransportEventKind::Error(message));
            return;
        }
    };

    emit(TransportEventKind::Open);
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    loop {
        tokio::select! {
            outgoing = outbound.recv() => match outgoing {
                Some(Outbound::Text(text)) => {
                    if let Err(e) = ws_sender.send(tungstenite::Message::Text(text)).await {
                        error!("Failed to send WebSocket message: {}", e);
                        emit(TransportEventKind::Error(e.to_string()));
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    debug!("Closing WebSocket to {}", url);
                    if let Err(e) = ws_sender.send(tungstenite::Message::Close(None)).await {
                        debug!("Close frame not delivered: {}", e);
                    }
                    break;
                }
            },

            incoming = ws_receiver.next() => match incoming {
                Some(Ok(tungstenite::Message::Text(text))) => {
                    emit(TransportEventKind::Message(text));
                }
                Some(Ok(tungstenite::Message::Binary(bytes))) => {
                    emit(TransportEventKind::Message(String::from_utf8_lossy(&bytes).into_owned()));
                }
                Some(Ok(tungstenite::Message::Close(frame))) => {
                    info!("WebSocket closed by server: {:?}", frame);
                    emit(TransportEventKind::Close);
                    break;
                }
                Some(Ok(_)) => {
                    // Ping/Pong are answered by tungstenite
                }
                Some(Err(e)) => {
                    warn!("WebSocket error: {}", e);
                    emit(TransportEventKind::Error(e.to_string()));
                    break;
                }
                None => {
                    info!("WebSocket stream ended");
                    emit(TransportEventKind::Close);
                    break;
                }
            },
        }
    }
}
