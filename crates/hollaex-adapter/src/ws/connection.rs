/*
[INPUT]:  Stream URL (optionally carrying auth query) and outbound text frames
[OUTPUT]: Generation-tagged connection events (opened, inbound, failed, closed)
[POS]:    WebSocket layer - single socket task, owned by the session worker
[UPDATE]: When changing socket I/O or close handling
*/

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::debug;

use super::message::{Inbound, parse_inbound};

#[derive(Debug)]
pub(crate) enum ConnectionEvent {
    Opened,
    Inbound(Inbound),
    Failed(String),
    Closed,
}

/// One socket attempt. Dropping it aborts the socket task.
#[derive(Debug)]
pub(crate) struct Connection {
    generation: u64,
    outbound_tx: Option<mpsc::UnboundedSender<WsMessage>>,
    events: mpsc::UnboundedReceiver<ConnectionEvent>,
    task: Option<JoinHandle<()>>,
}

impl Connection {
    /// Spawn the socket task for `url`. Must be called inside a Tokio runtime.
    pub(crate) fn open(generation: u64, url: String) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (event_tx, events) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_socket(generation, url, outbound_rx, event_tx));

        Self {
            generation,
            outbound_tx: Some(outbound_tx),
            events,
            task: Some(task),
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Queue a text frame; false once the socket task has stopped reading.
    pub(crate) fn send_text(&self, text: String) -> bool {
        match &self.outbound_tx {
            Some(tx) => tx.send(WsMessage::Text(text.into())).is_ok(),
            None => false,
        }
    }

    /// Ask the task to send a close frame and finish; `Closed` follows.
    pub(crate) fn close(&mut self) {
        self.outbound_tx = None;
    }

    /// Close without waiting for the task, leaving it to finish on its own.
    pub(crate) fn close_detached(mut self) {
        self.outbound_tx = None;
        self.task = None;
    }

    /// Next event; a finished task reads as `Closed`.
    pub(crate) async fn next_event(&mut self) -> ConnectionEvent {
        self.events.recv().await.unwrap_or(ConnectionEvent::Closed)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run_socket(
    generation: u64,
    url: String,
    mut outbound_rx: mpsc::UnboundedReceiver<WsMessage>,
    event_tx: mpsc::UnboundedSender<ConnectionEvent>,
) {
    let ws_stream = match connect_async(url.as_str()).await {
        Ok((ws_stream, _response)) => ws_stream,
        Err(err) => {
            let _ = event_tx.send(ConnectionEvent::Failed(format!("handshake failed: {err}")));
            let _ = event_tx.send(ConnectionEvent::Closed);
            return;
        }
    };
    let _ = event_tx.send(ConnectionEvent::Opened);

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            outbound = outbound_rx.recv() => {
                match outbound {
                    Some(message) => {
                        if let Err(err) = write.send(message).await {
                            let _ = event_tx.send(ConnectionEvent::Failed(format!("send failed: {err}")));
                            break;
                        }
                    }
                    None => {
                        let _ = write.send(WsMessage::Close(None)).await;
                        break;
                    }
                }
            }
            incoming = read.next() => {
                match incoming {
                    Some(Ok(WsMessage::Text(text))) => {
                        let _ = event_tx.send(ConnectionEvent::Inbound(parse_inbound(text.as_str())));
                    }
                    Some(Ok(WsMessage::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                        Ok(text) => {
                            let _ = event_tx.send(ConnectionEvent::Inbound(parse_inbound(text)));
                        }
                        Err(_) => debug!(generation, bytes = bytes.len(), "ws binary frame ignored"),
                    },
                    Some(Ok(WsMessage::Pong(_))) => {
                        let _ = event_tx.send(ConnectionEvent::Inbound(Inbound::Pong));
                    }
                    Some(Ok(WsMessage::Close(frame))) => {
                        debug!(generation, ?frame, "ws close frame received");
                        let _ = write.send(WsMessage::Close(None)).await;
                        break;
                    }
                    Some(Ok(WsMessage::Ping(_))) | Some(Ok(WsMessage::Frame(_))) => {}
                    Some(Err(err)) => {
                        let _ = event_tx.send(ConnectionEvent::Failed(format!("read failed: {err}")));
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    let _ = event_tx.send(ConnectionEvent::Closed);
}
