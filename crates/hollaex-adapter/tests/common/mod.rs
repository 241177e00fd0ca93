/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for hollaex-adapter tests

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use hollaex_adapter::{Clock, SessionState};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use wiremock::MockServer;

pub const FIXED_NOW: u64 = 1_700_000_000;
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Clock pinned to a fixed Unix time
#[derive(Debug)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn unix_seconds(&self) -> u64 {
        self.0
    }
}

/// Poll `condition` until it holds; panics after [`WAIT_TIMEOUT`].
pub async fn wait_until<F: Fn() -> bool>(what: &str, condition: F) {
    let result = tokio::time::timeout(WAIT_TIMEOUT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(result.is_ok(), "timed out waiting for {what}");
}

pub async fn wait_for_state(rx: &mut watch::Receiver<SessionState>, state: SessionState) {
    let result = tokio::time::timeout(WAIT_TIMEOUT, rx.wait_for(|current| *current == state)).await;
    assert!(
        matches!(result, Ok(Ok(_))),
        "timed out waiting for session state {state:?}"
    );
}

#[derive(Debug, Clone, Default)]
pub struct StreamServerOptions {
    /// Reply `{"message":"pong"}` to every `{"op":"ping"}`
    pub answer_pings: bool,
    /// Reject this many handshakes with 503 before accepting
    pub reject_first: usize,
}

#[derive(Debug)]
enum Control {
    Send(String),
    Close,
}

#[derive(Debug, Default)]
struct ServerLog {
    handshakes: usize,
    uris: Vec<String>,
    frames: Vec<Vec<Value>>,
    controls: Vec<mpsc::UnboundedSender<Control>>,
}

/// Local stream endpoint recording every accepted connection and frame
pub struct MockStreamServer {
    addr: SocketAddr,
    log: Arc<Mutex<ServerLog>>,
    task: JoinHandle<()>,
}

impl MockStreamServer {
    pub async fn start(options: StreamServerOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stream server");
        let addr = listener.local_addr().expect("local addr");
        let log = Arc::new(Mutex::new(ServerLog::default()));

        let accept_log = log.clone();
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve_connection(stream, options.clone(), accept_log.clone()));
            }
        });

        Self { addr, log, task }
    }

    /// Base URL to use as `ClientConfig::api_url`
    pub fn api_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn handshakes(&self) -> usize {
        self.log.lock().unwrap().handshakes
    }

    pub fn connections(&self) -> usize {
        self.log.lock().unwrap().uris.len()
    }

    pub fn uris(&self) -> Vec<String> {
        self.log.lock().unwrap().uris.clone()
    }

    /// Frames received on one connection, in order
    pub fn frames(&self, connection: usize) -> Vec<Value> {
        self.log
            .lock()
            .unwrap()
            .frames
            .get(connection)
            .cloned()
            .unwrap_or_default()
    }

    /// Subscription frames on one connection as `op:topic`, pings excluded
    pub fn subscription_ops(&self, connection: usize) -> Vec<String> {
        self.frames(connection)
            .iter()
            .filter(|frame| frame["op"] != "ping")
            .map(|frame| {
                format!(
                    "{}:{}",
                    frame["op"].as_str().unwrap_or_default(),
                    frame["args"][0].as_str().unwrap_or_default()
                )
            })
            .collect()
    }

    pub fn pings(&self, connection: usize) -> usize {
        self.frames(connection)
            .iter()
            .filter(|frame| frame["op"] == "ping")
            .count()
    }

    /// Send a text frame on the most recent connection
    pub fn send_text(&self, text: &str) {
        self.latest_control(Control::Send(text.to_string()));
    }

    /// Close the most recent connection from the server side
    pub fn close_latest(&self) {
        self.latest_control(Control::Close);
    }

    fn latest_control(&self, control: Control) {
        let log = self.log.lock().unwrap();
        let tx = log.controls.last().expect("no accepted connection");
        tx.send(control).expect("connection task stopped");
    }
}

impl Drop for MockStreamServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve_connection(stream: TcpStream, options: StreamServerOptions, log: Arc<Mutex<ServerLog>>) {
    let requested_uri = Arc::new(Mutex::new(None::<String>));
    let callback_uri = requested_uri.clone();
    let callback_log = log.clone();
    let reject_first = options.reject_first;

    let callback = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        let mut log = callback_log.lock().unwrap();
        log.handshakes += 1;
        if log.handshakes <= reject_first {
            let mut rejection = ErrorResponse::new(Some("unavailable".to_string()));
            *rejection.status_mut() = StatusCode::SERVICE_UNAVAILABLE;
            return Err(rejection);
        }
        *callback_uri.lock().unwrap() = Some(request.uri().to_string());
        Ok(response)
    };

    let Ok(mut ws) = accept_hdr_async(stream, callback).await else {
        return;
    };

    let (control_tx, mut control_rx) = mpsc::unbounded_channel();
    let index = {
        let mut log = log.lock().unwrap();
        let uri = requested_uri.lock().unwrap().take().unwrap_or_default();
        log.uris.push(uri);
        log.frames.push(Vec::new());
        log.controls.push(control_tx);
        log.uris.len() - 1
    };

    loop {
        tokio::select! {
            control = control_rx.recv() => match control {
                Some(Control::Send(text)) => {
                    if ws.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Some(Control::Close) | None => {
                    let _ = ws.close(None).await;
                    break;
                }
            },
            incoming = ws.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let Ok(frame) = serde_json::from_str::<Value>(text.as_str()) else {
                        continue;
                    };
                    let is_ping = frame["op"] == "ping";
                    log.lock().unwrap().frames[index].push(frame);
                    if is_ping && options.answer_pings {
                        let pong = Message::Text(r#"{"message":"pong"}"#.into());
                        if ws.send(pong).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
}
