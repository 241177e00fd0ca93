/*
[INPUT]:  Raw WebSocket text frames and outgoing subscription changes
[OUTPUT]: Parsed stream events and serialized client frames
[POS]:    WebSocket layer - message parsing and frame encoding
[UPDATE]: When adding new message types or changing format
*/

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::topic::Topic;
use crate::http::client::truncate_for_log;

const MESSAGE_SAMPLE_LIMIT: usize = 3;
const SUBSCRIPTION_LOG_LIMIT: usize = 10;
const OTHER_LOG_LIMIT: usize = 3;
const PARSE_FAIL_LOG_LIMIT: usize = 3;
const RAW_LOG_MAX_BYTES: usize = 1024;

static MESSAGE_SAMPLE_COUNT: AtomicUsize = AtomicUsize::new(0);
static SUBSCRIBE_LOG_COUNT: AtomicUsize = AtomicUsize::new(0);
static OTHER_LOG_COUNT: AtomicUsize = AtomicUsize::new(0);
static PARSE_FAIL_LOG_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Client to server frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ClientFrame {
    Subscribe { args: Vec<String> },
    Unsubscribe { args: Vec<String> },
    Ping,
}

impl ClientFrame {
    pub fn subscribe(topic: &Topic) -> Self {
        ClientFrame::Subscribe {
            args: vec![topic.to_string()],
        }
    }

    pub fn unsubscribe(topic: &Topic) -> Self {
        ClientFrame::Unsubscribe {
            args: vec![topic.to_string()],
        }
    }

    pub fn to_text(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Data message published on a subscribed topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamMessage {
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
}

/// What the session hands to the consumer
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Message(StreamMessage),
    /// Server frames without a topic (welcome notices, errors, acks)
    Other(Value),
}

/// Classified inbound frame
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Inbound {
    Pong,
    Event(StreamEvent),
    Ignored,
}

pub(crate) fn parse_inbound(text: &str) -> Inbound {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(err) => {
            log_parse_fail_once(&err, text);
            return Inbound::Ignored;
        }
    };

    if is_pong(&value) {
        return Inbound::Pong;
    }

    if value.get("topic").is_some_and(Value::is_string) {
        match serde_json::from_value::<StreamMessage>(value.clone()) {
            Ok(message) => {
                log_message_sample_once(&message);
                return Inbound::Event(StreamEvent::Message(message));
            }
            Err(err) => log_parse_fail_once(&err, text),
        }
    } else {
        log_other_message_once(text);
    }

    Inbound::Event(StreamEvent::Other(value))
}

fn is_pong(value: &Value) -> bool {
    value.get("message").and_then(Value::as_str) == Some("pong")
        || value.get("op").and_then(Value::as_str) == Some("pong")
}

pub(crate) fn log_frame_sent(frame: &ClientFrame) {
    let (action, args) = match frame {
        ClientFrame::Subscribe { args } => ("subscribe", args),
        ClientFrame::Unsubscribe { args } => ("unsubscribe", args),
        ClientFrame::Ping => return,
    };

    let count = SUBSCRIBE_LOG_COUNT.fetch_add(1, Ordering::Relaxed);
    if count >= SUBSCRIPTION_LOG_LIMIT {
        debug!(action, topics = ?args, "ws subscription sent");
        return;
    }
    info!(
        sample_index = count + 1,
        sample_limit = SUBSCRIPTION_LOG_LIMIT,
        action,
        topics = ?args,
        "ws subscription sent"
    );
}

fn log_message_sample_once(message: &StreamMessage) {
    let count = MESSAGE_SAMPLE_COUNT.fetch_add(1, Ordering::Relaxed);
    if count >= MESSAGE_SAMPLE_LIMIT {
        return;
    }

    info!(
        sample_index = count + 1,
        sample_limit = MESSAGE_SAMPLE_LIMIT,
        topic = %message.topic,
        action = message.action.as_deref().unwrap_or("-"),
        symbol = message.symbol.as_deref().unwrap_or("-"),
        "ws message sample"
    );
}

fn log_other_message_once(raw: &str) {
    let count = OTHER_LOG_COUNT.fetch_add(1, Ordering::Relaxed);
    if count < OTHER_LOG_LIMIT {
        info!(
            sample_index = count + 1,
            sample_limit = OTHER_LOG_LIMIT,
            bytes = raw.len(),
            "ws message without topic"
        );
        let preview = truncate_for_log(raw, RAW_LOG_MAX_BYTES);
        debug!(
            sample_index = count + 1,
            sample_limit = OTHER_LOG_LIMIT,
            message = %preview,
            "ws message without topic"
        );
    }
}

fn log_parse_fail_once(err: &serde_json::Error, raw: &str) {
    let count = PARSE_FAIL_LOG_COUNT.fetch_add(1, Ordering::Relaxed);
    if count < PARSE_FAIL_LOG_LIMIT {
        info!(
            sample_index = count + 1,
            sample_limit = PARSE_FAIL_LOG_LIMIT,
            error = %err,
            bytes = raw.len(),
            "ws message parse failed"
        );
        let preview = truncate_for_log(raw, RAW_LOG_MAX_BYTES);
        debug!(
            sample_index = count + 1,
            sample_limit = PARSE_FAIL_LOG_LIMIT,
            error = %err,
            message = %preview,
            "ws message parse failed"
        );
    }
}
