/*
[INPUT]:  Endpoint paths and call-site query parameters (any key casing)
[OUTPUT]: Canonical path+query strings shared by signing and transport
[POS]:    HTTP layer - canonical URL building
[UPDATE]: When changing query serialization (breaks every signature if signer and sender diverge)
*/

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use url::form_urlencoded;

use crate::http::{HollaexError, Result};

/// Query parameters in wire form.
///
/// Keys are normalized to snake_case on insert and kept sorted, so the same
/// logical parameters always serialize to the same string. Only absent values
/// are dropped: `false`, `0` and `""` are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: BTreeMap<String, String>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build parameters from any struct or map that serializes to a JSON object.
    ///
    /// `null` fields (e.g. `Option::None`) are omitted.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        let mut params = Self::new();
        match serde_json::to_value(value)? {
            Value::Object(map) => {
                for (key, value) in map {
                    if let Some(value) = query_value(value) {
                        params.insert(&key, value);
                    }
                }
                Ok(params)
            }
            Value::Null => Ok(params),
            other => Err(HollaexError::Config(format!(
                "query parameters must serialize to an object, got {other}"
            ))),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    /// Builder-style insert that skips `None`.
    pub fn with_opt<T: ToString>(mut self, key: &str, value: Option<T>) -> Self {
        if let Some(value) = value {
            self.insert(key, value);
        }
        self
    }

    /// Insert a pair; a key that normalizes to an existing one replaces it.
    pub fn insert(&mut self, key: &str, value: impl ToString) {
        self.pairs.insert(to_snake_case(key), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.get(&to_snake_case(key)).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Serialize as `a=1&b=2` (form-urlencoded, key order).
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.pairs {
            serializer.append_pair(key, value);
        }
        serializer.finish()
    }
}

/// Build the canonical `path[?query]` string.
///
/// Absent or empty params produce no `?` segment.
pub fn build_url(base_path: &str, params: Option<&QueryParams>) -> String {
    match params {
        Some(params) if !params.is_empty() => {
            format!("{base_path}?{}", params.to_query_string())
        }
        _ => base_path.to_string(),
    }
}

/// Convert a camelCase key to snake_case. Already snake-cased keys pass through.
pub fn to_snake_case(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let mut out = String::with_capacity(key.len() + 4);

    for (i, &ch) in chars.iter().enumerate() {
        if !ch.is_ascii_uppercase() {
            out.push(ch);
            continue;
        }

        let prev = i.checked_sub(1).map(|p| chars[p]);
        let next = chars.get(i + 1).copied();
        let boundary = match prev {
            Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit() => true,
            // acronym followed by a word: "HTTPServer" -> "http_server"
            Some(p) if p.is_ascii_uppercase() => next.is_some_and(|n| n.is_ascii_lowercase()),
            _ => false,
        };
        if boundary {
            out.push('_');
        }
        out.push(ch.to_ascii_lowercase());
    }

    out
}

fn query_value(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}
