/*
[INPUT]:  HTTP method, canonical path+query, optional JSON body, credentials, clock
[OUTPUT]: Signature header set (api-key, api-expires, api-signature)
[POS]:    Auth layer - HMAC-SHA256 request signing shared by REST and streaming
[UPDATE]: When changing the signed string layout or header names
*/

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Method, RequestBuilder};
use sha2::Sha256;

use super::Credentials;
use crate::http::query::{QueryParams, build_url};

type HmacSha256 = Hmac<Sha256>;

pub const API_KEY_HEADER: &str = "api-key";
pub const API_EXPIRES_HEADER: &str = "api-expires";
pub const API_SIGNATURE_HEADER: &str = "api-signature";

/// Source of the current Unix time in seconds.
pub trait Clock: Send + Sync + fmt::Debug {
    fn unix_seconds(&self) -> u64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_seconds(&self) -> u64 {
        u64::try_from(Utc::now().timestamp()).unwrap_or_default()
    }
}

/// Headers attached to an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeaders {
    pub api_key: String,
    pub api_expires: u64,
    pub api_signature: String,
}

impl SignatureHeaders {
    /// Attach the headers to an outgoing request.
    pub fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header(API_KEY_HEADER, &self.api_key)
            .header(API_EXPIRES_HEADER, self.api_expires.to_string())
            .header(API_SIGNATURE_HEADER, &self.api_signature)
    }

    /// Header name/value pairs, in wire order.
    pub fn pairs(&self) -> [(&'static str, String); 3] {
        [
            (API_KEY_HEADER, self.api_key.clone()),
            (API_EXPIRES_HEADER, self.api_expires.to_string()),
            (API_SIGNATURE_HEADER, self.api_signature.clone()),
        ]
    }
}

/// Signs requests as `hex(HMAC_SHA256(secret, METHOD + URL + EXPIRES + BODY))`.
#[derive(Clone)]
pub struct RequestSigner {
    credentials: Credentials,
    expires_after: u64,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner")
            .field("credentials", &self.credentials)
            .field("expires_after", &self.expires_after)
            .finish_non_exhaustive()
    }
}

impl RequestSigner {
    /// Create a signer whose signatures stay valid for `expires_after` seconds.
    pub fn new(credentials: Credentials, expires_after: u64) -> Self {
        Self {
            credentials,
            expires_after,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn api_key(&self) -> &str {
        self.credentials.api_key()
    }

    pub fn expires_after(&self) -> u64 {
        self.expires_after
    }

    /// Sign `path` plus the canonical form of `params`.
    ///
    /// `path` must already carry the API base path (e.g. `/v2/user/balance`);
    /// `body` must be the exact JSON text that goes on the wire.
    pub fn sign(
        &self,
        method: &Method,
        path: &str,
        params: Option<&QueryParams>,
        body: Option<&str>,
    ) -> SignatureHeaders {
        self.sign_url(method, &build_url(path, params), body)
    }

    /// Sign an already-canonical `path[?query]` string.
    pub fn sign_url(&self, method: &Method, canonical_url: &str, body: Option<&str>) -> SignatureHeaders {
        let api_expires = self.clock.unix_seconds() + self.expires_after;
        SignatureHeaders {
            api_key: self.credentials.api_key().to_string(),
            api_expires,
            api_signature: self.signature(method, canonical_url, api_expires, body),
        }
    }

    /// Raw signature for a fixed expiry.
    pub fn signature(
        &self,
        method: &Method,
        canonical_url: &str,
        api_expires: u64,
        body: Option<&str>,
    ) -> String {
        let payload = format!(
            "{}{}{}{}",
            method.as_str(),
            canonical_url,
            api_expires,
            body.unwrap_or_default()
        );
        hmac_sha256_hex(self.credentials.api_secret().as_bytes(), payload.as_bytes())
    }
}

fn hmac_sha256_hex(secret: &[u8], data: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
    mac.update(data);
    hex::encode(mac.finalize().into_bytes())
}
