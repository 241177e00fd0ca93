/*
[INPUT]:  HTTP configuration (API URL, base path, timeouts, stream timings, credentials)
[OUTPUT]: Configured reqwest client issuing public and signed requests
[POS]:    HTTP layer - core client implementation
[UPDATE]: When adding connection options or changing client behavior
*/

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::auth::{Clock, Credentials, RequestSigner, SystemClock};
use crate::http::query::{QueryParams, build_url};
use crate::http::{HollaexError, Result};
use crate::ws::StreamSession;

/// Default API host for HollaEx
const DEFAULT_API_URL: &str = "https://api.hollaex.com";
const DEFAULT_BASE_PATH: &str = "/v2";
const STREAM_PATH: &str = "/stream";
const ERROR_BODY_LOG_MAX_BYTES: usize = 512;
/// Upper bound for reconnect, ping and pong timings
const MAX_STREAM_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Client configuration shared by REST calls and the stream session
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Scheme and host, e.g. `https://api.hollaex.com`
    pub api_url: String,
    /// Path prefix prepended to every REST endpoint and included in signatures
    pub base_path: String,
    /// Seconds a signature stays valid (`api-expires = now + this`)
    pub api_expires_after: u64,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Fixed delay between stream reconnect attempts
    pub reconnect_interval: Duration,
    /// Interval between application-level pings on an open stream
    pub ping_interval: Duration,
    /// How long to wait for a pong before treating the stream as failed
    pub pong_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            base_path: DEFAULT_BASE_PATH.to_string(),
            api_expires_after: 60,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            reconnect_interval: Duration::from_secs(5),
            ping_interval: Duration::from_secs(55),
            pong_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    /// Streaming endpoint: same host as `api_url`, path `/stream`,
    /// `wss` for `https` and `ws` for `http`.
    pub fn stream_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.api_url)?;
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            "http" | "ws" => "ws",
            other => {
                return Err(HollaexError::Config(format!(
                    "unsupported API URL scheme: {other}"
                )));
            }
        };
        url.set_scheme(scheme)
            .map_err(|_| HollaexError::Config(format!("cannot derive stream URL from {url}")))?;
        url.set_path(STREAM_PATH);
        url.set_query(None);
        Ok(url)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.ping_interval.is_zero() {
            return Err(HollaexError::Config("ping_interval must be non-zero".to_string()));
        }
        for (name, value) in [
            ("reconnect_interval", self.reconnect_interval),
            ("ping_interval", self.ping_interval),
            ("pong_timeout", self.pong_timeout),
        ] {
            if value > MAX_STREAM_INTERVAL {
                return Err(HollaexError::Config(format!(
                    "{name} must not exceed {}s",
                    MAX_STREAM_INTERVAL.as_secs()
                )));
            }
        }
        if !self.base_path.is_empty() && !self.base_path.starts_with('/') {
            return Err(HollaexError::Config(format!(
                "base_path must start with '/': {}",
                self.base_path
            )));
        }
        Ok(())
    }
}

/// Main HTTP client for the HollaEx API
#[derive(Debug, Clone)]
pub struct HollaexClient {
    http_client: Client,
    config: ClientConfig,
    api_url: Url,
    signer: Option<RequestSigner>,
    clock: Arc<dyn Clock>,
}

impl HollaexClient {
    /// Create a new client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let http_client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;
        let api_url = Url::parse(&config.api_url)?;

        Ok(Self {
            http_client,
            config,
            api_url,
            signer: None,
            clock: Arc::new(SystemClock),
        })
    }

    /// Enable authenticated endpoints.
    pub fn with_credentials(mut self, credentials: Credentials) -> Result<Self> {
        credentials.validate()?;
        self.signer = Some(
            RequestSigner::new(credentials, self.config.api_expires_after)
                .with_clock(self.clock.clone()),
        );
        Ok(self)
    }

    /// Replace the time source used for `api-expires`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.signer = self.signer.take().map(|signer| signer.with_clock(clock.clone()));
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn signer(&self) -> Option<&RequestSigner> {
        self.signer.as_ref()
    }

    pub fn has_credentials(&self) -> bool {
        self.signer.is_some()
    }

    /// Create a stream session sharing this client's configuration and credentials.
    pub fn stream(&self) -> Result<StreamSession> {
        StreamSession::with_signer(self.config.clone(), self.signer.clone())
    }

    /// `base_path + endpoint`, the path that is both signed and requested.
    fn endpoint_path(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.base_path.trim_end_matches('/'), endpoint)
    }

    /// Build request builder for public endpoints (no auth headers)
    pub(crate) fn public_request(
        &self,
        method: Method,
        endpoint: &str,
        params: Option<&QueryParams>,
    ) -> Result<RequestBuilder> {
        let canonical = build_url(&self.endpoint_path(endpoint), params);
        let url = self.api_url.join(&canonical)?;
        Ok(self.http_client.request(method, url))
    }

    /// Build request builder for authenticated endpoints.
    ///
    /// The canonical path+query and `body` are signed and then sent unchanged.
    pub(crate) fn signed_request(
        &self,
        method: Method,
        endpoint: &str,
        params: Option<&QueryParams>,
        body: Option<String>,
    ) -> Result<RequestBuilder> {
        let signer = self.signer.as_ref().ok_or(HollaexError::MissingCredentials)?;
        let canonical = build_url(&self.endpoint_path(endpoint), params);
        let headers = signer.sign_url(&method, &canonical, body.as_deref());
        debug!(%method, path = %canonical, api_expires = headers.api_expires, "signed request");

        let url = self.api_url.join(&canonical)?;
        let builder = headers.apply(self.http_client.request(method, url));
        Ok(match body {
            Some(body) => builder.header(CONTENT_TYPE, "application/json").body(body),
            None => builder,
        })
    }

    /// Serialize a request body once; the same text is signed and sent.
    pub(crate) fn json_body<B: Serialize + ?Sized>(body: &B) -> Result<String> {
        Ok(serde_json::to_string(body)?)
    }

    /// Send the request and decode a JSON response.
    ///
    /// Non-success statuses (including 401/403 signature rejections) are
    /// returned as [`HollaexError::Api`] with the raw body.
    pub(crate) async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(
                status = status.as_u16(),
                body = %truncate_for_log(&body, ERROR_BODY_LOG_MAX_BYTES),
                "api request rejected"
            );
            return Err(HollaexError::api_error(status, body));
        }

        serde_json::from_str(&body).map_err(|err| {
            debug!(
                error = %err,
                body = %truncate_for_log(&body, ERROR_BODY_LOG_MAX_BYTES),
                "api response decode failed"
            );
            HollaexError::from(err)
        })
    }
}

pub(crate) fn truncate_for_log(value: &str, max_len: usize) -> String {
    if value.len() <= max_len {
        return value.to_string();
    }
    let mut end = max_len;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = String::with_capacity(end + 3);
    out.push_str(&value[..end]);
    out.push_str("...");
    out
}
