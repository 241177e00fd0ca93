/*
[INPUT]:  API key/secret from call site or environment
[OUTPUT]: Validated credentials (partial pairs rejected)
[POS]:    Auth layer - credential storage
[UPDATE]: When adding credential sources
*/

use std::fmt;

use crate::http::{HollaexError, Result};

const API_KEY_ENV: &str = "HOLLAEX_API_KEY";
const API_SECRET_ENV: &str = "HOLLAEX_API_SECRET";

/// API key and secret used to sign requests.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Load from `HOLLAEX_API_KEY` / `HOLLAEX_API_SECRET`.
    ///
    /// Returns `None` unless both are set.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var(API_KEY_ENV).ok()?;
        let api_secret = std::env::var(API_SECRET_ENV).ok()?;
        Some(Self::new(api_key, api_secret))
    }

    /// Resolve optional key/secret into credentials.
    ///
    /// Both present yields credentials, both absent yields `None` (public
    /// endpoints only). Empty strings count as absent. A lone key or secret is
    /// a configuration error.
    pub fn resolve(api_key: Option<String>, api_secret: Option<String>) -> Result<Option<Self>> {
        let api_key = api_key.filter(|value| !value.is_empty());
        let api_secret = api_secret.filter(|value| !value.is_empty());

        match (api_key, api_secret) {
            (Some(key), Some(secret)) => Ok(Some(Self::new(key, secret))),
            (None, None) => Ok(None),
            (Some(_), None) => Err(HollaexError::Config(
                "API key provided but secret is missing".to_string(),
            )),
            (None, Some(_)) => Err(HollaexError::Config(
                "API secret provided but key is missing".to_string(),
            )),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub(crate) fn api_secret(&self) -> &str {
        &self.api_secret
    }

    /// Reject credentials that cannot produce a valid signature.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(HollaexError::Config("API key is empty".to_string()));
        }
        if self.api_secret.is_empty() {
            return Err(HollaexError::Config("API secret is empty".to_string()));
        }
        Ok(())
    }
}
