use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

const DEFAULT_NONCE_EXPIRES_IN: i64 = 300;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Configuration of an [OpenIdProvider](crate::provider::OpenIdProvider).
#[derive(Deserialize, Debug, Clone)]
pub struct ProviderConfig {
    /// Base of the well-known discovery paths.
    pub base_url: BaseUrl,
    /// Identity placed in the `iss` claim of every code and access token, and required of them
    /// on the way back in.
    pub issuer: String,
    /// Remove the authorization session once its code has been exchanged for a token.
    #[serde(default = "single_use_codes")]
    pub single_use_codes: bool,
    /// Lifetime, in seconds, of the `c_nonce` values handed out with tokens and errors.
    #[serde(default = "nonce_expires_in")]
    pub nonce_expires_in: i64,
}

impl ProviderConfig {
    pub fn new(base_url: BaseUrl, issuer: impl Into<String>) -> Self {
        Self {
            base_url,
            issuer: issuer.into(),
            single_use_codes: single_use_codes(),
            nonce_expires_in: nonce_expires_in(),
        }
    }

    /// Keep sessions after their code has been exchanged, allowing a code to be used until
    /// the session expires.
    pub fn with_reusable_codes(mut self) -> Self {
        self.single_use_codes = false;
        self
    }
}

/// Identity of a client, used as the issuer of proofs of possession.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<Url>,
}

impl ClientConfig {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri: None,
        }
    }
}

/// Settings for the bundled HTTP client.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    #[serde(default = "http_timeout_secs")]
    pub timeout_secs: u64,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: http_timeout_secs(),
        }
    }
}

fn single_use_codes() -> bool {
    true
}

fn nonce_expires_in() -> i64 {
    DEFAULT_NONCE_EXPIRES_IN
}

fn http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

/// A url that is always a base (can be safely join()'ed with further path elements without
/// mangling).
#[derive(Deserialize, Debug, Clone, Hash, PartialEq, Eq)]
#[serde(try_from = "String")]
pub struct BaseUrl(Url);

impl std::ops::Deref for BaseUrl {
    type Target = Url;

    fn deref(&self) -> &Url {
        &self.0
    }
}

impl TryFrom<String> for BaseUrl {
    type Error = url::ParseError;

    fn try_from(mut url: String) -> Result<Self, Self::Error> {
        // Make URL a base.
        if !url.ends_with('/') {
            url += "/"
        }
        url.parse().map(Self)
    }
}

impl TryFrom<&str> for BaseUrl {
    type Error = url::ParseError;

    fn try_from(url: &str) -> Result<Self, Self::Error> {
        Self::try_from(url.to_owned())
    }
}
