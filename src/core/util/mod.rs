use anyhow::Context;
use anyhow::Result;
use async_trait::async_trait;
use http::{header, Request, Response};
use rand::{distributions::Alphanumeric, Rng};
use serde_json::Value as Json;
use tracing::{debug, warn};
use url::Url;

use crate::config::HttpConfig;

/// Generic HTTP client.
///
/// A trait is used here so to facilitate native HTTP/TLS when compiled for mobile applications.
#[async_trait]
pub trait AsyncHttpClient {
    async fn execute(&self, request: Request<Vec<u8>>) -> Result<Response<Vec<u8>>>;
}

pub(crate) fn base_request() -> http::request::Builder {
    Request::builder().header(header::ACCEPT, "application/json")
}

/// Random alphanumeric string, used for nonces.
pub fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[derive(Debug)]
pub struct ReqwestClient(reqwest::Client);

impl AsRef<reqwest::Client> for ReqwestClient {
    fn as_ref(&self) -> &reqwest::Client {
        &self.0
    }
}

impl ReqwestClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(config.timeout())
            .build()
            .context("unable to build http_client")
            .map(Self)
    }
}

#[async_trait]
impl AsyncHttpClient for ReqwestClient {
    async fn execute(&self, request: Request<Vec<u8>>) -> Result<Response<Vec<u8>>> {
        let response = self
            .0
            .execute(request.try_into().context("unable to convert request")?)
            .await
            .context("http request failed")?;

        let mut builder = Response::builder()
            .status(response.status())
            .version(response.version());

        builder
            .headers_mut()
            .context("unable to set headers")?
            .extend(response.headers().clone());

        builder
            .body(
                response
                    .bytes()
                    .await
                    .context("failed to extract response body")?
                    .to_vec(),
            )
            .context("unable to construct response")
    }
}

/// Resolves a JSON document published by reference, such as a `presentation_definition_uri`.
///
/// Returns `None` when nothing usable could be fetched. The caller maps that to its protocol
/// error code.
#[async_trait]
pub trait JsonResolver: std::fmt::Debug {
    async fn resolve(&self, url: &Url) -> Option<Json>;
}

/// A [JsonResolver] issuing `GET` requests through an [AsyncHttpClient].
#[derive(Debug)]
pub struct HttpJsonResolver<C> {
    client: C,
}

impl<C> HttpJsonResolver<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

impl HttpJsonResolver<ReqwestClient> {
    pub fn reqwest(config: &HttpConfig) -> Result<Self> {
        ReqwestClient::new(config).map(Self::new)
    }
}

#[async_trait]
impl<C: AsyncHttpClient + std::fmt::Debug + Send + Sync> JsonResolver for HttpJsonResolver<C> {
    async fn resolve(&self, url: &Url) -> Option<Json> {
        let request = match base_request().method("GET").uri(url.as_str()).body(vec![]) {
            Ok(request) => request,
            Err(e) => {
                warn!("unable to build request for {url}: {e}");
                return None;
            }
        };

        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("unable to fetch {url}: {e:#}");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            debug!("fetching {url} returned {status}");
            return None;
        }

        match serde_json::from_slice(response.body()) {
            Ok(json) => Some(json),
            Err(e) => {
                debug!("response from {url} is not JSON: {e}");
                None
            }
        }
    }
}
