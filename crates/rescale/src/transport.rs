//! Authenticated HTTP transport with bounded, fixed-delay retry
//!
//! Every request the SDK makes goes through [`Transport::request`]. A request
//! is attempted up to `max_attempts` times. Any 4xx/5xx response or
//! transport-level failure counts as a failed attempt; between attempts the
//! transport waits a fixed delay (30 seconds by default). There is no
//! exponential backoff, no jitter and no `Retry-After` handling.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, trace, warn};
use url::Url;

use crate::config::{ClientSettings, Credentials};
use crate::error::{RescaleError, Result};
use crate::sleep::{SharedSleeper, default_sleeper};

/// User agent string for SDK HTTP requests
const USER_AGENT: &str = concat!("rescale-sdk/", env!("CARGO_PKG_VERSION"));

/// Body of an outgoing request.
///
/// Kept in owned form so it can be rebuilt for every retry attempt.
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// JSON document sent with `Content-Type: application/json`
    Json(Value),
    /// Single-file multipart upload
    Multipart {
        field: String,
        file_name: String,
        bytes: Vec<u8>,
    },
}

impl RequestBody {
    fn is_multipart(&self) -> bool {
        matches!(self, RequestBody::Multipart { .. })
    }
}

/// HTTP transport bound to one set of credentials
#[derive(Clone)]
pub struct Transport {
    credentials: Arc<Credentials>,
    http: reqwest::Client,
    retry_delay: Duration,
    sleeper: SharedSleeper,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("credentials", &self.credentials)
            .field("retry_delay", &self.retry_delay)
            .finish()
    }
}

impl Transport {
    /// Create a transport using the retry delay and request timeout from `settings`
    pub fn new(credentials: Credentials, settings: &ClientSettings) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = settings.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self::with_http_client(
            credentials,
            http,
            settings.retry.delay(),
        ))
    }

    /// Create a transport around a preconfigured reqwest client
    pub fn with_http_client(
        credentials: Credentials,
        http: reqwest::Client,
        retry_delay: Duration,
    ) -> Self {
        Self {
            credentials: Arc::new(credentials),
            http,
            retry_delay,
            sleeper: default_sleeper(),
        }
    }

    /// Replace the sleeper used between attempts
    pub fn with_sleeper(mut self, sleeper: SharedSleeper) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Resolve `relative_url` against the base URL.
    ///
    /// Absolute URLs (such as pagination `next` links) are returned unchanged.
    pub fn url(&self, relative_url: &str) -> Result<Url> {
        Ok(self.credentials.base_url().join(relative_url)?)
    }

    /// Issue a request, retrying failed attempts with a fixed delay.
    ///
    /// Returns the first successful response. After the last attempt fails the
    /// error from that attempt is returned; for HTTP failures it carries the
    /// status code and response body.
    pub async fn request(
        &self,
        method: Method,
        relative_url: &str,
        body: Option<&RequestBody>,
        max_attempts: u32,
    ) -> Result<Response> {
        let url = self.url(relative_url)?;
        let max_attempts = max_attempts.max(1);
        let mut attempt = 1;

        loop {
            debug!("{} {} (attempt {}/{})", method, url, attempt, max_attempts);
            match self.attempt(method.clone(), &url, body).await {
                Ok(response) => return Ok(response),
                Err(err) if attempt < max_attempts => {
                    warn!(
                        "{} {} failed on attempt {}/{}: {}; retrying in {:?}",
                        method, url, attempt, max_attempts, err, self.retry_delay
                    );
                    self.sleeper.sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    error!("{} {} failed: {}", method, url, err);
                    return Err(err);
                }
            }
        }
    }

    async fn attempt(
        &self,
        method: Method,
        url: &Url,
        body: Option<&RequestBody>,
    ) -> Result<Response> {
        let token = format!("Token {}", self.credentials.api_key().unwrap_or_default());
        let mut request = self
            .http
            .request(method, url.clone())
            .header(AUTHORIZATION, token);

        if !body.is_some_and(RequestBody::is_multipart) {
            request = request.header(CONTENT_TYPE, "application/json");
        }

        request = match body {
            Some(RequestBody::Json(value)) => request.body(serde_json::to_vec(value)?),
            Some(RequestBody::Multipart {
                field,
                file_name,
                bytes,
            }) => {
                let part = reqwest::multipart::Part::bytes(bytes.clone())
                    .file_name(file_name.clone());
                request.multipart(reqwest::multipart::Form::new().part(field.clone(), part))
            }
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        trace!("{} -> {}", url, status);

        if status.is_client_error() || status.is_server_error() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RescaleError::Http {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    /// GET a JSON document
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        relative_url: &str,
        max_attempts: u32,
    ) -> Result<T> {
        let response = self
            .request(Method::GET, relative_url, None, max_attempts)
            .await?;
        decode(response).await
    }

    /// Send a JSON body and decode the JSON response
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        relative_url: &str,
        body: Value,
        max_attempts: u32,
    ) -> Result<T> {
        let body = RequestBody::Json(body);
        let response = self
            .request(method, relative_url, Some(&body), max_attempts)
            .await?;
        decode(response).await
    }

    /// Issue a request whose response body is not needed
    pub async fn execute(
        &self,
        method: Method,
        relative_url: &str,
        body: Option<Value>,
        max_attempts: u32,
    ) -> Result<()> {
        let body = body.map(RequestBody::Json);
        self.request(method, relative_url, body.as_ref(), max_attempts)
            .await?;
        Ok(())
    }
}

/// Decode a successful response body as JSON
pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
