//! Link shortening client
//!
//! Wraps the TinyURL `create` endpoint. Every call is attempted exactly once;
//! the caller decides what the user sees when it fails.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

/// Longest slice of an error body kept for diagnostics.
const ERROR_BODY_PREVIEW_CHARS: usize = 200;

/// Errors that can occur while shortening a link
#[derive(Debug, Error)]
pub enum ShortenError {
    /// The HTTP client could not be built
    #[error("HTTP client setup failed: {0}")]
    Client(#[source] reqwest::Error),
    /// Connection or transport failure
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),
    /// The service did not answer within the configured timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// The service answered with a non-success status
    #[error("API error: HTTP {status}: {body}")]
    Api {
        /// Status code returned by the service
        status: StatusCode,
        /// Beginning of the response body
        body: String,
    },
    /// The response body was not the expected JSON
    #[error("Malformed response: {0}")]
    Decode(String),
    /// The response decoded but carried no short URL
    #[error("Response did not contain a short URL")]
    MissingUrl,
}

/// Anything that can turn a long URL into a short one.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Shortener: Send + Sync {
    /// Returns the shortened form of `url`.
    async fn shorten(&self, url: &str) -> Result<String, ShortenError>;
}

#[derive(Serialize)]
struct CreateRequest<'a> {
    url: &'a str,
    domain: &'a str,
}

#[derive(Deserialize)]
struct CreateResponse {
    data: Option<CreateData>,
}

#[derive(Deserialize)]
struct CreateData {
    tiny_url: Option<String>,
}

/// TinyURL API client authenticated with a bearer token.
#[derive(Clone)]
pub struct TinyUrlClient {
    http: Client,
    api_url: String,
    token: String,
    domain: String,
    timeout: Duration,
}

impl std::fmt::Debug for TinyUrlClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TinyUrlClient")
            .field("api_url", &self.api_url)
            .field("domain", &self.domain)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl TinyUrlClient {
    /// Creates a client for the given endpoint.
    ///
    /// # Arguments
    ///
    /// * `token` - TinyURL API token, sent as `Authorization: Bearer`
    /// * `api_url` - Full URL of the `create` endpoint
    /// * `domain` - Short link domain requested from the service
    /// * `timeout` - Upper bound for the whole request
    ///
    /// # Errors
    ///
    /// Returns `ShortenError::Client` if the HTTP client cannot be built.
    pub fn new(
        token: impl Into<String>,
        api_url: impl Into<String>,
        domain: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ShortenError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ShortenError::Client)?;

        Ok(Self {
            http,
            api_url: api_url.into(),
            token: token.into(),
            domain: domain.into(),
            timeout,
        })
    }

    fn map_send_error(&self, err: reqwest::Error) -> ShortenError {
        if err.is_timeout() {
            ShortenError::Timeout(self.timeout)
        } else {
            ShortenError::Network(err)
        }
    }
}

#[async_trait]
impl Shortener for TinyUrlClient {
    #[instrument(skip(self), fields(domain = %self.domain))]
    async fn shorten(&self, url: &str) -> Result<String, ShortenError> {
        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.token)
            .json(&CreateRequest {
                url,
                domain: &self.domain,
            })
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            return Err(ShortenError::Api {
                status,
                body: body.chars().take(ERROR_BODY_PREVIEW_CHARS).collect(),
            });
        }

        let parsed: CreateResponse =
            serde_json::from_str(&body).map_err(|e| ShortenError::Decode(e.to_string()))?;

        let short_url = parsed
            .data
            .and_then(|data| data.tiny_url)
            .filter(|u| !u.trim().is_empty())
            .ok_or(ShortenError::MissingUrl)?;

        debug!(%short_url, "Link shortened");
        Ok(short_url)
    }
}
