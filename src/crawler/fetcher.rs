//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - The [`Transport`] seam, so tests can substitute canned responses
//! - The single manual redirect hop and the bang-URL rewrite
//! - Per-attempt deadlines and bounded retry of transient failures

use crate::config::FetchConfig;
use crate::url::unescape_bang_url;
use crate::{ArchiverError, Result, TransportError};
use async_trait::async_trait;
use reqwest::{header::LOCATION, redirect::Policy, Client};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Status, redirect target and body of one GET
#[derive(Debug, Clone, Default)]
pub struct TransportResponse {
    pub status: u16,

    /// `Location` header, if any
    pub location: Option<String>,

    pub body: Vec<u8>,
}

impl TransportResponse {
    /// A `200 OK` response with the given body
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            location: None,
            body: body.into(),
        }
    }

    /// A `302 Found` response pointing at `location`
    pub fn redirect(location: impl Into<String>) -> Self {
        Self {
            status: 302,
            location: Some(location.into()),
            body: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }
}

/// Bare GET without redirect following
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> std::result::Result<TransportResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn get(&self, url: &str) -> std::result::Result<TransportResponse, TransportError> {
        (**self).get(url).await
    }
}

/// [`Transport`] backed by a `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &FetchConfig) -> std::result::Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> std::result::Result<TransportResponse, TransportError> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();

        Ok(TransportResponse {
            status,
            location,
            body,
        })
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use gg_archiver::config::FetchConfig;
/// use gg_archiver::crawler::build_http_client;
///
/// let client = build_http_client(&FetchConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetchConfig) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(connect_timeout(config))
        .redirect(Policy::none()) // Handle redirects manually
        .gzip(true)
        .brotli(true)
        .build()
}

/// Connect deadline, never longer than the whole request deadline
fn connect_timeout(config: &FetchConfig) -> Duration {
    Duration::from_secs(config.connect_timeout_secs.min(config.timeout_secs))
}

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Canonical URL after rewriting and the redirect hop
    pub url: String,

    pub body: String,
}

/// Fetches forum pages through an injected [`Transport`]
///
/// # Request Flow
///
/// 1. Rewrite bang URLs into their `_escaped_fragment_` form
/// 2. GET, bounded by the per-attempt deadline
/// 3. On a 3xx, follow exactly one hop to the (rewritten) `Location`
/// 4. Require a 2xx answer
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | Transport error / deadline | Retry up to `retries` times |
/// | HTTP 5xx | Retry up to `retries` times |
/// | HTTP 4xx | Fail immediately |
pub struct PageFetcher<T> {
    transport: T,
    base: String,
    timeout: Duration,
    retries: u32,
    backoff: Duration,
}

impl<T: Transport> PageFetcher<T> {
    /// Creates a fetcher for the site at `base` with default retry policy
    pub fn new(transport: T, base: impl Into<String>) -> Self {
        Self::with_config(transport, base, &FetchConfig::default())
    }

    pub fn with_config(transport: T, base: impl Into<String>, config: &FetchConfig) -> Self {
        Self {
            transport,
            base: base.into(),
            timeout: Duration::from_secs(config.timeout_secs),
            retries: config.retries,
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    /// Overrides the retry policy
    pub fn with_retries(mut self, retries: u32, backoff: Duration) -> Self {
        self.retries = retries;
        self.backoff = backoff;
        self
    }

    /// Origin of the site being crawled
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Resolves `url` to its canonical crawlable form
    ///
    /// Resolving an already canonical URL returns it unchanged.
    pub async fn resolve(&self, url: &str) -> Result<String> {
        let (canonical, _) = self.get_following(unescape_bang_url(url, &self.base)).await?;
        Ok(canonical)
    }

    /// Fetches a page, rewriting bang URLs first
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let (url, response) = self.get_following(unescape_bang_url(url, &self.base)).await?;
        Ok(FetchedPage {
            url,
            body: String::from_utf8_lossy(&response.body).into_owned(),
        })
    }

    /// Fetches the raw bytes behind an endpoint URL, without rewriting
    pub async fn fetch_raw(&self, url: &str) -> Result<Vec<u8>> {
        let (_, response) = self.get_following(url.to_string()).await?;
        Ok(response.body)
    }

    /// GETs `url`, follows one redirect hop and requires a 2xx answer
    async fn get_following(&self, url: String) -> Result<(String, TransportResponse)> {
        let mut current = url;
        let mut response = self.get(&current).await?;

        if response.is_redirect() {
            let next = self.redirect_target(&current, &response)?;
            tracing::debug!("Redirect {} -> {}", current, next);
            current = next;
            response = self.get(&current).await?;
        }

        if !response.is_success() {
            return Err(ArchiverError::Status {
                url: current,
                status: response.status,
            });
        }

        Ok((current, response))
    }

    fn redirect_target(&self, from: &str, response: &TransportResponse) -> Result<String> {
        let location = response.location.as_deref().ok_or_else(|| ArchiverError::Fetch {
            url: from.to_string(),
            source: TransportError::Other(format!(
                "HTTP {} without a Location header",
                response.status
            )),
        })?;

        // Relative locations are resolved against the redirecting URL
        let absolute = match Url::parse(from).and_then(|base| base.join(location)) {
            Ok(joined) => joined.to_string(),
            Err(_) => location.to_string(),
        };

        Ok(unescape_bang_url(&absolute, &self.base))
    }

    /// One logical GET with deadline and retries
    async fn get(&self, url: &str) -> Result<TransportResponse> {
        let mut attempt: u32 = 0;

        loop {
            let outcome = match tokio::time::timeout(self.timeout, self.transport.get(url)).await
            {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout(self.timeout)),
            };

            match outcome {
                Ok(response) if response.is_server_error() && attempt < self.retries => {
                    tracing::warn!(
                        "HTTP {} from {} (attempt {}/{}), retrying",
                        response.status,
                        url,
                        attempt + 1,
                        self.retries + 1
                    );
                }
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.retries => {
                    tracing::warn!(
                        "Error fetching {} (attempt {}/{}): {}, retrying",
                        url,
                        attempt + 1,
                        self.retries + 1,
                        e
                    );
                }
                Err(source) => {
                    return Err(ArchiverError::Fetch {
                        url: url.to_string(),
                        source,
                    })
                }
            }

            attempt += 1;
            tokio::time::sleep(self.backoff * attempt).await;
        }
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Canned-response transport for unit tests

    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockTransport {
        responses: Mutex<HashMap<String, Vec<std::result::Result<TransportResponse, String>>>>,
        requests: Mutex<Vec<String>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queues a response for `url`; the last queued one repeats
        pub fn respond(&self, url: &str, response: TransportResponse) -> &Self {
            self.push(url, Ok(response))
        }

        pub fn html(&self, url: &str, body: &str) -> &Self {
            self.respond(url, TransportResponse::ok(body))
        }

        pub fn fail(&self, url: &str, message: &str) -> &Self {
            self.push(url, Err(message.to_string()))
        }

        fn push(
            &self,
            url: &str,
            response: std::result::Result<TransportResponse, String>,
        ) -> &Self {
            self.responses
                .lock()
                .unwrap()
                .entry(url.to_string())
                .or_default()
                .push(response);
            self
        }

        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn get(&self, url: &str) -> std::result::Result<TransportResponse, TransportError> {
            self.requests.lock().unwrap().push(url.to_string());

            let mut responses = self.responses.lock().unwrap();
            let queue = match responses.get_mut(url) {
                Some(queue) if !queue.is_empty() => queue,
                _ => {
                    return Ok(TransportResponse {
                        status: 404,
                        ..Default::default()
                    })
                }
            };
            let next = if queue.len() > 1 {
                queue.remove(0)
            } else {
                queue[0].clone()
            };
            next.map_err(TransportError::Other)
        }
    }
}
