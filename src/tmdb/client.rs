use super::dto::{DiscoverResponse, ImageUrls};
use crate::catalog::{Category, Movie};
use crate::config::TmdbConfig;
use crate::feed::MovieSource;
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use thiserror::Error;
use url::Url;

const MAX_RESPONSE_SIZE: usize = 5 * 1024 * 1024; // 5MB

/// Errors raised while fetching a discover page.
#[derive(Debug, Error)]
pub enum TmdbError {
    #[error("TMDB API key is missing (set TMDB_API_KEY or tmdb.api_key)")]
    MissingApiKey,
    #[error("Invalid TMDB base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
    #[error("Insecure base URL: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,
    #[error("Page numbers start at 1")]
    InvalidPage,
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Request timed out")]
    Timeout,
    #[error("Rate limited after {0} retries")]
    RateLimited(u32),
    #[error("Response too large")]
    ResponseTooLarge,
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

enum Attempt {
    Body(Vec<u8>),
    Retryable(reqwest::StatusCode),
}

/// Client for TMDB's `discover/movie` endpoint.
///
/// Owns the transport policy the feed controller deliberately lacks: a
/// per-request timeout, bounded retries with exponential backoff on 429 and
/// 5xx, and a response size cap.
pub struct TmdbClient {
    client: reqwest::Client,
    discover_url: Url,
    api_key: SecretString,
    language: String,
    images: ImageUrls,
    timeout: Duration,
    max_retries: u32,
    retry_backoff: Duration,
}

impl std::fmt::Debug for TmdbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TmdbClient")
            .field("discover_url", &self.discover_url.as_str())
            .field("api_key", &"[REDACTED]")
            .field("language", &self.language)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl TmdbClient {
    pub fn new(
        client: reqwest::Client,
        config: &TmdbConfig,
        api_key: SecretString,
    ) -> Result<Self, TmdbError> {
        if api_key.expose_secret().trim().is_empty() {
            return Err(TmdbError::MissingApiKey);
        }

        // The API key travels in the query string, so plain HTTP is only
        // acceptable against a local mock server.
        let base = config.base_url.trim_end_matches('/');
        let discover_url = Url::parse(&format!("{}/discover/movie", base))?;
        if discover_url.scheme() != "https" {
            let is_localhost = discover_url.scheme() == "http"
                && matches!(discover_url.host_str(), Some("localhost" | "127.0.0.1"));
            if !is_localhost {
                tracing::error!(base_url = %base, "Rejecting non-HTTPS base URL (HTTPS required except for localhost)");
                return Err(TmdbError::InsecureBaseUrl);
            }
            tracing::warn!(base_url = %base, "Using non-HTTPS TMDB base URL (localhost only)");
        }

        Ok(Self {
            client,
            discover_url,
            api_key,
            language: config.language.clone(),
            images: ImageUrls {
                base_url: config.image_base_url.clone(),
                poster_size: config.poster_size.clone(),
                backdrop_size: config.backdrop_size.clone(),
            },
            timeout: Duration::from_secs(config.timeout_secs),
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    /// Fetches one page of `category`, retrying rate limits and server errors.
    pub async fn discover(
        &self,
        category: Category,
        page: u32,
    ) -> Result<DiscoverResponse, TmdbError> {
        if page == 0 {
            return Err(TmdbError::InvalidPage);
        }

        let url = self.page_url(category, page);
        let mut retry_count = 0;

        let bytes = loop {
            tracing::debug!(category = %category, page, attempt = retry_count + 1, "Requesting discover page");

            let outcome = tokio::time::timeout(self.timeout, self.attempt(&url))
                .await
                .map_err(|_| TmdbError::Timeout)??;

            let status = match outcome {
                Attempt::Body(bytes) => break bytes,
                Attempt::Retryable(status) => status,
            };
            if retry_count >= self.max_retries {
                return Err(if status.is_server_error() {
                    TmdbError::HttpStatus(status.as_u16())
                } else {
                    TmdbError::RateLimited(self.max_retries)
                });
            }

            let delay = self.retry_backoff.saturating_mul(2u32.saturating_pow(retry_count));
            tracing::warn!(
                category = %category,
                page,
                status = %status,
                retry = retry_count + 1,
                delay_ms = delay.as_millis() as u64,
                "Retrying discover request after delay"
            );
            tokio::time::sleep(delay).await;
            retry_count += 1;
        };

        let parsed: DiscoverResponse = serde_json::from_slice(&bytes)?;
        Ok(parsed)
    }

    /// One request, headers and body. The caller bounds the whole attempt
    /// with the configured timeout.
    async fn attempt(&self, url: &Url) -> Result<Attempt, TmdbError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| TmdbError::Network(e.without_url()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Ok(Attempt::Retryable(status));
        }
        if !status.is_success() {
            return Err(TmdbError::HttpStatus(status.as_u16()));
        }

        Ok(Attempt::Body(read_limited_bytes(response, MAX_RESPONSE_SIZE).await?))
    }

    fn page_url(&self, category: Category, page: u32) -> Url {
        let mut url = self.discover_url.clone();
        url.query_pairs_mut()
            .append_pair("api_key", self.api_key.expose_secret())
            .append_pair("page", &page.to_string())
            .append_pair("sort_by", category.sort_by())
            .append_pair("language", &self.language);
        url
    }
}

impl MovieSource for TmdbClient {
    type Error = TmdbError;

    async fn fetch_page(&self, category: Category, page: u32) -> Result<Vec<Movie>, TmdbError> {
        let response = self.discover(category, page).await?;
        Ok(response
            .results
            .into_iter()
            .map(|result| result.into_movie(&self.images))
            .collect())
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, TmdbError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(TmdbError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| TmdbError::Network(e.without_url()))?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(TmdbError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
