use futures::StreamExt;
use geojson::{FeatureCollection, GeoJson};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(1);
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while fetching a GeoJSON feed.
///
/// None of these escape a feed update: the feed logs them and reports
/// [`UpdateStatus::Error`](crate::client::UpdateStatus::Error) instead.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with a non-success status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Server returned 429 Too Many Requests after max retries
    #[error("Rate limited after {0} retries")]
    RateLimited(u32),
    /// Response body exceeded the size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
    /// Body is not a GeoJSON FeatureCollection
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Knobs for a single fetch.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
    /// Retries for 429 and 5xx responses and truncated bodies.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on every further attempt.
    pub retry_base_delay: Duration,
    pub max_size: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            max_size: MAX_FEED_SIZE,
        }
    }
}

impl FetchOptions {
    fn backoff(&self, retry_count: u32) -> Duration {
        self.retry_base_delay.saturating_mul(2u32.saturating_pow(retry_count))
    }
}

/// Result of a successful fetch.
#[derive(Debug)]
pub enum FetchOutcome {
    Collection(FeatureCollection),
    /// HTTP 304: the server has nothing new for us.
    NotModified,
}

/// Fetches `url` and decodes the body as a GeoJSON `FeatureCollection`.
///
/// # Behavior
///
/// - Each request is bounded by `options.timeout`
/// - 429 and 5xx responses are retried with exponential backoff
/// - Other non-2xx statuses fail immediately
/// - Bodies larger than `options.max_size` are rejected
pub async fn fetch_feature_collection(
    client: &reqwest::Client,
    url: &str,
    options: &FetchOptions,
) -> Result<FetchOutcome, FetchError> {
    let mut retry_count = 0;

    let bytes = loop {
        let response = tokio::time::timeout(options.timeout, client.get(url).send())
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(FetchError::Network)?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_MODIFIED {
            return Ok(FetchOutcome::NotModified);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            if retry_count >= options.max_retries {
                return Err(FetchError::RateLimited(options.max_retries));
            }

            let delay = options.backoff(retry_count);
            tracing::warn!(
                url = %url,
                retry = retry_count,
                delay_ms = delay.as_millis() as u64,
                "Rate limited, backing off"
            );

            tokio::time::sleep(delay).await;
            retry_count += 1;
            continue;
        }

        if status.is_server_error() {
            if retry_count >= options.max_retries {
                return Err(FetchError::HttpStatus(status.as_u16()));
            }

            let delay = options.backoff(retry_count);
            tracing::warn!(
                url = %url,
                status = %status,
                retry = retry_count,
                delay_ms = delay.as_millis() as u64,
                "Server error, retrying after delay"
            );

            tokio::time::sleep(delay).await;
            retry_count += 1;
            continue;
        }

        // 4xx errors fail immediately
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        match tokio::time::timeout(options.timeout, read_limited_bytes(response, options.max_size))
            .await
            .map_err(|_| FetchError::Timeout)?
        {
            Ok(bytes) => break bytes,
            Err(FetchError::IncompleteResponse { expected, received }) => {
                if retry_count >= options.max_retries {
                    return Err(FetchError::IncompleteResponse { expected, received });
                }

                let delay = options.backoff(retry_count);
                tracing::debug!(
                    url = %url,
                    expected = expected,
                    received = received,
                    attempt = retry_count + 1,
                    "Retrying incomplete download"
                );

                tokio::time::sleep(delay).await;
                retry_count += 1;
                continue;
            }
            Err(e) => return Err(e),
        }
    };

    parse_feature_collection(&bytes).map(FetchOutcome::Collection)
}

/// Decodes a GeoJSON document that must be a `FeatureCollection`.
pub fn parse_feature_collection(bytes: &[u8]) -> Result<FeatureCollection, FetchError> {
    let geojson: GeoJson =
        serde_json::from_slice(bytes).map_err(|e| FetchError::Parse(e.to_string()))?;

    match geojson {
        GeoJson::FeatureCollection(collection) => Ok(collection),
        GeoJson::Feature(_) => Err(FetchError::Parse(
            "expected FeatureCollection, found Feature".to_string(),
        )),
        GeoJson::Geometry(_) => Err(FetchError::Parse(
            "expected FeatureCollection, found Geometry".to_string(),
        )),
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
