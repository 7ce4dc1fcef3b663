//! Page retrieval with bounded retries and encoding normalization.
//!
//! Fetching never returns an error: an unreachable page is an expected
//! outcome and is reported through [`FetchResult::succeeded`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::encoding::decode_body;
use crate::{PagewalkError, Result};

/// Desktop browser user agent; plain bot agents are routinely blocked by serial-fiction hosts.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// HTTP client configuration for fetching web pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Retries after the first attempt for transient failures.
    pub max_retries: u32,
    /// Fixed delay between attempts, in milliseconds.
    pub retry_delay_ms: u64,
    /// User-Agent header value.
    pub user_agent: String,
    /// Accept-Language header value.
    pub accept_language: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: 20,
            max_retries: 2,
            retry_delay_ms: 1000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
        }
    }
}

/// Outcome of fetching one URL.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FetchResult {
    /// Decoded page markup; empty on failure.
    pub raw_markup: String,
    /// URL after redirects, or the requested URL when nothing was received.
    pub final_url: String,
    /// Whether markup was obtained.
    pub succeeded: bool,
    /// Last HTTP status seen, if any response arrived.
    pub status: Option<u16>,
    /// Number of requests issued.
    pub attempts: u32,
    /// Why the fetch failed.
    pub error: Option<String>,
}

impl FetchResult {
    fn failure(url: &str, attempts: u32, status: Option<u16>, reason: impl Into<String>) -> Self {
        Self {
            final_url: url.to_string(),
            status,
            attempts,
            error: Some(reason.into()),
            ..Default::default()
        }
    }

    fn cancelled(url: &str) -> Self {
        Self::failure(url, 0, None, "cancelled")
    }

    /// Converts into `(markup, final_url)`, mapping failures to [`PagewalkError::FetchFailure`].
    pub fn into_result(self) -> Result<(String, String)> {
        if self.succeeded {
            Ok((self.raw_markup, self.final_url))
        } else {
            Err(PagewalkError::FetchFailure {
                url: self.final_url,
                reason: self.error.unwrap_or_else(|| "unreachable".to_string()),
            })
        }
    }
}

/// Anything that can produce page markup for a URL.
///
/// The engine only talks to this trait, which keeps network access
/// swappable in tests and embedders.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchResult;
}

/// [`PageSource`] backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Builds a fetcher with a client configured from `config`.
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = build_client(&config)?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl PageSource for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult {
        fetch_with_client(&self.client, url, &self.config).await
    }
}

fn build_client(config: &FetchConfig) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout))
        .build()
        .map_err(|e| PagewalkError::ConfigError(format!("HTTP client: {}", e)))
}

/// Parses a URL and checks that it uses an HTTP(S) scheme.
pub fn parse_http_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url.trim()).map_err(|e| PagewalkError::InvalidUrl(format!("{}: {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(PagewalkError::InvalidUrl(format!(
            "unsupported scheme '{}' (expected http or https)",
            other
        ))),
    }
}

/// Fetches a URL with a one-off client.
///
/// Prefer [`HttpFetcher`] when fetching many pages.
pub async fn fetch(url: &str, config: &FetchConfig) -> FetchResult {
    match build_client(config) {
        Ok(client) => fetch_with_client(&client, url, config).await,
        Err(e) => FetchResult::failure(url, 0, None, e.to_string()),
    }
}

/// Like [`fetch`], but gives up as soon as `token` is cancelled.
///
/// A cancelled fetch carries no markup, even if a response body had already arrived.
pub async fn fetch_cancellable(url: &str, config: &FetchConfig, token: &CancellationToken) -> FetchResult {
    tokio::select! {
        biased;
        _ = token.cancelled() => FetchResult::cancelled(url),
        result = fetch(url, config) => result,
    }
}

enum Attempt {
    Done(FetchResult),
    Retry { status: Option<u16>, reason: String },
    Fatal { status: Option<u16>, reason: String },
}

async fn fetch_with_client(client: &Client, url: &str, config: &FetchConfig) -> FetchResult {
    let parsed = match parse_http_url(url) {
        Ok(parsed) => parsed,
        Err(e) => return FetchResult::failure(url, 0, None, e.to_string()),
    };

    let allowed = config.max_retries.saturating_add(1);
    let delay = Duration::from_millis(config.retry_delay_ms);
    let mut last_status = None;
    let mut last_reason = String::new();

    for attempt in 1..=allowed {
        tracing::debug!(url, attempt, "fetching");
        match attempt_once(client, &parsed, config).await {
            Attempt::Done(mut result) => {
                result.attempts = attempt;
                return result;
            }
            Attempt::Fatal { status, reason } => {
                tracing::debug!(url, ?status, %reason, "fetch failed");
                return FetchResult::failure(url, attempt, status, reason);
            }
            Attempt::Retry { status, reason } => {
                if attempt < allowed {
                    tracing::warn!(url, attempt, ?status, %reason, "transient fetch failure, retrying");
                    tokio::time::sleep(delay).await;
                }
                last_status = status;
                last_reason = reason;
            }
        }
    }

    FetchResult::failure(
        url,
        allowed,
        last_status,
        format!("{} (gave up after {} attempts)", last_reason, allowed),
    )
}

async fn attempt_once(client: &Client, url: &Url, config: &FetchConfig) -> Attempt {
    let response = match client
        .get(url.clone())
        .header("User-Agent", &config.user_agent)
        .header("Accept", ACCEPT)
        .header("Accept-Language", &config.accept_language)
        .header("Cache-Control", "no-cache")
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) if e.is_timeout() => {
            return Attempt::Retry { status: None, reason: format!("timed out after {} seconds", config.timeout) };
        }
        Err(e) => return Attempt::Retry { status: None, reason: e.to_string() },
    };

    let status = response.status();
    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => return Attempt::Retry { status: Some(status.as_u16()), reason: e.to_string() },
    };

    match classify(status, bytes.is_empty()) {
        Disposition::Accept => {
            if !status.is_success() {
                tracing::warn!(url = %final_url, status = status.as_u16(), "using body of soft-blocked response");
            }
            Attempt::Done(FetchResult {
                raw_markup: decode_body(&bytes, content_type.as_deref()),
                final_url,
                succeeded: true,
                status: Some(status.as_u16()),
                attempts: 0,
                error: None,
            })
        }
        Disposition::Retry => Attempt::Retry { status: Some(status.as_u16()), reason: format!("HTTP {}", status) },
        Disposition::Fail => Attempt::Fatal { status: Some(status.as_u16()), reason: format!("HTTP {}", status) },
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Disposition {
    Accept,
    Retry,
    Fail,
}

/// 403 and non-empty 503 responses are soft blocks whose body is often the page itself.
fn classify(status: StatusCode, empty_body: bool) -> Disposition {
    match status.as_u16() {
        200..=399 => Disposition::Accept,
        403 => Disposition::Accept,
        503 if !empty_body => Disposition::Accept,
        408 | 429 => Disposition::Retry,
        500..=599 => Disposition::Retry,
        _ => Disposition::Fail,
    }
}
