//! Resilient JSON fetcher for the geocoding APIs
//!
//! Issues GET requests with a fixed timeout, retries connection faults and
//! HTTP 429 with linear backoff, and turns every other failure into a short
//! readable error. Transport and sleeping are trait seams so the retry policy
//! can be exercised without a network.

use crate::config::HttpConfig;
use anyhow::{Context, Result};
use regex::Regex;
use reqwest::blocking::Client;
use serde_json::Value;
use std::sync::LazyLock;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// Longest upstream error message kept, in characters
pub const UPSTREAM_MESSAGE_LIMIT: usize = 240;

/// Length of the body excerpt attached to malformed responses, in characters
pub const MALFORMED_SNIPPET_LIMIT: usize = 200;

static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap());
static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").unwrap());
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Failures surfaced by [`Fetcher::get_json`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Network error after {attempts} attempts: {message}")]
    Network { attempts: u32, message: String },

    #[error("Rate limited by the service after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("Service responded with HTTP {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Malformed response (not JSON): {snippet}")]
    MalformedResponse { snippet: String },
}

/// Raw status and body as received from the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Connection, timeout or body-read fault
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Performs a single GET request
pub trait HttpTransport: Send {
    fn get(&self, url: &str, params: &[(&str, &str)]) -> Result<RawResponse, TransportError>;
}

/// Waits out a backoff interval
pub trait Sleeper: Send {
    fn sleep(&self, duration: Duration);
}

/// Blocks the calling thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Blocking `reqwest` transport with a fixed per-request timeout
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .with_context(|| "Failed to create HTTP client")?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, url: &str, params: &[(&str, &str)]) -> Result<RawResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .map_err(|e| TransportError(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| TransportError(format!("failed to read response body: {e}")))?;
        Ok(RawResponse { status, body })
    }
}

/// Attempt budget and backoff steps; the n-th retry waits `step × n`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub network_backoff: Duration,
    pub rate_limit_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            network_backoff: Duration::from_millis(800),
            rate_limit_backoff: Duration::from_millis(1200),
        }
    }
}

/// JSON GET client with retry and error normalization
pub struct Fetcher {
    transport: Box<dyn HttpTransport>,
    sleeper: Box<dyn Sleeper>,
    policy: RetryPolicy,
}

impl Fetcher {
    /// Create a fetcher backed by `reqwest` from HTTP settings
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(
            Duration::from_secs(config.timeout_seconds.into()),
            &config.user_agent,
        )?;
        let policy = RetryPolicy {
            max_attempts: config.max_attempts,
            ..RetryPolicy::default()
        };
        Ok(Self::with_transport(
            Box::new(transport),
            Box::new(ThreadSleeper),
            policy,
        ))
    }

    #[must_use]
    pub fn with_transport(
        transport: Box<dyn HttpTransport>,
        sleeper: Box<dyn Sleeper>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            sleeper,
            policy,
        }
    }

    /// GET `url` with `params` and decode the body as JSON
    #[instrument(skip(self, params), fields(url = %url))]
    pub fn get_json(&self, url: &str, params: &[(&str, &str)]) -> Result<Value, FetchError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let request_start = Instant::now();
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!("Making HTTP request (attempt {}/{})", attempt, max_attempts);

            let backoff = match self.transport.get(url, params) {
                Ok(response) if (200..300).contains(&response.status) => {
                    info!(
                        "Successful request in {:.3}s (attempt {})",
                        request_start.elapsed().as_secs_f64(),
                        attempt
                    );
                    return parse_json_body(&response.body);
                }
                Ok(response) if response.status == 429 => {
                    warn!("Rate limited (HTTP 429) on attempt {}", attempt);
                    if attempt >= max_attempts {
                        error!("Rate limit persisted after {} attempts", attempt);
                        return Err(FetchError::RateLimited { attempts: attempt });
                    }
                    self.policy.rate_limit_backoff * attempt
                }
                Ok(response) => {
                    let message = upstream_message(response.status, &response.body);
                    warn!("HTTP {} from upstream: {}", response.status, message);
                    return Err(FetchError::Upstream {
                        status: response.status,
                        message,
                    });
                }
                Err(e) => {
                    warn!("Network error on attempt {}: {}", attempt, e);
                    if attempt >= max_attempts {
                        error!("Network error after {} attempts: {}", attempt, e);
                        return Err(FetchError::Network {
                            attempts: attempt,
                            message: e.0,
                        });
                    }
                    self.policy.network_backoff * attempt
                }
            };

            debug!("Backing off {:.1}s before retry", backoff.as_secs_f64());
            self.sleeper.sleep(backoff);
        }
    }
}

fn parse_json_body(body: &str) -> Result<Value, FetchError> {
    serde_json::from_str(body).map_err(|e| {
        error!("Failed to parse JSON response: {}", e);
        FetchError::MalformedResponse {
            snippet: truncate_chars(body, MALFORMED_SNIPPET_LIMIT),
        }
    })
}

/// Readable message for a non-success response body
pub(crate) fn upstream_message(status: u16, body: &str) -> String {
    let text = json_error_message(body).unwrap_or_else(|| strip_html(body));
    let text = truncate_chars(text.trim(), UPSTREAM_MESSAGE_LIMIT);
    if text.is_empty() {
        reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("no response body")
            .to_string()
    } else {
        text
    }
}

fn json_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let candidates = [
        value.pointer("/error/message"),
        value.get("error"),
        value.get("message"),
        value.get("reason"),
        value.get("detail"),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(|v| v.as_str().map(collapse_whitespace))
}

fn strip_html(body: &str) -> String {
    let without_scripts = SCRIPT_BLOCK.replace_all(body, " ");
    let without_blocks = STYLE_BLOCK.replace_all(&without_scripts, " ");
    let without_tags = HTML_TAG.replace_all(&without_blocks, " ");
    let decoded = without_tags
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    collapse_whitespace(&decoded)
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
