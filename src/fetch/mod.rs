//! Page fetching with retries and per-attempt timeouts.
//!
//! This module owns everything that touches the network on the way to the
//! extraction core. The core itself never fetches; it receives HTML strings.
//!
//! # Architecture
//!
//! - [`FetchHtml`]: core trait, one URL in, one HTML document out
//! - [`StaticFetcher`]: plain HTTP GET with session cookies
//! - [`RenderedFetcher`]: headless-browser render service
//! - [`Fetcher`]: dispatches a [`FetchTarget`] to the right fetcher by mode
//! - [`RetryFetch`]: decorator adding timeouts and exponential backoff to
//!   any [`FetchHtml`]
//!
//! # Retry Strategy
//!
//! - Every attempt is bounded by `tokio::time::timeout`
//! - Exponential backoff from a base delay, capped at 30 seconds
//! - Random jitter (0-250ms) added to each delay
//! - Only retryable errors (network, timeout, 429, 5xx) are retried

pub mod rendered;
pub mod session;
pub mod static_fetch;

pub use rendered::RenderedFetcher;
pub use session::Session;
pub use static_fetch::StaticFetcher;

use crate::config::PlatformConfig;
use crate::error::FetchError;
use rand::{Rng, rng};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::{sleep, timeout};
use tracing::{error, instrument, warn};

/// How a target is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchMode {
    Static,
    Rendered,
}

impl FetchMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Rendered => "rendered",
        }
    }
}

/// One URL variant of a group page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTarget {
    pub url: String,
    pub mode: FetchMode,
    /// Name of the fetch strategy, for logs and outcome reporting.
    pub label: &'static str,
}

impl FetchTarget {
    pub fn new(url: impl Into<String>, mode: FetchMode, label: &'static str) -> Self {
        Self {
            url: url.into(),
            mode,
            label,
        }
    }
}

/// Fetch one HTML document.
pub trait FetchHtml {
    async fn fetch(&self, target: &FetchTarget) -> Result<String, FetchError>;
}

/// URL variants for one group, in strategy order.
///
/// Static variants always come first. Rendered variants are appended when
/// `rendered` is true.
pub fn group_targets(platform: &PlatformConfig, group_id: &str, rendered: bool) -> Vec<FetchTarget> {
    let mobile = platform.mobile_url.trim_end_matches('/');
    let basic = platform.basic_url.trim_end_matches('/');
    let desktop = platform.base_url.trim_end_matches('/');

    let mut targets = vec![
        FetchTarget::new(format!("{mobile}/groups/{group_id}"), FetchMode::Static, "mobile_feed"),
        FetchTarget::new(
            format!("{mobile}/groups/{group_id}/posts"),
            FetchMode::Static,
            "mobile_posts",
        ),
        FetchTarget::new(format!("{basic}/groups/{group_id}"), FetchMode::Static, "basic_feed"),
        FetchTarget::new(
            format!("{desktop}/groups/{group_id}?sorting_setting=CHRONOLOGICAL"),
            FetchMode::Static,
            "desktop_chronological",
        ),
    ];
    if rendered {
        targets.extend([
            FetchTarget::new(format!("{mobile}/groups/{group_id}"), FetchMode::Rendered, "rendered_mobile"),
            FetchTarget::new(format!("{basic}/groups/{group_id}"), FetchMode::Rendered, "rendered_basic"),
            FetchTarget::new(format!("{desktop}/groups/{group_id}"), FetchMode::Rendered, "rendered_desktop"),
        ]);
    }
    targets
}

/// Whether a response body is plausibly an HTML page.
pub fn looks_like_html(body: &str) -> bool {
    let head: String = body.chars().take(4096).collect::<String>().to_ascii_lowercase();
    head.contains("<html") || head.contains("<!doctype")
}

/// Routes each target to the static or the rendered fetcher.
#[derive(Debug)]
pub struct Fetcher {
    static_fetcher: StaticFetcher,
    rendered: Option<RenderedFetcher>,
}

impl Fetcher {
    pub fn new(static_fetcher: StaticFetcher, rendered: Option<RenderedFetcher>) -> Self {
        Self {
            static_fetcher,
            rendered,
        }
    }

    pub fn renders(&self) -> bool {
        self.rendered.is_some()
    }
}

impl FetchHtml for Fetcher {
    async fn fetch(&self, target: &FetchTarget) -> Result<String, FetchError> {
        match target.mode {
            FetchMode::Static => self.static_fetcher.fetch(target).await,
            FetchMode::Rendered => match &self.rendered {
                Some(r) => r.fetch(target).await,
                None => Err(FetchError::NotConfigured {
                    mode: FetchMode::Rendered.as_str(),
                }),
            },
        }
    }
}

/// Adds per-attempt timeouts and exponential backoff to any [`FetchHtml`].
///
/// The delay between retries follows:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryFetch<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
    attempt_timeout: StdDuration,
}

impl<T> RetryFetch<T>
where
    T: FetchHtml,
{
    /// Wrap `inner` with per-attempt timeouts and exponential backoff.
    ///
    /// # Arguments
    ///
    /// * `inner` - The fetcher to retry
    /// * `max_retries` - Retries after the first attempt (0 = single attempt)
    /// * `base_delay` - Delay before the first retry; doubled per retry, capped at 30s
    /// * `attempt_timeout` - Upper bound on one attempt, after which it counts as a timeout
    ///
    /// # Returns
    ///
    /// A `RetryFetch` that retries only errors for which
    /// [`FetchError::is_retryable`] holds.
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration, attempt_timeout: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
            attempt_timeout,
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    fn backoff(&self, attempt: usize) -> StdDuration {
        let shift = (attempt.saturating_sub(1)).min(16) as u32;
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + StdDuration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("attempt_timeout", &self.attempt_timeout)
            .finish()
    }
}

impl<T> FetchHtml for RetryFetch<T>
where
    T: FetchHtml,
{
    #[instrument(level = "info", skip_all, fields(url = %target.url, label = target.label))]
    async fn fetch(&self, target: &FetchTarget) -> Result<String, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            let result = match timeout(self.attempt_timeout, self.inner.fetch(target)).await {
                Ok(r) => r,
                Err(_) => Err(FetchError::Timeout {
                    url: target.url.clone(),
                    secs: self.attempt_timeout.as_secs(),
                }),
            };

            let e = match result {
                Ok(body) => return Ok(body),
                Err(e) => e,
            };
            attempt += 1;
            let attempt_dt = attempt_t0.elapsed();
            let total_dt = total_t0.elapsed();

            if !e.is_retryable() || attempt > self.max_retries {
                error!(
                    attempt,
                    max = self.max_retries,
                    retryable = e.is_retryable(),
                    elapsed_ms_attempt = attempt_dt.as_millis(),
                    elapsed_ms_total = total_dt.as_millis(),
                    error = %e,
                    "fetch() giving up"
                );
                return Err(e);
            }

            let delay = self.backoff(attempt);
            warn!(
                attempt,
                max = self.max_retries,
                elapsed_ms_attempt = attempt_dt.as_millis(),
                elapsed_ms_total = total_dt.as_millis(),
                ?delay,
                error = %e,
                "fetch() attempt failed; backing off"
            );
            sleep(delay).await;
        }
    }
}
