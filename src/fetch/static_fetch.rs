//! Plain HTTP fetching of group pages.

use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::fetch::{FetchHtml, FetchTarget, Session, looks_like_html};
use reqwest::header::{self, HeaderMap, HeaderValue};
use tracing::{debug, instrument};

/// Headers a desktop browser sends with a top-level navigation.
pub fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("none"));
    headers
}

/// Build the shared HTTP client from the fetch settings.
pub fn build_client(config: &FetchConfig) -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .default_headers(browser_headers())
        .timeout(config.request_timeout())
        .gzip(true)
        .deflate(true)
        .build()
        .map_err(|e| FetchError::Client(e.to_string()))
}

#[derive(Debug, Clone)]
pub struct StaticFetcher {
    client: reqwest::Client,
    cookie_header: Option<String>,
    timeout_secs: u64,
}

impl StaticFetcher {
    pub fn new(config: &FetchConfig, session: Option<&Session>) -> Result<Self, FetchError> {
        Ok(Self {
            client: build_client(config)?,
            cookie_header: session.map(Session::cookie_header).filter(|h| !h.is_empty()),
            timeout_secs: config.request_timeout_secs,
        })
    }

    fn map_error(&self, url: &str, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                secs: self.timeout_secs,
            }
        } else {
            FetchError::Network {
                url: url.to_string(),
                message: e.to_string(),
            }
        }
    }
}

impl FetchHtml for StaticFetcher {
    #[instrument(level = "debug", skip_all, fields(url = %target.url))]
    async fn fetch(&self, target: &FetchTarget) -> Result<String, FetchError> {
        let mut request = self.client.get(&target.url);
        if let Some(cookies) = &self.cookie_header {
            request = request.header(header::COOKIE, cookies);
        }

        let resp = request.send().await.map_err(|e| self.map_error(&target.url, e))?;
        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchError::Status {
                url: target.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = resp.text().await.map_err(|e| self.map_error(&target.url, e))?;
        if !looks_like_html(&body) {
            return Err(FetchError::NotHtml {
                url: target.url.clone(),
            });
        }
        debug!(bytes = body.len(), "Fetched page");
        Ok(body)
    }
}
