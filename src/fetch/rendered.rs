//! Rendered fetching through a Browserless-style `/content` service.
//!
//! The service loads the page in a headless browser with the session
//! cookies, scrolls according to the [`ScrollPolicy`] and returns the final
//! DOM as HTML.

use crate::config::{FetchConfig, RenderConfig, ScrollPolicy};
use crate::error::FetchError;
use crate::fetch::session::{COOKIE_DOMAIN, Session};
use crate::fetch::{FetchHtml, FetchTarget, looks_like_html};
use serde::Serialize;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderCookie {
    name: String,
    value: String,
    domain: String,
    path: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GotoOptions {
    wait_until: &'static str,
    timeout: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderRequest<'a> {
    url: &'a str,
    cookies: &'a [RenderCookie],
    user_agent: &'a str,
    goto_options: GotoOptions,
    wait_for_timeout: u64,
    add_script_tag: Vec<ScriptTag>,
}

#[derive(Debug, Clone, Serialize)]
struct ScriptTag {
    content: String,
}

/// Page script that scrolls the feed until `max_scrolls` is reached, the
/// page stops growing, or the oldest `data-utime` on the page is older than
/// `target_days`.
fn scroll_script(policy: &ScrollPolicy) -> String {
    format!(
        "(async () => {{ const cutoff = Date.now() / 1000 - {target_days} * 86400; \
         const oldest = () => Math.min(...Array.from(document.querySelectorAll('[data-utime]'), \
         e => Number(e.getAttribute('data-utime')) || Infinity)); \
         let last = 0; for (let i = 0; i < {max}; i++) {{ \
         window.scrollTo(0, document.body.scrollHeight); \
         await new Promise(r => setTimeout(r, {settle})); \
         if (document.body.scrollHeight === last || oldest() < cutoff) break; \
         last = document.body.scrollHeight; }} }})();",
        target_days = policy.target_days,
        max = policy.max_scrolls,
        settle = policy.settle_ms,
    )
}

#[derive(Debug, Clone)]
pub struct RenderedFetcher {
    client: reqwest::Client,
    endpoint: String,
    user_agent: String,
    cookies: Vec<RenderCookie>,
    scroll: ScrollPolicy,
    timeout_ms: u64,
}

impl RenderedFetcher {
    /// `None` when no render endpoint is configured.
    pub fn from_config(
        render: &RenderConfig,
        fetch: &FetchConfig,
        session: Option<&Session>,
    ) -> Result<Option<Self>, FetchError> {
        let Some(base) = render.endpoint.as_deref().filter(|e| !e.trim().is_empty()) else {
            return Ok(None);
        };

        let mut endpoint = format!("{}/content", base.trim_end_matches('/'));
        if let Some(token) = render.token.as_deref().filter(|t| !t.is_empty()) {
            endpoint.push_str(&format!("?token={}", urlencoding::encode(token)));
        }

        // One request covers the whole render, scroll loop included.
        let client = reqwest::Client::builder()
            .timeout(fetch.attempt_timeout())
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        let cookies = session
            .map(|s| {
                s.cookies()
                    .iter()
                    .map(|c| RenderCookie {
                        name: c.name.clone(),
                        value: c.value.clone(),
                        domain: if c.domain.is_empty() {
                            format!(".{COOKIE_DOMAIN}")
                        } else {
                            c.domain.clone()
                        },
                        path: if c.path.is_empty() { "/".into() } else { c.path.clone() },
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Some(Self {
            client,
            endpoint,
            user_agent: fetch.user_agent.clone(),
            cookies,
            scroll: render.scroll,
            timeout_ms: fetch.request_timeout().as_millis() as u64,
        }))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request<'a>(&'a self, url: &'a str) -> RenderRequest<'a> {
        RenderRequest {
            url,
            cookies: &self.cookies,
            user_agent: &self.user_agent,
            goto_options: GotoOptions {
                wait_until: "networkidle2",
                timeout: self.timeout_ms,
            },
            wait_for_timeout: self.scroll.settle_ms.saturating_mul(u64::from(self.scroll.max_scrolls.max(1))),
            add_script_tag: vec![ScriptTag {
                content: scroll_script(&self.scroll),
            }],
        }
    }
}

impl FetchHtml for RenderedFetcher {
    #[instrument(level = "debug", skip_all, fields(url = %target.url))]
    async fn fetch(&self, target: &FetchTarget) -> Result<String, FetchError> {
        let network = |e: reqwest::Error| FetchError::Network {
            url: target.url.clone(),
            message: e.to_string(),
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&self.request(&target.url))
            .send()
            .await
            .map_err(network)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: target.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = resp.text().await.map_err(network)?;
        if !looks_like_html(&body) {
            return Err(FetchError::NotHtml {
                url: target.url.clone(),
            });
        }
        debug!(bytes = body.len(), "Rendered page");
        Ok(body)
    }
}
