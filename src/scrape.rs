//! Group scraping pipeline: fetch every URL variant of a group, extract,
//! merge, filter and save.

use crate::config::{Config, GroupConfig, PlatformConfig};
use crate::dedup;
use crate::error::{FetchError, StoreError};
use crate::extract::{self, ExtractionReport, assembler::AssemblyContext};
use crate::fetch::{FetchHtml, FetchTarget, Fetcher, RenderedFetcher, RetryFetch, Session, StaticFetcher, group_targets};
use crate::filter::{self, FilterStats};
use crate::models::FilterCriteria;
use crate::store::PostStore;
use crate::utils::truncate_for_log;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// What one group run did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupOutcome {
    pub group_id: String,
    pub group_name: String,
    /// Labels of the fetch strategies tried, in strategy order.
    pub attempted: Vec<&'static str>,
    /// Labels of the strategies whose document was extracted.
    pub succeeded: Vec<&'static str>,
    /// Posts extracted over all documents, before merging.
    pub extracted: usize,
    pub merged: usize,
    pub filter: FilterStats,
    pub saved: usize,
}

/// Build the production fetcher stack: static and rendered fetching behind
/// one retrying dispatcher.
pub fn build_fetcher(config: &Config, session: Option<&Session>) -> Result<RetryFetch<Fetcher>, FetchError> {
    let static_fetcher = StaticFetcher::new(&config.fetch, session)?;
    let rendered = RenderedFetcher::from_config(&config.render, &config.fetch, session)?;
    Ok(RetryFetch::new(
        Fetcher::new(static_fetcher, rendered),
        config.fetch.max_retries,
        config.fetch.base_backoff(),
        config.fetch.attempt_timeout(),
    ))
}

pub struct GroupScraper<F> {
    fetcher: F,
    store: PostStore,
    platform: PlatformConfig,
    criteria: FilterCriteria,
    concurrency: usize,
    group_delay: Duration,
    rendered: bool,
}

impl<F> GroupScraper<F>
where
    F: FetchHtml,
{
    /// `rendered` adds the rendered URL variants to every group.
    pub fn new(fetcher: F, store: PostStore, config: &Config, rendered: bool) -> Self {
        Self {
            fetcher,
            store,
            platform: config.platform.clone(),
            criteria: config.filter.clone(),
            concurrency: config.fetch.concurrency.max(1),
            group_delay: config.fetch.group_delay(),
            rendered,
        }
    }

    pub fn store(&self) -> &PostStore {
        &self.store
    }

    /// Scrape every group in order, pausing between groups.
    ///
    /// A group that fails to save is logged and skipped.
    #[instrument(level = "info", skip_all, fields(groups = groups.len()))]
    pub async fn scrape_all(&self, groups: &[GroupConfig]) -> Vec<GroupOutcome> {
        let mut outcomes = Vec::with_capacity(groups.len());
        for (i, group) in groups.iter().enumerate() {
            if i > 0 && !self.group_delay.is_zero() {
                debug!(delay = ?self.group_delay, "Pausing between groups");
                sleep(self.group_delay).await;
            }
            match self.scrape_group(group).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => error!(group_id = %group.id, error = %e, "Failed to scrape group"),
            }
        }
        outcomes
    }

    pub async fn scrape_group(&self, group: &GroupConfig) -> Result<GroupOutcome, StoreError> {
        self.scrape_group_at(group, Utc::now()).await
    }

    /// Scrape one group with `captured_at` as the run's capture time.
    #[instrument(level = "info", skip_all, fields(group_id = %group.id))]
    pub async fn scrape_group_at(
        &self,
        group: &GroupConfig,
        captured_at: DateTime<Utc>,
    ) -> Result<GroupOutcome, StoreError> {
        let targets = group_targets(&self.platform, &group.id, self.rendered);
        let mut outcome = GroupOutcome {
            group_id: group.id.clone(),
            attempted: targets.iter().map(|t| t.label).collect(),
            ..GroupOutcome::default()
        };

        let documents = self.fetch_all(&targets).await;
        let ctx = AssemblyContext::new(&group.id, captured_at);

        let mut first_title = None;
        let mut lists = Vec::with_capacity(documents.len());
        for (target, html) in &documents {
            match extract::extract_report(html, &ctx) {
                Ok(ExtractionReport {
                    strategy, posts, discarded, ..
                }) => {
                    info!(
                        label = target.label,
                        locator = strategy.unwrap_or("none"),
                        posts = posts.len(),
                        discarded,
                        "Extracted posts"
                    );
                    if first_title.is_none() {
                        first_title = extract::group_name_from_html(html);
                    }
                    outcome.succeeded.push(target.label);
                    outcome.extracted += posts.len();
                    lists.push(posts);
                }
                Err(e) => warn!(label = target.label, url = %target.url, error = %e, "Unreadable document"),
            }
        }

        outcome.group_name = group
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .or(first_title)
            .unwrap_or_else(|| format!("Group_{}", group.id));

        if outcome.succeeded.is_empty() {
            warn!(group_id = %group.id, "No posts retrieved");
            return Ok(outcome);
        }

        let merged = dedup::merge(lists);
        outcome.merged = merged.len();

        let (kept, stats) = filter::apply(merged, &self.criteria, captured_at);
        outcome.filter = stats;
        outcome.saved = self.store.save_all(&kept, &outcome.group_name, captured_at).await?;

        info!(
            group_name = %truncate_for_log(&outcome.group_name, 80),
            strategies = outcome.succeeded.len(),
            extracted = outcome.extracted,
            merged = outcome.merged,
            %stats,
            saved = outcome.saved,
            "Scraped group"
        );
        Ok(outcome)
    }

    /// Fetch targets concurrently; failures are logged and dropped.
    /// Successful documents come back in strategy order.
    async fn fetch_all<'t>(&self, targets: &'t [FetchTarget]) -> Vec<(&'t FetchTarget, String)> {
        let mut fetched: Vec<(usize, &FetchTarget, String)> = stream::iter(targets.iter().enumerate())
            .map(|(i, target)| async move {
                match self.fetcher.fetch(target).await {
                    Ok(html) => Some((i, target, html)),
                    Err(e) => {
                        warn!(label = target.label, url = %target.url, error = %e, "Fetch strategy failed");
                        None
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .filter_map(|r| async move { r })
            .collect()
            .await;

        fetched.sort_by_key(|(i, _, _)| *i);
        fetched.into_iter().map(|(_, t, html)| (t, html)).collect()
    }
}
