//! Query parameters and result shapes of the store's read side.
//!
//! Every time-windowed query measures the window on `scraped_at`, not on the
//! post time, and takes `now` explicitly.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Likes at or above which a post counts as high engagement.
pub const HIGH_ENGAGEMENT_LIKES: u64 = 1000;

/// Window, in days, of the summary statistics.
pub const STATS_WINDOW_DAYS: u32 = 5;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

/// Page through records by likes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    pub page: usize,
    pub page_size: usize,
    pub min_likes: u64,
    /// Only records scraped within this many days; `None` for all.
    pub window_days: Option<u32>,
}

impl PageQuery {
    /// Build a query, clamping out-of-range paging values.
    ///
    /// A page below 1 becomes 1; a page size outside `1..=100` becomes 20.
    pub fn new(page: usize, page_size: usize, min_likes: u64, window_days: Option<u32>) -> Self {
        Self {
            page: page.max(1),
            page_size: if (1..=MAX_PAGE_SIZE).contains(&page_size) {
                page_size
            } else {
                DEFAULT_PAGE_SIZE
            },
            min_likes,
            window_days,
        }
    }

    pub fn offset(&self) -> usize {
        (self.page - 1) * self.page_size
    }

    /// Number of pages needed for `total` matching records.
    pub fn total_pages(&self, total: usize) -> usize {
        total.div_ceil(self.page_size)
    }
}

/// Start of a window of `days` days ending at `now`; `None` for no window.
pub fn window_start(days: Option<u32>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    days.map(|d| now - Duration::days(i64::from(d)))
}

/// Aggregate statistics over the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStats {
    pub total_posts: usize,
    pub high_engagement_posts: usize,
    pub average_likes: f64,
    pub top_group: Option<String>,
    pub last_scraped_at: Option<DateTime<Utc>>,
    pub groups_scraped: usize,
    pub posts_by_type: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorStats {
    pub author_name: String,
    pub post_count: usize,
    pub avg_likes: f64,
}

/// Engagement of the records scraped on one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTrend {
    pub date: NaiveDate,
    pub posts_count: usize,
    pub avg_likes: f64,
    pub max_likes: u64,
}
