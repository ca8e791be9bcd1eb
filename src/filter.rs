//! Post filtering by engagement, recency, keywords and allow-lists.
//!
//! Each configured criterion is an independent predicate. A post passes
//! when every configured predicate passes. [`FilterStats`] counts the
//! failures of each predicate separately, so a post failing two predicates
//! is counted twice and the failure counts may add up to more than the
//! number of rejected posts.

use crate::models::{FilterCriteria, Post};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Per-predicate failure tallies for one [`apply`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterStats {
    pub total: usize,
    pub passed: usize,
    pub failed_likes: usize,
    pub failed_comments: usize,
    pub failed_shares: usize,
    pub failed_time: usize,
    pub failed_keywords: usize,
    pub failed_excluded: usize,
    pub failed_group: usize,
    pub failed_author: usize,
}

impl fmt::Display for FilterStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} passed (likes: {}, comments: {}, shares: {}, time: {}, keywords: {}, excluded: {}, group: {}, author: {})",
            self.passed,
            self.total,
            self.failed_likes,
            self.failed_comments,
            self.failed_shares,
            self.failed_time,
            self.failed_keywords,
            self.failed_excluded,
            self.failed_group,
            self.failed_author,
        )
    }
}

/// Outcome of every predicate for one post. Unconfigured predicates pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checks {
    pub likes: bool,
    pub comments: bool,
    pub shares: bool,
    pub time: bool,
    pub keywords: bool,
    pub excluded: bool,
    pub group: bool,
    pub author: bool,
}

impl Checks {
    pub fn passed(&self) -> bool {
        self.likes
            && self.comments
            && self.shares
            && self.time
            && self.keywords
            && self.excluded
            && self.group
            && self.author
    }
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles
        .iter()
        .map(|n| n.trim().to_lowercase())
        .filter(|n| !n.is_empty())
        .any(|n| haystack.contains(&n))
}

/// Evaluate every predicate of `criteria` against `post`.
pub fn evaluate(post: &Post, criteria: &FilterCriteria, now: DateTime<Utc>) -> Checks {
    let likes = criteria.min_likes.is_none_or(|min| post.likes >= min)
        && criteria.max_likes.is_none_or(|max| post.likes <= max);
    let comments = criteria.min_comments.is_none_or(|min| post.comments >= min);
    let shares = criteria.min_shares.is_none_or(|min| post.shares >= min);

    let time = criteria
        .days_back
        .is_none_or(|days| post.post_time >= now - Duration::days(i64::from(days)))
        && criteria.start_date.is_none_or(|start| post.post_time >= start)
        && criteria.end_date.is_none_or(|end| post.post_time <= end);

    let text = post.content.to_lowercase();
    let keywords = criteria.keywords.is_empty() || contains_any(&text, &criteria.keywords);
    let excluded = !contains_any(&text, &criteria.exclude_keywords);

    let group = criteria.group_ids.is_empty() || criteria.group_ids.iter().any(|g| *g == post.group_id);
    let author = criteria.author_names.is_empty()
        || post.author_name.as_deref().is_some_and(|name| {
            criteria
                .author_names
                .iter()
                .any(|a| a.trim().eq_ignore_ascii_case(name.trim()))
        });

    Checks {
        likes,
        comments,
        shares,
        time,
        keywords,
        excluded,
        group,
        author,
    }
}

/// Keep the posts passing every configured predicate.
///
/// # Arguments
///
/// * `posts` - Candidate posts, usually the output of [`crate::dedup::merge`]
/// * `criteria` - Predicates to apply; unset ones always pass
/// * `now` - Reference time for `days_back`
///
/// # Returns
///
/// The passing posts in input order, and a [`FilterStats`] tallying each
/// failed predicate separately. A post failing two predicates counts in
/// both tallies.
pub fn apply(posts: Vec<Post>, criteria: &FilterCriteria, now: DateTime<Utc>) -> (Vec<Post>, FilterStats) {
    let mut stats = FilterStats {
        total: posts.len(),
        ..FilterStats::default()
    };

    let kept: Vec<Post> = posts
        .into_iter()
        .filter(|post| {
            let checks = evaluate(post, criteria, now);
            stats.failed_likes += usize::from(!checks.likes);
            stats.failed_comments += usize::from(!checks.comments);
            stats.failed_shares += usize::from(!checks.shares);
            stats.failed_time += usize::from(!checks.time);
            stats.failed_keywords += usize::from(!checks.keywords);
            stats.failed_excluded += usize::from(!checks.excluded);
            stats.failed_group += usize::from(!checks.group);
            stats.failed_author += usize::from(!checks.author);
            checks.passed()
        })
        .collect();

    stats.passed = kept.len();
    debug!(%stats, "Applied filter");
    (kept, stats)
}
