//! Persistence of scraped posts.
//!
//! Posts are stored one row per post identifier in a SQLite database
//! ([`PostStore`]). Saving an identifier that already exists refreshes its
//! text and engagement counters and keeps everything else, so repeated
//! runs over the same group track how a post's engagement grows.
//!
//! Query parameters and result shapes live in [`query`]; [`export`]
//! renders records as CSV.

pub mod export;
pub mod query;
pub mod sqlite;

pub use export::export_csv;
pub use sqlite::{PostStore, Upsert};
pub use query::{AuthorStats, DailyTrend, PageQuery, StoreStats};

use crate::models::Post;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A post as persisted, with bookkeeping timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPost {
    #[serde(flatten)]
    pub post: Post,
    /// Display name of the group at the time of the first save.
    pub group_name: String,
    /// First time this post was saved.
    pub scraped_at: DateTime<Utc>,
    /// Last time this post was saved.
    pub updated_at: DateTime<Utc>,
}

impl StoredPost {
    pub fn new(post: Post, group_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            post,
            group_name: group_name.into(),
            scraped_at: now,
            updated_at: now,
        }
    }
}
