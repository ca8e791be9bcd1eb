//! Shared fixtures for unit tests.

use crate::models::{Post, PostType};
use chrono::{DateTime, TimeZone, Utc};

/// Fixed "now" used across the unit tests: Tuesday 2025-05-06 12:00 UTC.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 6, 12, 0, 0).unwrap()
}

/// A bare post with a platform id and nothing else filled in.
pub fn sample_post(id: &str) -> Post {
    let t = fixed_now();
    Post {
        id: id.to_string(),
        id_generated: false,
        group_id: "123".to_string(),
        author_name: None,
        author_id: None,
        content: String::new(),
        url: String::new(),
        post_time: t,
        post_time_estimated: true,
        captured_at: t,
        likes: 0,
        comments: 0,
        shares: 0,
        media: vec![],
        mentions: vec![],
        hashtags: vec![],
        links: vec![],
        post_type: PostType::Text,
        media_count: 0,
    }
}
