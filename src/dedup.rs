//! Merging duplicate sightings of the same post.
//!
//! Different URL variants of one group page overlap heavily, and each may
//! capture a different subset of a post's fields. [`merge`] folds every
//! sighting of a post into one record:
//!
//! - author, content and URL: first non-empty value seen
//! - likes, comments, shares: the maximum observed
//! - media and entities: union, in order of first appearance
//! - post time: a parsed time beats the capture-time estimate
//!
//! Posts keep the order in which their first sighting appeared. Merging
//! an already-merged list returns it unchanged.

use crate::models::Post;
use std::collections::HashMap;
use tracing::debug;

/// Merge any number of post lists into one deduplicated list.
///
/// # Arguments
///
/// * `lists` - Post lists in strategy order; earlier lists win ties on text
///
/// # Returns
///
/// One post per dedup key, in order of first sighting, with counters at
/// their maximum across sightings.
pub fn merge<L>(lists: impl IntoIterator<Item = L>) -> Vec<Post>
where
    L: IntoIterator<Item = Post>,
{
    let mut merged: Vec<Post> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut seen = 0usize;

    for post in lists.into_iter().flatten() {
        seen += 1;
        match index.get(&post.dedup_key()) {
            Some(&i) => fold(&mut merged[i], post),
            None => {
                index.insert(post.dedup_key(), merged.len());
                merged.push(post);
            }
        }
    }

    debug!(seen, unique = merged.len(), "Merged post sightings");
    merged
}

fn fill_empty(slot: &mut String, other: String) {
    if slot.trim().is_empty() && !other.trim().is_empty() {
        *slot = other;
    }
}

fn fill_none(slot: &mut Option<String>, other: Option<String>) {
    if slot.as_deref().is_none_or(|s| s.trim().is_empty()) {
        if let Some(v) = other.filter(|v| !v.trim().is_empty()) {
            *slot = Some(v);
        }
    }
}

fn union<T: PartialEq>(into: &mut Vec<T>, other: Vec<T>) {
    for item in other {
        if !into.contains(&item) {
            into.push(item);
        }
    }
}

/// Fold a later sighting into the first one.
fn fold(into: &mut Post, other: Post) {
    fill_none(&mut into.author_name, other.author_name);
    fill_none(&mut into.author_id, other.author_id);
    fill_empty(&mut into.content, other.content);
    fill_empty(&mut into.url, other.url);

    if into.post_time_estimated && !other.post_time_estimated {
        into.post_time = other.post_time;
        into.post_time_estimated = false;
    }

    into.likes = into.likes.max(other.likes);
    into.comments = into.comments.max(other.comments);
    into.shares = into.shares.max(other.shares);

    for item in other.media {
        if !into.media.iter().any(|m| m.url == item.url) {
            into.media.push(item);
        }
    }
    union(&mut into.mentions, other.mentions);
    union(&mut into.hashtags, other.hashtags);
    union(&mut into.links, other.links);

    into.refresh_derived();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MediaItem, MediaKind, PostType};
    use crate::testing::{fixed_now, sample_post};
    use chrono::Duration;

    fn with_likes(id: &str, likes: u64) -> Post {
        let mut p = sample_post(id);
        p.likes = likes;
        p
    }

    #[test]
    fn test_max_engagement_not_sum_or_last() {
        let mut a = with_likes("1", 5);
        a.comments = 9;
        let mut b = with_likes("1", 12);
        b.comments = 2;
        b.shares = 1;

        let merged = merge([vec![a], vec![b]]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].likes, 12);
        assert_eq!(merged[0].comments, 9);
        assert_eq!(merged[0].shares, 1);

        let merged = merge([vec![with_likes("1", 12)], vec![with_likes("1", 5)]]);
        assert_eq!(merged[0].likes, 12);
    }

    #[test]
    fn test_first_non_empty_fields_and_order() {
        let a = sample_post("1");
        let mut b = sample_post("2");
        b.content = "second".into();
        let mut a2 = sample_post("1");
        a2.content = "late content".into();
        a2.author_name = Some("Jane".into());

        let merged = merge([vec![a, b], vec![a2]]);
        let ids: Vec<_> = merged.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(merged[0].content, "late content");
        assert_eq!(merged[0].author_name.as_deref(), Some("Jane"));
    }

    #[test]
    fn test_media_union_and_derived_fields() {
        let mut a = sample_post("1");
        a.content = "x".into();
        let mut b = a.clone();
        b.media.push(MediaItem::new("https://scontent.fbcdn.net/a.jpg", MediaKind::Image));
        b.refresh_derived();
        let mut c = b.clone();
        c.media.push(MediaItem::new("https://video.fbcdn.net/b.mp4", MediaKind::Video));

        let merged = merge([vec![a], vec![b], vec![c]]);
        assert_eq!(merged[0].media_count, 2);
        assert_eq!(merged[0].post_type, PostType::Mixed);
    }

    #[test]
    fn test_real_timestamp_beats_estimate() {
        let a = sample_post("1");
        let mut b = sample_post("1");
        b.post_time = fixed_now() - Duration::hours(3);
        b.post_time_estimated = false;

        let merged = merge([vec![a], vec![b]]);
        assert_eq!(merged[0].post_time, fixed_now() - Duration::hours(3));
        assert!(!merged[0].post_time_estimated);
    }

    #[test]
    fn test_generated_ids_are_qualified_by_author() {
        let mut a = with_likes("g", 1);
        a.id_generated = true;
        a.author_name = Some("Jane".into());
        let mut b = a.clone();
        b.author_name = Some("Sam".into());

        assert_eq!(merge([vec![a.clone(), b]]).len(), 2);
        assert_eq!(merge([vec![a.clone(), a]]).len(), 1);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut a = with_likes("1", 5);
        a.hashtags = vec!["x".into()];
        let mut b = with_likes("1", 8);
        b.hashtags = vec!["y".into(), "x".into()];
        let c = with_likes("2", 3);

        let once = merge([vec![a, c], vec![b]]);
        let twice = merge([once.clone()]);
        assert_eq!(once, twice);
        assert_eq!(once[0].hashtags, vec!["x", "y"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(merge(Vec::<Vec<Post>>::new()).is_empty());
    }
}
