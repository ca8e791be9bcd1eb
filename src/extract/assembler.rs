//! Post assembly: run every field extractor over one candidate node and
//! decide whether the result is a post.

use super::dom::Node;
use super::entities::extract_entities;
use super::fields::{
    extract_author, extract_content, extract_engagement, extract_id, extract_permalink,
    extract_timestamp, generated_id,
};
use super::media::extract_media;
use super::patterns::PLATFORM_BASE;
use crate::models::{Post, PostType};
use chrono::{DateTime, Utc};
use tracing::trace;

/// Run-wide inputs shared by every candidate of one extraction.
#[derive(Debug, Clone)]
pub struct AssemblyContext {
    pub group_id: String,
    /// Capture time of the run: the "now" for relative timestamps and the
    /// fallback post time.
    pub captured_at: DateTime<Utc>,
}

impl AssemblyContext {
    pub fn new(group_id: impl Into<String>, captured_at: DateTime<Utc>) -> Self {
        Self {
            group_id: group_id.into(),
            captured_at,
        }
    }
}

/// Assemble a post from `node`, or `None` when the candidate fails the
/// validity rule. Rejection is routine and not logged above `trace`.
pub fn assemble(node: Node<'_>, ctx: &AssemblyContext) -> Option<Post> {
    let content = extract_content(node).unwrap_or_default();
    let author = extract_author(node);
    let engagement = extract_engagement(node);
    let media = extract_media(node);
    let entities = extract_entities(node, &content, author.as_ref().map(|a| a.name.as_str()));
    let permalink = extract_permalink(node);

    let (id, id_generated) = match extract_id(node) {
        Some(found) => (found.id, false),
        None => (generated_id(&ctx.group_id, &content, ctx.captured_at), true),
    };

    let (post_time, post_time_estimated) = match extract_timestamp(node, ctx.captured_at) {
        Some(t) => (t, false),
        None => (ctx.captured_at, true),
    };

    // A generated id has no post page; link the group instead.
    let url = match permalink.filter(|p| p.id == id) {
        Some(p) => p.url,
        None if id_generated => format!("{PLATFORM_BASE}/groups/{}", ctx.group_id),
        None => format!("{PLATFORM_BASE}/groups/{}/posts/{id}", ctx.group_id),
    };

    let (author_name, author_id) = match author {
        Some(a) => (Some(a.name), a.id),
        None => (None, None),
    };

    let mut post = Post {
        id,
        id_generated,
        group_id: ctx.group_id.clone(),
        author_name,
        author_id,
        content,
        url,
        post_time,
        post_time_estimated,
        captured_at: ctx.captured_at,
        likes: engagement.likes,
        comments: engagement.comments,
        shares: engagement.shares,
        media,
        mentions: entities.mentions,
        hashtags: entities.hashtags,
        links: entities.links,
        post_type: PostType::Text,
        media_count: 0,
    };
    post.refresh_derived();

    if !post.is_valid() {
        trace!(id = %post.id, "Discarding candidate without substance");
        return None;
    }
    Some(post)
}
