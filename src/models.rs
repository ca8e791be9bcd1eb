//! Data models for scraped group posts.
//!
//! This module defines the records that flow out of the extraction core
//! and into the store:
//! - [`Post`]: one assembled, validated post
//! - [`MediaItem`] / [`MediaKind`]: images and videos attached to a post
//! - [`PostType`]: the derived text/image/video/link/mixed classification
//! - [`FilterCriteria`]: caller-supplied inclusion/exclusion rules
//!
//! Engagement counters are plain non-negative integers. Zero means
//! "unknown or none": the extractors cannot tell a post with no likes
//! apart from a post whose like count was not found on the page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An assembled post record.
///
/// Posts are built once by the assembler and never mutated afterwards,
/// except by the deduplicator which folds duplicate sightings together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Best-effort identifier. Platform-derived when possible, otherwise
    /// a generated fallback (see [`Post::id_generated`]).
    pub id: String,
    /// True when `id` is the hash fallback rather than a platform id.
    pub id_generated: bool,
    /// The group the post was scraped from.
    pub group_id: String,
    /// Display name of the author, if one was found.
    pub author_name: Option<String>,
    /// Profile identifier parsed from the author link, if any.
    pub author_id: Option<String>,
    /// Raw text content, whitespace-collapsed. May be empty.
    pub content: String,
    /// Canonical URL of the post.
    pub url: String,
    /// When the post was published (best effort).
    pub post_time: DateTime<Utc>,
    /// True when `post_time` is the capture time fallback.
    pub post_time_estimated: bool,
    /// When the extraction run that produced this record started.
    pub captured_at: DateTime<Utc>,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    /// Images and videos in document order.
    pub media: Vec<MediaItem>,
    pub mentions: Vec<String>,
    pub hashtags: Vec<String>,
    /// External links, with redirect wrappers already unwrapped.
    pub links: Vec<String>,
    pub post_type: PostType,
    /// Number of images plus videos.
    pub media_count: usize,
}

impl Post {
    /// Image attachments, in document order.
    pub fn images(&self) -> impl Iterator<Item = &MediaItem> {
        self.media.iter().filter(|m| m.kind == MediaKind::Image)
    }

    /// Video attachments, in document order.
    pub fn videos(&self) -> impl Iterator<Item = &MediaItem> {
        self.media.iter().filter(|m| m.kind == MediaKind::Video)
    }

    pub fn total_engagement(&self) -> u64 {
        self.likes
            .saturating_add(self.comments)
            .saturating_add(self.shares)
    }

    /// A post is valid when it has an identifier and at least one of:
    /// content, an author, positive engagement, or media.
    pub fn is_valid(&self) -> bool {
        if self.id.trim().is_empty() {
            return false;
        }
        !self.content.trim().is_empty()
            || self.author_name.as_deref().is_some_and(|a| !a.trim().is_empty())
            || self.total_engagement() > 0
            || !self.media.is_empty()
    }

    /// Recompute `post_type` and `media_count` from the media and links.
    pub fn refresh_derived(&mut self) {
        let images = self.images().count();
        let videos = self.videos().count();
        self.media_count = images + videos;
        self.post_type = PostType::classify(images > 0, videos > 0, !self.links.is_empty());
    }

    /// Key used to recognise duplicate sightings of the same post.
    ///
    /// Generated identifiers are weak, so they are qualified by author.
    pub fn dedup_key(&self) -> (String, String) {
        if self.id_generated {
            (
                self.id.clone(),
                self.author_name.clone().unwrap_or_default(),
            )
        } else {
            (self.id.clone(), String::new())
        }
    }
}

/// Kind of a media attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

/// An image or video attached to a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub url: String,
    pub kind: MediaKind,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub description: Option<String>,
    /// Poster frame for videos.
    pub thumbnail: Option<String>,
}

impl MediaItem {
    pub fn new(url: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            url: url.into(),
            kind,
            width: None,
            height: None,
            description: None,
            thumbnail: None,
        }
    }
}

/// Derived classification of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    #[default]
    Text,
    Image,
    Video,
    Link,
    Mixed,
}

impl PostType {
    /// Video and image together are "mixed"; otherwise video beats image,
    /// image beats link, and anything else is plain text.
    pub fn classify(has_image: bool, has_video: bool, has_link: bool) -> Self {
        match (has_image, has_video) {
            (true, true) => Self::Mixed,
            (false, true) => Self::Video,
            (true, false) => Self::Image,
            (false, false) if has_link => Self::Link,
            (false, false) => Self::Text,
        }
    }

    /// Inverse of [`PostType::as_str`].
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            "link" => Some(Self::Link),
            "mixed" => Some(Self::Mixed),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
            Self::Link => "link",
            Self::Mixed => "mixed",
        }
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied inclusion/exclusion rules.
///
/// Every field is optional; an unset threshold or an empty list means the
/// corresponding predicate is not configured and always passes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    pub min_likes: Option<u64>,
    pub max_likes: Option<u64>,
    pub min_comments: Option<u64>,
    pub min_shares: Option<u64>,
    /// Only keep posts newer than this many days.
    pub days_back: Option<u32>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// Keep posts containing at least one of these (case-insensitive).
    pub keywords: Vec<String>,
    /// Drop posts containing any of these (case-insensitive).
    pub exclude_keywords: Vec<String>,
    pub group_ids: Vec<String>,
    /// Author allow-list, compared case-insensitively.
    pub author_names: Vec<String>,
}
