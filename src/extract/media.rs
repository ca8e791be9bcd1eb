//! Image and video attachments.

use super::dom::{Node, parse_selector};
use super::fields::absolutize;
use super::patterns::{CDN_HOSTS, PLATFORM_BASE};
use crate::models::{MediaItem, MediaKind};
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::Selector;
use url::Url;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "m4v", "m3u8"];

/// URL fragments that mark avatars, reaction emoji and UI sprites.
const URL_BLACKLIST: &[&str] = &["avatar", "profile", "emoji", "icon", "rsrc.php"];

/// Images smaller than this in either dimension are UI decoration.
const MIN_DIMENSION: u32 = 50;

struct Selectors {
    images: Selector,
    videos: Selector,
    sources: Selector,
    video_ids: Selector,
}

static SELECTORS: Lazy<Selectors> = Lazy::new(|| Selectors {
    images: parse_selector("img", "images"),
    videos: parse_selector("video", "videos"),
    sources: parse_selector("source[src]", "video sources"),
    video_ids: parse_selector("[data-video-id]", "video ids"),
});

/// Images then videos found under `node`, deduplicated by URL.
pub fn extract_media(node: Node<'_>) -> Vec<MediaItem> {
    let images = node.select(&SELECTORS.images).filter_map(image_item);
    let videos = node.select(&SELECTORS.videos).flat_map(video_items);
    let embedded = node
        .select(&SELECTORS.video_ids)
        .filter_map(|n| n.attr_nonempty("data-video-id"))
        .filter(|id| id.chars().all(|c| c.is_ascii_digit()))
        .map(|id| MediaItem::new(format!("{PLATFORM_BASE}/video.php?v={id}"), MediaKind::Video));

    images
        .chain(videos)
        .chain(embedded)
        .unique_by(|m| m.url.clone())
        .collect()
}

fn dimension(node: Node<'_>, attr: &str) -> Option<u32> {
    node.attr(attr)?.trim().trim_end_matches("px").parse().ok()
}

fn image_item(img: Node<'_>) -> Option<MediaItem> {
    let raw = img
        .attr_nonempty("src")
        .or_else(|| img.attr_nonempty("data-src"))?;
    let url = accept_url(raw, MediaKind::Image)?;

    let width = dimension(img, "width");
    let height = dimension(img, "height");
    if width.is_some_and(|w| w < MIN_DIMENSION) || height.is_some_and(|h| h < MIN_DIMENSION) {
        return None;
    }

    let mut item = MediaItem::new(url, MediaKind::Image);
    item.width = width;
    item.height = height;
    item.description = img.attr_nonempty("alt").map(str::to_string);
    Some(item)
}

fn video_items(video: Node<'_>) -> Vec<MediaItem> {
    let thumbnail = video
        .attr_nonempty("poster")
        .and_then(|p| accept_url(p, MediaKind::Image));

    std::iter::once(video)
        .filter_map(|v| v.attr_nonempty("src"))
        .chain(
            video
                .select(&SELECTORS.sources)
                .filter_map(|s| s.attr_nonempty("src")),
        )
        .filter_map(|raw| accept_url(raw, MediaKind::Video))
        .map(|url| {
            let mut item = MediaItem::new(url, MediaKind::Video);
            item.thumbnail = thumbnail.clone();
            item.width = dimension(video, "width");
            item.height = dimension(video, "height");
            item
        })
        .collect()
}

/// Absolute URL for `raw` if it passes the CDN/extension allow-lists and
/// the keyword blacklist.
pub(crate) fn accept_url(raw: &str, kind: MediaKind) -> Option<String> {
    if raw.trim_start().starts_with("data:") {
        return None;
    }
    let absolute = absolutize(raw)?;
    let lower = absolute.to_ascii_lowercase();
    if URL_BLACKLIST.iter().any(|k| lower.contains(k)) {
        return None;
    }

    let parsed = Url::parse(&absolute).ok()?;
    let on_cdn = parsed.host_str().is_some_and(|host| {
        CDN_HOSTS
            .iter()
            .any(|cdn| host == *cdn || host.ends_with(&format!(".{cdn}")))
    });
    let extensions = match kind {
        MediaKind::Image => IMAGE_EXTENSIONS,
        MediaKind::Video => VIDEO_EXTENSIONS,
    };
    let has_extension = parsed
        .path()
        .rsplit_once('.')
        .is_some_and(|(_, ext)| extensions.contains(&ext.to_ascii_lowercase().as_str()));

    (on_cdn || has_extension).then_some(absolute)
}
