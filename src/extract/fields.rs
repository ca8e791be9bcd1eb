//! Per-field extractors.
//!
//! Each extractor runs against one candidate node and tries an ordered list
//! of lookups, returning the first usable value. A miss is `None` (or zero
//! for the engagement counters), never an error.

use super::dom::{Node, SelectorStrategy, StrategyTable, outermost, parse_selector};
use super::metrics::{parse_count, parse_time};
use super::patterns::{
    COMMENTS_AFTER, COMMENTS_BEFORE, COMMENTS_IN_TEXT, COMPACT_TIME_TOKEN, LIKES_AFTER,
    LIKES_BEFORE, LIKES_IN_TEXT, LONG_DIGITS, PERMALINK_PATTERNS, PLATFORM_BASE,
    PROFILE_ID_PATTERNS, SEE_MORE, SHARES_AFTER, SHARES_BEFORE, SHARES_IN_TEXT, STORY_TOKEN,
    TRACKING_ID, UI_ACTION_WORDS, WHITESPACE,
};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Selector;
use sha2::{Digest, Sha256};
use url::Url;

/// Content longer than this is assumed to have swallowed page chrome.
const CONTENT_LEAK_CHARS: usize = 2000;
/// Cut-off for leaked content when no clean segment is found.
const CONTENT_TRUNCATE_CHARS: usize = 1000;
const MAX_AUTHOR_CHARS: usize = 100;
/// Characters of content that feed a generated identifier.
const GENERATED_ID_CONTENT_CHARS: usize = 100;

/// Keys that carry a post identifier inside tracking data, best first.
const TRACKING_KEYS: &[&str] = &[
    "top_level_post_id",
    "mf_story_key",
    "story_fbid",
    "content_id",
    "post_id",
];

pub const AUTHOR_STRATEGIES: &[SelectorStrategy] = &[
    SelectorStrategy::new("heading_link", "h3 a, h4 a"),
    SelectorStrategy::new("minor_heading_link", "h2 a, h5 a"),
    SelectorStrategy::new("strong_link", "strong a"),
    SelectorStrategy::new("mobile_header", "header a strong, header h3"),
    SelectorStrategy::new("actor", ".actor a, a.actor-link"),
    SelectorStrategy::new("story_subtitle", "[data-testid='story-subtitle'] a"),
    SelectorStrategy::new("profile_link", ".profileLink, a[data-hovercard]"),
];

pub const CONTENT_STRATEGIES: &[SelectorStrategy] = &[
    SelectorStrategy::new("post_message", "[data-testid='post_message']"),
    SelectorStrategy::new("user_content", ".userContent"),
    SelectorStrategy::new("legacy_paragraphs", "._5pbx p"),
    SelectorStrategy::new("mobile_story_body", ".story_body_container > div"),
    SelectorStrategy::new("mobile_tracking_span", "div[data-ft] > span"),
    SelectorStrategy::new("auto_dir", "span[dir='auto'], div[dir='auto']"),
    SelectorStrategy::new("paragraphs", "p"),
];

/// Whole-area fallbacks, used when no dedicated content block matched.
pub const CONTENT_AREA_STRATEGIES: &[SelectorStrategy] = &[
    SelectorStrategy::new("legacy_area", "div._5pcr"),
    SelectorStrategy::new("mobile_area", "div.story_body_container"),
    SelectorStrategy::new("nested_article", "div[role='article']"),
    SelectorStrategy::new("tracking_area", "div[data-ft]"),
];

pub const TIMESTAMP_TEXT_STRATEGIES: &[SelectorStrategy] = &[
    SelectorStrategy::new("abbr", "abbr"),
    SelectorStrategy::new("time", "time"),
    SelectorStrategy::new("timestamp_content", ".timestampContent"),
    SelectorStrategy::new("story_subtitle", "[data-testid='story-subtitle'] a"),
];

pub const LIKE_COUNTERS: &[SelectorStrategy] = &[
    SelectorStrategy::new("testid", "[data-testid*='like']"),
    SelectorStrategy::new("legacy", "span.like_def, span._81hb, span._4arz"),
    SelectorStrategy::new("mobile", "[data-sigil*='reactions']"),
];

pub const COMMENT_COUNTERS: &[SelectorStrategy] = &[
    SelectorStrategy::new("testid", "[data-testid*='comment']"),
    SelectorStrategy::new("legacy", "a._3hg-, span._1whp"),
];

pub const SHARE_COUNTERS: &[SelectorStrategy] = &[
    SelectorStrategy::new("testid", "[data-testid*='share']"),
    SelectorStrategy::new("legacy", "span._355t, span._15ko"),
];

static AUTHORS: Lazy<StrategyTable> = Lazy::new(|| StrategyTable::compile(AUTHOR_STRATEGIES));
static CONTENT: Lazy<StrategyTable> = Lazy::new(|| StrategyTable::compile(CONTENT_STRATEGIES));
static CONTENT_AREAS: Lazy<StrategyTable> =
    Lazy::new(|| StrategyTable::compile(CONTENT_AREA_STRATEGIES));
static TIMESTAMP_TEXT: Lazy<StrategyTable> =
    Lazy::new(|| StrategyTable::compile(TIMESTAMP_TEXT_STRATEGIES));
static LIKES: Lazy<StrategyTable> = Lazy::new(|| StrategyTable::compile(LIKE_COUNTERS));
static COMMENTS: Lazy<StrategyTable> = Lazy::new(|| StrategyTable::compile(COMMENT_COUNTERS));
static SHARES: Lazy<StrategyTable> = Lazy::new(|| StrategyTable::compile(SHARE_COUNTERS));

struct Selectors {
    tracking: Selector,
    anchors: Selector,
    permalinks: Selector,
    labelled: Selector,
    utime: Selector,
    datetime: Selector,
}

static SELECTORS: Lazy<Selectors> = Lazy::new(|| Selectors {
    tracking: parse_selector("[data-ft], [data-store]", "tracking data"),
    anchors: parse_selector("a[href]", "anchors"),
    permalinks: parse_selector(
        "a[href*='/permalink/'], a[href*='/posts/'], a[href*='story_fbid=']",
        "permalinks",
    ),
    labelled: parse_selector("[aria-label]", "aria labels"),
    utime: parse_selector("[data-utime]", "data-utime"),
    datetime: parse_selector("time[datetime]", "time datetime"),
});

/// Resolve `href` against the platform base URL.
pub(crate) fn absolutize(href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    let base = Url::parse(PLATFORM_BASE).ok()?;
    base.join(href).ok().map(String::from)
}

// ---------------------------------------------------------------------------
// Identifier
// ---------------------------------------------------------------------------

/// Where an identifier came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSource {
    TrackingData,
    Permalink,
    ElementId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostId {
    pub id: String,
    pub source: IdSource,
}

/// Platform identifier of the post, if the markup carries one.
///
/// Lookup order: tracking-data attributes, permalink anchors, then the
/// node's own `id` when it looks like a story/post element id.
pub fn extract_id(node: Node<'_>) -> Option<PostId> {
    if let Some(id) = id_from_tracking(node) {
        return Some(PostId {
            id,
            source: IdSource::TrackingData,
        });
    }
    if let Some(permalink) = extract_permalink(node) {
        return Some(PostId {
            id: permalink.id,
            source: IdSource::Permalink,
        });
    }
    id_from_element(node).map(|id| PostId {
        id,
        source: IdSource::ElementId,
    })
}

fn id_from_tracking(node: Node<'_>) -> Option<String> {
    std::iter::once(node)
        .chain(node.select(&SELECTORS.tracking))
        .flat_map(|n| [n.attr("data-ft"), n.attr("data-store")])
        .flatten()
        .find_map(id_from_tracking_blob)
}

fn id_from_tracking_blob(blob: &str) -> Option<String> {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(blob) {
        let found = TRACKING_KEYS.iter().find_map(|key| match map.get(*key)? {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
        if found.is_some() {
            return found;
        }
    }
    // Not JSON, or JSON without a known key: fall back to a loose scan.
    TRACKING_KEYS.iter().find_map(|key| {
        TRACKING_ID
            .captures_iter(blob)
            .find(|c| &c[1] == *key)
            .map(|c| c[2].to_string())
    })
}

fn id_from_element(node: Node<'_>) -> Option<String> {
    let raw = node.attr_nonempty("id")?;
    if !STORY_TOKEN.is_match(raw) {
        return None;
    }
    Some(
        LONG_DIGITS
            .find(raw)
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| raw.to_string()),
    )
}

/// A permalink anchor and the post identifier it encodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permalink {
    pub id: String,
    pub url: String,
}

/// First anchor matching a known permalink shape, most specific shape
/// first. Path-style permalinks lose their tracking query string.
pub fn extract_permalink(node: Node<'_>) -> Option<Permalink> {
    let hrefs: Vec<&str> = node
        .select(&SELECTORS.anchors)
        .filter_map(|a| a.attr_nonempty("href"))
        .collect();

    PERMALINK_PATTERNS.iter().find_map(|(name, pattern)| {
        hrefs.iter().find_map(|href| {
            let caps = pattern.captures(href)?;
            let mut url = Url::parse(&absolutize(href)?).ok()?;
            if matches!(*name, "posts" | "permalink") {
                url.set_query(None);
            }
            url.set_fragment(None);
            Some(Permalink {
                id: caps[1].to_string(),
                url: url.to_string(),
            })
        })
    })
}

/// Fallback identifier: `{group}_gen_{hash}` over the group, the first
/// characters of content and the capture time.
///
/// Two distinct posts with the same opening text captured in the same run
/// collide; that is accepted.
pub fn generated_id(group_id: &str, content: &str, captured_at: DateTime<Utc>) -> String {
    let prefix: String = content.chars().take(GENERATED_ID_CONTENT_CHARS).collect();
    let mut hasher = Sha256::new();
    hasher.update(group_id.as_bytes());
    hasher.update(prefix.as_bytes());
    hasher.update(captured_at.to_rfc3339().as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{group_id}_gen_{}", &digest[..16])
}

// ---------------------------------------------------------------------------
// Author
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub name: String,
    /// Profile id parsed from the author's link.
    pub id: Option<String>,
}

/// Author byline, skipping matches that look like buttons or URLs.
pub fn extract_author(node: Node<'_>) -> Option<Author> {
    AUTHORS.first_match(node, |candidate| {
        let name = candidate.text();
        if !is_plausible_name(&name) {
            return None;
        }
        let id = author_link(candidate)
            .and_then(|a| a.attr("href"))
            .and_then(profile_id);
        Some(Author { name, id })
    })
}

pub(crate) fn is_plausible_name(name: &str) -> bool {
    !name.is_empty()
        && name.chars().count() <= MAX_AUTHOR_CHARS
        && !name.starts_with("http")
        && !UI_ACTION_WORDS.is_match(name)
}

/// The anchor a byline match belongs to: itself, an enclosing anchor, or
/// the first anchor inside it.
fn author_link(candidate: Node<'_>) -> Option<Node<'_>> {
    if candidate.tag() == "a" {
        return Some(candidate);
    }
    candidate
        .ancestors()
        .find(|a| a.tag() == "a")
        .or_else(|| candidate.first(&SELECTORS.anchors))
}

/// Numeric profile id from a profile link.
pub(crate) fn profile_id(href: &str) -> Option<String> {
    PROFILE_ID_PATTERNS
        .iter()
        .find_map(|p| p.captures(href))
        .map(|c| c[1].to_string())
}

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

/// Subtrees that hold comments, reaction popovers or nested articles.
fn is_noise(node: Node<'_>) -> bool {
    node.class_contains("comment")
        || node.class_contains("uiPopover")
        || node.class_contains("UFICommentContainer")
        || node.attr("data-testid").is_some_and(|t| t.contains("react"))
        || node.attr("role") == Some("article")
        || node.tag() == "img"
}

fn inside_noise(node: Node<'_>, scope: Node<'_>) -> bool {
    node.ancestors()
        .take_while(|a| *a != scope)
        .any(is_noise)
}

/// Post text, cleaned.
///
/// Dedicated content blocks are tried first; all matches of the winning
/// strategy are joined. When none match, the first whole content area is
/// used with noise stripped.
pub fn extract_content(node: Node<'_>) -> Option<String> {
    for strategy in CONTENT.iter() {
        let matches: Vec<Node<'_>> = node
            .select(&strategy.selector)
            .filter(|m| !is_noise(*m) && !inside_noise(*m, node))
            .collect();
        let parts: Vec<&str> = outermost(matches)
            .into_iter()
            .flat_map(|m| m.text_parts_excluding(is_noise))
            .collect();
        if let Some(text) = clean_content(&parts) {
            return Some(text);
        }
    }

    CONTENT_AREAS.first_match(node, |area| {
        if inside_noise(area, node) {
            return None;
        }
        clean_content(&area.text_parts_excluding(is_noise))
    })
}

fn collapse(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

fn clean_content(parts: &[&str]) -> Option<String> {
    let joined = collapse(&SEE_MORE.replace_all(&parts.join(" "), ""));
    if joined.is_empty() {
        return None;
    }
    if joined.chars().count() <= CONTENT_LEAK_CHARS {
        return Some(joined);
    }

    let segment = parts
        .iter()
        .map(|p| collapse(&SEE_MORE.replace_all(p, "")))
        .find(|p| p.chars().count() > 20 && !p.starts_with("Like") && !p.starts_with("Comment"));
    Some(segment.unwrap_or_else(|| joined.chars().take(CONTENT_TRUNCATE_CHARS).collect()))
}

// ---------------------------------------------------------------------------
// Engagement
// ---------------------------------------------------------------------------

/// Likes, comments and shares. Zero means not found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Engagement {
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
}

struct Metric {
    after: &'static Lazy<Regex>,
    before: &'static Lazy<Regex>,
    in_text: &'static Lazy<Regex>,
    counters: &'static Lazy<StrategyTable>,
}

static LIKE_METRIC: Metric = Metric {
    after: &LIKES_AFTER,
    before: &LIKES_BEFORE,
    in_text: &LIKES_IN_TEXT,
    counters: &LIKES,
};
static COMMENT_METRIC: Metric = Metric {
    after: &COMMENTS_AFTER,
    before: &COMMENTS_BEFORE,
    in_text: &COMMENTS_IN_TEXT,
    counters: &COMMENTS,
};
static SHARE_METRIC: Metric = Metric {
    after: &SHARES_AFTER,
    before: &SHARES_BEFORE,
    in_text: &SHARES_IN_TEXT,
    counters: &SHARES,
};

/// First positive count captured by any of `patterns` in `text`.
fn count_near_keyword(patterns: &[&Lazy<Regex>], text: &str) -> u64 {
    patterns
        .iter()
        .flat_map(|re| re.captures_iter(text))
        .filter_map(|c| c.iter().skip(1).flatten().next().map(|m| parse_count(m.as_str())))
        .find(|n| *n > 0)
        .unwrap_or(0)
}

impl Metric {
    /// Count next to this metric's keyword, e.g. `12 comments`.
    fn from_keyword_text(&self, text: &str) -> u64 {
        count_near_keyword(&[self.after, self.before], text)
    }

    /// Visible text with standalone compact timestamps (`2m`, `5h`) removed.
    fn from_visible_text(&self, node: Node<'_>) -> u64 {
        let text = node
            .text_parts_excluding(is_noise)
            .into_iter()
            .filter(|part| !COMPACT_TIME_TOKEN.is_match(part))
            .collect::<Vec<_>>()
            .join(" ");
        count_near_keyword(&[self.in_text], &WHITESPACE.replace_all(&text, " "))
    }

    /// Accessible labels first, then dedicated counter elements, then a
    /// plural-keyword scan of the visible text.
    fn extract(&self, node: Node<'_>) -> u64 {
        let from_labels = std::iter::once(node)
            .chain(node.select(&SELECTORS.labelled))
            .filter(|n| !inside_noise(*n, node))
            .filter_map(|n| n.attr("aria-label"))
            .map(|label| self.from_keyword_text(label))
            .find(|n| *n > 0);
        if let Some(n) = from_labels {
            return n;
        }

        let from_counters = self.counters.first_match(node, |counter| {
            Some(parse_count(&counter.text())).filter(|n| *n > 0)
        });
        if let Some(n) = from_counters {
            return n;
        }

        self.from_visible_text(node)
    }
}

/// Extract each engagement counter independently.
pub fn extract_engagement(node: Node<'_>) -> Engagement {
    Engagement {
        likes: LIKE_METRIC.extract(node),
        comments: COMMENT_METRIC.extract(node),
        shares: SHARE_METRIC.extract(node),
    }
}

// ---------------------------------------------------------------------------
// Timestamp
// ---------------------------------------------------------------------------

/// Post time: machine-readable attributes first, then visible time text,
/// then the text or label of a permalink anchor.
pub fn extract_timestamp(node: Node<'_>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let from_attrs = node
        .select(&SELECTORS.utime)
        .filter_map(|n| n.attr("data-utime"))
        .chain(
            node.select(&SELECTORS.datetime)
                .filter_map(|n| n.attr("datetime")),
        )
        .find_map(|raw| parse_time(raw, now));
    if from_attrs.is_some() {
        return from_attrs;
    }

    let from_text = TIMESTAMP_TEXT.first_match(node, |n| {
        n.attr("title")
            .and_then(|t| parse_time(t, now))
            .or_else(|| parse_time(&n.text(), now))
    });
    if from_text.is_some() {
        return from_text;
    }

    node.select(&SELECTORS.permalinks).find_map(|a| {
        a.attr("aria-label")
            .and_then(|l| parse_time(l, now))
            .or_else(|| parse_time(&a.text(), now))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::dom::Document;
    use crate::testing::fixed_now;
    use chrono::Duration;

    fn with_node<T>(html: &str, f: impl FnOnce(Node<'_>) -> T) -> T {
        let doc = Document::parse(html).unwrap();
        let sel = Selector::parse("#c").unwrap();
        let node = doc.select(&sel).next().expect("fixture has #c");
        f(node)
    }

    #[test]
    fn test_all_field_tables_compile() {
        assert_eq!(AUTHORS.len(), AUTHOR_STRATEGIES.len());
        assert_eq!(CONTENT.len(), CONTENT_STRATEGIES.len());
        assert_eq!(CONTENT_AREAS.len(), CONTENT_AREA_STRATEGIES.len());
        assert_eq!(TIMESTAMP_TEXT.len(), TIMESTAMP_TEXT_STRATEGIES.len());
        assert_eq!(LIKES.len(), LIKE_COUNTERS.len());
        assert_eq!(COMMENTS.len(), COMMENT_COUNTERS.len());
        assert_eq!(SHARES.len(), SHARE_COUNTERS.len());
        let _ = &*SELECTORS;
    }

    #[test]
    fn test_id_from_tracking_json() {
        let html = r#"<div id="c" data-ft='{"mf_story_key":"98765","top_level_post_id":"12345"}'></div>"#;
        let id = with_node(html, extract_id).unwrap();
        assert_eq!(id.id, "12345");
        assert_eq!(id.source, IdSource::TrackingData);
    }

    #[test]
    fn test_id_from_malformed_tracking_blob() {
        let html = r#"<div id="c" data-ft='{"content_id": 4455667, broken'></div>"#;
        let id = with_node(html, extract_id).unwrap();
        assert_eq!(id.id, "4455667");
    }

    #[test]
    fn test_id_from_permalink() {
        let html = r#"<div id="c"><a href="/groups/123/posts/555666777/?__cft__=abc">2h</a></div>"#;
        let id = with_node(html, extract_id).unwrap();
        assert_eq!(id.id, "555666777");
        assert_eq!(id.source, IdSource::Permalink);

        let link = with_node(html, extract_permalink).unwrap();
        assert_eq!(link.url, "https://www.facebook.com/groups/123/posts/555666777/");
    }

    #[test]
    fn test_permalink_prefers_posts_over_fbid() {
        let html = r#"<div id="c">
            <a href="https://www.facebook.com/photo.php?fbid=111">photo</a>
            <a href="https://www.facebook.com/groups/1/permalink/222/">link</a>
        </div>"#;
        assert_eq!(with_node(html, extract_permalink).unwrap().id, "222");
    }

    #[test]
    fn test_id_from_element_id() {
        let html = r#"<div id="c"><div id="mall_post_778899001"></div></div>"#;
        let inner = Document::parse(html).unwrap();
        let sel = Selector::parse("[id^='mall']").unwrap();
        let node = inner.select(&sel).next().unwrap();
        assert_eq!(extract_id(node).unwrap().id, "778899001");
        assert_eq!(extract_id(node).unwrap().source, IdSource::ElementId);

        assert_eq!(with_node(r#"<div id="c"></div>"#, extract_id), None);
    }

    #[test]
    fn test_generated_id_shape_and_stability() {
        let now = fixed_now();
        let a = generated_id("123", "hello world", now);
        let b = generated_id("123", "hello world", now);
        let c = generated_id("123", "hello there", now);
        assert!(a.starts_with("123_gen_"));
        assert_eq!(a.len(), "123_gen_".len() + 16);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_author_with_profile_id() {
        let html = r#"<div id="c"><h3><a href="/profile.php?id=1001&ref=x">Jane Doe</a></h3></div>"#;
        let author = with_node(html, extract_author).unwrap();
        assert_eq!(author.name, "Jane Doe");
        assert_eq!(author.id.as_deref(), Some("1001"));
    }

    #[test]
    fn test_author_rejects_buttons_and_urls() {
        let html = r##"<div id="c">
            <h3><a href="#">Like</a></h3>
            <strong><a href="/x">https://example.com</a></strong>
            <a data-hovercard="/user/42" href="/groups/1/user/42/">Sam Lee</a>
        </div>"##;
        let author = with_node(html, extract_author).unwrap();
        assert_eq!(author.name, "Sam Lee");
        assert_eq!(author.id.as_deref(), Some("42"));
    }

    #[test]
    fn test_author_rejects_overlong_names() {
        let long = "x".repeat(101);
        let html = format!(r#"<div id="c"><h3><a href="/a">{long}</a></h3></div>"#);
        assert_eq!(with_node(&html, extract_author), None);
    }

    #[test]
    fn test_content_prefers_post_message_and_strips_see_more() {
        let html = r#"<div id="c">
            <p>decoy paragraph</p>
            <div data-testid="post_message"><p>Selling my   bike.</p><span>... See more</span></div>
        </div>"#;
        assert_eq!(
            with_node(html, extract_content).as_deref(),
            Some("Selling my bike.")
        );
    }

    #[test]
    fn test_content_excludes_comments() {
        let html = r#"<div id="c">
            <div class="userContent">
              <p>Free couch</p>
              <div class="UFICommentContainer"><p>is it still available?</p></div>
            </div>
        </div>"#;
        assert_eq!(with_node(html, extract_content).as_deref(), Some("Free couch"));
    }

    #[test]
    fn test_leaked_content_keeps_first_real_segment() {
        let chrome = "Like ".repeat(500);
        let html = format!(
            r#"<div id="c"><p>{chrome}</p><p>This is the actual post text about a lost dog.</p></div>"#
        );
        assert_eq!(
            with_node(&html, extract_content).as_deref(),
            Some("This is the actual post text about a lost dog.")
        );
    }

    #[test]
    fn test_no_content() {
        let html = r#"<div id="c"><span>Like</span></div>"#;
        assert_eq!(with_node(html, extract_content), None);
    }

    #[test]
    fn test_engagement_from_labels_counters_and_text() {
        let html = r#"<div id="c">
            <span aria-label="2.5K reactions">2.5K</span>
            <span data-testid="comment_count">14</span>
            <div>3 shares</div>
        </div>"#;
        let e = with_node(html, extract_engagement);
        assert_eq!(
            e,
            Engagement {
                likes: 2500,
                comments: 14,
                shares: 3
            }
        );
    }

    #[test]
    fn test_engagement_label_beats_visible_text() {
        let html = r#"<div id="c">
            <span aria-label="40 reactions">12</span>
            <div>12 likes</div>
        </div>"#;
        assert_eq!(with_node(html, extract_engagement).likes, 40);
    }

    #[test]
    fn test_engagement_ignores_compact_times_next_to_buttons() {
        let html = r#"<div id="c">
            <h3><a href="/profile.php?id=7">Jane Doe</a></h3>
            <div><span>2m</span> <span>Like</span> <span>Comment</span></div>
            <p>Anyone seen my cat?</p>
        </div>"#;
        assert_eq!(with_node(html, extract_engagement), Engagement::default());

        let html = r#"<div id="c"><a href="/groups/1/posts/5/">5m</a> Comment</div>"#;
        assert_eq!(with_node(html, extract_engagement).comments, 0);

        let html = r#"<div id="c"><span>2m</span> · <span>Like</span> <span>12 comments</span></div>"#;
        let e = with_node(html, extract_engagement);
        assert_eq!((e.likes, e.comments), (0, 12));
    }

    #[test]
    fn test_engagement_bare_buttons_are_zero() {
        let html = r#"<div id="c">
            <span aria-label="Like">Like</span>
            <span aria-label="Comment">Comment</span>
            <span aria-label="Share">Share</span>
        </div>"#;
        assert_eq!(with_node(html, extract_engagement), Engagement::default());
    }

    #[test]
    fn test_timestamp_attribute_beats_text() {
        let now = fixed_now();
        let html = r#"<div id="c"><abbr data-utime="1746000000">3 hours ago</abbr></div>"#;
        let t = with_node(html, |n| extract_timestamp(n, now)).unwrap();
        assert_eq!(t.timestamp(), 1_746_000_000);
    }

    #[test]
    fn test_timestamp_from_text_and_permalink_label() {
        let now = fixed_now();
        let html = r#"<div id="c"><a href="/x"><abbr>2h</abbr></a></div>"#;
        assert_eq!(
            with_node(html, |n| extract_timestamp(n, now)),
            Some(now - Duration::hours(2))
        );

        let html = r#"<div id="c"><a href="/groups/1/posts/9/" aria-label="Yesterday at 9:14 PM">link</a></div>"#;
        assert_eq!(
            with_node(html, |n| extract_timestamp(n, now)),
            Some(now - Duration::hours(24))
        );

        assert_eq!(
            with_node(r#"<div id="c"><p>hello</p></div>"#, |n| extract_timestamp(n, now)),
            None
        );
    }
}
