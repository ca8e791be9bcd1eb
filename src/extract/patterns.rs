//! Compiled regex patterns and platform constants shared by the extractors.
//!
//! All patterns are compiled once, on first use. They are compile-time
//! constants, so a failure to compile is a programming error and panics
//! with the offending pattern name.

use once_cell::sync::Lazy;
use regex::Regex;

/// Base URL used to absolutise relative links and build fallback permalinks.
pub const PLATFORM_BASE: &str = "https://www.facebook.com";

/// Hosts that belong to the platform itself. Links to these are not
/// "external" and are dropped from a post's link list.
pub const PLATFORM_HOSTS: &[&str] = &["facebook.com", "fb.com", "fb.me", "messenger.com"];

/// Hosts of platform-issued redirect wrappers (`/l.php?u=<target>`).
pub const REDIRECT_HOSTS: &[&str] = &["l.facebook.com", "lm.facebook.com", "l.messenger.com"];

/// Media CDN hosts.
pub const CDN_HOSTS: &[&str] = &["fbcdn.net", "fbsbx.com", "facebook.com", "cdninstagram.com"];

fn compile(pattern: &str, name: &str) -> Regex {
    Regex::new(pattern)
        .unwrap_or_else(|e| panic!("failed to compile {name} pattern '{pattern}': {e}"))
}

// ---------------------------------------------------------------------------
// Counts
// ---------------------------------------------------------------------------

/// `1.2K`, `4M`, `3.75b`
pub static SUFFIX_COUNT: Lazy<Regex> =
    Lazy::new(|| compile(r"(?i)(\d+)(?:\.(\d+))?([kmb])\b", "SUFFIX_COUNT"));

/// `1,234` / `12,345,678`
pub static GROUPED_COUNT: Lazy<Regex> =
    Lazy::new(|| compile(r"\d{1,3}(?:,\d{3})+", "GROUPED_COUNT"));

pub static BARE_COUNT: Lazy<Regex> = Lazy::new(|| compile(r"\d+", "BARE_COUNT"));

/// A count as it appears next to an engagement keyword.
const NUM: &str = r"(\d[\d,]*(?:\.\d+)?[KkMmBb]?)\b";

pub static LIKES_AFTER: Lazy<Regex> = Lazy::new(|| {
    compile(
        &format!(r"(?i){NUM}\s*(?:likes?|reactions?|people reacted)\b"),
        "LIKES_AFTER",
    )
});
pub static LIKES_BEFORE: Lazy<Regex> = Lazy::new(|| {
    compile(
        &format!(r"(?i)\b(?:likes?|reactions?)\s*:?\s*{NUM}"),
        "LIKES_BEFORE",
    )
});
pub static COMMENTS_AFTER: Lazy<Regex> = Lazy::new(|| {
    compile(
        &format!(r"(?i){NUM}\s*(?:comments?|replies)\b"),
        "COMMENTS_AFTER",
    )
});
pub static COMMENTS_BEFORE: Lazy<Regex> = Lazy::new(|| {
    compile(
        &format!(r"(?i)\bcomments?\s*:?\s*{NUM}"),
        "COMMENTS_BEFORE",
    )
});
pub static SHARES_AFTER: Lazy<Regex> = Lazy::new(|| {
    compile(
        &format!(r"(?i){NUM}\s*(?:shares?|shared)\b"),
        "SHARES_AFTER",
    )
});
pub static SHARES_BEFORE: Lazy<Regex> =
    Lazy::new(|| compile(&format!(r"(?i)\bshares?\s*:?\s*{NUM}"), "SHARES_BEFORE"));

// Visible-text variants. Button labels ("Like", "Comment") sit next to
// compact timestamps in bylines, so only plural keywords or a
// `Keyword: N` form count here.

pub static LIKES_IN_TEXT: Lazy<Regex> = Lazy::new(|| {
    compile(
        &format!(r"(?i){NUM}\s*(?:likes|reactions|people reacted)\b|\b(?:likes|reactions)\s*:\s*{NUM}"),
        "LIKES_IN_TEXT",
    )
});
pub static COMMENTS_IN_TEXT: Lazy<Regex> = Lazy::new(|| {
    compile(
        &format!(r"(?i){NUM}\s*(?:comments|replies)\b|\bcomments\s*:\s*{NUM}"),
        "COMMENTS_IN_TEXT",
    )
});
pub static SHARES_IN_TEXT: Lazy<Regex> = Lazy::new(|| {
    compile(
        &format!(r"(?i){NUM}\s*shares\b|\bshares\s*:\s*{NUM}"),
        "SHARES_IN_TEXT",
    )
});

/// A text node that is nothing but a compact timestamp (`2m`, `5 h`, `3mo`).
pub static COMPACT_TIME_TOKEN: Lazy<Regex> = Lazy::new(|| {
    compile(
        r"(?i)^\s*\d{1,3}\s?(?:s|m|h|d|w|y|mo|mos|mins?|hrs?|wks?|yrs?)\s*$",
        "COMPACT_TIME_TOKEN",
    )
});

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

pub static EPOCH: Lazy<Regex> = Lazy::new(|| compile(r"^\d{9,13}$", "EPOCH"));

/// `3 hours ago`, `5h`, `2 wks`
pub static RELATIVE_TIME: Lazy<Regex> = Lazy::new(|| {
    compile(
        r"(?i)\b(\d+)\s*(seconds?|secs?|minutes?|mins?|hours?|hrs?|days?|weeks?|wks?|months?|mos?|years?|yrs?|s|m|h|hr|d|w|y)\b",
        "RELATIVE_TIME",
    )
});

/// `a minute ago`, `an hour ago`
pub static ARTICLE_RELATIVE_TIME: Lazy<Regex> = Lazy::new(|| {
    compile(
        r"(?i)\b(?:a|an|one)\s+(second|minute|hour|day|week|month|year)\s+ago\b",
        "ARTICLE_RELATIVE_TIME",
    )
});

/// `January 2`, `Jan 2 at 3:04 pm`, `March 5, 2024`
pub static MONTH_DAY: Lazy<Regex> = Lazy::new(|| {
    compile(
        r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(\d{1,2})(?:,?\s+(\d{4}))?(?:\s+at\s+(\d{1,2}):(\d{2})\s*(am|pm)?)?\b",
        "MONTH_DAY",
    )
});

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Post identifier keys inside a tracking-data blob that failed to parse
/// as JSON.
pub static TRACKING_ID: Lazy<Regex> = Lazy::new(|| {
    compile(
        r#""(top_level_post_id|mf_story_key|story_fbid|content_id|post_id)"\s*:\s*"?(\d+)"#,
        "TRACKING_ID",
    )
});

/// Permalink shapes, most specific first.
pub static PERMALINK_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("posts", r"/posts/(\d+)"),
        ("permalink", r"/permalink/(\d+)"),
        ("story_fbid", r"[?&]story_fbid=(\d+)"),
        ("fbid", r"[?&]fbid=(\d+)"),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, compile(pattern, name)))
    .collect()
});

pub static STORY_TOKEN: Lazy<Regex> = Lazy::new(|| compile(r"(?i)(?:story|post)", "STORY_TOKEN"));
pub static LONG_DIGITS: Lazy<Regex> = Lazy::new(|| compile(r"\d{5,}", "LONG_DIGITS"));

pub static PROFILE_ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"profile\.php\?id=(\d+)",
        r"/user/(\d+)",
        r"/people/[^/]+/(\d+)",
    ]
    .into_iter()
    .map(|p| compile(p, "PROFILE_ID"))
    .collect()
});

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

/// Words that betray a selector landing on a button instead of a name.
pub static UI_ACTION_WORDS: Lazy<Regex> = Lazy::new(|| {
    compile(
        r"(?i)\b(?:like|likes|liked|comment|comments|follow|following|share|shares|reply|see more)\b",
        "UI_ACTION_WORDS",
    )
});

/// Truncation affordances appended to long posts.
pub static SEE_MORE: Lazy<Regex> = Lazy::new(|| {
    compile(
        r"(?i)(?:…|\.\.\.)?\s*\b(?:see more|see translation|show more|read more)\b",
        "SEE_MORE",
    )
});

pub static WHITESPACE: Lazy<Regex> = Lazy::new(|| compile(r"\s+", "WHITESPACE"));

pub static MENTION: Lazy<Regex> =
    Lazy::new(|| compile(r"(?:^|[^\w@])@(\w[\w.]{0,49})", "MENTION"));

pub static HASHTAG: Lazy<Regex> =
    Lazy::new(|| compile(r"(?:^|[^\w&#])#(\w{1,100})", "HASHTAG"));

pub static URL_IN_TEXT: Lazy<Regex> =
    Lazy::new(|| compile(r#"https?://[^\s<>"']+"#, "URL_IN_TEXT"));
