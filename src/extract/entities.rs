//! Mentions, hashtags and external links.
//!
//! Entities come from two places: regex matches over the assembled post
//! text, and anchors inside the candidate node. Both are unioned in order
//! of first appearance.

use super::dom::{Node, parse_selector};
use super::fields::{absolutize, is_plausible_name};
use super::patterns::{HASHTAG, MENTION, PLATFORM_HOSTS, PROFILE_ID_PATTERNS, REDIRECT_HOSTS, URL_IN_TEXT};
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::Selector;
use url::Url;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entities {
    /// Mentioned names or handles, without the `@`.
    pub mentions: Vec<String>,
    /// Hashtags without the `#`.
    pub hashtags: Vec<String>,
    /// External URLs, redirect wrappers unwrapped.
    pub links: Vec<String>,
}

static ANCHORS: Lazy<Selector> = Lazy::new(|| parse_selector("a[href]", "entity anchors"));

/// Collect entities from `content` and the anchors under `node`. Links to
/// `author` are not mentions.
pub fn extract_entities(node: Node<'_>, content: &str, author: Option<&str>) -> Entities {
    let anchors: Vec<(Node<'_>, &str)> = node
        .select(&ANCHORS)
        .filter_map(|a| a.attr_nonempty("href").map(|href| (a, href)))
        .collect();

    let mentions = MENTION
        .captures_iter(content)
        .map(|c| c[1].trim_end_matches('.').to_string())
        .chain(anchors.iter().filter_map(|(a, href)| {
            if !is_profile_link(href) {
                return None;
            }
            let name = a.text();
            let is_author = author.is_some_and(|au| au.eq_ignore_ascii_case(&name));
            (is_plausible_name(&name) && !is_author).then_some(name)
        }))
        .filter(|m| !m.is_empty())
        .unique()
        .collect();

    let hashtags = HASHTAG
        .captures_iter(content)
        .map(|c| c[1].to_string())
        .chain(anchors.iter().filter_map(|(_, href)| hashtag_from_href(href)))
        .filter(|tag| !tag.is_empty() && !tag.chars().all(|c| c.is_ascii_digit()))
        .unique()
        .collect();

    let links = anchors
        .iter()
        .map(|(_, href)| *href)
        .filter(|href| href.starts_with("http://") || href.starts_with("https://"))
        .chain(URL_IN_TEXT.find_iter(content).map(|m| {
            m.as_str()
                .trim_end_matches(['.', ',', ';', ':', '!', '?', ')'])
        }))
        .filter_map(external_link)
        .unique()
        .collect();

    Entities {
        mentions,
        hashtags,
        links,
    }
}

fn is_profile_link(href: &str) -> bool {
    PROFILE_ID_PATTERNS.iter().any(|p| p.is_match(href))
}

fn hashtag_from_href(href: &str) -> Option<String> {
    let (_, rest) = href.split_once("/hashtag/")?;
    let tag = rest.split(['/', '?', '#']).next()?;
    Some(tag.trim_start_matches('#').to_string())
}

fn host_matches(host: &str, domains: &[&str]) -> bool {
    domains
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{d}")))
}

/// The external destination of `raw`, or `None` for platform-internal
/// links. Redirect wrappers are unwrapped first.
pub fn external_link(raw: &str) -> Option<String> {
    let url = Url::parse(&absolutize(raw)?).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = url.host_str()?.to_ascii_lowercase();

    let is_wrapper = host_matches(&host, REDIRECT_HOSTS)
        || (host_matches(&host, PLATFORM_HOSTS) && url.path() == "/l.php");
    if is_wrapper {
        let target = url
            .query_pairs()
            .find(|(k, _)| k == "u")
            .map(|(_, v)| v.into_owned())?;
        let target = Url::parse(&target).ok()?;
        let target_host = target.host_str()?.to_ascii_lowercase();
        if host_matches(&target_host, PLATFORM_HOSTS) {
            return None;
        }
        return Some(target.to_string());
    }

    if host_matches(&host, PLATFORM_HOSTS) {
        return None;
    }
    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::dom::Document;

    fn entities_of(html: &str, content: &str, author: Option<&str>) -> Entities {
        let doc = Document::parse(html).unwrap();
        let sel = Selector::parse("#c").unwrap();
        extract_entities(doc.select(&sel).next().unwrap(), content, author)
    }

    #[test]
    fn test_mentions_and_hashtags_from_text() {
        let e = entities_of(
            r#"<div id="c"></div>"#,
            "Thanks @sam.lee! Meetup at #Downtown tonight #2024 email me@example.com",
            None,
        );
        assert_eq!(e.mentions, vec!["sam.lee"]);
        assert_eq!(e.hashtags, vec!["Downtown"]);
    }

    #[test]
    fn test_profile_anchors_become_mentions_except_author() {
        let e = entities_of(
            r#"<div id="c">
                <a href="/profile.php?id=1">Jane Doe</a>
                <a href="/profile.php?id=2">Sam Lee</a>
                <a href="/hashtag/bikes?__eep__=6">#bikes</a>
            </div>"#,
            "",
            Some("Jane Doe"),
        );
        assert_eq!(e.mentions, vec!["Sam Lee"]);
        assert_eq!(e.hashtags, vec!["bikes"]);
    }

    #[test]
    fn test_links_skip_platform_and_unwrap_redirects() {
        let e = entities_of(
            r#"<div id="c">
                <a href="https://www.facebook.com/groups/1/posts/2/">permalink</a>
                <a href="https://l.facebook.com/l.php?u=https%3A%2F%2Fshop.example.com%2Fbike%3Fid%3D7&h=AT0">shop</a>
                <a href="https://l.facebook.com/l.php?u=https%3A%2F%2Fwww.facebook.com%2Fevents%2F1">event</a>
            </div>"#,
            "More at https://blog.example.org/post. Bye",
            None,
        );
        assert_eq!(
            e.links,
            vec![
                "https://shop.example.com/bike?id=7",
                "https://blog.example.org/post"
            ]
        );
    }

    #[test]
    fn test_external_link_rejects_non_http() {
        assert_eq!(external_link("mailto:a@example.com"), None);
        assert_eq!(external_link("https://m.facebook.com/story.php"), None);
        assert_eq!(
            external_link("https://example.com/a").as_deref(),
            Some("https://example.com/a")
        );
    }
}
