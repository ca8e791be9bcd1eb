//! Post candidate location.
//!
//! Strategies run most specific first and the first one that yields any
//! candidates wins, so a post is never picked up twice under two different
//! layout schemes. When every selector strategy comes up empty, a
//! content heuristic scores container elements instead.

use super::dom::{Document, Node, SelectorStrategy, StrategyTable, innermost, outermost, parse_selector};
use once_cell::sync::Lazy;
use scraper::Selector;
use tracing::{debug, trace};

/// Selector strategies, most specific first.
pub const LOCATOR_STRATEGIES: &[SelectorStrategy] = &[
    SelectorStrategy::new("feed_unit", "[role='feed'] [aria-posinset]"),
    SelectorStrategy::new("article", "[role='article'], article"),
    SelectorStrategy::new("tracking_data", "[data-ft]"),
    SelectorStrategy::new("story_id", "[id*='story'], [id*='mall_post']"),
];

/// Name reported when the heuristic fallback produced the candidates.
pub const HEURISTIC_STRATEGY: &str = "content_heuristic";

static TABLE: Lazy<StrategyTable> = Lazy::new(|| StrategyTable::compile(LOCATOR_STRATEGIES));

struct Heuristic {
    containers: Selector,
    author: Selector,
    timestamp: Selector,
    content: Selector,
    engagement: Selector,
}

static HEURISTIC: Lazy<Heuristic> = Lazy::new(|| Heuristic {
    containers: parse_selector("div, article, section, li", "heuristic containers"),
    author: parse_selector(
        "h2 a, h3 a, h4 a, strong a, a[data-hovercard]",
        "heuristic author",
    ),
    timestamp: parse_selector(
        "abbr, time, [data-utime], a[href*='/permalink/'], a[href*='/posts/']",
        "heuristic timestamp",
    ),
    content: parse_selector(
        "p, span[dir='auto'], div[dir='auto'], [data-testid='post_message'], .userContent",
        "heuristic content",
    ),
    engagement: parse_selector(
        "[aria-label*='Like'], [aria-label*='like'], [aria-label*='Comment'], \
         [aria-label*='comment'], [aria-label*='Share'], [aria-label*='share'], \
         [aria-label*='reaction']",
        "heuristic engagement",
    ),
});

/// Candidates found in one document and the strategy that found them.
#[derive(Debug)]
pub struct Located<'a> {
    /// `None` when nothing at all was found.
    pub strategy: Option<&'static str>,
    pub candidates: Vec<Node<'a>>,
}

/// Find nodes likely to represent individual posts.
pub fn locate(doc: &Document) -> Located<'_> {
    for strategy in TABLE.iter() {
        let matches: Vec<Node<'_>> = doc.select(&strategy.selector).collect();
        if matches.is_empty() {
            trace!(strategy = strategy.name, "Locator strategy found nothing");
            continue;
        }
        let candidates = outermost(matches);
        debug!(
            strategy = strategy.name,
            candidates = candidates.len(),
            "Locator strategy matched"
        );
        return Located {
            strategy: Some(strategy.name),
            candidates,
        };
    }

    let candidates = heuristic_candidates(doc);
    debug!(
        strategy = HEURISTIC_STRATEGY,
        candidates = candidates.len(),
        "Fell back to content heuristic"
    );
    Located {
        strategy: (!candidates.is_empty()).then_some(HEURISTIC_STRATEGY),
        candidates,
    }
}

/// A container qualifies when it shows two independent signals that
/// belong together: an author plus content, or a timestamp plus
/// engagement controls. The innermost qualifying containers are kept.
fn heuristic_candidates(doc: &Document) -> Vec<Node<'_>> {
    let h = &*HEURISTIC;
    let qualifying: Vec<Node<'_>> = doc
        .select(&h.containers)
        .filter(|n| {
            let author_and_content = n.has(&h.author) && n.has(&h.content);
            author_and_content || (n.has(&h.timestamp) && n.has(&h.engagement))
        })
        .collect();
    innermost(qualifying)
}
