//! Typed document and node handles over `scraper`.
//!
//! Extraction code never passes raw selector strings around. Selectors live
//! in [`StrategyTable`]s: named, ordered, compiled once. A table is tried
//! front to back and the first strategy that produces something wins.

use crate::error::ExtractError;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use tracing::warn;

use super::patterns::WHITESPACE;

/// A parsed HTML document.
pub struct Document {
    html: Html,
}

impl Document {
    /// Parse raw HTML.
    ///
    /// The HTML5 parser recovers from almost anything, so the only inputs
    /// rejected are the ones with nothing to recover: empty bodies and plain
    /// text without a single tag.
    pub fn parse(html: &str) -> Result<Self, ExtractError> {
        if html.trim().is_empty() {
            return Err(ExtractError::EmptyDocument);
        }
        if !html.contains('<') {
            return Err(ExtractError::NotMarkup { bytes: html.len() });
        }
        Ok(Self {
            html: Html::parse_document(html),
        })
    }

    pub fn root(&self) -> Node<'_> {
        Node {
            el: self.html.root_element(),
        }
    }

    /// All elements in the document matching `selector`, in document order.
    pub fn select<'a, 's>(&'a self, selector: &'s Selector) -> impl Iterator<Item = Node<'a>> {
        self.html.select(selector).map(Node::from)
    }

    /// Trimmed `<title>` text, if there is one.
    pub fn title(&self) -> Option<String> {
        static TITLE: once_cell::sync::Lazy<Selector> =
            once_cell::sync::Lazy::new(|| parse_selector("title", "title"));
        self.select(&TITLE)
            .next()
            .map(|n| n.text())
            .filter(|t| !t.is_empty())
    }
}

/// A handle to one element of a [`Document`].
///
/// Equality and hashing go by position in the tree, not by content.
#[derive(Clone, Copy, Debug)]
pub struct Node<'a> {
    el: ElementRef<'a>,
}

impl<'a> From<ElementRef<'a>> for Node<'a> {
    fn from(el: ElementRef<'a>) -> Self {
        Self { el }
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.el.id() == other.el.id()
    }
}

impl Eq for Node<'_> {}

impl Hash for Node<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.el.id().hash(state);
    }
}

impl<'a> Node<'a> {
    /// Lowercase tag name.
    pub fn tag(self) -> &'a str {
        self.el.value().name()
    }

    pub fn attr(self, name: &str) -> Option<&'a str> {
        self.el.value().attr(name)
    }

    /// Attribute value, trimmed, `None` when missing or blank.
    pub fn attr_nonempty(self, name: &str) -> Option<&'a str> {
        self.attr(name).map(str::trim).filter(|v| !v.is_empty())
    }

    /// True when the `class` attribute contains `needle` anywhere.
    pub fn class_contains(self, needle: &str) -> bool {
        self.attr("class").is_some_and(|c| c.contains(needle))
    }

    /// Descendants matching `selector`, in document order.
    pub fn select<'s>(self, selector: &'s Selector) -> impl Iterator<Item = Node<'a>> {
        self.el.select(selector).map(Node::from)
    }

    pub fn first(self, selector: &Selector) -> Option<Node<'a>> {
        self.select(selector).next()
    }

    pub fn has(self, selector: &Selector) -> bool {
        self.first(selector).is_some()
    }

    /// Element ancestors, nearest first.
    pub fn ancestors(self) -> impl Iterator<Item = Node<'a>> {
        self.el.ancestors().filter_map(ElementRef::wrap).map(Node::from)
    }

    /// True when `self` is a strict ancestor of `other`.
    pub fn contains(self, other: Node<'a>) -> bool {
        other.ancestors().any(|a| a == self)
    }

    /// Visible text, whitespace-collapsed. Script and style bodies are
    /// skipped.
    pub fn text(self) -> String {
        self.text_excluding(|_| false)
    }

    /// Visible text with every subtree for which `exclude` returns true
    /// left out. Text nodes are joined with single spaces and whitespace
    /// runs collapsed.
    pub fn text_excluding(self, exclude: impl Fn(Node<'a>) -> bool) -> String {
        let joined = self.text_parts_excluding(exclude).join(" ");
        WHITESPACE.replace_all(joined.trim(), " ").into_owned()
    }

    /// The non-blank text nodes under `self`, untrimmed, in document order.
    pub fn text_parts_excluding(self, exclude: impl Fn(Node<'a>) -> bool) -> Vec<&'a str> {
        let mut parts = Vec::new();
        collect_text(self.el, &exclude, &mut parts);
        parts
    }
}

fn collect_text<'a>(
    el: ElementRef<'a>,
    exclude: &dyn Fn(Node<'a>) -> bool,
    out: &mut Vec<&'a str>,
) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            let t: &'a str = text;
            if !t.trim().is_empty() {
                out.push(t);
            }
        } else if let Some(child_el) = ElementRef::wrap(child) {
            let node = Node::from(child_el);
            if matches!(node.tag(), "script" | "style" | "noscript") || exclude(node) {
                continue;
            }
            collect_text(child_el, exclude, out);
        }
    }
}

/// Keep only nodes with no ancestor in the same set, preserving order.
pub fn outermost<'a>(nodes: Vec<Node<'a>>) -> Vec<Node<'a>> {
    let set: HashSet<Node<'a>> = nodes.iter().copied().collect();
    nodes
        .into_iter()
        .filter(|n| !n.ancestors().any(|a| set.contains(&a)))
        .collect()
}

/// Keep only nodes with no descendant in the same set, preserving order.
pub fn innermost<'a>(nodes: Vec<Node<'a>>) -> Vec<Node<'a>> {
    let set: HashSet<Node<'a>> = nodes.iter().copied().collect();
    let mut enclosing = HashSet::new();
    for n in &nodes {
        for a in n.ancestors() {
            if set.contains(&a) {
                enclosing.insert(a);
            }
        }
    }
    nodes
        .into_iter()
        .filter(|n| !enclosing.contains(n))
        .collect()
}

/// One named lookup strategy: a CSS selector list.
#[derive(Debug, Clone, Copy)]
pub struct SelectorStrategy {
    pub name: &'static str,
    pub css: &'static str,
}

impl SelectorStrategy {
    pub const fn new(name: &'static str, css: &'static str) -> Self {
        Self { name, css }
    }
}

/// A compiled strategy.
#[derive(Debug)]
pub struct CompiledStrategy {
    pub name: &'static str,
    pub selector: Selector,
}

/// An ordered list of compiled strategies, most specific first.
#[derive(Debug)]
pub struct StrategyTable {
    strategies: Vec<CompiledStrategy>,
}

impl StrategyTable {
    /// Compile every strategy. A selector that fails to parse is logged and
    /// skipped so one bad entry cannot disable the whole table.
    pub fn compile(specs: &[SelectorStrategy]) -> Self {
        let strategies = specs
            .iter()
            .filter_map(|s| match Selector::parse(s.css) {
                Ok(selector) => Some(CompiledStrategy {
                    name: s.name,
                    selector,
                }),
                Err(e) => {
                    warn!(strategy = s.name, css = s.css, error = %e, "Skipping invalid selector");
                    None
                }
            })
            .collect();
        Self { strategies }
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompiledStrategy> {
        self.strategies.iter()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// First strategy (in order) whose selector matches under `scope`,
    /// mapped through `f`; strategies whose matches all map to `None` are
    /// passed over.
    pub fn first_match<'a, T>(
        &self,
        scope: Node<'a>,
        mut f: impl FnMut(Node<'a>) -> Option<T>,
    ) -> Option<T> {
        self.iter()
            .find_map(|s| scope.select(&s.selector).find_map(&mut f))
    }
}

/// Parse a selector that is a compile-time constant.
pub(crate) fn parse_selector(css: &str, name: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid {name} selector '{css}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTML: &str = r#"
        <html><head><title>Bikes For Sale | Facebook</title>
        <style>.x{color:red}</style></head>
        <body>
          <div id="outer" class="wrap">
            <p>Hello   <b>world</b></p>
            <div class="comment-box"><span>ignore me</span></div>
            <script>var a = 1;</script>
            <div id="inner"><span>deep</span></div>
          </div>
        </body></html>"#;

    fn sel(css: &str) -> Selector {
        Selector::parse(css).unwrap()
    }

    #[test]
    fn test_parse_rejects_empty_and_plain_text() {
        assert_eq!(Document::parse("   ").err(), Some(ExtractError::EmptyDocument));
        assert_eq!(
            Document::parse("just words").err(),
            Some(ExtractError::NotMarkup { bytes: 10 })
        );
        assert!(Document::parse("<div>ok</div>").is_ok());
    }

    #[test]
    fn test_text_collapses_and_skips_scripts() {
        let doc = Document::parse(HTML).unwrap();
        let outer = doc.select(&sel("#outer")).next().unwrap();
        assert_eq!(outer.text(), "Hello world ignore me deep");
    }

    #[test]
    fn test_text_excluding_drops_subtrees() {
        let doc = Document::parse(HTML).unwrap();
        let outer = doc.select(&sel("#outer")).next().unwrap();
        let text = outer.text_excluding(|n| n.class_contains("comment"));
        assert_eq!(text, "Hello world deep");
    }

    #[test]
    fn test_title() {
        let doc = Document::parse(HTML).unwrap();
        assert_eq!(doc.title().as_deref(), Some("Bikes For Sale | Facebook"));
    }

    #[test]
    fn test_outermost_and_innermost() {
        let doc = Document::parse(HTML).unwrap();
        let divs: Vec<_> = doc.select(&sel("div[id]")).collect();
        assert_eq!(divs.len(), 2);

        let outer = outermost(divs.clone());
        assert_eq!(outer.len(), 1);
        assert_eq!(outer[0].attr("id"), Some("outer"));

        let inner = innermost(divs);
        assert_eq!(inner.len(), 1);
        assert_eq!(inner[0].attr("id"), Some("inner"));
        assert!(outer[0].contains(inner[0]));
        assert!(!inner[0].contains(outer[0]));
    }

    #[test]
    fn test_strategy_table_skips_invalid_selectors() {
        let table = StrategyTable::compile(&[
            SelectorStrategy::new("bad", "div[[["),
            SelectorStrategy::new("good", "p"),
        ]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.iter().next().map(|s| s.name), Some("good"));
    }

    #[test]
    fn test_first_match_respects_order() {
        let doc = Document::parse(HTML).unwrap();
        let table = StrategyTable::compile(&[
            SelectorStrategy::new("missing", "article"),
            SelectorStrategy::new("inner", "#inner span"),
            SelectorStrategy::new("para", "p"),
        ]);
        let found = table.first_match(doc.root(), |n| Some(n.text()));
        assert_eq!(found.as_deref(), Some("deep"));
    }
}
