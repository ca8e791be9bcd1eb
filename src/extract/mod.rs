//! The extraction core: raw HTML in, validated posts out.
//!
//! Everything under this module is synchronous and free of I/O. A call to
//! [`extract_posts`] parses one document, locates candidate nodes with the
//! first locator strategy that matches, and assembles each candidate into
//! a [`Post`]. Candidates that fail the validity rule are dropped and
//! counted. Duplicates across documents are left to [`crate::dedup`].
//!
//! # Modules
//!
//! - [`metrics`]: count and time text parsing
//! - [`dom`]: typed document/node handles and selector strategy tables
//! - [`locator`]: candidate location
//! - [`fields`], [`media`], [`entities`]: per-field extractors
//! - [`assembler`]: candidate to post

pub mod assembler;
pub mod dom;
pub mod entities;
pub mod fields;
pub mod locator;
pub mod media;
pub mod metrics;
pub mod patterns;

use crate::error::ExtractError;
use crate::models::Post;
use assembler::{AssemblyContext, assemble};
use chrono::{DateTime, Utc};
use dom::Document;
use tracing::debug;

/// Outcome of extracting one document.
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    /// Locator strategy that produced the candidates.
    pub strategy: Option<&'static str>,
    pub candidates: usize,
    /// Candidates dropped by the validity rule.
    pub discarded: usize,
    pub posts: Vec<Post>,
}

/// Extract posts from `html`, capturing at the current time.
pub fn extract_posts(html: &str, group_id: &str) -> Result<Vec<Post>, ExtractError> {
    extract_posts_at(html, group_id, Utc::now())
}

/// Extract posts from `html` with an explicit capture time.
///
/// Relative timestamps resolve against `captured_at`, which is also the
/// fallback post time. Fetch orchestration passes one capture time for all
/// documents of a run so generated identifiers line up between them.
pub fn extract_posts_at(
    html: &str,
    group_id: &str,
    captured_at: DateTime<Utc>,
) -> Result<Vec<Post>, ExtractError> {
    let ctx = AssemblyContext::new(group_id, captured_at);
    Ok(extract_report(html, &ctx)?.posts)
}

/// Extract posts and report how the document was read.
///
/// Locates post candidates, assembles each one and drops the candidates
/// that fail the validity rule. Duplicates inside one document are kept;
/// [`crate::dedup::merge`] folds them.
///
/// # Arguments
///
/// * `html` - The raw page as fetched
/// * `ctx` - Group identifier and capture time shared by the whole run
///
/// # Returns
///
/// An [`ExtractionReport`] with the winning locator strategy, candidate and
/// discard counts, and the valid posts in document order.
///
/// # Errors
///
/// [`ExtractError::EmptyDocument`] for a blank input and
/// [`ExtractError::NotMarkup`] when the input contains no markup at all.
/// A document with markup but no posts is `Ok` with an empty list.
pub fn extract_report(html: &str, ctx: &AssemblyContext) -> Result<ExtractionReport, ExtractError> {
    let doc = Document::parse(html)?;
    let located = locator::locate(&doc);
    let candidates = located.candidates.len();

    let posts: Vec<Post> = located
        .candidates
        .into_iter()
        .filter_map(|node| assemble(node, ctx))
        .collect();
    let discarded = candidates - posts.len();

    debug!(
        group_id = %ctx.group_id,
        strategy = located.strategy.unwrap_or("none"),
        candidates,
        posts = posts.len(),
        discarded,
        "Extracted document"
    );

    Ok(ExtractionReport {
        strategy: located.strategy,
        candidates,
        discarded,
        posts,
    })
}

/// Group display name from the page title: the text before the first `|`.
///
/// # Examples
///
/// ```
/// use group_post_scraper::extract::group_name_from_html;
/// let html = "<html><head><title>Bikes For Sale | Facebook</title></head></html>";
/// assert_eq!(group_name_from_html(html).as_deref(), Some("Bikes For Sale"));
/// ```
pub fn group_name_from_html(html: &str) -> Option<String> {
    let title = Document::parse(html).ok()?.title()?;
    let name = title.split('|').next()?.trim();
    (!name.is_empty()).then(|| name.to_string())
}
