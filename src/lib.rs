//! # Group Post Scraper
//!
//! Turns the HTML of social-media group feed pages into validated,
//! deduplicated post records with engagement metrics, media and entities.
//!
//! ## Architecture
//!
//! 1. **Fetching** ([`fetch`]): every group is read through several URL
//!    variants (mobile, basic, desktop, optionally rendered), with retries
//! 2. **Extraction** ([`extract`]): pure HTML to [`Post`] conversion
//! 3. **Merging** ([`dedup`]): sightings of one post across variants are
//!    folded into a single record
//! 4. **Filtering** ([`filter`]): engagement, recency and keyword predicates
//! 5. **Storage** ([`store`]): upsert into a SQLite store, with queries
//!    and CSV export
//!
//! [`scrape::GroupScraper`] ties the stages together for one group at a
//! time.
//!
//! ## Offline use
//!
//! ```
//! use group_post_scraper::extract::extract_posts;
//!
//! let html = r#"<div role="article">
//!     <h3><a href="/profile.php?id=7">Jane Doe</a></h3>
//!     <a href="/groups/1/posts/42/">2h</a>
//!     <span aria-label="120 reactions"></span>
//! </div>"#;
//! let posts = extract_posts(html, "1").unwrap();
//! assert_eq!(posts[0].id, "42");
//! assert_eq!(posts[0].likes, 120);
//! ```

pub mod config;
pub mod dedup;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod filter;
pub mod models;
pub mod scrape;
pub mod store;
pub mod utils;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{ConfigError, ExtractError, FetchError, SessionError, StoreError};
pub use models::{FilterCriteria, MediaItem, MediaKind, Post, PostType};
