//! # Group Post Scraper
//!
//! Command-line front end: scrape configured groups into the post store and
//! query what has been stored.
//!
//! ## Usage
//!
//! ```sh
//! group_post_scraper scrape
//! group_post_scraper stats
//! ```
//!
//! Logging is controlled with `RUST_LOG` (default `info`). Command output
//! (JSON or CSV) goes to stdout, logs to stderr.

use chrono::Utc;
use clap::Parser;
use group_post_scraper::config::{Config, GroupConfig, load_groups_file};
use group_post_scraper::extract::extract_posts;
use group_post_scraper::fetch::{Session, static_fetch::build_client};
use group_post_scraper::filter;
use group_post_scraper::scrape::{GroupScraper, build_fetcher};
use group_post_scraper::store::{PostStore, PageQuery, export_csv};
use group_post_scraper::utils::ensure_writable_parent;
use serde::Serialize;
use std::error::Error;
use tracing::{debug, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;

use cli::{Cli, Command, ExportArgs, ExtractArgs, GroupArgs, PostsArgs, ScrapeArgs, StatsArgs};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(store) = args.store {
        config.store.path = store;
    }

    match args.command {
        Command::Scrape(a) => scrape(config, a).await,
        Command::Extract(a) => extract(&config, a).await,
        Command::Posts(a) => posts(&config, a).await,
        Command::Group(a) => group(&config, a).await,
        Command::Stats(a) => stats(&config, a).await,
        Command::Export(a) => export(&config, a).await,
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn resolve_groups(config: &Config, args: &ScrapeArgs) -> Result<Vec<GroupConfig>, Box<dyn Error>> {
    if !args.groups.is_empty() {
        return Ok(args.groups.iter().map(GroupConfig::new).collect());
    }
    if let Some(path) = &args.groups_file {
        return Ok(load_groups_file(path)?);
    }
    Ok(config.groups.clone())
}

#[instrument(level = "info", skip_all)]
async fn scrape(mut config: Config, args: ScrapeArgs) -> Result<(), Box<dyn Error>> {
    let start_time = std::time::Instant::now();
    let groups = resolve_groups(&config, &args)?;
    if groups.is_empty() {
        return Err("no groups to scrape: configure `groups` or pass --group".into());
    }
    if let Some(cookies) = args.cookies.clone() {
        config.auth.cookies_file = cookies;
    }

    let session = if args.anonymous {
        info!("Scraping without a session");
        None
    } else {
        Some(Session::load(&config.auth.cookies_file).await?)
    };

    if args.verify_session {
        if let Some(session) = &session {
            let client = build_client(&config.fetch)?;
            session.verify(&client, &config.platform.base_url).await?;
        }
    }

    ensure_writable_parent(&config.store.path).await?;
    let store = PostStore::open(&config.store.path).await?;

    let fetcher = build_fetcher(&config, session.as_ref())?;
    let rendered = args.rendered && fetcher.inner().renders();
    if args.rendered && !rendered {
        warn!("--rendered given but no render endpoint is configured; using static fetching only");
    }

    info!(groups = groups.len(), rendered, "Starting scrape");
    let scraper = GroupScraper::new(fetcher, store, &config, rendered);
    let outcomes = scraper.scrape_all(&groups).await;

    let saved: usize = outcomes.iter().map(|o| o.saved).sum();
    info!(
        groups = outcomes.len(),
        saved,
        elapsed_ms = start_time.elapsed().as_millis(),
        "Scrape finished"
    );
    print_json(&outcomes)
}

#[instrument(level = "info", skip_all, fields(file = %args.file))]
async fn extract(config: &Config, args: ExtractArgs) -> Result<(), Box<dyn Error>> {
    let html = tokio::fs::read_to_string(&args.file).await?;
    let posts = extract_posts(&html, &args.group)?;
    info!(posts = posts.len(), "Extracted posts");

    if args.filter {
        let (kept, stats) = filter::apply(posts, &config.filter, Utc::now());
        info!(%stats, "Filtered posts");
        print_json(&kept)
    } else {
        print_json(&posts)
    }
}

async fn posts(config: &Config, args: PostsArgs) -> Result<(), Box<dyn Error>> {
    let store = PostStore::open(&config.store.path).await?;
    let now = Utc::now();
    let query = PageQuery::new(args.page, args.page_size, args.min_likes, Some(args.days));
    let total = store.count(query.min_likes, query.window_days, now).await?;
    let posts = store.page(&query, now).await?;

    print_json(&serde_json::json!({
        "page": query.page,
        "page_size": query.page_size,
        "total": total,
        "total_pages": query.total_pages(total),
        "posts": posts,
    }))
}

async fn group(config: &Config, args: GroupArgs) -> Result<(), Box<dyn Error>> {
    let store = PostStore::open(&config.store.path).await?;
    print_json(&store.by_group(&args.group_id, args.limit).await?)
}

async fn stats(config: &Config, args: StatsArgs) -> Result<(), Box<dyn Error>> {
    let store = PostStore::open(&config.store.path).await?;
    let now = Utc::now();
    print_json(&serde_json::json!({
        "stats": store.stats(now).await?,
        "top_authors": store.top_authors(args.top_authors, now).await?,
        "engagement_trends": store.engagement_trends(args.trend_days, now).await?,
    }))
}

#[instrument(level = "info", skip_all, fields(min_likes = args.min_likes))]
async fn export(config: &Config, args: ExportArgs) -> Result<(), Box<dyn Error>> {
    let store = PostStore::open(&config.store.path).await?;
    let min_likes = if args.min_likes < 1 { 1000 } else { args.min_likes };
    let records = store.ranked(min_likes, Some(args.days), Utc::now()).await?;
    let csv = export_csv(&records);

    match &args.out {
        Some(path) => {
            tokio::fs::write(path, csv).await?;
            info!(path = %path, rows = records.len(), "Wrote CSV export");
        }
        None => print!("{csv}"),
    }
    Ok(())
}
