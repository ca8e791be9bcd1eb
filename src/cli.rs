//! Command-line interface definitions.
//!
//! Global options can also be set through environment variables.
//!
//! # Examples
//!
//! ```sh
//! # Scrape every group listed in config.yaml
//! group_post_scraper scrape
//!
//! # Scrape two groups with rendered fetching, ignoring the configured list
//! group_post_scraper scrape --group 123456789 --group 987654321 --rendered
//!
//! # Run the extractor against a saved page
//! group_post_scraper extract --file page.html --group 123456789
//!
//! # Browse what is stored
//! group_post_scraper posts --min-likes 1000 --page 2
//! group_post_scraper export --out posts.csv
//! ```

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to config.yaml file
    #[arg(short, long, env = "SCRAPER_CONFIG", global = true)]
    pub config: Option<String>,

    /// Override the store file from the config
    #[arg(long, global = true)]
    pub store: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch, extract, filter and store posts for the configured groups
    Scrape(ScrapeArgs),
    /// Extract posts from a saved HTML page and print them as JSON
    Extract(ExtractArgs),
    /// Page through stored posts, most liked first
    Posts(PostsArgs),
    /// Latest stored posts of one group
    Group(GroupArgs),
    /// Aggregate statistics over the store
    Stats(StatsArgs),
    /// Export stored posts as CSV
    Export(ExportArgs),
}

#[derive(Args, Debug)]
pub struct ScrapeArgs {
    /// Group id to scrape; repeatable. Replaces the configured groups
    #[arg(short, long = "group")]
    pub groups: Vec<String>,

    /// YAML file with a `groups:` list. Replaces the configured groups
    #[arg(long)]
    pub groups_file: Option<String>,

    /// Cookie file; overrides `auth.cookies_file`
    #[arg(long, env = "SCRAPER_COOKIES_FILE")]
    pub cookies: Option<String>,

    /// Also fetch the rendered page variants (needs a render endpoint)
    #[arg(long)]
    pub rendered: bool,

    /// Check the session against the notifications page before scraping
    #[arg(long)]
    pub verify_session: bool,

    /// Scrape without cookies
    #[arg(long, conflicts_with = "verify_session")]
    pub anonymous: bool,
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Saved HTML page
    #[arg(short, long)]
    pub file: String,

    /// Group id the page belongs to
    #[arg(short, long)]
    pub group: String,

    /// Apply the configured filter to the extracted posts
    #[arg(long)]
    pub filter: bool,
}

#[derive(Args, Debug)]
pub struct PostsArgs {
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    #[arg(long, default_value_t = 20)]
    pub page_size: usize,

    #[arg(long, default_value_t = 0)]
    pub min_likes: u64,

    /// Only posts scraped within this many days
    #[arg(long, default_value_t = 5)]
    pub days: u32,
}

#[derive(Args, Debug)]
pub struct GroupArgs {
    /// Group id
    pub group_id: String,

    #[arg(long, default_value_t = 50)]
    pub limit: usize,
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Number of top authors to list
    #[arg(long, default_value_t = 10)]
    pub top_authors: usize,

    /// Days covered by the engagement trends
    #[arg(long, default_value_t = 30)]
    pub trend_days: u32,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Minimum likes; values below 1 mean 1000
    #[arg(long, default_value_t = 1000)]
    pub min_likes: u64,

    /// Only posts scraped within this many days
    #[arg(long, default_value_t = 5)]
    pub days: u32,

    /// Output file; stdout when omitted
    #[arg(short, long)]
    pub out: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrape_parsing() {
        let cli = Cli::parse_from([
            "group_post_scraper",
            "--config",
            "my.yaml",
            "scrape",
            "-g",
            "111",
            "--group",
            "222",
            "--rendered",
        ]);
        assert_eq!(cli.config.as_deref(), Some("my.yaml"));
        match cli.command {
            Command::Scrape(args) => {
                assert_eq!(args.groups, vec!["111", "222"]);
                assert!(args.rendered);
                assert!(!args.verify_session);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_posts_defaults() {
        let cli = Cli::parse_from(["group_post_scraper", "posts", "--store", "/tmp/p.db"]);
        assert_eq!(cli.store.as_deref(), Some("/tmp/p.db"));
        match cli.command {
            Command::Posts(args) => {
                assert_eq!(args.page, 1);
                assert_eq!(args.page_size, 20);
                assert_eq!(args.days, 5);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_extract_requires_file_and_group() {
        assert!(Cli::try_parse_from(["group_post_scraper", "extract", "--file", "a.html"]).is_err());
        let cli = Cli::parse_from(["group_post_scraper", "extract", "-f", "a.html", "-g", "9", "--filter"]);
        assert!(matches!(cli.command, Command::Extract(ExtractArgs { filter: true, .. })));
    }

    #[test]
    fn test_anonymous_conflicts_with_verify() {
        assert!(
            Cli::try_parse_from(["group_post_scraper", "scrape", "--anonymous", "--verify-session"]).is_err()
        );
    }
}
