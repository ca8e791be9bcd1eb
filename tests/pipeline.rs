use chrono::{DateTime, Duration, TimeZone, Utc};
use group_post_scraper::config::{Config, GroupConfig};
use group_post_scraper::fetch::{FetchHtml, FetchMode, FetchTarget};
use group_post_scraper::scrape::GroupScraper;
use group_post_scraper::store::{PostStore, PageQuery, export_csv};
use group_post_scraper::{FetchError, FilterCriteria};
use std::sync::Mutex;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 6, 12, 0, 0).unwrap()
}

/// Serves one page per URL variant label and records what was asked for.
struct StubFetcher {
    requested: Mutex<Vec<String>>,
}

impl StubFetcher {
    fn new() -> Self {
        Self {
            requested: Mutex::new(Vec::new()),
        }
    }
}

fn article(id: &str, author: &str, likes: &str, text: &str) -> String {
    format!(
        r#"<div role="article">
            <h3><a href="/profile.php?id=1{id}">{author}</a></h3>
            <a href="/groups/555/posts/{id}/"><abbr>3h</abbr></a>
            <div data-testid="post_message">{text}</div>
            <span aria-label="{likes} reactions"></span>
        </div>"#
    )
}

impl FetchHtml for StubFetcher {
    async fn fetch(&self, target: &FetchTarget) -> Result<String, FetchError> {
        self.requested.lock().unwrap().push(target.url.clone());
        assert_eq!(target.mode, FetchMode::Static);
        let body = match target.label {
            "mobile_feed" => format!(
                "<html><head><title>Camera Swap | Facebook</title></head><body>{}{}</body></html>",
                article("1001", "Ana Lima", "1.2K", "Leica M6 for trade"),
                article("1002", "Bo Chen", "15", "Anyone selling a tripod?"),
            ),
            "mobile_posts" => format!(
                "<html><body>{}</body></html>",
                article("1001", "Ana Lima", "1,300", "Leica M6 for trade, see https://example.com/m6"),
            ),
            "basic_feed" => "{\"error\": \"rate limited\"}".to_string(),
            _ => {
                return Err(FetchError::Status {
                    url: target.url.clone(),
                    status: 500,
                });
            }
        };
        Ok(body)
    }
}

fn config() -> Config {
    let mut config = Config::default();
    config.fetch.group_delay_secs = 0;
    config.filter = FilterCriteria {
        min_likes: Some(100),
        days_back: Some(5),
        ..Default::default()
    };
    config
}

#[tokio::test]
async fn test_pipeline_fetch_extract_merge_filter_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store/posts.db");
    let store = PostStore::open(&path).await.unwrap();
    let scraper = GroupScraper::new(StubFetcher::new(), store, &config(), false);

    let outcome = scraper
        .scrape_group_at(&GroupConfig::new("555"), now())
        .await
        .unwrap();

    assert_eq!(outcome.group_name, "Camera Swap");
    assert_eq!(outcome.attempted.len(), 4);
    // The basic variant returned HTML-less text, which the extractor rejects.
    assert_eq!(outcome.succeeded, vec!["mobile_feed", "mobile_posts"]);
    assert_eq!(outcome.extracted, 3);
    assert_eq!(outcome.merged, 2);
    assert_eq!(outcome.filter.failed_likes, 1);
    assert_eq!(outcome.saved, 1);

    let stored = scraper.store().get("1001").await.unwrap().unwrap();
    assert_eq!(stored.post.likes, 1300);
    assert_eq!(stored.post.author_name.as_deref(), Some("Ana Lima"));
    assert_eq!(stored.post.post_time, now() - Duration::hours(3));
    assert_eq!(stored.group_name, "Camera Swap");
    assert!(scraper.store().get("1002").await.unwrap().is_none());

    let reopened = PostStore::open(&path).await.unwrap();
    assert_eq!(reopened.len().await.unwrap(), 1);
    let page = reopened.page(&PageQuery::new(1, 20, 1000, Some(5)), now()).await.unwrap();
    assert_eq!(page.len(), 1);

    let csv = export_csv(&page);
    assert!(csv.lines().nth(1).unwrap().starts_with("Camera Swap,Ana Lima,\"Leica M6"));
}

#[tokio::test]
async fn test_rescrape_updates_engagement() {
    let dir = tempfile::tempdir().unwrap();
    let store = PostStore::open(dir.path().join("posts.db")).await.unwrap();
    let scraper = GroupScraper::new(StubFetcher::new(), store, &config(), false);
    let group = GroupConfig::new("555");

    scraper.scrape_group_at(&group, now()).await.unwrap();
    let later = now() + Duration::hours(1);
    scraper.scrape_group_at(&group, later).await.unwrap();

    let stored = scraper.store().get("1001").await.unwrap().unwrap();
    assert_eq!(scraper.store().len().await.unwrap(), 1);
    assert_eq!(stored.scraped_at, now());
    assert_eq!(stored.updated_at, later);
}
