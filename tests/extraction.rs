use chrono::{DateTime, Duration, TimeZone, Utc};
use group_post_scraper::dedup::merge;
use group_post_scraper::extract::extract_posts_at;
use group_post_scraper::filter;
use group_post_scraper::{FilterCriteria, PostType};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 6, 12, 0, 0).unwrap()
}

const FEED: &str = r#"<html><head><title>Bikes For Sale | Facebook</title></head><body>
<div role="feed">
  <div role="article">
    <h3><a href="https://www.facebook.com/profile.php?id=100001">Jane Doe</a></h3>
    <a href="/groups/123/posts/555666777/"><abbr>2h</abbr></a>
    <div data-testid="post_message"><p>Selling my road bike, barely used. #bikes</p></div>
    <span aria-label="2.5K reactions">2.5K</span>
  </div>
  <div role="article">
    <span aria-label="Like">Like</span>
  </div>
  <div role="article">
    <h3><a href="https://www.facebook.com/profile.php?id=100001">Jane Doe</a></h3>
    <a href="/groups/123/posts/555666777/"><abbr>2h</abbr></a>
    <div data-testid="post_message"><p>Selling my road bike, barely used. #bikes</p></div>
    <span aria-label="2,500 reactions">2,500</span>
    <img src="https://scontent.xx.fbcdn.net/v/t39/bike_photo.jpg" width="600" height="400" alt="A road bike">
  </div>
</div>
</body></html>"#;

#[test]
fn test_feed_scenario_single_merged_post() {
    let posts = extract_posts_at(FEED, "123", now()).unwrap();
    assert_eq!(posts.len(), 2, "the bare Like node must be discarded");

    let merged = merge([posts]);
    assert_eq!(merged.len(), 1);

    let post = &merged[0];
    assert_eq!(post.id, "555666777");
    assert_eq!(post.group_id, "123");
    assert_eq!(post.author_name.as_deref(), Some("Jane Doe"));
    assert_eq!(post.author_id.as_deref(), Some("100001"));
    assert_eq!(post.likes, 2500);
    assert_eq!(post.media_count, 1);
    assert_eq!(post.post_type, PostType::Image);
    assert_eq!(post.post_time, now() - Duration::hours(2));
    assert!(!post.post_time_estimated);
    assert!(post.content.contains("road bike"));
    assert_eq!(post.hashtags, vec!["bikes"]);
    assert_eq!(post.url, "https://www.facebook.com/groups/123/posts/555666777/");
}

#[test]
fn test_every_assembled_post_is_valid() {
    let posts = extract_posts_at(FEED, "123", now()).unwrap();
    for post in &posts {
        assert!(post.is_valid());
        assert!(!post.id.is_empty());
        assert_eq!(post.media_count, post.images().count() + post.videos().count());
        assert!(post.post_time <= now());
    }
}

#[test]
fn test_merge_is_idempotent_and_keeps_max() {
    let posts = extract_posts_at(FEED, "123", now()).unwrap();
    let once = merge([posts.clone()]);
    let twice = merge([once.clone()]);
    assert_eq!(once, twice);

    let max = posts.iter().map(|p| p.likes).max().unwrap();
    assert_eq!(once[0].likes, max);
}

#[test]
fn test_tighter_filter_keeps_subset() {
    let mut posts = merge([extract_posts_at(FEED, "123", now()).unwrap()]);
    let mut other = posts[0].clone();
    other.id = "999".into();
    other.likes = 40;
    posts.push(other);

    let loose = FilterCriteria {
        min_likes: Some(10),
        ..Default::default()
    };
    let tight = FilterCriteria {
        min_likes: Some(1000),
        days_back: Some(1),
        ..Default::default()
    };

    let (loose_kept, _) = filter::apply(posts.clone(), &loose, now());
    let (tight_kept, stats) = filter::apply(posts, &tight, now());
    assert_eq!(loose_kept.len(), 2);
    assert_eq!(tight_kept.len(), 1);
    assert!(tight_kept.iter().all(|p| loose_kept.contains(p)));
    assert_eq!(stats.failed_likes, 1);
}

#[test]
fn test_unparseable_and_empty_documents() {
    assert!(extract_posts_at("", "123", now()).is_err());
    assert!(extract_posts_at("<html><body></body></html>", "123", now()).unwrap().is_empty());
}
