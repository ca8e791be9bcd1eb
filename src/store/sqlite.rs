//! SQLite-backed post store.
//!
//! One `posts` table keyed by the post identifier. Saving an identifier
//! that already exists is an `ON CONFLICT DO UPDATE` of the text and
//! engagement columns; everything else, `scraped_at` included, keeps the
//! value from the first save. List fields are stored as JSON arrays.

use crate::error::StoreError;
use crate::models::{MediaItem, Post, PostType};
use crate::store::StoredPost;
use crate::store::query::{
    AuthorStats, DailyTrend, HIGH_ENGAGEMENT_LIKES, PageQuery, STATS_WINDOW_DAYS, StoreStats,
    window_start,
};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS posts (
    id TEXT NOT NULL UNIQUE PRIMARY KEY,
    id_generated INTEGER NOT NULL DEFAULT 0,
    group_id TEXT NOT NULL,
    group_name TEXT NOT NULL,
    author_name TEXT,
    author_id TEXT,
    content TEXT NOT NULL DEFAULT '',
    url TEXT NOT NULL DEFAULT '',
    post_time INTEGER NOT NULL,
    post_time_estimated INTEGER NOT NULL DEFAULT 0,
    captured_at INTEGER NOT NULL,
    likes INTEGER NOT NULL DEFAULT 0,
    comments INTEGER NOT NULL DEFAULT 0,
    shares INTEGER NOT NULL DEFAULT 0,
    media TEXT NOT NULL DEFAULT '[]',
    mentions TEXT NOT NULL DEFAULT '[]',
    hashtags TEXT NOT NULL DEFAULT '[]',
    links TEXT NOT NULL DEFAULT '[]',
    post_type TEXT NOT NULL DEFAULT 'text',
    media_count INTEGER NOT NULL DEFAULT 0,
    scraped_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_posts_likes ON posts (likes DESC);
CREATE INDEX IF NOT EXISTS idx_posts_group_time ON posts (group_id, post_time DESC);
CREATE INDEX IF NOT EXISTS idx_posts_scraped_at ON posts (scraped_at);
";

const UPSERT: &str = "
INSERT INTO posts (
    id, id_generated, group_id, group_name, author_name, author_id, content, url,
    post_time, post_time_estimated, captured_at, likes, comments, shares,
    media, mentions, hashtags, links, post_type, media_count, scraped_at, updated_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?21)
ON CONFLICT (id) DO UPDATE SET
    content = excluded.content,
    likes = excluded.likes,
    comments = excluded.comments,
    shares = excluded.shares,
    updated_at = excluded.updated_at
";

const COLUMNS: &str = "id, id_generated, group_id, group_name, author_name, author_id, content, url, \
     post_time, post_time_estimated, captured_at, likes, comments, shares, \
     media, mentions, hashtags, links, post_type, media_count, scraped_at, updated_at";

/// What a save did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Updated,
}

/// Posts keyed by identifier in one SQLite database file.
#[derive(Debug)]
pub struct PostStore {
    path: PathBuf,
    db: Mutex<Connection>,
}

fn millis(t: DateTime<Utc>) -> i64 {
    t.timestamp_millis()
}

fn sql_int(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn sql_limit(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn conversion_error(idx: usize, ty: Type, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, message.into())
}

fn time_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let ms: i64 = row.get(idx)?;
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| conversion_error(idx, Type::Integer, format!("timestamp {ms} out of range")))
}

fn count_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let n: i64 = row.get(idx)?;
    Ok(n.max(0) as u64)
}

fn json_at<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Map a row selected with [`COLUMNS`] back to a record.
fn read_row(row: &Row<'_>) -> rusqlite::Result<StoredPost> {
    let post_type: String = row.get(18)?;
    let media: Vec<MediaItem> = json_at(row, 14)?;
    let media_count: i64 = row.get(19)?;
    let post = Post {
        id: row.get(0)?,
        id_generated: row.get(1)?,
        group_id: row.get(2)?,
        author_name: row.get(4)?,
        author_id: row.get(5)?,
        content: row.get(6)?,
        url: row.get(7)?,
        post_time: time_at(row, 8)?,
        post_time_estimated: row.get(9)?,
        captured_at: time_at(row, 10)?,
        likes: count_at(row, 11)?,
        comments: count_at(row, 12)?,
        shares: count_at(row, 13)?,
        media,
        mentions: json_at(row, 15)?,
        hashtags: json_at(row, 16)?,
        links: json_at(row, 17)?,
        post_type: PostType::parse(&post_type)
            .ok_or_else(|| conversion_error(18, Type::Text, format!("unknown post type {post_type:?}")))?,
        media_count: media_count.max(0) as usize,
    };
    Ok(StoredPost {
        post,
        group_name: row.get(3)?,
        scraped_at: time_at(row, 20)?,
        updated_at: time_at(row, 21)?,
    })
}

fn upsert(tx: &Transaction<'_>, post: &Post, group_name: &str, now: DateTime<Utc>) -> Result<Upsert, StoreError> {
    let exists = tx
        .query_row("SELECT 1 FROM posts WHERE id = ?1", params![post.id], |_| Ok(()))
        .optional()?
        .is_some();

    tx.execute(
        UPSERT,
        params![
            post.id,
            post.id_generated,
            post.group_id,
            group_name,
            post.author_name,
            post.author_id,
            post.content,
            post.url,
            millis(post.post_time),
            post.post_time_estimated,
            millis(post.captured_at),
            sql_int(post.likes),
            sql_int(post.comments),
            sql_int(post.shares),
            serde_json::to_string(&post.media)?,
            serde_json::to_string(&post.mentions)?,
            serde_json::to_string(&post.hashtags)?,
            serde_json::to_string(&post.links)?,
            post.post_type.as_str(),
            sql_limit(post.media_count),
            millis(now),
        ],
    )?;

    Ok(if exists { Upsert::Updated } else { Upsert::Inserted })
}

impl PostStore {
    /// Open (or create) the database at `path` and make sure the schema
    /// exists. Missing parent directories are created.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Io {
                    path: parent.display().to_string(),
                    source,
                })?;
        }

        let db = Connection::open(&path)?;
        db.execute_batch(SCHEMA)?;
        let records: i64 = db.query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
        info!(records, "Opened post store");

        Ok(Self {
            path,
            db: Mutex::new(db),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn len(&self) -> Result<usize, StoreError> {
        let db = self.db.lock().await;
        let n: i64 = db.query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
        Ok(n.max(0) as usize)
    }

    pub async fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len().await? == 0)
    }

    pub async fn get(&self, id: &str) -> Result<Option<StoredPost>, StoreError> {
        let db = self.db.lock().await;
        let sql = format!("SELECT {COLUMNS} FROM posts WHERE id = ?1");
        Ok(db.query_row(&sql, params![id], read_row).optional()?)
    }

    /// Upsert one post.
    pub async fn save(&self, post: &Post, group_name: &str, now: DateTime<Utc>) -> Result<Upsert, StoreError> {
        let mut db = self.db.lock().await;
        let tx = db.transaction()?;
        let outcome = upsert(&tx, post, group_name, now)?;
        tx.commit()?;
        Ok(outcome)
    }

    /// Upsert a batch of posts in one transaction.
    ///
    /// A new identifier is inserted with `group_name` and `now` as its
    /// `scraped_at`. An identifier already in the store only has its
    /// content, likes, comments, shares and `updated_at` refreshed.
    ///
    /// # Arguments
    ///
    /// * `posts` - Merged, filtered posts of one group.
    /// * `group_name` - Display name recorded on newly inserted posts.
    /// * `now` - Save time, written to `updated_at` (and `scraped_at` for inserts).
    ///
    /// # Returns
    ///
    /// The number of posts saved, inserts and updates together.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when a statement fails or a list field cannot
    /// be serialized. Nothing from the batch is kept in that case.
    #[instrument(level = "info", skip_all, fields(group_name = %group_name, posts = posts.len()))]
    pub async fn save_all(&self, posts: &[Post], group_name: &str, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut db = self.db.lock().await;
        let tx = db.transaction()?;
        let (mut inserted, mut updated) = (0usize, 0usize);
        for post in posts {
            match upsert(&tx, post, group_name, now)? {
                Upsert::Inserted => inserted += 1,
                Upsert::Updated => updated += 1,
            }
        }
        tx.commit()?;
        info!(inserted, updated, "Saved posts");
        Ok(inserted + updated)
    }

    fn select(db: &Connection, sql: &str, params: impl rusqlite::Params) -> Result<Vec<StoredPost>, StoreError> {
        let mut stmt = db.prepare(sql)?;
        let records = stmt
            .query_map(params, read_row)?
            .collect::<Result<Vec<_>, _>>()?;
        debug!(records = records.len(), "Selected posts");
        Ok(records)
    }

    /// Records with at least `query.min_likes` likes inside the window, most
    /// liked first, one page at a time.
    pub async fn page(&self, query: &PageQuery, now: DateTime<Utc>) -> Result<Vec<StoredPost>, StoreError> {
        let db = self.db.lock().await;
        let sql = format!(
            "SELECT {COLUMNS} FROM posts
             WHERE likes >= ?1 AND (?2 IS NULL OR scraped_at >= ?2)
             ORDER BY likes DESC, scraped_at DESC, id
             LIMIT ?3 OFFSET ?4"
        );
        Self::select(
            &db,
            &sql,
            params![
                sql_int(query.min_likes),
                window_start(query.window_days, now).map(millis),
                sql_limit(query.page_size),
                sql_limit(query.offset()),
            ],
        )
    }

    pub async fn count(&self, min_likes: u64, window_days: Option<u32>, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let db = self.db.lock().await;
        let n: i64 = db.query_row(
            "SELECT COUNT(*) FROM posts WHERE likes >= ?1 AND (?2 IS NULL OR scraped_at >= ?2)",
            params![sql_int(min_likes), window_start(window_days, now).map(millis)],
            |row| row.get(0),
        )?;
        Ok(n.max(0) as usize)
    }

    /// Latest posts of one group by post time.
    pub async fn by_group(&self, group_id: &str, limit: usize) -> Result<Vec<StoredPost>, StoreError> {
        let db = self.db.lock().await;
        let sql = format!("SELECT {COLUMNS} FROM posts WHERE group_id = ?1 ORDER BY post_time DESC, id LIMIT ?2");
        Self::select(&db, &sql, params![group_id, sql_limit(limit)])
    }

    /// Records for export, most liked first.
    pub async fn ranked(
        &self,
        min_likes: u64,
        window_days: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<Vec<StoredPost>, StoreError> {
        let db = self.db.lock().await;
        let sql = format!(
            "SELECT {COLUMNS} FROM posts
             WHERE likes >= ?1 AND (?2 IS NULL OR scraped_at >= ?2)
             ORDER BY likes DESC, scraped_at DESC, id"
        );
        Self::select(
            &db,
            &sql,
            params![sql_int(min_likes), window_start(window_days, now).map(millis)],
        )
    }

    /// Summary over the whole store and the last [`STATS_WINDOW_DAYS`] days.
    pub async fn stats(&self, now: DateTime<Utc>) -> Result<StoreStats, StoreError> {
        let db = self.db.lock().await;
        let since = window_start(Some(STATS_WINDOW_DAYS), now).map(millis);

        let (total, last_ms): (i64, Option<i64>) =
            db.query_row("SELECT COUNT(*), MAX(scraped_at) FROM posts", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?;

        let (high, average, groups): (Option<i64>, Option<f64>, i64) = db.query_row(
            "SELECT SUM(CASE WHEN likes >= ?2 THEN 1 ELSE 0 END), AVG(likes), COUNT(DISTINCT group_id)
             FROM posts WHERE scraped_at >= ?1",
            params![since, sql_int(HIGH_ENGAGEMENT_LIKES)],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        let top_group: Option<String> = db
            .query_row(
                "SELECT group_name FROM posts WHERE scraped_at >= ?1
                 GROUP BY group_name ORDER BY COUNT(*) DESC, group_name LIMIT 1",
                params![since],
                |row| row.get(0),
            )
            .optional()?;

        let mut stmt =
            db.prepare("SELECT post_type, COUNT(*) FROM posts WHERE scraped_at >= ?1 GROUP BY post_type")?;
        let posts_by_type = stmt
            .query_map(params![since], |row| {
                let n: i64 = row.get(1)?;
                Ok((row.get::<_, String>(0)?, n.max(0) as usize))
            })?
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(StoreStats {
            total_posts: total.max(0) as usize,
            high_engagement_posts: high.unwrap_or(0).max(0) as usize,
            average_likes: average.unwrap_or(0.0),
            top_group,
            last_scraped_at: last_ms.and_then(DateTime::from_timestamp_millis),
            groups_scraped: groups.max(0) as usize,
            posts_by_type,
        })
    }

    /// Authors with the most high-engagement posts in the stats window.
    pub async fn top_authors(&self, limit: usize, now: DateTime<Utc>) -> Result<Vec<AuthorStats>, StoreError> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT COALESCE(author_name, '') AS author, COUNT(*) AS n, AVG(likes) AS avg_likes
             FROM posts WHERE likes >= ?1 AND scraped_at >= ?2
             GROUP BY author ORDER BY n DESC, avg_likes DESC, author LIMIT ?3",
        )?;
        let authors = stmt
            .query_map(
                params![
                    sql_int(HIGH_ENGAGEMENT_LIKES),
                    window_start(Some(STATS_WINDOW_DAYS), now).map(millis),
                    sql_limit(limit),
                ],
                |row| {
                    let n: i64 = row.get(1)?;
                    Ok(AuthorStats {
                        author_name: row.get(0)?,
                        post_count: n.max(0) as usize,
                        avg_likes: row.get(2)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(authors)
    }

    /// Per-day engagement over the last `days` days, newest day first.
    pub async fn engagement_trends(&self, days: u32, now: DateTime<Utc>) -> Result<Vec<DailyTrend>, StoreError> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT date(scraped_at / 1000, 'unixepoch') AS day, COUNT(*), AVG(likes), MAX(likes)
             FROM posts WHERE scraped_at >= ?1
             GROUP BY day ORDER BY day DESC",
        )?;
        let trends = stmt
            .query_map(params![window_start(Some(days), now).map(millis)], |row| {
                let day: String = row.get(0)?;
                let date = NaiveDate::parse_from_str(&day, "%Y-%m-%d")
                    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;
                let n: i64 = row.get(1)?;
                Ok(DailyTrend {
                    date,
                    posts_count: n.max(0) as usize,
                    avg_likes: row.get(2)?,
                    max_likes: count_at(row, 3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(trends)
    }
}
