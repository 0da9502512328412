// src/core/database.rs
//! Draft store: posts, user profiles and trends in a single SQLite file.
//!
//! Every operation opens its own connection and drops it when done. There is
//! no pool and no multi-statement transaction.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteRow};
use sqlx::{ConnectOptions, Row, SqliteConnection};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

// ===== Models =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Posted,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Posted => "posted",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "posted" => Ok(PostStatus::Posted),
            other => anyhow::bail!("Unknown post status: {}", other),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: i64,
    pub content: String,
    pub hashtags: String,
    pub status: PostStatus,
    pub created_at: DateTime<Utc>,
    pub posted_at: Option<DateTime<Utc>>,
}

impl Post {
    fn from_row(row: &SqliteRow) -> Result<Self> {
        let status: String = row.try_get("status")?;
        Ok(Self {
            id: row.try_get("id")?,
            content: row.try_get("content")?,
            hashtags: row.try_get("hashtags")?,
            status: status.parse()?,
            created_at: row.try_get("created_at")?,
            posted_at: row.try_get("posted_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub user_id: String,
    pub profile_summary: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Trend {
    pub id: i64,
    pub topic: String,
    pub source_url: String,
    pub created_at: DateTime<Utc>,
}

// ===== Store =====

#[derive(Debug, Clone)]
pub struct DraftStore {
    options: SqliteConnectOptions,
    location: String,
}

impl DraftStore {
    /// Accepts either a file path or a `sqlite:` URL
    pub fn new(database_path: &Path) -> Result<Self> {
        let location = database_path.display().to_string();
        let options = if location.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(&location)
                .with_context(|| format!("Invalid database URL: {}", location))?
        } else {
            SqliteConnectOptions::new().filename(database_path)
        };
        let options = options.create_if_missing(true);

        Ok(Self { options, location })
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    async fn connect(&self) -> Result<SqliteConnection> {
        self.options
            .connect()
            .await
            .with_context(|| format!("Failed to connect to database: {}", self.location))
    }

    /// Create tables and indexes; safe to call on every startup
    pub async fn init(&self) -> Result<()> {
        let mut conn = self.connect().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                content TEXT NOT NULL,
                hashtags TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'draft' CHECK (status IN ('draft', 'posted')),
                created_at TEXT NOT NULL,
                posted_at TEXT,
                CONSTRAINT posted_at_matches_status CHECK (
                    (status = 'posted' AND posted_at IS NOT NULL) OR
                    (status = 'draft' AND posted_at IS NULL)
                )
            );
            "#,
        )
        .execute(&mut conn)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_profiles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL UNIQUE,
                profile_summary_json TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&mut conn)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trends (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                topic TEXT NOT NULL,
                source_url TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                UNIQUE (topic, source_url)
            );
            "#,
        )
        .execute(&mut conn)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_posts_created_at ON posts(created_at);")
            .execute(&mut conn)
            .await?;

        info!("Database initialized: {}", self.location);
        Ok(())
    }

    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.connect().await?;
        sqlx::query("SELECT 1")
            .execute(&mut conn)
            .await
            .context("Database health check failed")?;
        Ok(())
    }

    // ----- posts -----

    pub async fn insert_post(&self, content: &str, hashtags: &str) -> Result<i64> {
        let mut conn = self.connect().await?;

        let result = sqlx::query(
            "INSERT INTO posts (content, hashtags, status, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(content)
        .bind(hashtags)
        .bind(PostStatus::Draft.as_str())
        .bind(Utc::now())
        .execute(&mut conn)
        .await
        .context("Failed to insert post")?;

        let id = result.last_insert_rowid();
        info!("Saved draft post {}", id);
        Ok(id)
    }

    /// Newest first
    pub async fn list_posts(&self) -> Result<Vec<Post>> {
        let mut conn = self.connect().await?;

        let rows = sqlx::query(
            r#"
            SELECT id, content, hashtags, status, created_at, posted_at
            FROM posts
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&mut conn)
        .await
        .context("Failed to list posts")?;

        rows.iter().map(Post::from_row).collect()
    }

    pub async fn get_post(&self, id: i64) -> Result<Option<Post>> {
        let mut conn = self.connect().await?;

        let row = sqlx::query(
            "SELECT id, content, hashtags, status, created_at, posted_at FROM posts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&mut conn)
        .await
        .context("Failed to load post")?;

        row.as_ref().map(Post::from_row).transpose()
    }

    /// Transition to posted. The first posted_at stamp is kept on repeat calls.
    pub async fn mark_posted(&self, id: i64) -> Result<bool> {
        let mut conn = self.connect().await?;

        let result = sqlx::query(
            r#"
            UPDATE posts
            SET status = 'posted', posted_at = COALESCE(posted_at, ?)
            WHERE id = ?
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&mut conn)
        .await
        .context("Failed to mark post as posted")?;

        let updated = result.rows_affected() > 0;
        if updated {
            info!("Marked post {} as posted", id);
        }
        Ok(updated)
    }

    /// Delete every post whose id is in `ids`. An empty set never touches the database.
    pub async fn delete_posts(&self, ids: &[i64]) -> Result<u64> {
        if ids.is_empty() {
            debug!("delete_posts called with no ids");
            return Ok(0);
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("DELETE FROM posts WHERE id IN ({})", placeholders);

        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(*id);
        }

        let mut conn = self.connect().await?;
        let result = query
            .execute(&mut conn)
            .await
            .context("Failed to delete posts")?;

        info!("Deleted {} posts", result.rows_affected());
        Ok(result.rows_affected())
    }

    // ----- user profiles -----

    pub async fn upsert_user_profile(
        &self,
        user_id: &str,
        profile_summary: &serde_json::Value,
    ) -> Result<()> {
        let mut conn = self.connect().await?;

        sqlx::query(
            r#"
            INSERT INTO user_profiles (user_id, profile_summary_json, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                profile_summary_json = excluded.profile_summary_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(serde_json::to_string(profile_summary)?)
        .bind(Utc::now())
        .execute(&mut conn)
        .await
        .context("Failed to upsert user profile")?;

        info!("Stored profile summary for {}", user_id);
        Ok(())
    }

    pub async fn get_user_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let mut conn = self.connect().await?;

        let row = sqlx::query(
            "SELECT user_id, profile_summary_json, updated_at FROM user_profiles WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&mut conn)
        .await
        .context("Failed to load user profile")?;

        match row {
            Some(row) => {
                let raw: String = row.try_get("profile_summary_json")?;
                Ok(Some(UserProfile {
                    user_id: row.try_get("user_id")?,
                    profile_summary: serde_json::from_str(&raw)
                        .context("Stored profile summary is not valid JSON")?,
                    updated_at: row.try_get("updated_at")?,
                }))
            }
            None => Ok(None),
        }
    }

    // ----- trends -----

    /// Insert-or-ignore keyed on (topic, source_url). Returns false for a duplicate.
    pub async fn insert_trend(&self, topic: &str, source_url: &str) -> Result<bool> {
        let mut conn = self.connect().await?;

        let result = sqlx::query(
            "INSERT OR IGNORE INTO trends (topic, source_url, created_at) VALUES (?, ?, ?)",
        )
        .bind(topic)
        .bind(source_url)
        .bind(Utc::now())
        .execute(&mut conn)
        .await
        .context("Failed to insert trend")?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list_trends(&self, limit: i64) -> Result<Vec<Trend>> {
        let mut conn = self.connect().await?;

        let rows = sqlx::query(
            r#"
            SELECT id, topic, source_url, created_at
            FROM trends
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&mut conn)
        .await
        .context("Failed to list trends")?;

        rows.iter()
            .map(|row| {
                Ok(Trend {
                    id: row.try_get("id")?,
                    topic: row.try_get("topic")?,
                    source_url: row.try_get("source_url")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }
}
