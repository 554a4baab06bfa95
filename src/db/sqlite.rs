use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tokio::sync::RwLock;
use tracing::info;

use super::model::*;
use super::repo::*;

pub struct SqliteRepository {
    pool: SqlitePool,
    resume_cache: Arc<RwLock<HashMap<(String, String), i64>>>,
}

impl SqliteRepository {
    pub async fn new(db_path: &str) -> DbResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let repo = Self {
            pool,
            resume_cache: Arc::new(RwLock::new(HashMap::new())),
        };

        repo.init_schema().await?;

        info!("Database initialized at {}", db_path);

        Ok(repo)
    }

    async fn init_schema(&self) -> DbResult<()> {
        let schema = include_str!("schema.sql");
        sqlx::query(schema).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl ContinueWatchingStore for SqliteRepository {
    async fn set_continue_watching(&self, id: &str, seconds: i64, content_type: &str) -> DbResult<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO continuewatching (id, type, seconds, timestamp)
            VALUES (?, ?, ?, ?)",
        )
        .bind(id)
        .bind(content_type)
        .bind(seconds)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        // Only cache what made it to disk.
        let mut cache = self.resume_cache.write().await;
        cache.insert((id.to_string(), content_type.to_string()), seconds);
        Ok(())
    }

    async fn reset_continue_watching(&self, id: &str, content_type: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM continuewatching WHERE id = ? AND type = ?")
            .bind(id)
            .bind(content_type)
            .execute(&self.pool)
            .await?;

        let mut cache = self.resume_cache.write().await;
        cache.remove(&(id.to_string(), content_type.to_string()));
        Ok(())
    }

    async fn get_continue_watching(&self, id: &str, content_type: &str) -> DbResult<Option<i64>> {
        let key = (id.to_string(), content_type.to_string());
        {
            let cache = self.resume_cache.read().await;
            if let Some(seconds) = cache.get(&key) {
                return Ok(Some(*seconds));
            }
        }

        let result = sqlx::query_as::<_, (i64,)>(
            "SELECT seconds FROM continuewatching WHERE id = ? AND type = ?",
        )
        .bind(id)
        .bind(content_type)
        .fetch_optional(&self.pool)
        .await?;

        let Some((seconds,)) = result else {
            return Ok(None);
        };

        let mut cache = self.resume_cache.write().await;
        cache.insert(key, seconds);

        Ok(Some(seconds))
    }

    async fn list_continue_watching(&self, limit: Option<u32>) -> DbResult<Vec<ContinueWatching>> {
        let mut query = "SELECT id, type, seconds, timestamp
            FROM continuewatching
            ORDER BY timestamp DESC"
            .to_string();
        if let Some(limit) = limit {
            let _ = write!(&mut query, " LIMIT {}", limit);
        }

        let results = sqlx::query_as::<_, (String, String, i64, Option<String>)>(&query)
            .fetch_all(&self.pool)
            .await?;

        let entries = results
            .into_iter()
            .map(|r| ContinueWatching {
                id: r.0,
                content_type: r.1,
                seconds: r.2,
                timestamp: r.3.and_then(|s| {
                    DateTime::parse_from_rfc3339(&s)
                        .ok()
                        .map(|dt| dt.with_timezone(&Utc))
                }),
            })
            .collect();

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Movie;

    async fn open(dir: &tempfile::TempDir) -> SqliteRepository {
        let path = dir.path().join("resume.db");
        SqliteRepository::new(path.to_str().unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn test_set_get_reset() {
        let dir = tempfile::tempdir().unwrap();
        let repo = open(&dir).await;

        assert_eq!(repo.get_continue_watching("m1", "vod").await.unwrap(), None);

        repo.set_continue_watching("m1", 120, "vod").await.unwrap();
        assert_eq!(repo.get_continue_watching("m1", "vod").await.unwrap(), Some(120));
        assert_eq!(repo.get_continue_watching("m1", "series").await.unwrap(), None);

        repo.reset_continue_watching("m1", "vod").await.unwrap();
        assert_eq!(repo.get_continue_watching("m1", "vod").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_cache_alone() {
        let dir = tempfile::tempdir().unwrap();
        let repo = open(&dir).await;

        repo.set_continue_watching("m1", 100, "vod").await.unwrap();
        repo.close().await;

        assert!(repo.set_continue_watching("m1", 200, "vod").await.is_err());
        assert_eq!(repo.get_continue_watching("m1", "vod").await.unwrap(), Some(100));
        assert!(repo.reset_continue_watching("m1", "vod").await.is_err());
        assert_eq!(repo.get_continue_watching("m1", "vod").await.unwrap(), Some(100));
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let repo = open(&dir).await;
            repo.set_continue_watching("m2", 900, "vod").await.unwrap();
            repo.close().await;
        }
        let repo = open(&dir).await;
        assert_eq!(repo.get_continue_watching("m2", "vod").await.unwrap(), Some(900));

        let entries = repo.list_continue_watching(Some(10)).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "m2");
        assert_eq!(entries[0].seconds, 900);
        assert!(entries[0].timestamp.is_some());
    }

    #[tokio::test]
    async fn test_movie_round_trip_through_store() {
        let dir = tempfile::tempdir().unwrap();
        let repo = open(&dir).await;

        let mut movie = Movie::new("m3", "vod");
        movie.save_continue_watching(&repo, 30, 75).await.unwrap();

        let mut fresh = Movie::new("m3", "vod");
        assert!(fresh.load_continue_watching(&repo).await.unwrap());
        assert_eq!(fresh.continue_watching_time, 75);

        fresh.save_continue_watching(&repo, 30, 10).await.unwrap();
        assert_eq!(fresh.continue_watching_time, 0);
        assert_eq!(repo.get_continue_watching("m3", "vod").await.unwrap(), None);
    }
}
