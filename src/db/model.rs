use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored resume point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinueWatching {
    pub id: String,
    pub content_type: String,
    pub seconds: i64,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

pub type DbResult<T> = Result<T, DbError>;
