use async_trait::async_trait;

use super::model::*;

/// Where resume points live between sessions. Keys are `(id, content type)`
/// because a series and one of its episodes may share an id.
#[async_trait]
pub trait ContinueWatchingStore: Send + Sync {
    async fn set_continue_watching(&self, id: &str, seconds: i64, content_type: &str) -> DbResult<()>;
    async fn reset_continue_watching(&self, id: &str, content_type: &str) -> DbResult<()>;
    async fn get_continue_watching(&self, id: &str, content_type: &str) -> DbResult<Option<i64>>;
    /// Most recently updated first.
    async fn list_continue_watching(&self, limit: Option<u32>) -> DbResult<Vec<ContinueWatching>>;
}
