mod repository;
mod schema;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::models::{FeedItem, PersistedPost, UpsertSummary};

pub use repository::SqliteStore;

/// Durable, unique-keyed collection of posts.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Insert or update every item in one transaction.
    ///
    /// A row matches an item by `post_id` first, then by `url`. Later items in
    /// the batch win over earlier ones.
    async fn upsert_batch(&self, items: Vec<FeedItem>) -> Result<UpsertSummary, StoreError>;

    /// Posts with `start <= published_at < end`, newest first, plus the size
    /// of the whole filtered set.
    async fn query_range(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        offset: u64,
        limit: u32,
    ) -> Result<(Vec<PersistedPost>, u64), StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;
}
