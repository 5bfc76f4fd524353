use std::sync::Arc;

use crate::db::PostStore;
use crate::error::Result;
use crate::feed::FeedSource;
use crate::models::UpsertSummary;

/// One fetch-then-upsert cycle.
#[derive(Clone)]
pub struct Ingestor {
    source: Arc<dyn FeedSource>,
    store: Arc<dyn PostStore>,
}

impl Ingestor {
    pub fn new(source: Arc<dyn FeedSource>, store: Arc<dyn PostStore>) -> Self {
        Self { source, store }
    }

    pub async fn run_once(&self) -> Result<UpsertSummary> {
        tracing::debug!("Fetching feed");
        let items = self.source.fetch().await?;
        let fetched = items.len();

        let summary = self.store.upsert_batch(items).await?;
        tracing::info!(
            "Ingested {} items ({} new, {} updated)",
            fetched,
            summary.inserted,
            summary.updated
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use crate::db::SqliteStore;
    use crate::error::{AppError, FetchError};
    use crate::models::FeedItem;

    struct StaticSource(Vec<FeedItem>);

    #[async_trait]
    impl FeedSource for StaticSource {
        async fn fetch(&self) -> std::result::Result<Vec<FeedItem>, FetchError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenSource;

    #[async_trait]
    impl FeedSource for BrokenSource {
        async fn fetch(&self) -> std::result::Result<Vec<FeedItem>, FetchError> {
            Err(FetchError::Status(reqwest::StatusCode::INTERNAL_SERVER_ERROR))
        }
    }

    fn item(post_id: &str) -> FeedItem {
        FeedItem {
            post_id: post_id.to_string(),
            url: format!("https://example.com/{}", post_id),
            author: "a".to_string(),
            title: "t".to_string(),
            tag: String::new(),
            summary: String::new(),
            published_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_run_once_stores_items() {
        let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
        let ingestor = Ingestor::new(Arc::new(StaticSource(vec![item("1"), item("2")])), store.clone());

        let first = ingestor.run_once().await.unwrap();
        let second = ingestor.run_once().await.unwrap();

        assert_eq!(first.inserted, 2);
        assert_eq!(second.inserted, 0);
        assert_eq!(second.updated, 2);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_writes_nothing() {
        let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
        let ingestor = Ingestor::new(Arc::new(BrokenSource), store.clone());

        let err = ingestor.run_once().await.unwrap_err();

        assert!(matches!(err, AppError::Fetch(FetchError::Status(_))));
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
