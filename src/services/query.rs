use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::datetime::parse_local;
use crate::db::PostStore;
use crate::error::{Result, ValidationError};
use crate::models::{PersistedPost, PostView, QueryRequest, QueryResponse, MAX_PAGE_SIZE};

/// Validates query parameters and wraps store results in a [`QueryResponse`].
///
/// Never returns an error: every failure becomes `success = false`.
#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn PostStore>,
    tz: Tz,
}

impl QueryService {
    pub fn new(store: Arc<dyn PostStore>, tz: Tz) -> Self {
        Self { store, tz }
    }

    pub async fn query(&self, start_time: &str, end_time: &str, page: i64, page_size: i64) -> QueryResponse {
        match self.try_query(start_time, end_time, page, page_size).await {
            Ok((posts, total_count)) => {
                QueryResponse::ok(posts.into_iter().map(PostView::from).collect(), total_count)
            }
            Err(e) => {
                tracing::warn!(
                    "Query failed (start_time={:?}, end_time={:?}): {}",
                    start_time,
                    end_time,
                    e
                );
                QueryResponse::failure(e.to_string())
            }
        }
    }

    pub async fn handle(&self, request: &QueryRequest) -> QueryResponse {
        self.query(&request.start_time, &request.end_time, request.page, request.page_size)
            .await
    }

    async fn try_query(
        &self,
        start_time: &str,
        end_time: &str,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<PersistedPost>, u64)> {
        let start = self.parse_bound("start_time", start_time)?;
        let end = self.parse_bound("end_time", end_time)?;
        let (offset, limit) = clamp_paging(page, page_size);

        if let (Some(start), Some(end)) = (start, end) {
            if start >= end {
                return Ok((Vec::new(), 0));
            }
        }

        let result = self.store.query_range(start, end, offset, limit).await?;
        Ok(result)
    }

    fn parse_bound(&self, field: &'static str, value: &str) -> std::result::Result<Option<DateTime<Utc>>, ValidationError> {
        if value.trim().is_empty() {
            return Ok(None);
        }
        parse_local(field, value, self.tz).map(Some)
    }
}

/// Clamp `page` to at least 1 and `page_size` to `1..=100`, returning the
/// row offset and limit.
pub fn clamp_paging(page: i64, page_size: i64) -> (u64, u32) {
    let page = page.max(1) as u64;
    let limit = page_size.clamp(1, i64::from(MAX_PAGE_SIZE)) as u32;
    let offset = (page - 1).saturating_mul(u64::from(limit));
    (offset, limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;

    use crate::db::SqliteStore;
    use crate::error::StoreError;
    use crate::models::{FeedItem, UpsertSummary};

    fn item(post_id: &str, published_at: DateTime<Utc>) -> FeedItem {
        FeedItem {
            post_id: post_id.to_string(),
            url: format!("https://www.nodeseek.com/post-{}-1", post_id),
            author: "author".to_string(),
            title: format!("title {}", post_id),
            tag: "tech".to_string(),
            summary: String::new(),
            published_at,
        }
    }

    async fn service_with(items: Vec<FeedItem>, tz: Tz) -> QueryService {
        let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
        store.upsert_batch(items).await.unwrap();
        QueryService::new(store, tz)
    }

    fn a_and_b() -> Vec<FeedItem> {
        vec![
            item("1", Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()),
            item("2", Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap()),
        ]
    }

    struct FailingStore;

    #[async_trait]
    impl PostStore for FailingStore {
        async fn upsert_batch(&self, _items: Vec<FeedItem>) -> std::result::Result<UpsertSummary, StoreError> {
            Err(StoreError::Sqlite(rusqlite::Error::InvalidQuery))
        }

        async fn query_range(
            &self,
            _start: Option<DateTime<Utc>>,
            _end: Option<DateTime<Utc>>,
            _offset: u64,
            _limit: u32,
        ) -> std::result::Result<(Vec<PersistedPost>, u64), StoreError> {
            Err(StoreError::Sqlite(rusqlite::Error::InvalidQuery))
        }

        async fn count(&self) -> std::result::Result<u64, StoreError> {
            Err(StoreError::Sqlite(rusqlite::Error::InvalidQuery))
        }
    }

    #[test]
    fn test_clamp_paging() {
        assert_eq!(clamp_paging(1, 20), (0, 20));
        assert_eq!(clamp_paging(3, 20), (40, 20));
        assert_eq!(clamp_paging(0, 20), (0, 20));
        assert_eq!(clamp_paging(-5, 0), (0, 1));
        assert_eq!(clamp_paging(2, 1000), (100, 100));
        assert_eq!(clamp_paging(i64::MAX, 100).1, 100);
    }

    #[tokio::test]
    async fn test_range_scenario_in_utc() {
        let service = service_with(a_and_b(), chrono_tz::UTC).await;
        let resp = service
            .query("2025-01-01 00:00:00", "2025-01-02 00:00:00", 1, 20)
            .await;

        assert!(resp.success);
        assert_eq!(resp.error, "");
        assert_eq!(resp.total_count, 1);
        assert_eq!(resp.posts.len(), 1);
        assert_eq!(resp.posts[0].post_id, "1");
    }

    #[tokio::test]
    async fn test_range_scenario_in_shanghai() {
        let service = service_with(a_and_b(), chrono_tz::Asia::Shanghai).await;
        let resp = service
            .query("2025-01-01 00:00:00", "2025-01-02 00:00:00", 1, 20)
            .await;

        assert!(resp.success);
        assert_eq!(resp.total_count, 1);
        assert_eq!(resp.posts[0].post_id, "1");
    }

    #[tokio::test]
    async fn test_local_bounds_are_converted_to_utc() {
        let service = service_with(a_and_b(), chrono_tz::Asia::Shanghai).await;

        // 08:00 Shanghai is exactly A's publish instant.
        let resp = service.query("2025-01-01 08:00:00", "", 1, 20).await;
        assert_eq!(resp.total_count, 2);

        let resp = service.query("2025-01-01 08:00:01", "", 1, 20).await;
        assert_eq!(resp.total_count, 1);
        assert_eq!(resp.posts[0].post_id, "2");
    }

    #[tokio::test]
    async fn test_unparsable_start_returns_failure_envelope() {
        let service = service_with(a_and_b(), chrono_tz::UTC).await;
        let resp = service.query("not-a-date", "", 1, 20).await;

        assert!(!resp.success);
        assert!(!resp.error.is_empty());
        assert!(resp.posts.is_empty());
        assert_eq!(resp.total_count, 0);
    }

    #[tokio::test]
    async fn test_unbounded_query_returns_everything_newest_first() {
        let service = service_with(a_and_b(), chrono_tz::UTC).await;
        let resp = service.handle(&QueryRequest::default()).await;

        assert!(resp.success);
        assert_eq!(resp.total_count, 2);
        let ids: Vec<_> = resp.posts.iter().map(|p| p.post_id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1"]);
    }

    #[tokio::test]
    async fn test_out_of_range_paging_is_clamped() {
        let service = service_with(a_and_b(), chrono_tz::UTC).await;

        let resp = service.query("", "", 0, 0).await;
        assert!(resp.success);
        assert_eq!(resp.posts.len(), 1);
        assert_eq!(resp.posts[0].post_id, "2");
        assert_eq!(resp.total_count, 2);

        let resp = service.query("", "", 2, 1).await;
        assert_eq!(resp.posts[0].post_id, "1");

        let resp = service.query("", "", 3, 1).await;
        assert!(resp.success);
        assert!(resp.posts.is_empty());
        assert_eq!(resp.total_count, 2);
    }

    #[tokio::test]
    async fn test_inverted_range_is_empty() {
        let service = service_with(a_and_b(), chrono_tz::UTC).await;
        let resp = service
            .query("2025-01-03 00:00:00", "2025-01-01 00:00:00", 1, 20)
            .await;

        assert!(resp.success);
        assert!(resp.posts.is_empty());
        assert_eq!(resp.total_count, 0);
    }

    #[tokio::test]
    async fn test_store_failure_returns_failure_envelope() {
        let service = QueryService::new(Arc::new(FailingStore), chrono_tz::UTC);
        let resp = service.query("", "", 1, 20).await;

        assert!(!resp.success);
        assert!(resp.error.contains("sqlite error"));
        assert!(resp.posts.is_empty());
        assert_eq!(resp.total_count, 0);
    }
}
