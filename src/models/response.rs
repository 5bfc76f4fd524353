use serde::{Deserialize, Serialize};

use super::PostView;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Raw query parameters as a transport layer would receive them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryRequest {
    /// `YYYY-MM-DD HH:MM:SS` in the configured zone, or empty for no lower bound.
    pub start_time: String,
    pub end_time: String,
    pub page: i64,
    pub page_size: i64,
}

impl Default for QueryRequest {
    fn default() -> Self {
        Self {
            start_time: String::new(),
            end_time: String::new(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE as i64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub success: bool,
    pub error: String,
    pub posts: Vec<PostView>,
    pub total_count: u64,
}

impl QueryResponse {
    pub fn ok(posts: Vec<PostView>, total_count: u64) -> Self {
        Self {
            success: true,
            error: String::new(),
            posts,
            total_count,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            posts: Vec::new(),
            total_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_request_defaults_fill_missing_fields() {
        let req: QueryRequest = serde_json::from_str(r#"{"start_time": "2025-01-01 00:00:00"}"#).unwrap();
        assert_eq!(req.start_time, "2025-01-01 00:00:00");
        assert_eq!(req.end_time, "");
        assert_eq!(req.page, 1);
        assert_eq!(req.page_size, 20);
    }

    #[test]
    fn test_response_serializes_utc_iso8601() {
        let post = PostView {
            post_id: "419416".to_string(),
            url: "https://www.nodeseek.com/post-419416-1".to_string(),
            author: "someone".to_string(),
            title: "hello".to_string(),
            tag: "tech".to_string(),
            summary: String::new(),
            published_at: Utc.with_ymd_and_hms(2025, 8, 10, 16, 49, 46).unwrap(),
        };
        let json = serde_json::to_value(QueryResponse::ok(vec![post], 1)).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["error"], "");
        assert_eq!(json["total_count"], 1);
        assert_eq!(json["posts"][0]["published_at"], "2025-08-10T16:49:46Z");
    }

    #[test]
    fn test_failure_envelope_is_empty() {
        let resp = QueryResponse::failure("boom");
        assert!(!resp.success);
        assert_eq!(resp.error, "boom");
        assert!(resp.posts.is_empty());
        assert_eq!(resp.total_count, 0);
    }
}
