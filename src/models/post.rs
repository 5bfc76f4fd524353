use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One normalized feed entry, as produced by the fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub post_id: String,
    pub url: String,
    pub author: String,
    pub title: String,
    /// Entry categories joined with ", " in source order.
    pub tag: String,
    pub summary: String,
    pub published_at: DateTime<Utc>,
}

/// A stored post. `id` grows with insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedPost {
    pub id: i64,
    pub post_id: String,
    pub url: String,
    pub author: String,
    pub title: String,
    pub tag: String,
    pub summary: String,
    pub published_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The representation handed to callers of the query operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostView {
    pub post_id: String,
    pub url: String,
    pub author: String,
    pub title: String,
    pub tag: String,
    pub summary: String,
    pub published_at: DateTime<Utc>,
}

impl From<PersistedPost> for PostView {
    fn from(post: PersistedPost) -> Self {
        Self {
            post_id: post.post_id,
            url: post.url,
            author: post.author,
            title: post.title,
            tag: post.tag,
            summary: post.summary,
            published_at: post.published_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    pub inserted: usize,
    pub updated: usize,
}

impl UpsertSummary {
    pub fn total(&self) -> usize {
        self.inserted + self.updated
    }
}
