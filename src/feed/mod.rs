mod fetcher;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::models::FeedItem;

pub use fetcher::{parse_feed, FeedFetcher};

/// Upper bound on the size of a feed document, in bytes.
pub const MAX_FEED_SIZE: u64 = 10 * 1024 * 1024;

/// Anything that can produce the current batch of feed items.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<FeedItem>, FetchError>;
}
