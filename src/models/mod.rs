mod post;
mod response;

pub use post::{FeedItem, PersistedPost, PostView, UpsertSummary};
pub use response::{QueryRequest, QueryResponse, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
