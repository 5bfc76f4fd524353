use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use feed_rs::model::Entry;
use feed_rs::parser::Builder;
use reqwest::Client;

use crate::config::Config;
use crate::datetime::parse_feed_timestamp;
use crate::error::FetchError;
use crate::models::FeedItem;

use super::{FeedSource, MAX_FEED_SIZE};

const CONNECT_TIMEOUT_SECS: u64 = 10;

pub struct FeedFetcher {
    client: Client,
    url: String,
}

impl FeedFetcher {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        Self::with_client_settings(&config.feed_url, &config.user_agent, config.request_timeout())
    }

    pub fn with_client_settings(url: &str, user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn fetch_items(&self) -> Result<Vec<FeedItem>, FetchError> {
        let response = self.client.get(&self.url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        if let Some(len) = response.content_length() {
            if len > MAX_FEED_SIZE {
                return Err(FetchError::TooLarge(len));
            }
        }

        let bytes = response.bytes().await?;
        if bytes.len() as u64 > MAX_FEED_SIZE {
            return Err(FetchError::TooLarge(bytes.len() as u64));
        }

        let items = parse_feed(&bytes)?;
        tracing::debug!("Parsed {} entries from {}", items.len(), self.url);
        Ok(items)
    }
}

#[async_trait]
impl FeedSource for FeedFetcher {
    async fn fetch(&self) -> Result<Vec<FeedItem>, FetchError> {
        self.fetch_items().await
    }
}

/// Parse a feed document into normalized items.
///
/// Fails on the first entry without a link or a usable publish date, so a
/// caller never sees a partial batch.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<FeedItem>, FetchError> {
    let rejected = Arc::new(Mutex::new(Vec::new()));
    let parser = Builder::new()
        .timestamp_parser({
            let rejected = Arc::clone(&rejected);
            move |text: &str| {
                let parsed = parse_feed_timestamp(text);
                if parsed.is_none() && !text.trim().is_empty() {
                    if let Ok(mut rejected) = rejected.lock() {
                        rejected.push(text.trim().to_string());
                    }
                }
                parsed
            }
        })
        .build();
    let feed = parser.parse(bytes)?;

    let rejected = rejected.lock().map(|r| r.clone()).unwrap_or_default();
    if !rejected.is_empty() {
        tracing::warn!("Unparsable feed timestamps: {:?}", rejected);
        // A rejected <published> surfaces as None and must not fall back to <updated>.
        if let Some(entry) = feed.entries.iter().find(|e| e.published.is_none()) {
            return Err(FetchError::InvalidTimestamp {
                entry: entry.id.clone(),
            });
        }
    }

    feed.entries.into_iter().map(item_from_entry).collect()
}

fn item_from_entry(entry: Entry) -> Result<FeedItem, FetchError> {
    let url = entry
        .links
        .first()
        .map(|l| l.href.trim().to_string())
        .filter(|href| !href.is_empty())
        .ok_or_else(|| FetchError::MissingField {
            entry: entry.id.clone(),
            field: "link",
        })?;

    // Atom entries may carry only <updated>.
    let published_at = entry
        .published
        .or(entry.updated)
        .ok_or_else(|| FetchError::InvalidTimestamp {
            entry: entry.id.clone(),
        })?;

    let tag = entry
        .categories
        .iter()
        .map(|c| c.term.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    Ok(FeedItem {
        post_id: entry.id,
        url,
        author: entry.authors.first().map(|a| a.name.clone()).unwrap_or_default(),
        title: entry.title.map(|t| t.content).unwrap_or_default(),
        tag,
        // Restricted posts are published without a summary.
        summary: entry.summary.map(|s| s.content).unwrap_or_default(),
        published_at,
    })
}
