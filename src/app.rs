use std::sync::Arc;

use crate::config::Config;
use crate::db::{PostStore, SqliteStore};
use crate::error::Result;
use crate::feed::{FeedFetcher, FeedSource};
use crate::models::{QueryRequest, QueryResponse};
use crate::scheduler::{RunOutcome, Scheduler};
use crate::services::{Ingestor, QueryService};

/// Wires the fetcher, store, scheduler and query service together and exposes
/// the operations a transport layer calls.
pub struct App {
    config: Config,
    store: Arc<dyn PostStore>,
    query_service: QueryService,
    scheduler: Scheduler,
}

impl App {
    pub async fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let store = Arc::new(SqliteStore::new(&config.db_path).await?);
        let fetcher = Arc::new(FeedFetcher::new(config)?);
        Self::with_parts(config, fetcher, store)
    }

    /// Build an app around an existing feed source and store.
    pub fn with_parts(
        config: &Config,
        source: Arc<dyn FeedSource>,
        store: Arc<dyn PostStore>,
    ) -> Result<Self> {
        let tz = config.tz()?;
        let ingestor = Ingestor::new(source, Arc::clone(&store));
        let query_service = QueryService::new(Arc::clone(&store), tz);

        Ok(Self {
            config: config.clone(),
            store,
            query_service,
            scheduler: Scheduler::new(ingestor),
        })
    }

    pub fn store(&self) -> &Arc<dyn PostStore> {
        &self.store
    }

    /// Run one ingestion cycle now. Shares the scheduler's overlap guard.
    pub async fn ingest(&self) -> RunOutcome {
        self.scheduler.trigger().await
    }

    pub async fn query(&self, start_time: &str, end_time: &str, page: i64, page_size: i64) -> QueryResponse {
        self.query_service
            .query(start_time, end_time, page, page_size)
            .await
    }

    pub async fn query_request(&self, request: &QueryRequest) -> QueryResponse {
        self.query_service.handle(request).await
    }

    pub fn health_check(&self) -> &'static str {
        "ok"
    }

    pub fn start_scheduler(&mut self) {
        self.scheduler.start(self.config.sync_interval());
    }

    pub fn is_scheduler_started(&self) -> bool {
        self.scheduler.is_started()
    }

    pub async fn shutdown(&mut self) {
        self.scheduler.stop().await;
    }
}
