use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, OptionalExtension, Row, Transaction};
use tokio_rusqlite::Connection;

use crate::datetime::{from_storage, to_storage};
use crate::error::StoreError;
use crate::models::{FeedItem, PersistedPost, UpsertSummary};

use super::schema::SCHEMA;
use super::PostStore;

const POST_COLUMNS: &str =
    "id, post_id, url, author, title, tag, summary, published_at, created_at, updated_at";

/// SQLite-backed post store.
///
/// File databases get a writer and a separate reader connection in WAL mode,
/// so queries read the last committed snapshot instead of waiting for a batch
/// to finish. In-memory databases share a single connection.
pub struct SqliteStore {
    writer: Connection,
    reader: Connection,
}

impl SqliteStore {
    pub async fn new(db_path: &str) -> Result<Self, StoreError> {
        if db_path == ":memory:" {
            return Self::open_in_memory().await;
        }

        let writer = Connection::open(db_path).await?;
        writer
            .call(|conn| {
                configure(conn)?;
                conn.execute_batch(SCHEMA)?;
                Ok(())
            })
            .await?;

        let reader = Connection::open(db_path).await?;
        reader
            .call(|conn| {
                configure(conn)?;
                Ok(())
            })
            .await?;

        tracing::debug!("Opened post store at {}", db_path);
        Ok(Self { writer, reader })
    }

    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().await?;
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self {
            writer: conn.clone(),
            reader: conn,
        })
    }
}

fn configure(conn: &mut rusqlite::Connection) -> rusqlite::Result<()> {
    conn.busy_timeout(Duration::from_secs(5))?;
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    if !mode.eq_ignore_ascii_case("wal") {
        tracing::warn!("SQLite refused WAL mode (journal_mode = {})", mode);
    }
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    Ok(())
}

#[async_trait]
impl PostStore for SqliteStore {
    async fn upsert_batch(&self, items: Vec<FeedItem>) -> Result<UpsertSummary, StoreError> {
        if items.is_empty() {
            return Ok(UpsertSummary::default());
        }

        let summary = self
            .writer
            .call(move |conn| {
                let tx = conn.transaction()?;
                let summary = upsert_items(&tx, &items)?;
                tx.commit()?;
                Ok(summary)
            })
            .await?;
        Ok(summary)
    }

    async fn query_range(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        offset: u64,
        limit: u32,
    ) -> Result<(Vec<PersistedPost>, u64), StoreError> {
        let result = self
            .reader
            .call(move |conn| {
                // Count and page come from the same snapshot.
                let tx = conn.transaction()?;
                let result = select_range(&tx, start, end, offset, limit)?;
                tx.commit()?;
                Ok(result)
            })
            .await?;
        Ok(result)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let count = self
            .reader
            .call(|conn| {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
                Ok(count)
            })
            .await?;
        Ok(count.max(0) as u64)
    }
}

fn upsert_items(tx: &Transaction<'_>, items: &[FeedItem]) -> rusqlite::Result<UpsertSummary> {
    let now = to_storage(&Utc::now());

    let mut by_post_id = tx.prepare_cached("SELECT id FROM posts WHERE post_id = ?1")?;
    let mut by_url = tx.prepare_cached("SELECT id FROM posts WHERE url = ?1")?;
    let mut update = tx.prepare_cached(
        r#"UPDATE posts SET
               author = ?2,
               title = ?3,
               tag = ?4,
               summary = ?5,
               published_at = ?6,
               updated_at = ?7
           WHERE id = ?1"#,
    )?;
    let mut insert = tx.prepare_cached(
        r#"INSERT INTO posts (post_id, url, author, title, tag, summary, published_at, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)"#,
    )?;

    let mut summary = UpsertSummary::default();
    for item in items {
        let published_at = to_storage(&item.published_at);

        let existing: Option<i64> = match by_post_id
            .query_row(params![item.post_id], |row| row.get(0))
            .optional()?
        {
            Some(id) => Some(id),
            None => by_url
                .query_row(params![item.url], |row| row.get(0))
                .optional()?,
        };

        match existing {
            Some(id) => {
                update.execute(params![
                    id,
                    item.author,
                    item.title,
                    item.tag,
                    item.summary,
                    published_at,
                    now,
                ])?;
                summary.updated += 1;
            }
            None => {
                insert.execute(params![
                    item.post_id,
                    item.url,
                    item.author,
                    item.title,
                    item.tag,
                    item.summary,
                    published_at,
                    now,
                ])?;
                summary.inserted += 1;
            }
        }
    }

    Ok(summary)
}

fn select_range(
    tx: &Transaction<'_>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    offset: u64,
    limit: u32,
) -> rusqlite::Result<(Vec<PersistedPost>, u64)> {
    let mut conditions = Vec::new();
    let mut args = Vec::new();
    if let Some(start) = start {
        conditions.push("published_at >= ?");
        args.push(Value::Text(to_storage(&start)));
    }
    if let Some(end) = end {
        conditions.push("published_at < ?");
        args.push(Value::Text(to_storage(&end)));
    }
    let filter = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let total: i64 = tx.query_row(
        &format!("SELECT COUNT(*) FROM posts{}", filter),
        params_from_iter(args.iter()),
        |row| row.get(0),
    )?;

    args.push(Value::Integer(i64::from(limit)));
    args.push(Value::Integer(i64::try_from(offset).unwrap_or(i64::MAX)));

    let mut stmt = tx.prepare(&format!(
        "SELECT {} FROM posts{} ORDER BY published_at DESC, id ASC LIMIT ? OFFSET ?",
        POST_COLUMNS, filter
    ))?;
    let posts = stmt
        .query_map(params_from_iter(args.iter()), post_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok((posts, total.max(0) as u64))
}

fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    from_storage(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("invalid timestamp {:?}", raw).into(),
        )
    })
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<PersistedPost> {
    Ok(PersistedPost {
        id: row.get(0)?,
        post_id: row.get(1)?,
        url: row.get(2)?,
        author: row.get(3)?,
        title: row.get(4)?,
        tag: row.get(5)?,
        summary: row.get(6)?,
        published_at: timestamp_at(row, 7)?,
        created_at: timestamp_at(row, 8)?,
        updated_at: timestamp_at(row, 9)?,
    })
}
