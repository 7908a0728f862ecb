use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::search::{Search, SearchStatus, SortBy, SourceTag, TimeRange};
use crate::services::store::StoreError;

#[derive(sqlx::FromRow)]
struct SearchRow {
    id: Uuid,
    topic: String,
    tags: Vec<String>,
    time_range: String,
    min_upvotes: i32,
    sort_by: String,
    status: String,
    error_message: Option<String>,
    retry_count: i32,
    last_retry_at: Option<DateTime<Utc>>,
    next_retry_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<SearchRow> for Search {
    type Error = StoreError;

    fn try_from(row: SearchRow) -> Result<Self, Self::Error> {
        let tags = row
            .tags
            .iter()
            .map(|t| t.parse::<SourceTag>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::Decode)?;
        let time_range =
            row.time_range.parse::<TimeRange>().map_err(StoreError::Decode)?;
        let sort_by = row.sort_by.parse::<SortBy>().map_err(StoreError::Decode)?;
        let status = row.status.parse::<SearchStatus>().map_err(StoreError::Decode)?;

        Ok(Search {
            id: row.id,
            topic: row.topic,
            tags,
            time_range,
            min_upvotes: row.min_upvotes,
            sort_by,
            status,
            error_message: row.error_message,
            retry_count: row.retry_count,
            last_retry_at: row.last_retry_at,
            next_retry_at: row.next_retry_at,
            created_at: row.created_at,
            completed_at: row.completed_at,
        })
    }
}

#[derive(Clone)]
pub struct SearchesRepo {
    pool: PgPool,
}

impl SearchesRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, search: &Search) -> Result<(), StoreError> {
        let tags: Vec<String> = search.tags.iter().map(|t| t.as_str().to_string()).collect();
        sqlx::query(
            "INSERT INTO searches
             (id, topic, tags, time_range, min_upvotes, sort_by, status, error_message,
              retry_count, last_retry_at, next_retry_at, created_at, completed_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(search.id)
        .bind(&search.topic)
        .bind(&tags)
        .bind(search.time_range.to_string())
        .bind(search.min_upvotes)
        .bind(search.sort_by.to_string())
        .bind(search.status.to_string())
        .bind(&search.error_message)
        .bind(search.retry_count)
        .bind(search.last_retry_at)
        .bind(search.next_retry_at)
        .bind(search.created_at)
        .bind(search.completed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Search>, StoreError> {
        let row = sqlx::query_as::<_, SearchRow>("SELECT * FROM searches WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Search::try_from).transpose()
    }

    /// Claims up to `limit` ready pending searches under `FOR UPDATE SKIP
    /// LOCKED` and atomically transitions them to PROCESSING within the
    /// same transaction. Safe under concurrently-running Scheduler
    /// instances — spec §4.3/§4.5/§8 "Dispatch exclusivity".
    pub async fn find_pending_ready(
        &self,
        now: DateTime<Utc>,
        max_retries: i32,
        limit: i64,
    ) -> Result<Vec<Search>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query_as::<_, SearchRow>(
            "SELECT * FROM searches
             WHERE status = 'pending' AND retry_count < $1
               AND (next_retry_at IS NULL OR next_retry_at <= $2)
             ORDER BY created_at ASC
             LIMIT $3
             FOR UPDATE SKIP LOCKED",
        )
        .bind(max_retries)
        .bind(now)
        .bind(limit)
        .fetch_all(&mut *tx)
        .await?;

        if rows.is_empty() {
            tx.commit().await?;
            return Ok(vec![]);
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        sqlx::query(
            "UPDATE searches SET status = 'processing', last_retry_at = $1
             WHERE id = ANY($2)",
        )
        .bind(now)
        .bind(&ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        rows.into_iter()
            .map(|mut row| {
                row.status = "processing".to_string();
                row.last_retry_at = Some(now);
                Search::try_from(row)
            })
            .collect()
    }

    /// Resets searches stuck in PROCESSING past `stale_after` back to
    /// PENDING with incremented retry_count and scheduled back-off, per
    /// spec §4.3 `reset_stale`. Returns the number of rows reset.
    pub async fn reset_stale(
        &self,
        now: DateTime<Utc>,
        stale_after: ChronoDuration,
        max_retries: i32,
    ) -> Result<u64, StoreError> {
        let stale_before = now - stale_after;
        let result = sqlx::query(
            "UPDATE searches
             SET status = 'pending',
                 retry_count = retry_count + 1,
                 next_retry_at = $1 + (power(2, retry_count)::text || ' minutes')::interval,
                 error_message = 'Search timed out and will be retried'
             WHERE status = 'processing'
               AND last_retry_at < $2
               AND retry_count < $3",
        )
        .bind(now)
        .bind(stale_before)
        .bind(max_retries)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Terminal-fails stale PROCESSING searches that have exhausted
    /// retries, per spec §4.3 `mark_permanently_failed`.
    pub async fn mark_permanently_failed(
        &self,
        now: DateTime<Utc>,
        stale_after: ChronoDuration,
        max_retries: i32,
    ) -> Result<u64, StoreError> {
        let stale_before = now - stale_after;
        let result = sqlx::query(
            "UPDATE searches
             SET status = 'failed', error_message = 'Search timed out and exceeded retry limit'
             WHERE status = 'processing'
               AND last_retry_at < $1
               AND retry_count >= $2",
        )
        .bind(stale_before)
        .bind(max_retries)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// `PROCESSING -> COMPLETED`. Guarded by `WHERE status = 'processing'`;
    /// a zero-rows result is a conflicting-transition, logged not surfaced.
    pub async fn transition_to_completed(
        &self,
        id: Uuid,
        completed_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE searches SET status = 'completed', completed_at = $1
             WHERE id = $2 AND status = 'processing'",
        )
        .bind(completed_at)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// `PROCESSING -> PENDING` with incremented retry_count and computed
    /// back-off, or `PROCESSING -> FAILED` when retries are exhausted —
    /// the Worker's failure-handling transition from spec §4.6/§4.7.
    pub async fn schedule_retry_or_fail(
        &self,
        id: Uuid,
        retry_count: i32,
        next_retry_at: Option<DateTime<Utc>>,
        error_message: &str,
        failed: bool,
    ) -> Result<bool, StoreError> {
        let status = if failed { "failed" } else { "pending" };
        let result = sqlx::query(
            "UPDATE searches
             SET status = $1, retry_count = $2, next_retry_at = $3, error_message = $4
             WHERE id = $5 AND status = 'processing'",
        )
        .bind(status)
        .bind(retry_count)
        .bind(next_retry_at)
        .bind(error_message)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
