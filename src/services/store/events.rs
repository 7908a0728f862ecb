use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::event::{EventType, Phase, SearchEvent};
use crate::services::store::StoreError;

#[derive(sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    search_id: Uuid,
    phase: String,
    event_type: String,
    payload: Value,
    created_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for SearchEvent {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(SearchEvent {
            id: row.id,
            search_id: row.search_id,
            phase: row.phase.parse::<Phase>().map_err(StoreError::Decode)?,
            event_type: row.event_type.parse::<EventType>().map_err(StoreError::Decode)?,
            payload: row.payload,
            created_at: row.created_at,
        })
    }
}

#[derive(Clone)]
pub struct EventsRepo {
    pool: PgPool,
}

impl EventsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, event: &SearchEvent) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO search_events (id, search_id, phase, event_type, payload, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(event.id)
        .bind(event.search_id)
        .bind(event.phase.to_string())
        .bind(event.event_type.to_string())
        .bind(&event.payload)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Ordered by `created_at`, the contract `Subscriber::backfill` relies
    /// on (spec §4.8).
    pub async fn list_for_search(&self, search_id: Uuid) -> Result<Vec<SearchEvent>, StoreError> {
        let rows = sqlx::query_as::<_, EventRow>(
            "SELECT * FROM search_events WHERE search_id = $1 ORDER BY created_at ASC",
        )
        .bind(search_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(SearchEvent::try_from).collect()
    }
}
