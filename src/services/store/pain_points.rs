use sqlx::PgPool;
use uuid::Uuid;

use crate::models::pain_point::{PainPoint, PainPointQuote};
use crate::models::search::SourceTag;
use crate::services::store::StoreError;

#[derive(sqlx::FromRow)]
struct PainPointRow {
    id: Uuid,
    search_id: Uuid,
    title: String,
    source_tag: String,
    mentions_count: i32,
    severity_score: Option<f64>,
}

impl TryFrom<PainPointRow> for PainPoint {
    type Error = StoreError;

    fn try_from(row: PainPointRow) -> Result<Self, Self::Error> {
        Ok(PainPoint {
            id: row.id,
            search_id: row.search_id,
            title: row.title,
            source_tag: row.source_tag.parse::<SourceTag>().map_err(StoreError::Decode)?,
            mentions_count: row.mentions_count,
            severity_score: row.severity_score,
        })
    }
}

#[derive(Clone)]
pub struct PainPointsRepo {
    pool: PgPool,
}

impl PainPointsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, pain_point: &PainPoint) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO pain_points (id, search_id, title, source_tag, mentions_count, severity_score)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(pain_point.id)
        .bind(pain_point.search_id)
        .bind(&pain_point.title)
        .bind(pain_point.source_tag.as_str())
        .bind(pain_point.mentions_count)
        .bind(pain_point.severity_score)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn insert_quote(&self, quote: &PainPointQuote) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO pain_point_quotes
             (id, pain_point_id, quote_text, author_handle, upvotes, permalink)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(quote.id)
        .bind(quote.pain_point_id)
        .bind(&quote.quote_text)
        .bind(&quote.author_handle)
        .bind(quote.upvotes)
        .bind(&quote.permalink)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_for_search(&self, search_id: Uuid) -> Result<Vec<PainPoint>, StoreError> {
        let rows = sqlx::query_as::<_, PainPointRow>(
            "SELECT * FROM pain_points WHERE search_id = $1 ORDER BY mentions_count DESC",
        )
        .bind(search_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(PainPoint::try_from).collect()
    }

    pub async fn list_quotes_for_pain_point(
        &self,
        pain_point_id: Uuid,
    ) -> Result<Vec<PainPointQuote>, StoreError> {
        let rows = sqlx::query_as::<_, PainPointQuote>(
            "SELECT id, pain_point_id, quote_text, author_handle, upvotes, permalink
             FROM pain_point_quotes WHERE pain_point_id = $1 ORDER BY upvotes DESC",
        )
        .bind(pain_point_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_quotes_for_search(
        &self,
        search_id: Uuid,
    ) -> Result<Vec<PainPointQuote>, StoreError> {
        let rows = sqlx::query_as::<_, PainPointQuote>(
            "SELECT q.id, q.pain_point_id, q.quote_text, q.author_handle, q.upvotes, q.permalink
             FROM pain_point_quotes q
             JOIN pain_points p ON p.id = q.pain_point_id
             WHERE p.search_id = $1
             ORDER BY q.upvotes DESC",
        )
        .bind(search_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
