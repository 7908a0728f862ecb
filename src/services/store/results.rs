use sqlx::PgPool;
use uuid::Uuid;

use crate::models::search::{SearchResults, SourceTag};
use crate::services::store::StoreError;

#[derive(sqlx::FromRow)]
struct SearchResultsRow {
    search_id: Uuid,
    total_posts_considered: i32,
    total_comments_considered: i32,
    total_mentions: i32,
    source_tags: Vec<String>,
}

impl TryFrom<SearchResultsRow> for SearchResults {
    type Error = StoreError;

    fn try_from(row: SearchResultsRow) -> Result<Self, Self::Error> {
        let source_tags = row
            .source_tags
            .iter()
            .map(|t| t.parse::<SourceTag>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::Decode)?;
        Ok(SearchResults {
            search_id: row.search_id,
            total_posts_considered: row.total_posts_considered,
            total_comments_considered: row.total_comments_considered,
            total_mentions: row.total_mentions,
            source_tags,
        })
    }
}

/// Repository for the 1:1 `SearchResults` aggregate row. Its presence is
/// the `already_completed` guard Phase 0 checks — it must be written last
/// in Phase 4 so a crash mid-persist never leaves it behind prematurely
/// (spec §4.6 Phase 4, §7 "Partial persistence", §9 ordering resolution).
#[derive(Clone)]
pub struct ResultsRepo {
    pool: PgPool,
}

impl ResultsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn exists(&self, search_id: Uuid) -> Result<bool, StoreError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1::bigint FROM search_results WHERE search_id = $1")
                .bind(search_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    pub async fn get(&self, search_id: Uuid) -> Result<Option<SearchResults>, StoreError> {
        let row = sqlx::query_as::<_, SearchResultsRow>(
            "SELECT * FROM search_results WHERE search_id = $1",
        )
        .bind(search_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(SearchResults::try_from).transpose()
    }

    pub async fn insert(&self, results: &SearchResults) -> Result<(), StoreError> {
        let source_tags: Vec<String> =
            results.source_tags.iter().map(|t| t.as_str().to_string()).collect();
        sqlx::query(
            "INSERT INTO search_results
             (search_id, total_posts_considered, total_comments_considered, total_mentions, source_tags)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(results.search_id)
        .bind(results.total_posts_considered)
        .bind(results.total_comments_considered)
        .bind(results.total_mentions)
        .bind(&source_tags)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
