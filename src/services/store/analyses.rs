use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::analysis::{AiAnalysis, ProblemCluster, ProductIdea};
use crate::services::store::StoreError;

#[derive(sqlx::FromRow)]
struct AnalysisRow {
    search_id: Uuid,
    summary: String,
    problem_clusters: Value,
    product_ideas: Value,
    model: Option<String>,
    tokens_used: Option<i32>,
}

impl TryFrom<AnalysisRow> for AiAnalysis {
    type Error = StoreError;

    fn try_from(row: AnalysisRow) -> Result<Self, Self::Error> {
        let problem_clusters: Vec<ProblemCluster> =
            serde_json::from_value(row.problem_clusters).map_err(|e| StoreError::Decode(e.to_string()))?;
        let product_ideas: Vec<ProductIdea> =
            serde_json::from_value(row.product_ideas).map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(AiAnalysis {
            search_id: row.search_id,
            summary: row.summary,
            problem_clusters,
            product_ideas,
            model: row.model,
            tokens_used: row.tokens_used,
        })
    }
}

#[derive(Clone)]
pub struct AnalysesRepo {
    pool: PgPool,
}

impl AnalysesRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, analysis: &AiAnalysis) -> Result<(), StoreError> {
        let clusters = serde_json::to_value(&analysis.problem_clusters)
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        let ideas = serde_json::to_value(&analysis.product_ideas)
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        sqlx::query(
            "INSERT INTO ai_analyses
             (search_id, summary, problem_clusters, product_ideas, model, tokens_used)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(analysis.search_id)
        .bind(&analysis.summary)
        .bind(clusters)
        .bind(ideas)
        .bind(&analysis.model)
        .bind(analysis.tokens_used)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, search_id: Uuid) -> Result<Option<AiAnalysis>, StoreError> {
        let row = sqlx::query_as::<_, AnalysisRow>(
            "SELECT * FROM ai_analyses WHERE search_id = $1",
        )
        .bind(search_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(AiAnalysis::try_from).transpose()
    }
}
