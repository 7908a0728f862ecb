use sqlx::PgPool;
use uuid::Uuid;

use crate::services::store::StoreError;

#[derive(Clone)]
pub struct UsageRepo {
    pool: PgPool,
}

impl UsageRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// `estimated_cost_usd = tokens_used / 1e6 * cost_per_million`, per
    /// spec §4.6 Phase 4 step 5.
    pub async fn record(
        &self,
        search_id: Uuid,
        service: &str,
        tokens_used: i32,
        cost_per_million: f64,
    ) -> Result<(), StoreError> {
        let estimated_cost_usd = tokens_used as f64 / 1_000_000.0 * cost_per_million;
        sqlx::query(
            "INSERT INTO api_usage (id, search_id, service, tokens_used, estimated_cost_usd)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::new_v4())
        .bind(search_id)
        .bind(service)
        .bind(tokens_used)
        .bind(estimated_cost_usd)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
