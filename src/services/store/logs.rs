use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::log::{JobLog, LogLevel};
use crate::services::store::StoreError;

#[derive(Clone)]
pub struct LogsRepo {
    pool: PgPool,
}

impl LogsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn append(
        &self,
        search_id: Option<Uuid>,
        level: LogLevel,
        message: &str,
        context: Value,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO job_logs (id, search_id, level, message, context, created_at)
             VALUES ($1, $2, $3, $4, $5, now())",
        )
        .bind(Uuid::new_v4())
        .bind(search_id)
        .bind(level.to_string())
        .bind(message)
        .bind(context)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_for_search(&self, search_id: Uuid) -> Result<Vec<JobLog>, StoreError> {
        #[derive(sqlx::FromRow)]
        struct Row {
            id: Uuid,
            search_id: Option<Uuid>,
            level: String,
            message: String,
            context: Value,
            created_at: chrono::DateTime<chrono::Utc>,
        }

        let rows = sqlx::query_as::<_, Row>(
            "SELECT * FROM job_logs WHERE search_id = $1 ORDER BY created_at ASC",
        )
        .bind(search_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                let level = match r.level.as_str() {
                    "info" => LogLevel::Info,
                    "warn" => LogLevel::Warn,
                    "error" => LogLevel::Error,
                    other => return Err(StoreError::Decode(format!("unknown log level: {other}"))),
                };
                Ok(JobLog {
                    id: r.id,
                    search_id: r.search_id,
                    level,
                    message: r.message,
                    context: r.context,
                    created_at: r.created_at,
                })
            })
            .collect()
    }
}
