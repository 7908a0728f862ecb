use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::search::SourceTag;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PainPoint {
    pub id: Uuid,
    pub search_id: Uuid,
    pub title: String,
    pub source_tag: SourceTag,
    pub mentions_count: i32,
    pub severity_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct PainPointQuote {
    pub id: Uuid,
    pub pain_point_id: Uuid,
    pub quote_text: String,
    pub author_handle: Option<String>,
    pub upvotes: i32,
    pub permalink: String,
}
