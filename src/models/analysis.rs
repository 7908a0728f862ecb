use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Schema-versioned structured payload for one clustered problem theme.
///
/// Stored as JSONB inside `ai_analyses.problem_clusters`; decoded through
/// this struct rather than a raw `serde_json::Value` so a malformed Analyzer
/// response fails fast at the write boundary instead of silently persisting
/// garbage that breaks readers later.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProblemCluster {
    pub title: String,
    pub description: String,
    pub severity: f64,
    pub mention_count: i32,
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductIdea {
    pub title: String,
    pub description: String,
    pub target_problem: String,
    pub impact_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AiAnalysis {
    pub search_id: Uuid,
    pub summary: String,
    pub problem_clusters: Vec<ProblemCluster>,
    pub product_ideas: Vec<ProductIdea>,
    pub model: Option<String>,
    pub tokens_used: Option<i32>,
}
