use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::analysis::{ProblemCluster, ProductIdea};
use crate::models::search::{SortBy, SourceTag, TimeRange};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PainPointView {
    pub id: Uuid,
    pub search_id: Uuid,
    pub title: String,
    pub source_tag: SourceTag,
    pub mentions_count: i32,
    pub severity_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuoteView {
    pub id: Uuid,
    pub pain_point_id: Uuid,
    pub quote_text: String,
    pub author_handle: Option<String>,
    pub upvotes: i32,
    pub permalink: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisView {
    pub summary: String,
    pub problem_clusters: Vec<ProblemCluster>,
    pub product_ideas: Vec<ProductIdea>,
    pub model: Option<String>,
    pub tokens_used: Option<i32>,
}

/// The canonical completed-search shape: stored (serialized) in Cache and
/// returned by Intake/StatusReader on cache hits. See spec §6.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub search_id: Uuid,
    pub status: String,
    pub topic: String,
    pub tags: Vec<SourceTag>,
    pub time_range: TimeRange,
    pub min_upvotes: i32,
    pub sort_by: SortBy,
    pub total_mentions: i32,
    pub total_posts_considered: i32,
    pub total_comments_considered: i32,
    pub source_tags: Vec<String>,
    pub pain_points: Vec<PainPointView>,
    pub quotes: Vec<QuoteView>,
    pub analysis: AnalysisView,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_result_round_trips_through_json() {
        let result = SearchResult {
            search_id: Uuid::new_v4(),
            status: "completed".to_string(),
            topic: "notion".to_string(),
            tags: vec![SourceTag::Ask],
            time_range: TimeRange::Month,
            min_upvotes: 10,
            sort_by: SortBy::Relevance,
            total_mentions: 3,
            total_posts_considered: 12,
            total_comments_considered: 40,
            source_tags: vec!["ask".to_string()],
            pain_points: vec![],
            quotes: vec![],
            analysis: AnalysisView {
                summary: "summary".to_string(),
                problem_clusters: vec![],
                product_ideas: vec![],
                model: None,
                tokens_used: None,
            },
        };

        let encoded = serde_json::to_string(&result).unwrap();
        let decoded: SearchResult = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.search_id, result.search_id);
        assert_eq!(decoded.topic, result.topic);
        assert_eq!(decoded.pain_points.len(), result.pain_points.len());
    }
}
