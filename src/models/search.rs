use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Preferred precedence order used when a story's primary tag is chosen
/// and when tag-based pain-point fallback needs a tie-break.
pub const TAG_PREFERENCE_ORDER: [SourceTag; 5] =
    [SourceTag::Ask, SourceTag::Show, SourceTag::Front, SourceTag::Poll, SourceTag::Story];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    Story,
    Ask,
    Show,
    Front,
    Poll,
}

impl SourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::Story => "story",
            SourceTag::Ask => "ask",
            SourceTag::Show => "show",
            SourceTag::Front => "front",
            SourceTag::Poll => "poll",
        }
    }
}

impl std::str::FromStr for SourceTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "story" => Ok(SourceTag::Story),
            "ask" => Ok(SourceTag::Ask),
            "show" => Ok(SourceTag::Show),
            "front" => Ok(SourceTag::Front),
            "poll" => Ok(SourceTag::Poll),
            other => Err(format!("unknown source tag: {other}")),
        }
    }
}

impl std::fmt::Display for SourceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TimeRange {
    Week,
    Month,
    Year,
    All,
}

impl std::str::FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "week" => Ok(TimeRange::Week),
            "month" => Ok(TimeRange::Month),
            "year" => Ok(TimeRange::Year),
            "all" => Ok(TimeRange::All),
            other => Err(format!("unknown time range: {other}")),
        }
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TimeRange::Week => "week",
            TimeRange::Month => "month",
            TimeRange::Year => "year",
            TimeRange::All => "all",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    Relevance,
    Upvotes,
    Recency,
}

impl std::str::FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "relevance" => Ok(SortBy::Relevance),
            "upvotes" => Ok(SortBy::Upvotes),
            "recency" => Ok(SortBy::Recency),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

impl std::fmt::Display for SortBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SortBy::Relevance => "relevance",
            SortBy::Upvotes => "upvotes",
            SortBy::Recency => "recency",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl std::str::FromStr for SearchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(SearchStatus::Pending),
            "processing" => Ok(SearchStatus::Processing),
            "completed" => Ok(SearchStatus::Completed),
            "failed" => Ok(SearchStatus::Failed),
            other => Err(format!("unknown search status: {other}")),
        }
    }
}

impl std::fmt::Display for SearchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SearchStatus::Pending => "pending",
            SearchStatus::Processing => "processing",
            SearchStatus::Completed => "completed",
            SearchStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Checks the *trimmed* topic length against spec §3's 2..100 bound. A
/// length-only derive validator would see the raw, untrimmed string, letting
/// e.g. `" a "` (3 raw chars, 1 trimmed) slip past the boundary.
fn validate_topic_length(topic: &str) -> Result<(), ValidationError> {
    let trimmed_len = topic.trim().chars().count();
    if (2..=100).contains(&trimmed_len) {
        Ok(())
    } else {
        Err(ValidationError::new("length"))
    }
}

/// Inbound request body for `POST /search`.
///
/// `validator::Validate` enforces the boundary checks from spec §6; the
/// `<>{}[]` forbidden-character rule on `topic` is applied separately in
/// `services::intake` since it needs a regex the derive can't express cleanly
/// inline without a custom validation function registered per-field.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[validate(custom(function = "validate_topic_length"))]
    pub topic: String,
    #[validate(length(max = 5))]
    pub tags: Vec<SourceTag>,
    pub time_range: TimeRange,
    #[validate(range(min = 0, max = 10000))]
    pub min_upvotes: i32,
    pub sort_by: SortBy,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Search {
    pub id: Uuid,
    pub topic: String,
    pub tags: Vec<SourceTag>,
    pub time_range: TimeRange,
    pub min_upvotes: i32,
    pub sort_by: SortBy,
    pub status: SearchStatus,
    pub error_message: Option<String>,
    pub retry_count: i32,
    pub last_retry_at: Option<DateTime<Utc>>,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Search {
    pub fn new(req: &SearchRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic: req.topic.trim().to_string(),
            tags: req.tags.clone(),
            time_range: req.time_range,
            min_upvotes: req.min_upvotes,
            sort_by: req.sort_by,
            status: SearchStatus::Pending,
            error_message: None,
            retry_count: 0,
            last_retry_at: None,
            next_retry_at: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// 1:1 aggregate metadata row for a completed Search.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SearchResults {
    pub search_id: Uuid,
    pub total_posts_considered: i32,
    pub total_comments_considered: i32,
    pub total_mentions: i32,
    pub source_tags: Vec<SourceTag>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_request_rejects_single_char_topic() {
        let req = SearchRequest {
            topic: "a".to_string(),
            tags: vec![],
            time_range: TimeRange::Month,
            min_upvotes: 0,
            sort_by: SortBy::Relevance,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn search_request_accepts_boundary_topic_lengths() {
        let short = SearchRequest {
            topic: "ab".to_string(),
            tags: vec![],
            time_range: TimeRange::Month,
            min_upvotes: 0,
            sort_by: SortBy::Relevance,
        };
        assert!(short.validate().is_ok());

        let long = SearchRequest {
            topic: "a".repeat(100),
            tags: vec![],
            time_range: TimeRange::Month,
            min_upvotes: 10000,
            sort_by: SortBy::Relevance,
        };
        assert!(long.validate().is_ok());

        let too_long = SearchRequest { topic: "a".repeat(101), ..long };
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn search_request_validates_trimmed_topic_length() {
        // Raw length is 3 (" a "), but the trimmed topic is a single char
        // and must be rejected per spec §3/§8.
        let padded_single_char = SearchRequest {
            topic: " a ".to_string(),
            tags: vec![],
            time_range: TimeRange::Month,
            min_upvotes: 0,
            sort_by: SortBy::Relevance,
        };
        assert!(padded_single_char.validate().is_err());

        // Raw length is 4 (" ab "), trimmed to the 2-char boundary: accepted.
        let padded_boundary = SearchRequest { topic: " ab ".to_string(), ..padded_single_char };
        assert!(padded_boundary.validate().is_ok());
    }

    #[test]
    fn search_request_rejects_upvotes_out_of_range() {
        let req = SearchRequest {
            topic: "notion".to_string(),
            tags: vec![],
            time_range: TimeRange::Month,
            min_upvotes: 10001,
            sort_by: SortBy::Relevance,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn tag_preference_order_matches_glossary() {
        assert_eq!(
            TAG_PREFERENCE_ORDER,
            [SourceTag::Ask, SourceTag::Show, SourceTag::Front, SourceTag::Poll, SourceTag::Story]
        );
    }
}
