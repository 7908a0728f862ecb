use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Stories,
    Comments,
    Analysis,
}

impl std::str::FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stories" => Ok(Phase::Stories),
            "comments" => Ok(Phase::Comments),
            "analysis" => Ok(Phase::Analysis),
            other => Err(format!("unknown phase: {other}")),
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::Stories => "stories",
            Phase::Comments => "comments",
            Phase::Analysis => "analysis",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    StoryDiscovered,
    CommentDiscovered,
    PhaseProgress,
}

impl std::str::FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "story_discovered" => Ok(EventType::StoryDiscovered),
            "comment_discovered" => Ok(EventType::CommentDiscovered),
            "phase_progress" => Ok(EventType::PhaseProgress),
            other => Err(format!("unknown event type: {other}")),
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventType::StoryDiscovered => "story_discovered",
            EventType::CommentDiscovered => "comment_discovered",
            EventType::PhaseProgress => "phase_progress",
        };
        f.write_str(s)
    }
}

/// Append-only progress record. Wire shape matches spec §6 exactly
/// (snake_case, not camelCase, unlike the other response bodies).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SearchEvent {
    pub id: Uuid,
    pub search_id: Uuid,
    pub phase: Phase,
    pub event_type: EventType,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}
