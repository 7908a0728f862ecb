//! Paginated story + comment retrieval port (C4).
//!
//! Kept abstract per spec §1: the core never wires in a concrete news API.
//! `HttpNewsSource` is the ambient default implementation, suitable for
//! integration testing against a mock server and as a template for wiring
//! a real provider, built once with a bounded timeout the way a single
//! long-lived `reqwest::Client` should be.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::search::{SortBy, SourceTag, TimeRange};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
    pub id: String,
    pub title: String,
    pub url: Option<String>,
    pub permalink: String,
    pub text: Option<String>,
    pub points: i32,
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
    pub tags: Vec<String>,
    pub num_comments: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub text: String,
    pub points: i32,
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
    pub story_id: String,
    pub parent_id: Option<String>,
    pub permalink: String,
}

#[derive(Debug, Clone)]
pub struct SearchParams {
    pub topic: String,
    pub tags: Vec<SourceTag>,
    pub time_range: TimeRange,
    pub min_upvotes: i32,
    pub sort_by: SortBy,
    pub page: u32,
    pub hits_per_page: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum NewsSourceError {
    #[error("news source request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("news source returned an unparseable response: {0}")]
    Parse(String),
    #[error("news source is temporarily unavailable: {0}")]
    Unavailable(String),
    #[error("news source rejected the request: {0}")]
    Rejected(String),
}

impl NewsSourceError {
    /// network refused / 5xx are transient-retryable; a malformed payload
    /// or explicit 4xx rejection is not (spec §7 kind 3 vs the rest).
    pub fn is_retryable(&self) -> bool {
        match self {
            NewsSourceError::Request(err) => !err.is_decode(),
            NewsSourceError::Parse(_) => false,
            NewsSourceError::Unavailable(_) => true,
            NewsSourceError::Rejected(_) => false,
        }
    }
}

#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn search(&self, params: &SearchParams) -> Result<Vec<Story>, NewsSourceError>;
    async fn comments(&self, story_id: &str) -> Result<Vec<Comment>, NewsSourceError>;
}

pub struct HttpNewsSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpNewsSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client =
            reqwest::Client::builder().timeout(timeout).build().expect("client config is valid");
        Self { client, base_url: base_url.into() }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Vec<Story>,
}

#[derive(Debug, Deserialize)]
struct CommentsResponse {
    comments: Vec<Comment>,
}

#[async_trait]
impl NewsSource for HttpNewsSource {
    async fn search(&self, params: &SearchParams) -> Result<Vec<Story>, NewsSourceError> {
        let tags_param: Vec<&str> = params.tags.iter().map(|t| t.as_str()).collect();
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("query", params.topic.as_str()),
                ("tags", &tags_param.join(",")),
                ("timeRange", &params.time_range.to_string()),
                ("minUpvotes", &params.min_upvotes.to_string()),
                ("sortBy", &params.sort_by.to_string()),
                ("page", &params.page.to_string()),
                ("hitsPerPage", &params.hits_per_page.to_string()),
            ])
            .send()
            .await?;

        if response.status().is_server_error() {
            return Err(NewsSourceError::Unavailable(format!(
                "news source returned status {}",
                response.status()
            )));
        }
        if !response.status().is_success() {
            return Err(NewsSourceError::Rejected(format!(
                "news source returned status {}",
                response.status()
            )));
        }

        let parsed: SearchResponse =
            response.json().await.map_err(|e| NewsSourceError::Parse(e.to_string()))?;
        Ok(parsed.hits)
    }

    async fn comments(&self, story_id: &str) -> Result<Vec<Comment>, NewsSourceError> {
        let response =
            self.client.get(format!("{}/items/{story_id}/comments", self.base_url)).send().await?;

        if response.status().is_server_error() {
            return Err(NewsSourceError::Unavailable(format!(
                "news source returned status {}",
                response.status()
            )));
        }
        if !response.status().is_success() {
            return Err(NewsSourceError::Rejected(format!(
                "news source returned status {}",
                response.status()
            )));
        }

        let parsed: CommentsResponse =
            response.json().await.map_err(|e| NewsSourceError::Parse(e.to_string()))?;
        Ok(parsed.comments)
    }
}
