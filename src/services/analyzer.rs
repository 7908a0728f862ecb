//! LLM call producing clusters + product ideas from transcripts (C5).
//!
//! Kept abstract per spec §1. `HttpAnalyzer` is the ambient default
//! implementation: an OpenAI-compatible chat-completions client using
//! `ChatCompletionRequest`/`ChatCompletionResponse` wire shapes, the
//! `response_format: {"type": "json_object"}` trick, and Bearer auth.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::analysis::{ProblemCluster, ProductIdea};

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisStory {
    pub title: String,
    pub text: String,
    pub comments: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AnalysisPayload {
    pub stories: Vec<AnalysisStory>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub summary: String,
    pub problem_clusters: Vec<ProblemCluster>,
    pub product_ideas: Vec<ProductIdea>,
    pub model: Option<String>,
    pub tokens_used: Option<i32>,
}

#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("analyzer request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("analyzer returned a structurally invalid response: {0}")]
    Parse(String),
    #[error("analyzer is temporarily unavailable: {0}")]
    Unavailable(String),
    #[error("analyzer rejected the request: {0}")]
    Rejected(String),
}

impl AnalyzerError {
    /// Any non-JSON/structurally-invalid response, and any 5xx from the
    /// analyzer itself, is a transient failure eligible for retry (spec §7
    /// kind 3 "5xx from news/analyzer"); an explicit 4xx rejection is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            AnalyzerError::Request(_) => true,
            AnalyzerError::Parse(_) => true,
            AnalyzerError::Unavailable(_) => true,
            AnalyzerError::Rejected(_) => false,
        }
    }
}

#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, topic: &str, payload: &AnalysisPayload) -> Result<Analysis, AnalyzerError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    response_format: ResponseFormat<'a>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionUsage {
    total_tokens: i32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
    usage: Option<ChatCompletionUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysis {
    summary: String,
    problem_clusters: Vec<ProblemCluster>,
    product_ideas: Vec<ProductIdea>,
}

pub struct HttpAnalyzer {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl HttpAnalyzer {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
        temperature: f32,
        timeout: Duration,
    ) -> Self {
        let client =
            reqwest::Client::builder().timeout(timeout).build().expect("client config is valid");
        Self {
            client,
            api_base: api_base.into(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens,
            temperature,
        }
    }

    fn build_prompt(topic: &str, payload: &AnalysisPayload) -> String {
        let transcript = serde_json::to_string(&payload.stories)
            .unwrap_or_else(|_| "[]".to_string());
        format!(
            "You are analyzing Hacker News discussions about \"{topic}\" to surface recurring \
             user pain points. Given the following stories and comment excerpts as JSON, return a \
             JSON object with keys `summary` (string), `problemClusters` (array of {{title, \
             description, severity 0-10, mentionCount, examples: [string]}}), and `productIdeas` \
             (array of {{title, description, targetProblem, impactScore 0-10}}).\n\nTranscript:\n{transcript}"
        )
    }
}

#[async_trait]
impl Analyzer for HttpAnalyzer {
    async fn analyze(
        &self,
        topic: &str,
        payload: &AnalysisPayload,
    ) -> Result<Analysis, AnalyzerError> {
        let prompt = Self::build_prompt(topic, payload);
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AnalyzerError::Request(
                response.error_for_status().unwrap_err(),
            ));
        }
        if response.status().is_server_error() {
            return Err(AnalyzerError::Unavailable(format!(
                "analyzer returned status {}",
                response.status()
            )));
        }
        if !response.status().is_success() {
            return Err(AnalyzerError::Rejected(format!(
                "analyzer returned status {}",
                response.status()
            )));
        }

        let completion: ChatCompletionResponse =
            response.json().await.map_err(|e| AnalyzerError::Parse(e.to_string()))?;
        let content = completion
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| AnalyzerError::Parse("no choices in response".to_string()))?;

        let raw: RawAnalysis =
            serde_json::from_str(&content).map_err(|e| AnalyzerError::Parse(e.to_string()))?;

        Ok(Analysis {
            summary: raw.summary,
            problem_clusters: raw.problem_clusters,
            product_ideas: raw.product_ideas,
            model: Some(self.model.clone()),
            tokens_used: completion.usage.map(|u| u.total_tokens),
        })
    }
}
