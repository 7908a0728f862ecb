//! The phased pipeline: stories -> comments -> analyze -> persist -> cache
//! (C7). Executes Phases 0-5 from spec §4.6 as private methods, each
//! returning a typed `Result<_, PipelineFailure>`; a single match at the
//! end of `run` applies the failure classification and retry/FAIL
//! transition from §4.6/§4.7.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use uuid::Uuid;

use crate::models::analysis::AiAnalysis;
use crate::models::event::{EventType, Phase, SearchEvent};
use crate::models::pain_point::{PainPoint, PainPointQuote};
use crate::models::result::{AnalysisView, PainPointView, QuoteView, SearchResult};
use crate::models::search::{Search, SourceTag, TAG_PREFERENCE_ORDER};
use crate::services::analyzer::{Analysis, AnalysisPayload, AnalysisStory, Analyzer};
use crate::services::cache::RedisCache;
use crate::services::event_emitter::EventEmitter;
use crate::services::fingerprint::fingerprint_of_search;
use crate::services::news_source::{Comment, NewsSource, SearchParams, Story};
use crate::services::store::{AnalysesRepo, LogsRepo, PainPointsRepo, ResultsRepo, SearchesRepo, UsageRepo};
use crate::utils::html;
use crate::utils::retry::retry_with_backoff;

pub const MAX_RETRIES: i32 = 3;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub edge_timeout: Duration,
    pub page_delay: Duration,
    pub comment_delay: Duration,
    pub hn_max_stories: usize,
    pub hn_stories_for_comments: usize,
    pub hn_max_comments_per_story: usize,
    pub analysis_max_stories: usize,
    pub analysis_max_comments_per_story: usize,
    pub max_pain_points: usize,
    pub max_quotes_per_pain_point: usize,
    pub max_quote_len: usize,
    pub cache_ttl: Duration,
    pub event_snippet_len: usize,
    pub analyzer_cost_per_million: f64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            edge_timeout: Duration::from_secs(60),
            page_delay: Duration::from_millis(200),
            comment_delay: Duration::from_millis(120),
            hn_max_stories: 60,
            hn_stories_for_comments: 20,
            hn_max_comments_per_story: 20,
            analysis_max_stories: 40,
            analysis_max_comments_per_story: 10,
            max_pain_points: 10,
            max_quotes_per_pain_point: 5,
            max_quote_len: 800,
            cache_ttl: Duration::from_secs(1800),
            event_snippet_len: 200,
            analyzer_cost_per_million: 1.0,
        }
    }
}

#[derive(Debug)]
pub enum PipelineFailure {
    /// Phase 0 guard tripped: a `SearchResults` row already exists. Not a
    /// failure — the caller treats this as a successful no-op.
    AlreadyCompleted,
    /// Any other failure, already carrying the user-visible message per
    /// the classification rules in spec §4.6 "Failure handling".
    Failed(String),
}

struct NormalizedStory {
    story: Story,
    primary_tag: SourceTag,
}

fn choose_primary_tag(story: &Story) -> SourceTag {
    let raw: Vec<SourceTag> = story.tags.iter().filter_map(|t| t.parse().ok()).collect();
    for preferred in TAG_PREFERENCE_ORDER {
        if raw.contains(&preferred) {
            return preferred;
        }
    }
    SourceTag::Story
}

pub struct Worker {
    news_source: Arc<dyn NewsSource>,
    analyzer: Arc<dyn Analyzer>,
    searches_repo: Arc<SearchesRepo>,
    results_repo: Arc<ResultsRepo>,
    pain_points_repo: Arc<PainPointsRepo>,
    analyses_repo: Arc<AnalysesRepo>,
    usage_repo: Arc<UsageRepo>,
    logs_repo: Arc<LogsRepo>,
    event_emitter: EventEmitter,
    cache: RedisCache,
    config: WorkerConfig,
}

impl Worker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        news_source: Arc<dyn NewsSource>,
        analyzer: Arc<dyn Analyzer>,
        searches_repo: Arc<SearchesRepo>,
        results_repo: Arc<ResultsRepo>,
        pain_points_repo: Arc<PainPointsRepo>,
        analyses_repo: Arc<AnalysesRepo>,
        usage_repo: Arc<UsageRepo>,
        logs_repo: Arc<LogsRepo>,
        event_emitter: EventEmitter,
        cache: RedisCache,
        config: WorkerConfig,
    ) -> Self {
        Self {
            news_source,
            analyzer,
            searches_repo,
            results_repo,
            pain_points_repo,
            analyses_repo,
            usage_repo,
            logs_repo,
            event_emitter,
            cache,
            config,
        }
    }

    /// Entry point dispatched by the Scheduler. Never panics; all failures
    /// are caught and routed through the retry/FAIL transition.
    pub async fn run(&self, search_id: Uuid) {
        let outcome = tokio::time::timeout(self.config.edge_timeout, self.run_inner(search_id)).await;

        match outcome {
            Ok(Ok(())) => {},
            Ok(Err(PipelineFailure::AlreadyCompleted)) => {
                tracing::debug!(%search_id, "worker run is a no-op, search already completed");
            },
            Ok(Err(PipelineFailure::Failed(message))) => {
                self.fail_or_retry(search_id, &message).await;
            },
            Err(_elapsed) => {
                self.fail_or_retry(search_id, "Analysis took too long. Try narrowing your search.")
                    .await;
            },
        }
    }

    async fn run_inner(&self, search_id: Uuid) -> Result<(), PipelineFailure> {
        let search = self.phase0_guard(search_id).await?;
        let stories = self.phase1_stories(&search).await?;
        let comments = self.phase2_comments(&search, &stories).await?;
        let analysis = self.phase3_analyze(&search, &stories, &comments).await?;
        self.phase4_persist(&search, &stories, &comments, &analysis).await?;
        self.phase5_finalize(&search, &stories, &comments, &analysis).await?;
        Ok(())
    }

    async fn phase0_guard(&self, search_id: Uuid) -> Result<Search, PipelineFailure> {
        let search = self
            .searches_repo
            .get(search_id)
            .await
            .map_err(|e| PipelineFailure::Failed(format!("Something went wrong: {e}")))?
            .ok_or_else(|| PipelineFailure::Failed("Something went wrong.".to_string()))?;

        let already_completed = self
            .results_repo
            .exists(search_id)
            .await
            .map_err(|e| PipelineFailure::Failed(format!("Something went wrong: {e}")))?;

        if already_completed {
            return Err(PipelineFailure::AlreadyCompleted);
        }

        Ok(search)
    }

    async fn phase1_stories(&self, search: &Search) -> Result<Vec<NormalizedStory>, PipelineFailure> {
        let mut stories = Vec::new();
        for page in 0..3 {
            if stories.len() >= self.config.hn_max_stories {
                break;
            }

            let params = SearchParams {
                topic: search.topic.clone(),
                tags: search.tags.clone(),
                time_range: search.time_range,
                min_upvotes: search.min_upvotes,
                sort_by: search.sort_by,
                page,
                hits_per_page: 30,
            };

            let news_source = self.news_source.clone();
            let hits = retry_with_backoff(
                3,
                Duration::from_secs(1),
                |e: &crate::services::news_source::NewsSourceError| e.is_retryable(),
                || {
                    let news_source = news_source.clone();
                    let params = params.clone();
                    async move { news_source.search(&params).await }
                },
            )
            .await
            .map_err(|_| PipelineFailure::Failed("Unable to reach external services.".to_string()))?;

            if hits.is_empty() {
                break;
            }

            for story in hits {
                if stories.len() >= self.config.hn_max_stories {
                    break;
                }
                let primary_tag = choose_primary_tag(&story);

                let event = SearchEvent {
                    id: Uuid::new_v4(),
                    search_id: search.id,
                    phase: Phase::Stories,
                    event_type: EventType::StoryDiscovered,
                    payload: serde_json::json!({
                        "id": story.id,
                        "title": story.title,
                        "url": story.url,
                        "points": story.points,
                        "tag": primary_tag.as_str(),
                        "createdAt": story.created_at,
                    }),
                    created_at: Utc::now(),
                };
                self.event_emitter
                    .append(event)
                    .await
                    .map_err(|e| PipelineFailure::Failed(format!("Something went wrong: {e}")))?;

                stories.push(NormalizedStory { story, primary_tag });
            }

            tokio::time::sleep(self.config.page_delay).await;
        }

        Ok(stories)
    }

    async fn phase2_comments(
        &self,
        search: &Search,
        stories: &[NormalizedStory],
    ) -> Result<Vec<Comment>, PipelineFailure> {
        let mut corpus: Vec<Comment> = Vec::new();
        let top_n = stories.len().min(self.config.hn_stories_for_comments);

        for normalized in stories.iter().take(top_n) {
            let news_source = self.news_source.clone();
            let story_id = normalized.story.id.clone();
            let fetched = retry_with_backoff(
                3,
                Duration::from_secs(1),
                |e: &crate::services::news_source::NewsSourceError| e.is_retryable(),
                || {
                    let news_source = news_source.clone();
                    let story_id = story_id.clone();
                    async move { news_source.comments(&story_id).await }
                },
            )
            .await
            .map_err(|_| PipelineFailure::Failed("Unable to reach external services.".to_string()))?;

            let mut kept: Vec<Comment> = fetched.into_iter().filter(|c| !c.text.trim().is_empty()).collect();
            kept.sort_by(|a, b| b.points.cmp(&a.points));
            kept.truncate(self.config.hn_max_comments_per_story);

            let event_comments: Vec<_> = kept
                .iter()
                .map(|c| {
                    serde_json::json!({
                        "id": c.id,
                        "snippet": html::strip_and_truncate(&c.text, self.config.event_snippet_len),
                        "author": c.author,
                        "upvotes": c.points,
                        "permalink": c.permalink,
                    })
                })
                .collect();

            corpus.extend(kept);

            let event = SearchEvent {
                id: Uuid::new_v4(),
                search_id: search.id,
                phase: Phase::Comments,
                event_type: EventType::PhaseProgress,
                payload: serde_json::json!({
                    "totalCommentsSoFar": corpus.len(),
                    "comments": event_comments,
                }),
                created_at: Utc::now(),
            };
            self.event_emitter
                .append(event)
                .await
                .map_err(|e| PipelineFailure::Failed(format!("Something went wrong: {e}")))?;

            tokio::time::sleep(self.config.comment_delay).await;
        }

        Ok(corpus)
    }

    async fn phase3_analyze(
        &self,
        search: &Search,
        stories: &[NormalizedStory],
        comments: &[Comment],
    ) -> Result<Analysis, PipelineFailure> {
        let event = SearchEvent {
            id: Uuid::new_v4(),
            search_id: search.id,
            phase: Phase::Analysis,
            event_type: EventType::PhaseProgress,
            payload: serde_json::json!({ "stage": "analyzing" }),
            created_at: Utc::now(),
        };
        self.event_emitter
            .append(event)
            .await
            .map_err(|e| PipelineFailure::Failed(format!("Something went wrong: {e}")))?;

        let mut comments_by_story: HashMap<&str, Vec<&Comment>> = HashMap::new();
        for comment in comments {
            comments_by_story.entry(comment.story_id.as_str()).or_default().push(comment);
        }

        let analysis_stories: Vec<AnalysisStory> = stories
            .iter()
            .take(self.config.analysis_max_stories)
            .map(|normalized| {
                let story_comments = comments_by_story
                    .get(normalized.story.id.as_str())
                    .map(|cs| {
                        cs.iter()
                            .take(self.config.analysis_max_comments_per_story)
                            .map(|c| html::strip_and_truncate(&c.text, 280))
                            .collect()
                    })
                    .unwrap_or_default();

                AnalysisStory {
                    title: normalized.story.title.clone(),
                    text: html::strip_and_truncate(
                        normalized.story.text.as_deref().unwrap_or(""),
                        400,
                    ),
                    comments: story_comments,
                }
            })
            .collect();

        let payload = AnalysisPayload { stories: analysis_stories };

        let analyzer = self.analyzer.clone();
        let topic = search.topic.clone();
        let result = retry_with_backoff(
            3,
            Duration::from_secs(1),
            |e: &crate::services::analyzer::AnalyzerError| e.is_retryable(),
            || {
                let analyzer = analyzer.clone();
                let topic = topic.clone();
                let payload = payload.clone();
                async move { analyzer.analyze(&topic, &payload).await }
            },
        )
        .await;

        result.map_err(|_| PipelineFailure::Failed("AI analysis failed.".to_string()))
    }

    async fn phase4_persist(
        &self,
        search: &Search,
        stories: &[NormalizedStory],
        comments: &[Comment],
        analysis: &Analysis,
    ) -> Result<(), PipelineFailure> {
        let tag_order = tag_frequency_order(stories);

        let mut pain_points: Vec<PainPoint> = Vec::new();
        if !analysis.problem_clusters.is_empty() {
            for (i, cluster) in
                analysis.problem_clusters.iter().take(self.config.max_pain_points).enumerate()
            {
                let source_tag = if tag_order.is_empty() {
                    SourceTag::Story
                } else {
                    tag_order[i % tag_order.len()]
                };
                pain_points.push(PainPoint {
                    id: Uuid::new_v4(),
                    search_id: search.id,
                    title: cluster.title.clone(),
                    source_tag,
                    mentions_count: cluster.mention_count,
                    severity_score: Some(cluster.severity),
                });
            }
        } else {
            // Tag-based pain-point fallback: one per distinct primary tag.
            for tag in &tag_order {
                let mentions = stories.iter().filter(|s| s.primary_tag == *tag).count() as i32;
                pain_points.push(PainPoint {
                    id: Uuid::new_v4(),
                    search_id: search.id,
                    title: format!("Discussions in {}", tag.as_str()),
                    source_tag: *tag,
                    mentions_count: mentions,
                    severity_score: None,
                });
            }
        }

        for pp in &pain_points {
            self.pain_points_repo
                .insert(pp)
                .await
                .map_err(|e| PipelineFailure::Failed(format!("Something went wrong: {e}")))?;
        }

        let stripped_corpus: Vec<(String, &Comment)> =
            comments.iter().map(|c| (html::strip(&c.text), c)).collect();

        let mut quote_counts: HashMap<Uuid, usize> = HashMap::new();
        let mut any_llm_quote = false;

        if !analysis.problem_clusters.is_empty() {
            for (cluster, pain_point) in analysis.problem_clusters.iter().zip(pain_points.iter()) {
                for example in cluster.examples.iter().take(self.config.max_quotes_per_pain_point) {
                    let needle: String = example.chars().take(50).collect();
                    if needle.is_empty() {
                        continue;
                    }
                    let count = quote_counts.entry(pain_point.id).or_insert(0);
                    if *count >= self.config.max_quotes_per_pain_point {
                        continue;
                    }
                    if let Some((_, comment)) =
                        stripped_corpus.iter().find(|(stripped, _)| stripped.contains(&needle))
                    {
                        let quote = PainPointQuote {
                            id: Uuid::new_v4(),
                            pain_point_id: pain_point.id,
                            quote_text: html::truncate(
                                &html::strip(&comment.text),
                                self.config.max_quote_len,
                            ),
                            author_handle: comment.author.clone(),
                            upvotes: comment.points,
                            permalink: comment.permalink.clone(),
                        };
                        self.pain_points_repo
                            .insert_quote(&quote)
                            .await
                            .map_err(|e| PipelineFailure::Failed(format!("Something went wrong: {e}")))?;
                        *count += 1;
                        any_llm_quote = true;
                    }
                }
            }
        }

        if !any_llm_quote && !pain_points.is_empty() && !comments.is_empty() {
            let mut top_comments: Vec<&Comment> = comments.iter().collect();
            top_comments.sort_by(|a, b| b.points.cmp(&a.points));
            top_comments.truncate(20);

            let mut pp_idx = 0usize;
            for comment in top_comments {
                let mut attempts = 0;
                loop {
                    if attempts >= pain_points.len() {
                        break;
                    }
                    let pain_point = &pain_points[pp_idx % pain_points.len()];
                    let count = quote_counts.entry(pain_point.id).or_insert(0);
                    if *count < self.config.max_quotes_per_pain_point {
                        let quote = PainPointQuote {
                            id: Uuid::new_v4(),
                            pain_point_id: pain_point.id,
                            quote_text: html::truncate(
                                &html::strip(&comment.text),
                                self.config.max_quote_len,
                            ),
                            author_handle: comment.author.clone(),
                            upvotes: comment.points,
                            permalink: comment.permalink.clone(),
                        };
                        self.pain_points_repo
                            .insert_quote(&quote)
                            .await
                            .map_err(|e| PipelineFailure::Failed(format!("Something went wrong: {e}")))?;
                        *count += 1;
                        pp_idx += 1;
                        break;
                    }
                    pp_idx += 1;
                    attempts += 1;
                }
            }
        }

        let stored_analysis = AiAnalysis {
            search_id: search.id,
            summary: analysis.summary.clone(),
            problem_clusters: analysis.problem_clusters.clone(),
            product_ideas: analysis.product_ideas.clone(),
            model: analysis.model.clone(),
            tokens_used: analysis.tokens_used,
        };
        self.analyses_repo
            .insert(&stored_analysis)
            .await
            .map_err(|e| PipelineFailure::Failed(format!("Something went wrong: {e}")))?;

        if let Some(tokens) = analysis.tokens_used {
            self.usage_repo
                .record(search.id, "analyzer", tokens, self.config.analyzer_cost_per_million)
                .await
                .map_err(|e| PipelineFailure::Failed(format!("Something went wrong: {e}")))?;
        }

        let total_mentions: i32 = pain_points.iter().map(|p| p.mentions_count).sum();
        let mut source_tags: Vec<SourceTag> = stories.iter().map(|s| s.primary_tag).collect();
        source_tags.sort_by_key(|t| t.as_str());
        source_tags.dedup();

        let results = crate::models::search::SearchResults {
            search_id: search.id,
            total_posts_considered: stories.len() as i32,
            total_comments_considered: comments.len() as i32,
            total_mentions,
            source_tags,
        };
        // Written last: the already_completed guard in Phase 0 checks this
        // row's presence, so it must land only once every other Phase 4
        // row has been written (spec §7 "Partial persistence", §9).
        self.results_repo
            .insert(&results)
            .await
            .map_err(|e| PipelineFailure::Failed(format!("Something went wrong: {e}")))?;

        Ok(())
    }

    async fn phase5_finalize(
        &self,
        search: &Search,
        stories: &[NormalizedStory],
        comments: &[Comment],
        analysis: &Analysis,
    ) -> Result<(), PipelineFailure> {
        let pain_points = self
            .pain_points_repo
            .list_for_search(search.id)
            .await
            .map_err(|e| PipelineFailure::Failed(format!("Something went wrong: {e}")))?;
        let quotes = self
            .pain_points_repo
            .list_quotes_for_search(search.id)
            .await
            .map_err(|e| PipelineFailure::Failed(format!("Something went wrong: {e}")))?;
        let results = self
            .results_repo
            .get(search.id)
            .await
            .map_err(|e| PipelineFailure::Failed(format!("Something went wrong: {e}")))?
            .ok_or_else(|| PipelineFailure::Failed("Something went wrong.".to_string()))?;

        let result = SearchResult {
            search_id: search.id,
            status: "completed".to_string(),
            topic: search.topic.clone(),
            tags: search.tags.clone(),
            time_range: search.time_range,
            min_upvotes: search.min_upvotes,
            sort_by: search.sort_by,
            total_mentions: results.total_mentions,
            total_posts_considered: results.total_posts_considered,
            total_comments_considered: results.total_comments_considered,
            source_tags: results.source_tags.iter().map(|t| t.as_str().to_string()).collect(),
            pain_points: pain_points
                .iter()
                .map(|p| PainPointView {
                    id: p.id,
                    search_id: p.search_id,
                    title: p.title.clone(),
                    source_tag: p.source_tag,
                    mentions_count: p.mentions_count,
                    severity_score: p.severity_score,
                })
                .collect(),
            quotes: quotes
                .iter()
                .map(|q| QuoteView {
                    id: q.id,
                    pain_point_id: q.pain_point_id,
                    quote_text: q.quote_text.clone(),
                    author_handle: q.author_handle.clone(),
                    upvotes: q.upvotes,
                    permalink: q.permalink.clone(),
                })
                .collect(),
            analysis: AnalysisView {
                summary: analysis.summary.clone(),
                problem_clusters: analysis.problem_clusters.clone(),
                product_ideas: analysis.product_ideas.clone(),
                model: analysis.model.clone(),
                tokens_used: analysis.tokens_used,
            },
        };

        let fp = fingerprint_of_search(search);
        self.cache.set_result_and_map(&search.id.to_string(), &fp, &result).await;

        let completed_at = Utc::now();
        let transitioned = self
            .searches_repo
            .transition_to_completed(search.id, completed_at)
            .await
            .map_err(|e| PipelineFailure::Failed(format!("Something went wrong: {e}")))?;
        if !transitioned {
            tracing::warn!(search_id = %search.id, "conflicting transition to completed, skipping");
        }

        self.logs_repo
            .append(
                Some(search.id),
                crate::models::log::LogLevel::Info,
                "search completed",
                serde_json::json!({
                    "stories": stories.len(),
                    "comments": comments.len(),
                    "painPoints": pain_points.len(),
                    "quotes": quotes.len(),
                }),
            )
            .await
            .map_err(|e| PipelineFailure::Failed(format!("Something went wrong: {e}")))?;

        Ok(())
    }

    /// Worker's failure-handling transition (spec §4.6/§4.7): increments
    /// `retry_count` and schedules back-off, or sets FAILED when retries
    /// are exhausted.
    async fn fail_or_retry(&self, search_id: Uuid, message: &str) {
        let search = match self.searches_repo.get(search_id).await {
            Ok(Some(s)) => s,
            Ok(None) => return,
            Err(err) => {
                tracing::error!(%search_id, error = %err, "failed to load search for retry bookkeeping");
                return;
            },
        };

        let next_retry_count = search.retry_count + 1;
        let failed = next_retry_count >= MAX_RETRIES;
        let next_retry_at = if failed {
            None
        } else {
            Some(Utc::now() + ChronoDuration::minutes(1i64 << (next_retry_count - 1)))
        };

        if let Err(err) = self
            .searches_repo
            .schedule_retry_or_fail(search_id, next_retry_count, next_retry_at, message, failed)
            .await
        {
            tracing::error!(%search_id, error = %err, "failed to persist retry/FAIL transition");
        }

        let _ = self
            .logs_repo
            .append(
                Some(search_id),
                crate::models::log::LogLevel::Error,
                message,
                serde_json::json!({ "retryCount": next_retry_count, "failed": failed }),
            )
            .await;
    }
}

fn tag_frequency_order(stories: &[NormalizedStory]) -> Vec<SourceTag> {
    let mut counts: HashMap<SourceTag, i32> = HashMap::new();
    for s in stories {
        *counts.entry(s.primary_tag).or_insert(0) += 1;
    }

    let pref_rank = |tag: &SourceTag| {
        TAG_PREFERENCE_ORDER.iter().position(|t| t == tag).unwrap_or(usize::MAX)
    };

    let mut tags: Vec<SourceTag> = counts.keys().copied().collect();
    tags.sort_by(|a, b| counts[b].cmp(&counts[a]).then_with(|| pref_rank(a).cmp(&pref_rank(b))));
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chooses_preferred_tag_order() {
        let story = Story {
            id: "1".to_string(),
            title: "t".to_string(),
            url: None,
            permalink: "https://news.ycombinator.com/item?id=1".to_string(),
            text: None,
            points: 10,
            author: None,
            created_at: Utc::now(),
            tags: vec!["story".to_string(), "show".to_string()],
            num_comments: 0,
        };
        assert_eq!(choose_primary_tag(&story), SourceTag::Show);
    }

    #[test]
    fn defaults_to_story_tag_when_no_match() {
        let story = Story {
            id: "1".to_string(),
            title: "t".to_string(),
            url: None,
            permalink: "https://news.ycombinator.com/item?id=1".to_string(),
            text: None,
            points: 10,
            author: None,
            created_at: Utc::now(),
            tags: vec!["front_page".to_string()],
            num_comments: 0,
        };
        assert_eq!(choose_primary_tag(&story), SourceTag::Story);
    }
}
