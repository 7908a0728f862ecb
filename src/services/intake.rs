//! Validates a request, computes its fingerprint, returns a cached result
//! or enqueues a new job (C9). Spec §4.4.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;
use validator::Validate;

use crate::models::result::SearchResult;
use crate::models::search::{Search, SearchRequest, SearchStatus};
use crate::services::cache::RedisCache;
use crate::services::fingerprint::fingerprint;
use crate::services::store::SearchesRepo;
use crate::utils::error::ApiError;

static FORBIDDEN_CHARS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[<>{}\[\]]").unwrap());

pub enum IntakeOutcome {
    Completed { search_id: Uuid, result: SearchResult },
    Enqueued { search_id: Uuid },
    InFlight { search_id: Uuid, status: SearchStatus },
}

#[derive(Clone)]
pub struct Intake {
    cache: RedisCache,
    searches_repo: Arc<SearchesRepo>,
}

impl Intake {
    pub fn new(cache: RedisCache, searches_repo: Arc<SearchesRepo>) -> Self {
        Self { cache, searches_repo }
    }

    fn validate(req: &SearchRequest) -> Result<(), ApiError> {
        if let Err(errors) = req.validate() {
            let mut issues = std::collections::HashMap::new();
            for (field, field_errors) in errors.field_errors() {
                let messages = field_errors
                    .iter()
                    .map(|e| e.message.clone().map(|m| m.to_string()).unwrap_or_else(|| "invalid value".to_string()))
                    .collect();
                issues.insert(field.to_string(), messages);
            }
            return Err(ApiError::Validation(issues));
        }

        if FORBIDDEN_CHARS_RE.is_match(&req.topic) {
            return Err(ApiError::validation_error("topic", "must not contain <>{}[]"));
        }

        Ok(())
    }

    pub async fn handle(&self, req: &SearchRequest) -> Result<IntakeOutcome, ApiError> {
        Self::validate(req)?;

        let fp = fingerprint(req);

        if let Some(result) = self
            .cache
            .get_result_by_fingerprint::<SearchResult>(&fp)
            .await
            .map_err(|e| ApiError::unavailable(e.to_string()))?
        {
            let search_id = result.search_id;
            return Ok(IntakeOutcome::Completed { search_id, result });
        }

        if let Some(existing_id) = self
            .cache
            .get_search_id_for_fingerprint(&fp)
            .await
            .map_err(|e| ApiError::unavailable(e.to_string()))?
        {
            if let Some(outcome) = self.resolve_existing(existing_id).await? {
                return Ok(outcome);
            }
        }

        let search = Search::new(req);

        let claimed = self
            .cache
            .claim_search_id_for_fingerprint(&fp, &search.id.to_string(), self.cache.default_ttl())
            .await
            .map_err(|e| ApiError::unavailable(e.to_string()))?;

        if !claimed {
            // Lost the race: someone else's claim is now in the map. Defer to
            // the winner instead of inserting a second Search row.
            if let Some(winner_id) = self
                .cache
                .get_search_id_for_fingerprint(&fp)
                .await
                .map_err(|e| ApiError::unavailable(e.to_string()))?
            {
                if let Some(outcome) = self.resolve_existing(winner_id).await? {
                    return Ok(outcome);
                }
            }
            // Winner's mapping vanished (expired) before we could read it;
            // fall through and dispatch our own search rather than error out.
        }

        self.searches_repo.insert(&search).await.map_err(|e| ApiError::unavailable(e.to_string()))?;

        Ok(IntakeOutcome::Enqueued { search_id: search.id })
    }

    /// Looks up a fingerprint-mapped search id in the Store and classifies
    /// it into an outcome. Returns `None` for a stale mapping (the search no
    /// longer exists, or its id failed to parse) so the caller can fall
    /// through to dispatching a fresh search.
    async fn resolve_existing(&self, raw_id: String) -> Result<Option<IntakeOutcome>, ApiError> {
        let Ok(search_id) = raw_id.parse::<Uuid>() else {
            return Ok(None);
        };

        let Some(existing) =
            self.searches_repo.get(search_id).await.map_err(|e| ApiError::unavailable(e.to_string()))?
        else {
            return Ok(None);
        };

        match existing.status {
            SearchStatus::Pending | SearchStatus::Processing => {
                Ok(Some(IntakeOutcome::InFlight { search_id, status: existing.status }))
            },
            SearchStatus::Completed | SearchStatus::Failed => {
                // stale mapping; fall through to dispatch a fresh search
                Ok(None)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_chars_are_rejected() {
        assert!(FORBIDDEN_CHARS_RE.is_match("notion <script>"));
        assert!(FORBIDDEN_CHARS_RE.is_match("ideas[1]"));
        assert!(!FORBIDDEN_CHARS_RE.is_match("plain notion ideas"));
    }
}
