//! Cache-first, store-fallback status/result lookups (C10). Spec §4.9.

use std::sync::Arc;

use uuid::Uuid;

use crate::models::result::SearchResult;
use crate::models::search::SearchStatus;
use crate::services::cache::RedisCache;
use crate::services::store::SearchesRepo;
use crate::utils::error::ApiError;

pub enum StatusOutcome {
    Completed { result: SearchResult },
    Pending { status: SearchStatus, error_message: Option<String> },
}

#[derive(Clone)]
pub struct StatusReader {
    cache: RedisCache,
    searches_repo: Arc<SearchesRepo>,
}

impl StatusReader {
    pub fn new(cache: RedisCache, searches_repo: Arc<SearchesRepo>) -> Self {
        Self { cache, searches_repo }
    }

    pub async fn get(&self, search_id: Uuid) -> Result<StatusOutcome, ApiError> {
        if let Some(result) =
            self.cache.get_result_by_id::<SearchResult>(&search_id.to_string()).await?
        {
            return Ok(StatusOutcome::Completed { result });
        }

        let search = self
            .searches_repo
            .get(search_id)
            .await?
            .ok_or_else(ApiError::not_found)?;

        Ok(StatusOutcome::Pending { status: search.status, error_message: search.error_message })
    }
}
