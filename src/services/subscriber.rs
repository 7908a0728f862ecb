//! Streams events from EventEmitter and backfills missed events from Store
//! (C11). A late-joining subscriber calls `backfill` which reads
//! `search_events`, `pain_points`, and `pain_point_quotes`, then hands the
//! caller the live `broadcast::Receiver` to continue from (spec §4.8).
//! Dedup against a seen-set of event `id`s is the caller's responsibility —
//! the HTTP handler owns that, not this component.

use std::sync::Arc;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::event::SearchEvent;
use crate::models::pain_point::{PainPoint, PainPointQuote};
use crate::services::event_emitter::EventEmitter;
use crate::services::store::{EventsRepo, PainPointsRepo, StoreError};

pub struct BackfillSnapshot {
    pub events: Vec<SearchEvent>,
    pub pain_points: Vec<PainPoint>,
    pub quotes: Vec<PainPointQuote>,
}

#[derive(Clone)]
pub struct Subscriber {
    events_repo: Arc<EventsRepo>,
    pain_points_repo: Arc<PainPointsRepo>,
    emitter: EventEmitter,
}

impl Subscriber {
    pub fn new(
        events_repo: Arc<EventsRepo>,
        pain_points_repo: Arc<PainPointsRepo>,
        emitter: EventEmitter,
    ) -> Self {
        Self { events_repo, pain_points_repo, emitter }
    }

    /// Subscribes to the live channel *before* reading backfill data, so no
    /// event published between the two reads is missed — the seen-set on
    /// the caller side resolves the resulting overlap (spec §4.8).
    pub fn subscribe_live(&self, search_id: Uuid) -> broadcast::Receiver<SearchEvent> {
        self.emitter.subscribe(search_id)
    }

    pub async fn backfill(&self, search_id: Uuid) -> Result<BackfillSnapshot, StoreError> {
        let events = self.events_repo.list_for_search(search_id).await?;
        let pain_points = self.pain_points_repo.list_for_search(search_id).await?;
        let quotes = self.pain_points_repo.list_quotes_for_search(search_id).await?;
        Ok(BackfillSnapshot { events, pain_points, quotes })
    }
}
