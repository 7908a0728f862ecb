//! Appends incremental progress events and fans them out to subscribers
//! (C6). `append` persists durably then publishes live — spec §4.8.
//!
//! The `DashMap<Uuid, Sender<SearchEvent>>` subscriber registry is the
//! teacher's `MySQLPoolManager` lock-free-concurrent-map idiom, applied to
//! per-search fan-out channels instead of per-cluster connection pools.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::event::SearchEvent;
use crate::services::store::{EventsRepo, StoreError};

const CHANNEL_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct EventEmitter {
    events_repo: Arc<EventsRepo>,
    channels: Arc<DashMap<Uuid, broadcast::Sender<SearchEvent>>>,
}

impl EventEmitter {
    pub fn new(events_repo: Arc<EventsRepo>) -> Self {
        Self { events_repo, channels: Arc::new(DashMap::new()) }
    }

    /// Lazily creates the broadcast channel for a search on first access —
    /// either the first `append` or the first `subscribe`.
    fn channel_for(&self, search_id: Uuid) -> broadcast::Sender<SearchEvent> {
        self.channels
            .entry(search_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    /// Persists then publishes. A send with no active subscribers is not a
    /// failure — `broadcast::Sender::send` errors in that case and the
    /// error is intentionally dropped.
    pub async fn append(&self, event: SearchEvent) -> Result<(), StoreError> {
        self.events_repo.insert(&event).await?;
        let sender = self.channel_for(event.search_id);
        let _ = sender.send(event);
        Ok(())
    }

    pub fn subscribe(&self, search_id: Uuid) -> broadcast::Receiver<SearchEvent> {
        self.channel_for(search_id).subscribe()
    }
}
