//! `GET /search-events` — backfills persisted progress events then streams
//! the live broadcast channel over SSE, deduplicating by event `id` (spec
//! §4.8, §6).

use std::collections::HashSet;
use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use crate::models::event::SearchEvent;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsQuery {
    pub search_id: Uuid,
}

fn to_sse_event(event: &SearchEvent) -> Event {
    Event::default().data(serde_json::to_string(event).unwrap_or_default())
}

#[utoipa::path(
    get,
    path = "/search-events",
    params(("searchId" = Uuid, Query, description = "Search identifier returned by POST /search")),
    responses((status = 200, description = "Server-sent stream of progress events")),
    tag = "search",
)]
pub async fn stream(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let search_id = query.search_id;

    // Subscribe before backfilling: any event published between the two
    // reads lands in the live receiver and is deduped against the seen set
    // below rather than being silently dropped.
    let live_rx = state.subscriber.subscribe_live(search_id);
    let backfill = state.subscriber.backfill(search_id).await.unwrap_or_else(|err| {
        tracing::warn!(%search_id, %err, "failed to backfill search events");
        crate::services::subscriber::BackfillSnapshot {
            events: Vec::new(),
            pain_points: Vec::new(),
            quotes: Vec::new(),
        }
    });

    let mut seen: HashSet<Uuid> = HashSet::new();
    let backfill_events: Vec<SearchEvent> = backfill
        .events
        .into_iter()
        .filter(|event| seen.insert(event.id))
        .collect();

    let backfill_stream = stream::iter(backfill_events.into_iter().map(|event| Ok(to_sse_event(&event))));

    let live_stream = BroadcastStream::new(live_rx).filter_map(move |item| {
        let keep = match &item {
            Ok(event) => seen.insert(event.id),
            Err(_lagged) => true,
        };
        let mapped = match item {
            Ok(event) if keep => Some(Ok(to_sse_event(&event))),
            Ok(_) => None,
            Err(_lagged) => {
                tracing::warn!(%search_id, "subscriber lagged behind the event broadcast channel");
                None
            },
        };
        async move { mapped }
    });

    let combined = backfill_stream.chain(live_stream);

    Sse::new(combined).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("keep-alive"))
}
