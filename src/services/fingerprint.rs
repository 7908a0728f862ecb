//! Deterministic hashing of normalized query parameters (C3).
//!
//! Pure function, no I/O, no struct — a free function is enough when there
//! is no state to carry.

use serde::Serialize;

use crate::models::search::{Search, SearchRequest, SortBy, SourceTag, TimeRange};

#[derive(Serialize)]
struct FingerprintPayload {
    topic: String,
    tags: Vec<String>,
    time_range: String,
    min_upvotes: i32,
    sort_by: String,
}

fn fingerprint_of(
    topic: &str,
    tags: &[SourceTag],
    time_range: TimeRange,
    min_upvotes: i32,
    sort_by: SortBy,
) -> String {
    let topic = topic.trim().to_lowercase();
    let mut tags: Vec<String> = tags.iter().map(|t| t.as_str().to_string()).collect();
    tags.sort();

    let payload = FingerprintPayload {
        topic,
        tags,
        time_range: time_range.to_string(),
        min_upvotes,
        sort_by: sort_by.to_string(),
    };

    format!("searchKey:{}", serde_json::to_string(&payload).expect("payload is always valid JSON"))
}

/// `"searchKey:" + canonical_json(payload)` with keys in a fixed order.
/// Topic is trimmed+lowercased, tags lowercased+sorted; everything else is
/// included verbatim. Two requests differing only in that normalization
/// must yield the same fingerprint (spec §4.1, §8 "Fingerprint stability").
pub fn fingerprint(req: &SearchRequest) -> String {
    fingerprint_of(&req.topic, &req.tags, req.time_range, req.min_upvotes, req.sort_by)
}

/// Recomputes the fingerprint of an already-persisted `Search` — used by
/// the Worker to re-derive the cache key at Phase 5 without reconstructing
/// a `SearchRequest`.
pub fn fingerprint_of_search(search: &Search) -> String {
    fingerprint_of(
        &search.topic,
        &search.tags,
        search.time_range,
        search.min_upvotes,
        search.sort_by,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::search::{SortBy, SourceTag, TimeRange};

    fn req(topic: &str, tags: Vec<SourceTag>) -> SearchRequest {
        SearchRequest {
            topic: topic.to_string(),
            tags,
            time_range: TimeRange::Month,
            min_upvotes: 10,
            sort_by: SortBy::Relevance,
        }
    }

    #[test]
    fn stable_under_trim_and_case() {
        let a = req("  Notion  ", vec![SourceTag::Ask, SourceTag::Show]);
        let b = req("notion", vec![SourceTag::Show, SourceTag::Ask]);
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn differs_on_meaningful_change() {
        let a = req("notion", vec![SourceTag::Ask]);
        let b = req("notion", vec![SourceTag::Show]);
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn has_stable_prefix() {
        let a = req("notion", vec![]);
        assert!(fingerprint(&a).starts_with("searchKey:"));
    }
}
