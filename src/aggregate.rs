//! Merging of primary and fallback search results for one wanted song.

use rustc_hash::FxHashSet;

use crate::error::FetchError;
use crate::models::{SongCandidate, WantedSong};
use crate::search::SearchClient;

/// Search with the display query and, when present, the fallback query.
///
/// Results are unioned with exact-tuple deduplication: a row returned by both
/// queries appears once, while two rows sharing only a title are both kept.
/// First-seen order is preserved so the ranker's tie order is deterministic.
pub fn resolve(
    client: &SearchClient<'_>,
    song: &WantedSong,
) -> Result<Vec<SongCandidate>, FetchError> {
    let mut results = client.search(&song.display_query)?;
    if let Some(fallback) = &song.fallback_query {
        results.extend(client.search(fallback)?);
    }
    Ok(dedup_candidates(results))
}

/// Drop repeated candidates, keeping the first occurrence of each.
pub fn dedup_candidates(candidates: Vec<SongCandidate>) -> Vec<SongCandidate> {
    let mut seen = FxHashSet::default();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.clone()))
        .collect()
}
