//! Cross-indexer result deduplication.

use std::collections::HashMap;

use crate::indexer::SearchResult;

/// Collapse duplicates across indexers and sort by seeders, descending.
///
/// Identity is the info hash when present, otherwise the locator string. When
/// several indexers report the same release, the variant with the strictly
/// highest seeder count survives; nothing is merged or summed, since each
/// variant's numbers describe one tracker's view and adding them would invent
/// swarm sizes no tracker reported. Results with no identity at all pass
/// through untouched.
pub fn deduplicate_results(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut by_identity: HashMap<String, SearchResult> = HashMap::new();
    let mut anonymous: Vec<SearchResult> = Vec::new();

    for result in results {
        match result_identity(&result) {
            Some(identity) => match by_identity.get(&identity) {
                Some(existing) if existing.seeders >= result.seeders => {}
                _ => {
                    by_identity.insert(identity, result);
                }
            },
            None => anonymous.push(result),
        }
    }

    let mut deduped: Vec<SearchResult> = by_identity.into_values().collect();
    deduped.append(&mut anonymous);
    deduped.sort_by(|a, b| b.seeders.cmp(&a.seeders));
    deduped
}

fn result_identity(result: &SearchResult) -> Option<String> {
    if let Some(hash) = &result.info_hash {
        if !hash.is_empty() {
            return Some(hash.clone());
        }
    }
    result.locator().map(String::from)
}
