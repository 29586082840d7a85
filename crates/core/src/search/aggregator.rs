//! Multi-indexer search fan-out.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::indexer::{episode_query, movie_query, Indexer, SearchResult};

use super::dedup::deduplicate_results;

/// Fans a query out to every enabled indexer concurrently and merges the
/// answers into one deduplicated, seeder-sorted list. A failing indexer
/// contributes nothing; it never fails the search.
pub struct SearchAggregator {
    indexers: Vec<Arc<dyn Indexer>>,
}

impl SearchAggregator {
    pub fn new(mut indexers: Vec<Arc<dyn Indexer>>) -> Self {
        indexers.sort_by_key(|i| i.priority());
        Self { indexers }
    }

    pub fn indexer_names(&self) -> Vec<String> {
        self.indexers.iter().map(|i| i.name().to_string()).collect()
    }

    pub async fn search_episode(
        &self,
        series_name: &str,
        season: u32,
        episode: u32,
    ) -> Vec<SearchResult> {
        self.search_by_query(&episode_query(series_name, season, episode))
            .await
    }

    pub async fn search_movie(&self, title: &str, year: Option<u16>) -> Vec<SearchResult> {
        self.search_by_query(&movie_query(title, year)).await
    }

    /// Run one query against all enabled indexers, waiting for every one.
    pub async fn search_by_query(&self, query: &str) -> Vec<SearchResult> {
        self.search_by_patterns(&[query.to_string()]).await
    }

    /// Run every pattern against every enabled indexer (full cross product)
    /// and merge everything through one dedup pass.
    pub async fn search_by_patterns(&self, patterns: &[String]) -> Vec<SearchResult> {
        let enabled: Vec<&Arc<dyn Indexer>> =
            self.indexers.iter().filter(|i| i.enabled()).collect();

        if enabled.is_empty() {
            warn!("Search requested but no indexers are enabled");
            return Vec::new();
        }

        debug!(
            indexers = enabled.len(),
            patterns = patterns.len(),
            "Starting search fan-out"
        );

        let futures: Vec<_> = enabled
            .iter()
            .flat_map(|indexer| {
                patterns.iter().map(move |pattern| {
                    let indexer = Arc::clone(indexer);
                    let pattern = pattern.clone();
                    async move {
                        let outcome = indexer.search_raw(&pattern).await;
                        (indexer.name().to_string(), pattern, outcome)
                    }
                })
            })
            .collect();

        let outcomes = futures::future::join_all(futures).await;

        let mut merged: Vec<SearchResult> = Vec::new();
        for (indexer, pattern, outcome) in outcomes {
            match outcome {
                Ok(mut results) => merged.append(&mut results),
                Err(e) => {
                    warn!(indexer = %indexer, pattern = %pattern, error = %e, "Indexer search failed");
                }
            }
        }

        let results = deduplicate_results(merged);
        debug!(results = results.len(), "Search fan-out complete");
        results
    }
}

/// Query permutations for an episode: plain, dotted scene style, 1x02 style.
pub fn episode_patterns(series_name: &str, season: u32, episode: u32) -> Vec<String> {
    let dotted = series_name.replace(' ', ".");
    vec![
        format!("{} S{:02}E{:02}", series_name, season, episode),
        format!("{}.S{:02}E{:02}", dotted, season, episode),
        format!("{} {}x{:02}", series_name, season, episode),
    ]
}

/// Query permutations for a movie: with year, plain, dotted scene style.
pub fn movie_patterns(title: &str, year: Option<u16>) -> Vec<String> {
    let mut patterns = Vec::new();
    if let Some(y) = year {
        patterns.push(format!("{} {}", title, y));
        patterns.push(format!("{}.{}", title.replace(' ', "."), y));
    }
    patterns.push(title.to_string());
    patterns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockIndexer;

    fn mock_result(hash: &str, seeders: u32, indexer: &str) -> SearchResult {
        SearchResult {
            title: format!("Release {}", hash),
            magnet_uri: Some(format!("magnet:?xt=urn:btih:{}", hash)),
            download_url: None,
            info_hash: Some(hash.to_string()),
            size_bytes: 1000,
            seeders,
            leechers: 0,
            quality: Default::default(),
            indexer: indexer.to_string(),
            publish_date: None,
        }
    }

    #[tokio::test]
    async fn test_merges_results_from_all_indexers() {
        let a = Arc::new(MockIndexer::new("a").with_results(vec![mock_result("h1", 5, "a")]));
        let b = Arc::new(MockIndexer::new("b").with_results(vec![mock_result("h2", 9, "b")]));

        let aggregator = SearchAggregator::new(vec![a, b]);
        let results = aggregator.search_by_query("anything").await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].seeders, 9);
    }

    #[tokio::test]
    async fn test_failing_indexer_is_absorbed() {
        let good = Arc::new(MockIndexer::new("good").with_results(vec![mock_result("h1", 5, "good")]));
        let bad = Arc::new(MockIndexer::new("bad").with_failure());

        let aggregator = SearchAggregator::new(vec![good, bad]);
        let results = aggregator.search_by_query("anything").await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].indexer, "good");
    }

    #[tokio::test]
    async fn test_disabled_indexer_skipped() {
        let on = Arc::new(MockIndexer::new("on").with_results(vec![mock_result("h1", 5, "on")]));
        let off = Arc::new(
            MockIndexer::new("off")
                .with_results(vec![mock_result("h2", 9, "off")])
                .disabled(),
        );

        let aggregator = SearchAggregator::new(vec![on, off]);
        let results = aggregator.search_by_query("anything").await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].indexer, "on");
    }

    #[tokio::test]
    async fn test_duplicate_across_indexers_deduped() {
        let a = Arc::new(MockIndexer::new("a").with_results(vec![mock_result("same", 5, "a")]));
        let b = Arc::new(MockIndexer::new("b").with_results(vec![mock_result("same", 20, "b")]));

        let aggregator = SearchAggregator::new(vec![a, b]);
        let results = aggregator.search_by_query("anything").await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].seeders, 20);
        assert_eq!(results[0].indexer, "b");
    }

    #[tokio::test]
    async fn test_all_indexers_failing_yields_empty() {
        let a = Arc::new(MockIndexer::new("a").with_failure());
        let b = Arc::new(MockIndexer::new("b").with_failure());

        let aggregator = SearchAggregator::new(vec![a, b]);
        assert!(aggregator.search_by_query("anything").await.is_empty());
    }

    #[tokio::test]
    async fn test_no_indexers_yields_empty() {
        let aggregator = SearchAggregator::new(vec![]);
        assert!(aggregator.search_by_query("anything").await.is_empty());
    }

    #[test]
    fn test_episode_patterns() {
        let patterns = episode_patterns("Some Show", 1, 2);
        assert!(patterns.contains(&"Some Show S01E02".to_string()));
        assert!(patterns.contains(&"Some.Show.S01E02".to_string()));
        assert!(patterns.contains(&"Some Show 1x02".to_string()));
    }

    #[test]
    fn test_movie_patterns_with_year() {
        let patterns = movie_patterns("Big Film", Some(1999));
        assert_eq!(patterns[0], "Big Film 1999");
        assert!(patterns.contains(&"Big.Film.1999".to_string()));
        assert!(patterns.contains(&"Big Film".to_string()));
    }

    #[test]
    fn test_movie_patterns_without_year() {
        assert_eq!(movie_patterns("Big Film", None), vec!["Big Film"]);
    }
}
