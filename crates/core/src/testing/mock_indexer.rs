//! Mock indexer for testing the search aggregator.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::indexer::{Indexer, IndexerError, SearchResult};

/// Mock implementation of the Indexer trait. Returns a canned result list
/// for every query, or a canned failure.
pub struct MockIndexer {
    name: String,
    enabled: bool,
    priority: u32,
    results: Vec<SearchResult>,
    fail: bool,
    queries: Mutex<Vec<String>>,
}

impl MockIndexer {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
            priority: 100,
            results: Vec::new(),
            fail: false,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn with_results(mut self, results: Vec<SearchResult>) -> Self {
        self.results = results;
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Every query this indexer has been asked to run.
    pub fn recorded_queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    fn answer(&self, query: &str) -> Result<Vec<SearchResult>, IndexerError> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.fail {
            Err(IndexerError::ApiError("mock indexer failure".to_string()))
        } else {
            Ok(self.results.clone())
        }
    }
}

#[async_trait]
impl Indexer for MockIndexer {
    fn name(&self) -> &str {
        &self.name
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    async fn search_episode(
        &self,
        series_name: &str,
        season: u32,
        episode: u32,
    ) -> Result<Vec<SearchResult>, IndexerError> {
        self.answer(&format!("{} S{:02}E{:02}", series_name, season, episode))
    }

    async fn search_movie(
        &self,
        title: &str,
        year: Option<u16>,
    ) -> Result<Vec<SearchResult>, IndexerError> {
        match year {
            Some(y) => self.answer(&format!("{} {}", title, y)),
            None => self.answer(title),
        }
    }

    async fn search_raw(&self, query: &str) -> Result<Vec<SearchResult>, IndexerError> {
        self.answer(query)
    }

    async fn test_connection(&self) -> Result<(), IndexerError> {
        if self.fail {
            Err(IndexerError::ConnectionFailed("mock failure".to_string()))
        } else {
            Ok(())
        }
    }
}
