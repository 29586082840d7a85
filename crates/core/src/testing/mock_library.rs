//! Mock media library for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::library::{LibraryError, MediaLibrary, MovieRef, SeriesRef};

/// Mock implementation of the MediaLibrary trait backed by in-memory maps.
pub struct MockMediaLibrary {
    series: Mutex<HashMap<i64, SeriesRef>>,
    movies: Mutex<HashMap<i64, MovieRef>>,
    rescanned: Mutex<Vec<String>>,
    fail_rescans: Mutex<bool>,
}

impl Default for MockMediaLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMediaLibrary {
    pub fn new() -> Self {
        Self {
            series: Mutex::new(HashMap::new()),
            movies: Mutex::new(HashMap::new()),
            rescanned: Mutex::new(Vec::new()),
            fail_rescans: Mutex::new(false),
        }
    }

    /// Library pre-populated with one series (id 1) and one movie (id 7).
    pub fn with_defaults() -> Self {
        let library = Self::new();
        library.add_series(SeriesRef {
            id: 1,
            title: "Some Show".to_string(),
            path: "/media/tv/Some Show".to_string(),
        });
        library.add_movie(MovieRef {
            id: 7,
            title: "Some Film".to_string(),
            year: Some(2020),
            path: "/media/movies/Some Film (2020)".to_string(),
        });
        library
    }

    pub fn add_series(&self, series: SeriesRef) {
        self.series.lock().unwrap().insert(series.id, series);
    }

    pub fn add_movie(&self, movie: MovieRef) {
        self.movies.lock().unwrap().insert(movie.id, movie);
    }

    pub fn rescanned_paths(&self) -> Vec<String> {
        self.rescanned.lock().unwrap().clone()
    }

    /// Make every rescan call fail from now on.
    pub fn fail_rescans(&self) {
        *self.fail_rescans.lock().unwrap() = true;
    }
}

#[async_trait]
impl MediaLibrary for MockMediaLibrary {
    async fn series(&self, id: i64) -> Result<SeriesRef, LibraryError> {
        self.series
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(LibraryError::SeriesNotFound(id))
    }

    async fn movie(&self, id: i64) -> Result<MovieRef, LibraryError> {
        self.movies
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(LibraryError::MovieNotFound(id))
    }

    async fn rescan(&self, path: &str) -> Result<(), LibraryError> {
        if *self.fail_rescans.lock().unwrap() {
            return Err(LibraryError::RescanFailed("mock rescan failure".to_string()));
        }
        self.rescanned.lock().unwrap().push(path.to_string());
        Ok(())
    }
}
