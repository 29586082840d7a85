mod jackett;
mod release;
mod torznab;
mod types;

pub use jackett::JackettIndexer;
pub use release::ReleaseQuality;
pub use torznab::TorznabIndexer;
pub use types::{episode_query, movie_query, Indexer, IndexerError, SearchResult};
