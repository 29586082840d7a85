mod aggregator;
mod dedup;

pub use aggregator::{episode_patterns, movie_patterns, SearchAggregator};
pub use dedup::deduplicate_results;
