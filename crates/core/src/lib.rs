pub mod client;
pub mod config;
pub mod download;
pub mod events;
pub mod indexer;
pub mod library;
pub mod manager;
pub mod search;
pub mod testing;
pub mod worker;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use download::{DownloadRecord, DownloadState, MediaKind};
pub use manager::{DownloadError, DownloadManager};
