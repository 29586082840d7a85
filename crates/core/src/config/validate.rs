use std::collections::HashSet;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - qBittorrent URL is set
/// - download paths are set
/// - indexer names are unique and non-empty
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.qbittorrent.url.is_empty() {
        return Err(ConfigError::ValidationError(
            "qbittorrent.url cannot be empty".to_string(),
        ));
    }

    if config.downloads.save_path.is_empty() {
        return Err(ConfigError::ValidationError(
            "downloads.save_path cannot be empty".to_string(),
        ));
    }
    if config.downloads.movies_root.is_empty() || config.downloads.tv_root.is_empty() {
        return Err(ConfigError::ValidationError(
            "downloads.movies_root and downloads.tv_root cannot be empty".to_string(),
        ));
    }

    let mut names = HashSet::new();
    for indexer in &config.indexers {
        if indexer.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "indexer name cannot be empty".to_string(),
            ));
        }
        if !names.insert(indexer.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate indexer name: {}",
                indexer.name
            )));
        }
        if indexer.url.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "indexer {} has no url",
                indexer.name
            )));
        }
    }

    Ok(())
}
