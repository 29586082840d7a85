use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("FETCHARR_").split("_"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexerKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
[qbittorrent]
url = "http://localhost:8080"
username = "admin"
password = "pass"

[downloads]
save_path = "/downloads"
movies_root = "/media/movies"
tv_root = "/media/tv"
"#;

    #[test]
    fn test_load_minimal_config() {
        let config = load_config_from_str(MINIMAL).unwrap();
        assert_eq!(config.qbittorrent.url, "http://localhost:8080");
        assert_eq!(config.qbittorrent.category, "fetcharr");
        assert_eq!(config.qbittorrent.timeout_secs, 30);
        assert!(config.indexers.is_empty());
        assert!(config.downloads.auto_import);
        assert_eq!(config.workers.progress_interval_secs, 5);
    }

    #[test]
    fn test_load_config_with_indexers() {
        let toml = format!(
            r#"{}
[[indexers]]
name = "jackett"
kind = "jackett"
url = "http://localhost:9117"
api_key = "key"

[[indexers]]
name = "nyaa"
kind = "torznab"
url = "http://localhost:9118"
enabled = false
priority = 5
"#,
            MINIMAL
        );

        let config = load_config_from_str(&toml).unwrap();
        assert_eq!(config.indexers.len(), 2);
        assert_eq!(config.indexers[0].kind, IndexerKind::Jackett);
        assert_eq!(config.indexers[0].priority, 100);
        assert!(!config.indexers[1].enabled);
        assert_eq!(config.indexers[1].priority, 5);
    }

    #[test]
    fn test_load_config_missing_qbittorrent_section() {
        let toml = r#"
[downloads]
save_path = "/downloads"
movies_root = "/m"
tv_root = "/t"
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", MINIMAL).unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.qbittorrent.username, "admin");
        assert_eq!(config.downloads.tv_root, "/media/tv");
    }
}
