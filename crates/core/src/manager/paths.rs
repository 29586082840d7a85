//! Destination paths, deterministic ids and disk space checks for
//! discovery-driven downloads.

use std::path::Path;

use sha2::{Digest, Sha256};
use sysinfo::Disks;

/// Strip filesystem-hostile characters from a title so it can name a folder.
/// Collapses runs of whitespace left behind by removed characters.
pub fn safe_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => ' ',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Library folder for a movie: `{movies_root}/{Safe Title (Year)}`.
pub fn movie_dir(movies_root: &str, title: &str, year: Option<u16>) -> String {
    let name = match year {
        Some(y) => format!("{} ({})", safe_title(title), y),
        None => safe_title(title),
    };
    format!("{}/{}", movies_root.trim_end_matches('/'), name)
}

/// Library folder for a season: `{tv_root}/{Safe Show}/Season {NN}`.
pub fn season_dir(tv_root: &str, series_name: &str, season: u32) -> String {
    format!(
        "{}/{}/Season {:02}",
        tv_root.trim_end_matches('/'),
        safe_title(series_name),
        season
    )
}

/// Deterministic media id for content discovered outside the library.
///
/// First 8 bytes of sha256 over a namespaced key, sign bit cleared so the id
/// is a non-negative i64. One-way: the same catalog id always maps to the
/// same media id, and ids never collide with library ids in practice because
/// libraries hand out small sequential ids.
pub fn stable_media_id(namespace: &str, catalog_id: &str) -> i64 {
    let mut hasher = Sha256::new();
    hasher.update(format!("fetcharr/{}/{}", namespace, catalog_id).as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(bytes) & i64::MAX
}

/// Available bytes on the filesystem holding `path`, resolved against the
/// disk with the longest matching mount point. `None` when no disk matches.
pub fn free_space(path: &str) -> Option<u64> {
    let disks = Disks::new_with_refreshed_list();
    let target = Path::new(path);

    disks
        .list()
        .iter()
        .filter(|d| target.starts_with(d.mount_point()))
        .max_by_key(|d| d.mount_point().as_os_str().len())
        .map(|d| d.available_space())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_title_strips_hostile_chars() {
        assert_eq!(safe_title("Mission: Impossible"), "Mission Impossible");
        assert_eq!(safe_title("What/If?"), "What If");
        assert_eq!(safe_title("A  Plain  Name"), "A Plain Name");
    }

    #[test]
    fn test_movie_dir_with_year() {
        assert_eq!(
            movie_dir("/media/movies/", "Big Film: Returns", Some(2020)),
            "/media/movies/Big Film Returns (2020)"
        );
    }

    #[test]
    fn test_movie_dir_without_year() {
        assert_eq!(movie_dir("/media/movies", "Big Film", None), "/media/movies/Big Film");
    }

    #[test]
    fn test_season_dir_zero_pads() {
        assert_eq!(
            season_dir("/media/tv", "Some Show", 3),
            "/media/tv/Some Show/Season 03"
        );
    }

    #[test]
    fn test_stable_media_id_deterministic() {
        let a = stable_media_id("movie", "tt0111161");
        let b = stable_media_id("movie", "tt0111161");
        assert_eq!(a, b);
        assert!(a >= 0);
    }

    #[test]
    fn test_stable_media_id_namespaced() {
        assert_ne!(
            stable_media_id("movie", "xyz"),
            stable_media_id("series", "xyz")
        );
    }

    #[test]
    fn test_free_space_on_root() {
        // Every test machine has a filesystem under /
        assert!(free_space("/").is_some());
    }
}
