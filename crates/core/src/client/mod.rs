mod qbittorrent;
mod types;

pub use qbittorrent::QbittorrentClient;
pub use types::{
    AddTorrentRequest, TorrentClient, TorrentClientError, TorrentInfo, TorrentState,
};
