//! Reusable mock implementations for tests.
//!
//! Compiled into the crate (not behind cfg(test)) so integration tests and
//! downstream consumers can drive the acquisition pipeline without a real
//! torrent client, indexer or library.

mod mock_client;
mod mock_indexer;
mod mock_library;

pub use mock_client::MockTorrentClient;
pub use mock_indexer::MockIndexer;
pub use mock_library::MockMediaLibrary;
