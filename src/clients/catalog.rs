use async_trait::async_trait;

use crate::clients::{
    entities::{MatchCandidate, PlaylistDescriptor, PlaylistHandle},
    errors::Result,
};

/// Read side of a transfer: the catalog playlists are copied from.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceCatalog: Send + Sync {
    /// Fetch playlist metadata and every track, following pagination.
    ///
    /// Fails with `Error::NotFound` for unknown ids and `Error::SourceUnavailable`
    /// on auth or network problems.
    async fn fetch_playlist(&self, playlist_id: &str) -> Result<PlaylistDescriptor>;
}

/// Write side of a transfer: the catalog playlists are rebuilt in.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DestinationCatalog: Send + Sync {
    /// Free text or identifier search, ranked by the catalog's own relevance.
    /// No results is an empty vector, not an error.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<MatchCandidate>>;

    /// Fails with `Error::CreateFailed`.
    async fn create_playlist(&self, name: &str, description: &str) -> Result<PlaylistHandle>;

    /// All-or-nothing: either every id lands or `Error::AppendError` is returned.
    async fn append_tracks(&self, playlist: &PlaylistHandle, track_ids: &[String]) -> Result<()>;
}
