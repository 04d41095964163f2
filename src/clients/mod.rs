/// Source and destination catalog capabilities
pub mod catalog;
/// Data entities for tracks and playlists
pub mod entities;
/// Error types and result aliases
pub mod errors;
/// Spotify API client
pub mod spotify;
/// Tidal API client
pub mod tidal;

pub use catalog::{DestinationCatalog, SourceCatalog};
pub use spotify::SpotifyClient;
pub use tidal::TidalClient;
