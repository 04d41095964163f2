//! Rtransfer - Transfer playlists from Spotify to Tidal
//!
//! This library fetches a playlist from a source catalog, resolves every track
//! against a destination catalog and rebuilds the playlist there.

/// Client modules for interacting with the streaming catalogs
pub mod clients;
/// Matching of source tracks to destination catalog entries
pub mod matcher;
/// Transfer outcome counters
pub mod report;
/// The end-to-end transfer pipeline
pub mod transfer;
