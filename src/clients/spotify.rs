use std::path::PathBuf;

use async_trait::async_trait;
use log::{debug, info, warn};

use crate::clients::{
    catalog::SourceCatalog,
    entities::{PlaylistDescriptor, TrackDescriptor},
    errors::{Error, Result},
};
use futures::stream::TryStreamExt;
use rspotify::{
    AuthCodeSpotify, ClientError, Config, Credentials, OAuth,
    http::HttpError,
    model::{FullTrack, PlayableItem, PlaylistId, PlaylistItem},
    prelude::*,
    scopes,
};

impl TryFrom<FullTrack> for TrackDescriptor {
    type Error = Error;

    fn try_from(track: FullTrack) -> Result<TrackDescriptor> {
        if track.artists.is_empty() {
            return Err(Error::ParseError(format!(
                "track '{}' has no artists",
                track.name
            )));
        }
        Ok(TrackDescriptor {
            source_id: track.id.map(|id| id.id().to_owned()),
            artists: track.artists.into_iter().map(|a| a.name).collect(),
            album: track.album.name,
            duration_ms: u64::try_from(track.duration.num_milliseconds()).unwrap_or_default(),
            isrc: track.external_ids.get("isrc").cloned(),
            title: track.name,
        })
    }
}

// Episodes, removed items and artist-less tracks can't be matched by metadata
fn track_descriptor(item: PlaylistItem) -> Option<TrackDescriptor> {
    match item.track {
        Some(PlayableItem::Track(track)) => match TrackDescriptor::try_from(track) {
            Ok(descriptor) => Some(descriptor),
            Err(e) => {
                warn!("Skipping playlist item: {e}");
                None
            }
        },
        Some(_) => {
            debug!("Skipping non-track playlist item");
            None
        }
        None => {
            debug!("Skipping unavailable playlist item");
            None
        }
    }
}

fn playlist_id(raw: &str) -> Result<PlaylistId<'_>> {
    PlaylistId::from_id(raw).map_err(|_| Error::NotFound(raw.to_string()))
}

fn playlist_descriptor(
    name: String,
    description: Option<String>,
    items: Vec<PlaylistItem>,
) -> PlaylistDescriptor {
    let item_count = items.len();
    let tracks: Vec<TrackDescriptor> = items.into_iter().filter_map(track_descriptor).collect();
    debug!(
        "Fetched {item_count} items from Spotify playlist '{name}', {} are transferable tracks",
        tracks.len()
    );

    PlaylistDescriptor {
        name,
        description: description.unwrap_or_default(),
        total_tracks: tracks.len(),
        skipped_items: item_count - tracks.len(),
        tracks,
    }
}

fn source_error(playlist_id: &str, err: ClientError) -> Error {
    if let ClientError::Http(http) = &err
        && let HttpError::StatusCode(response) = http.as_ref()
        && response.status().as_u16() == 404
    {
        return Error::NotFound(playlist_id.to_string());
    }
    Error::SourceUnavailable(err.to_string())
}

pub struct SpotifyClient {
    pub spotify: AuthCodeSpotify,
}

impl SpotifyClient {
    pub fn new(spotify: AuthCodeSpotify) -> Self {
        SpotifyClient { spotify }
    }

    // Authorize the Spotify client via CLI prompt and OAuth flow
    // A cached token is reused when present, so the prompt only shows on first run.
    pub async fn authorize_client(&self) -> Result<()> {
        debug!("Starting Spotify authorization ...");
        let url = self.spotify.get_authorize_url(false)?;
        // This function requires the `cli` feature enabled.
        self.spotify.prompt_for_token(&url).await?;
        let user = self.spotify.me().await?;
        debug!("Authenticated on Spotify as user: {:?}", user.display_name);
        Ok(())
    }

    // Create a SpotifyClient from environment variables or raise a configuration error
    pub fn try_default() -> Result<Self> {
        let creds = Credentials::from_env()
        .ok_or_else(|| Error::ConfigurationError("Missing Spotify credentials in environment variables (RSPOTIFY_CLIENT_ID, RSPOTIFY_CLIENT_SECRET).".into()))?;
        let oauth = OAuth::from_env(scopes!("playlist-read-private", "playlist-read-collaborative"))
        .ok_or_else(|| Error::ConfigurationError("Missing Spotify OAuth configuration in environment variables (RSPOTIFY_REDIRECT_URI).".into()))?;

        let cache_path = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp")) // Fallback to /tmp if cache directory can't be determined
            .join(".rtransfer_spotify_cache");

        let spotify = AuthCodeSpotify::with_config(
            creds,
            oauth,
            Config {
                token_cached: true,
                cache_path,
                ..Default::default()
            },
        );

        Ok(Self::new(spotify))
    }
}

#[async_trait]
impl SourceCatalog for SpotifyClient {
    async fn fetch_playlist(&self, raw_id: &str) -> Result<PlaylistDescriptor> {
        let id = playlist_id(raw_id)?;

        info!("Fetching Spotify playlist {raw_id} ...");
        let playlist = self
            .spotify
            .playlist(id.clone(), None, None)
            .await
            .map_err(|e| source_error(raw_id, e))?;

        // The paginator follows `next` links until the last page
        let items: Vec<PlaylistItem> = self
            .spotify
            .playlist_items(id, None, None)
            .try_collect()
            .await
            .map_err(|e| source_error(raw_id, e))?;

        Ok(playlist_descriptor(playlist.name, playlist.description, items))
    }
}
