use std::time::Duration;

use log::{debug, info, warn};

use crate::clients::{
    catalog::{DestinationCatalog, SourceCatalog},
    errors::{Error, Result},
};
use crate::matcher::{DEFAULT_ISRC_SEARCH_LIMIT, DEFAULT_TEXT_SEARCH_LIMIT, TrackMatcher};
use crate::report::TransferReport;

/// Default number of track ids appended per destination request
pub const DEFAULT_BATCH_SIZE: usize = 100;
/// Default pause after every track lookup
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(300);
/// Default note appended to the destination playlist description
pub const DEFAULT_PROVENANCE_MARKER: &str = "Transferred from Spotify";

const BATCH_SIZE_ENV: &str = "RTRANSFER_BATCH_SIZE";
const REQUEST_DELAY_ENV: &str = "RTRANSFER_REQUEST_DELAY_MS";

/// Tunables of a transfer run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    pub batch_size: usize,
    pub request_delay: Duration,
    pub isrc_search_limit: usize,
    pub text_search_limit: usize,
    pub provenance_marker: String,
}

impl Default for TransferConfig {
    fn default() -> Self {
        TransferConfig {
            batch_size: DEFAULT_BATCH_SIZE,
            request_delay: DEFAULT_REQUEST_DELAY,
            isrc_search_limit: DEFAULT_ISRC_SEARCH_LIMIT,
            text_search_limit: DEFAULT_TEXT_SEARCH_LIMIT,
            provenance_marker: DEFAULT_PROVENANCE_MARKER.to_string(),
        }
    }
}

/// Resolves a `TransferConfig` from explicit values, then the environment, then defaults
#[derive(Default)]
pub struct ConfigBuilder {
    batch_size: Option<usize>,
    request_delay: Option<Duration>,
}

impl ConfigBuilder {
    /// Builder with nothing set explicitly
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of track ids sent per append request
    #[must_use]
    pub fn batch_size(mut self, batch_size: Option<usize>) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Pause after every track lookup
    #[must_use]
    pub fn request_delay(mut self, request_delay: Option<Duration>) -> Self {
        self.request_delay = request_delay;
        self
    }

    /// Build using the process environment for unset values
    pub fn build(self) -> Result<TransferConfig> {
        self.build_with(|name| std::env::var(name).ok())
    }

    fn build_with<F>(self, lookup: F) -> Result<TransferConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let batch_size = match self.batch_size {
            Some(size) => size,
            None => parse_env(&lookup, BATCH_SIZE_ENV)?.unwrap_or(DEFAULT_BATCH_SIZE),
        };
        if batch_size == 0 {
            return Err(Error::ConfigurationError(
                "batch size must be at least 1".into(),
            ));
        }

        let request_delay = match self.request_delay {
            Some(delay) => delay,
            None => parse_env(&lookup, REQUEST_DELAY_ENV)?
                .map_or(DEFAULT_REQUEST_DELAY, Duration::from_millis),
        };

        Ok(TransferConfig {
            batch_size,
            request_delay,
            ..TransferConfig::default()
        })
    }
}

fn parse_env<F, T>(lookup: &F, name: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(name)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| Error::ConfigurationError(format!("{name}={raw}: {e}")))
        })
        .transpose()
}

/// Pipeline stages, always traversed in this order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStage {
    FetchingSource,
    CreatingDestination,
    ResolvingTracks,
    FlushingBatch,
    Reporting,
    Done,
}

/// Copies one playlist from the source catalog into a new destination playlist.
///
/// Only the source fetch and the playlist creation can fail the run. Tracks that
/// can't be matched and batches that can't be appended are tallied in the report.
pub struct Transfer<'a> {
    source: &'a dyn SourceCatalog,
    destination: &'a dyn DestinationCatalog,
    config: TransferConfig,
}

impl<'a> Transfer<'a> {
    /// Transfer between the given catalogs
    pub fn new(
        source: &'a dyn SourceCatalog,
        destination: &'a dyn DestinationCatalog,
        config: TransferConfig,
    ) -> Self {
        Transfer {
            source,
            destination,
            config,
        }
    }

    fn enter(stage: TransferStage) {
        debug!("Transfer stage: {stage:?}");
    }

    fn description(&self, source_description: &str) -> String {
        if source_description.is_empty() {
            self.config.provenance_marker.clone()
        } else {
            format!("{source_description}\n\n{}", self.config.provenance_marker)
        }
    }

    /// Run the whole pipeline for one source playlist
    pub async fn run(&self, source_playlist_id: &str) -> Result<TransferReport> {
        info!("Starting transfer of playlist {source_playlist_id} ...");

        Self::enter(TransferStage::FetchingSource);
        let playlist = self.source.fetch_playlist(source_playlist_id).await?;
        info!(
            "Found {} tracks in playlist '{}'",
            playlist.total_tracks, playlist.name
        );
        if playlist.skipped_items > 0 {
            info!(
                "Skipped {} playlist items that are not transferable tracks",
                playlist.skipped_items
            );
        }

        Self::enter(TransferStage::CreatingDestination);
        let handle = self
            .destination
            .create_playlist(&playlist.name, &self.description(&playlist.description))
            .await?;
        info!("Created destination playlist '{}'", handle.name);

        // The report counts the descriptors actually resolved below
        let total = playlist.tracks.len();
        if total != playlist.total_tracks {
            warn!(
                "Source reported {} tracks but delivered {total}, reporting against {total}",
                playlist.total_tracks
            );
        }
        let mut report = TransferReport::new(playlist.name.clone(), handle, total);
        let matcher = TrackMatcher::with_limits(
            self.destination,
            self.config.isrc_search_limit,
            self.config.text_search_limit,
        );
        let mut buffer: Vec<String> = Vec::with_capacity(self.config.batch_size);

        Self::enter(TransferStage::ResolvingTracks);
        for (position, track) in playlist.tracks.iter().enumerate() {
            debug!("[{}/{total}] Searching: {}", position + 1, track.label());
            match matcher.find_match(track).await {
                Some(candidate) => {
                    debug!(
                        "Found: {} - {}",
                        candidate.artists.first().map_or("Unknown", String::as_str),
                        candidate.title
                    );
                    buffer.push(candidate.id);
                }
                None => {
                    info!("Not found: {}", track.label());
                    report.record_unmatched(track.label());
                }
            }

            if buffer.len() >= self.config.batch_size {
                self.flush(&mut buffer, &mut report).await;
                Self::enter(TransferStage::ResolvingTracks);
            }

            // Rate limiting, applies to lookups only
            if !self.config.request_delay.is_zero() {
                tokio::time::sleep(self.config.request_delay).await;
            }
        }

        if !buffer.is_empty() {
            self.flush(&mut buffer, &mut report).await;
        }

        Self::enter(TransferStage::Reporting);
        report.log_summary();
        Self::enter(TransferStage::Done);
        Ok(report)
    }

    // A failed append can't be traced to a single track, so the whole batch counts as errored
    async fn flush(&self, buffer: &mut Vec<String>, report: &mut TransferReport) {
        Self::enter(TransferStage::FlushingBatch);
        let batch = std::mem::take(buffer);
        let appended = match self
            .destination
            .append_tracks(&report.destination, &batch)
            .await
        {
            Ok(()) => {
                info!("Added batch of {} tracks", batch.len());
                true
            }
            Err(e) => {
                warn!("Failed to add batch of {} tracks: {e}", batch.len());
                false
            }
        };
        report.record_batch(batch.len(), appended);
    }
}
