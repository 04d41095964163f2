use rspotify::ClientError;
use thiserror::Error;

/// Result alias used across the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to parse catalog data, error: {0}")]
    ParseError(String),

    #[error("Source catalog unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Playlist not found: {0}")]
    NotFound(String),

    #[error("Failed to create destination playlist: {0}")]
    CreateFailed(String),

    #[error("Track search failed: {0}")]
    SearchError(String),

    #[error("Failed to append tracks: {0}")]
    AppendError(String),

    #[error("Spotify error: {0}")]
    SpotifyError(#[from] ClientError),

    #[error("Tidal HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Tidal authorization error: {0}")]
    AuthorizationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Transfer cancelled by user")]
    Cancelled,
}

impl Error {
    /// Search and append failures are absorbed into the transfer report,
    /// everything else terminates the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::SearchError(_) | Error::AppendError(_))
    }
}

impl From<std::env::VarError> for Error {
    fn from(err: std::env::VarError) -> Self {
        Error::ConfigurationError(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::ConfigurationError(err.to_string())
    }
}
