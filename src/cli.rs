use std::time::Duration;

use clap::Parser;
use log::info;
use rtransfer::clients::{SpotifyClient, TidalClient, errors::Result};
use rtransfer::report::TransferReport;
use rtransfer::transfer::{ConfigBuilder, Transfer};

#[derive(Parser)]
#[command(name = "rtransfer")]
#[command(version, about = "Transfer a Spotify playlist to Tidal", long_about = None)]
pub struct Cli {
    /// Spotify playlist ID or URL
    playlist: String,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Track ids appended per Tidal request [env: RTRANSFER_BATCH_SIZE, default: 100]
    #[arg(long)]
    batch_size: Option<usize>,

    /// Pause after every track lookup, in milliseconds [env: RTRANSFER_REQUEST_DELAY_MS, default: 300]
    #[arg(long)]
    delay_ms: Option<u64>,
}

// Accepts a raw id, a spotify:playlist: URI or any URL containing `playlist/<id>`
pub fn extract_playlist_id(input: &str) -> &str {
    let input = input.trim();
    if let Some(id) = input.strip_prefix("spotify:playlist:") {
        return id;
    }
    match input.split_once("playlist/") {
        Some((_, rest)) => rest.split('?').next().unwrap_or(rest),
        None => input,
    }
}

pub async fn run(cli: Cli) -> Result<TransferReport> {
    let playlist_id = extract_playlist_id(&cli.playlist).to_string();

    info!("Building config ...");
    let config = ConfigBuilder::new()
        .batch_size(cli.batch_size)
        .request_delay(cli.delay_ms.map(Duration::from_millis))
        .build()?;
    let spotify = SpotifyClient::try_default()?;
    let tidal = TidalClient::try_default()?;

    info!("Authorizing clients ...");
    // CLI prompts may be shown on those two calls
    spotify.authorize_client().await?;
    tidal.authorize_client().await?;

    let transfer = Transfer::new(&spotify, &tidal, config);
    transfer.run(&playlist_id).await
}
