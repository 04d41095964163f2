mod cli;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};
use rtransfer::clients::errors::Error;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = cli::Cli::parse();

    let filter = if args.verbose { "info,rtransfer=debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    // Ctrl-C ends the process from its own task: the login prompts block on stdin
    // and would keep the runtime from shutting down. A partially filled Tidal
    // playlist is kept.
    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            error!("Playlist transfer failed: {}", Error::Cancelled);
            std::process::exit(1);
        }
    });

    let outcome = cli::run(args).await;

    match outcome {
        Ok(_) => {
            info!("Playlist transfer completed!");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Playlist transfer failed: {e}");
            ExitCode::FAILURE
        }
    }
}
