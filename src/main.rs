mod cli;
mod config;
mod dispatch;
mod error;
pub(crate) mod git;
mod logging;
pub(crate) mod notice;
pub(crate) mod time_utils;
mod transport;

pub(crate) use error::{AppError, AppResult};

use std::process::ExitCode;

use clap::Parser;
use tracing::error;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    logging::setup_logger(&cli.verbosity, cli.color);
    match cli.run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
