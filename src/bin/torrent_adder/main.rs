//! torrent-adder - Add torrents to a remote Transmission daemon.
//!
//! Suggests the matching TV show folder for episode releases
//! and asks for the download directory with native dialogs or terminal prompts.

mod adder;
mod config;
mod dialog;

use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::Shell;

use crate::adder::TorrentAdder;

/// Add a torrent file or magnet link to Transmission.
///
/// Lists the media library directories from the torrent-api service,
/// suggests the existing show folder for TV episodes,
/// and adds the torrent into the chosen directory.
#[derive(Parser)]
#[command(
    author,
    version,
    name = env!("CARGO_BIN_NAME"),
    about = "Add a torrent file or magnet link to Transmission"
)]
pub struct Args {
    /// Torrent file path or magnet link
    #[arg(value_name = "SOURCE", value_hint = clap::ValueHint::FilePath)]
    source: Option<String>,

    /// Transmission host
    #[arg(short = 'H', long, name = "HOST")]
    host: Option<String>,

    /// Transmission RPC port
    #[arg(short = 'P', long, name = "PORT")]
    port: Option<u16>,

    /// Transmission RPC username
    #[arg(short = 'u', long, name = "USER")]
    username: Option<String>,

    /// Transmission RPC password
    #[arg(short = 'w', long, name = "PASS")]
    password: Option<String>,

    /// Directory listing service host, defaults to the Transmission host
    #[arg(long, name = "API_HOST")]
    api_host: Option<String>,

    /// Directory listing service port
    #[arg(long, name = "API_PORT")]
    api_port: Option<u16>,

    /// Use terminal prompts instead of native dialogs
    #[arg(short = 't', long)]
    terminal: bool,

    /// Choose the directory but do not add the torrent
    #[arg(short = 'p', long)]
    dryrun: bool,

    /// Generate shell completion
    #[arg(short = 'l', long, name = "SHELL")]
    completion: Option<Shell>,

    /// Print verbose output
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    if let Some(ref shell) = args.completion {
        torrent_adder::generate_shell_completion(*shell, Args::command(), true, env!("CARGO_BIN_NAME"))?;
        return Ok(ExitCode::SUCCESS);
    }

    let outcome = TorrentAdder::new(args).run().await?;
    if outcome.is_failure() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
