//! torrent-api - Media library directory listing service.
//!
//! Serves the download directories and TV show folders as JSON
//! for torrent-adder running on another machine.

mod config;
mod server;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use colored::Colorize;

use crate::config::Config;

/// Serve media library directory listings as JSON.
#[derive(Parser)]
#[command(
    author,
    version,
    name = env!("CARGO_BIN_NAME"),
    about = "Serve media library directory listings as JSON"
)]
pub struct Args {
    /// Address to listen on
    #[arg(short = 'b', long, name = "ADDRESS")]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short = 'P', long, name = "PORT")]
    port: Option<u16>,

    /// Movies directory
    #[arg(long, name = "MOVIES_DIR", value_hint = clap::ValueHint::DirPath)]
    movies: Option<String>,

    /// TV shows directory containing one folder per show
    #[arg(long, name = "TV_DIR", value_hint = clap::ValueHint::DirPath)]
    tv: Option<String>,

    /// Downloads directory
    #[arg(long, name = "DOWNLOADS_DIR", value_hint = clap::ValueHint::DirPath)]
    downloads: Option<String>,

    /// Generate shell completion
    #[arg(short = 'l', long, name = "SHELL")]
    completion: Option<Shell>,

    /// Print each request
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(ref shell) = args.completion {
        return torrent_adder::generate_shell_completion(*shell, Args::command(), true, env!("CARGO_BIN_NAME"));
    }

    let config = Config::from_args(args)?;
    let address = (config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.bind, config.port))?;

    println!(
        "{}",
        format!("Torrent Directory API running on {}:{}", config.bind, config.port).green()
    );
    if config.verbose {
        torrent_adder::print_verbose!("Movies: {}", config.directories.movies);
        torrent_adder::print_verbose!("TV shows: {}", config.directories.tv_shows);
        torrent_adder::print_verbose!("Downloads: {}", config.directories.downloads);
    }

    let router = server::create_router(config.directories, config.verbose);
    axum::serve(listener, router).await.context("Server error")
}

#[cfg(test)]
mod cli_args_tests {
    use super::*;

    #[test]
    fn empty_by_default() {
        let args = Args::try_parse_from(["test"]).expect("should parse");
        assert!(args.bind.is_none());
        assert!(args.port.is_none());
        assert!(args.tv.is_none());
        assert!(!args.verbose);
    }

    #[test]
    fn parses_directories() {
        let args = Args::try_parse_from([
            "test",
            "--movies",
            "/srv/Movies",
            "--tv",
            "/srv/TV",
            "--downloads",
            "/srv/Downloads",
        ])
        .expect("should parse");
        assert_eq!(args.movies.as_deref(), Some("/srv/Movies"));
        assert_eq!(args.tv.as_deref(), Some("/srv/TV"));
        assert_eq!(args.downloads.as_deref(), Some("/srv/Downloads"));
    }

    #[test]
    fn parses_bind_and_port() {
        let args = Args::try_parse_from(["test", "-b", "127.0.0.1", "-P", "9000", "-v"]).expect("should parse");
        assert_eq!(args.bind.as_deref(), Some("127.0.0.1"));
        assert_eq!(args.port, Some(9000));
        assert!(args.verbose);
    }
}
