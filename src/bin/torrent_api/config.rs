//! Configuration for torrent-api.
//!
//! Handles reading configuration from CLI arguments and the user config file.

use std::fs;
use std::net::IpAddr;

use anyhow::{Context, Result};
use serde::Deserialize;
use torrent_adder::library::{DEFAULT_DOWNLOADS_DIR, DEFAULT_MOVIES_DIR, DEFAULT_TV_DIR};

use crate::Args;
use crate::server::LibraryDirectories;

const DEFAULT_PORT: u16 = 8765;
const DEFAULT_BIND: &str = "0.0.0.0";

/// Config from the user config file.
#[derive(Debug, Default, Deserialize)]
pub struct TorrentApiConfig {
    #[serde(default)]
    bind: Option<String>,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    movies_dir: Option<String>,
    #[serde(default)]
    tv_dir: Option<String>,
    #[serde(default)]
    downloads_dir: Option<String>,
    #[serde(default)]
    verbose: bool,
}

/// Wrapper needed for parsing the config file section.
#[derive(Debug, Default, Deserialize)]
struct UserConfig {
    #[serde(default)]
    torrent_api: TorrentApiConfig,
}

/// Final config combined from CLI arguments and user config file.
#[derive(Debug)]
pub struct Config {
    pub bind: IpAddr,
    pub port: u16,
    pub directories: LibraryDirectories,
    pub verbose: bool,
}

impl TorrentApiConfig {
    /// Try to read user config from the file if it exists.
    /// Otherwise, fall back to default config.
    ///
    /// # Errors
    /// Returns an error if config file exists but cannot be read or parsed.
    pub fn get_user_config() -> Result<Self> {
        let Some(path) = torrent_adder::config::CONFIG_PATH.as_deref() else {
            return Ok(Self::default());
        };

        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content)
                .with_context(|| format!("Failed to parse config file {}", path.display())),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(anyhow::anyhow!(
                "Failed to read config file {}: {error}",
                path.display()
            )),
        }
    }

    /// Parse config from a TOML string.
    ///
    /// # Errors
    /// Returns an error if the TOML string is invalid.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        toml::from_str::<UserConfig>(toml_str)
            .map(|config| config.torrent_api)
            .context("Failed to parse torrent_api config TOML")
    }
}

impl Config {
    /// Create config from given command line args and user config file.
    ///
    /// # Errors
    /// Returns an error if the config file cannot be read or parsed,
    /// or the bind address is invalid.
    pub fn from_args(args: Args) -> Result<Self> {
        let user_config = TorrentApiConfig::get_user_config()?;
        Self::from_parts(args, user_config)
    }

    /// Combine args and user config, with args taking priority.
    ///
    /// # Errors
    /// Returns an error if the bind address is invalid.
    pub fn from_parts(args: Args, user_config: TorrentApiConfig) -> Result<Self> {
        let bind = args
            .bind
            .or(user_config.bind)
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind: IpAddr = bind
            .parse()
            .with_context(|| format!("Invalid bind address: {bind}"))?;

        let directories = LibraryDirectories {
            movies: args
                .movies
                .or(user_config.movies_dir)
                .unwrap_or_else(|| DEFAULT_MOVIES_DIR.to_string()),
            tv_shows: args
                .tv
                .or(user_config.tv_dir)
                .unwrap_or_else(|| DEFAULT_TV_DIR.to_string()),
            downloads: args
                .downloads
                .or(user_config.downloads_dir)
                .unwrap_or_else(|| DEFAULT_DOWNLOADS_DIR.to_string()),
        };

        Ok(Self {
            bind,
            port: args.port.or(user_config.port).unwrap_or(DEFAULT_PORT),
            directories,
            verbose: args.verbose || user_config.verbose,
        })
    }
}
