//! Configuration for torrent-adder.
//!
//! Handles reading configuration from CLI arguments and the user config file.

use std::fs;

use anyhow::{Context, Result};
use serde::Deserialize;
use torrent_adder::library::LibraryPaths;
use torrent_adder::print_warning;
use torrent_adder::transmission::Credentials;

use crate::Args;

/// Default Transmission host.
const DEFAULT_HOST: &str = "192.168.1.100";

/// Default Transmission RPC port.
const DEFAULT_PORT: u16 = 9091;

/// Default directory listing service port.
const DEFAULT_API_PORT: u16 = 8765;

/// Which dialog implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialogKind {
    AppleScript,
    Terminal,
}

/// Config from the user config file.
#[derive(Debug, Default, Deserialize)]
pub struct TorrentAdderConfig {
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    /// Directory listing service host. Defaults to the Transmission host.
    #[serde(default)]
    api_host: Option<String>,
    #[serde(default)]
    api_port: Option<u16>,
    #[serde(default)]
    movies_dir: Option<String>,
    #[serde(default)]
    downloads_dir: Option<String>,
    #[serde(default)]
    tv_dir: Option<String>,
    #[serde(default)]
    dialog: Option<DialogKind>,
    #[serde(default)]
    dryrun: bool,
    #[serde(default)]
    verbose: bool,
}

/// Wrapper needed for parsing the config file section.
#[derive(Debug, Default, Deserialize)]
struct UserConfig {
    #[serde(default)]
    torrent_adder: TorrentAdderConfig,
}

/// Final config combined from CLI arguments and user config file.
#[derive(Debug)]
pub struct Config {
    /// Torrent file path or magnet link.
    pub source: Option<String>,
    pub host: String,
    pub port: u16,
    pub credentials: Option<Credentials>,
    pub api_host: String,
    pub api_port: u16,
    /// Directories used when the listing service is unavailable.
    pub library: LibraryPaths,
    pub dialog: DialogKind,
    pub dryrun: bool,
    pub verbose: bool,
}

impl Default for DialogKind {
    fn default() -> Self {
        if cfg!(target_os = "macos") {
            Self::AppleScript
        } else {
            Self::Terminal
        }
    }
}

impl TorrentAdderConfig {
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
            .map(|config| config.torrent_adder)
            .context("Failed to parse torrent_adder config TOML")
    }
}

impl Config {
    /// Create config from given command line args and user config file.
    ///
    /// An invalid config file is reported and ignored so a torrent can always be added.
    pub fn from_args(args: Args) -> Self {
        let user_config = TorrentAdderConfig::get_user_config().unwrap_or_else(|error| {
            print_warning!("{error:#}\nUsing default config");
            TorrentAdderConfig::default()
        });
        Self::from_parts(args, user_config)
    }

    /// Combine args and user config, with args taking priority.
    pub fn from_parts(args: Args, user_config: TorrentAdderConfig) -> Self {
        let host = args
            .host
            .or(user_config.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = args.port.or(user_config.port).unwrap_or(DEFAULT_PORT);

        let username = args.username.or(user_config.username).unwrap_or_default();
        let password = args.password.or(user_config.password).unwrap_or_default();

        let api_host = args
            .api_host
            .or(user_config.api_host)
            .unwrap_or_else(|| host.clone());
        let api_port = args.api_port.or(user_config.api_port).unwrap_or(DEFAULT_API_PORT);

        let defaults = LibraryPaths::default();
        let library = LibraryPaths {
            movies: user_config.movies_dir.unwrap_or(defaults.movies),
            downloads: user_config.downloads_dir.unwrap_or(defaults.downloads),
            tv_base: user_config.tv_dir.unwrap_or(defaults.tv_base),
        };

        let dialog = if args.terminal {
            DialogKind::Terminal
        } else {
            user_config.dialog.unwrap_or_default()
        };

        Self {
            source: args.source.map(|source| source.trim().to_string()).filter(|source| !source.is_empty()),
            host,
            port,
            credentials: Credentials::from_parts(&username, &password),
            api_host,
            api_port,
            library,
            dialog,
            dryrun: args.dryrun || user_config.dryrun,
            verbose: args.verbose || user_config.verbose,
        }
    }
}


#[cfg(test)]
mod config_from_parts_tests {
    use super::*;

    use clap::Parser;

    fn args(arguments: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("test").chain(arguments.iter().copied())).expect("should parse")
    }

    #[test]
    fn defaults_without_args_or_config() {
        let config = Config::from_parts(args(&[]), TorrentAdderConfig::default());
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.api_host, DEFAULT_HOST);
        assert_eq!(config.api_port, DEFAULT_API_PORT);
        assert_eq!(config.library, LibraryPaths::default());
        assert!(config.credentials.is_none());
        assert!(config.source.is_none());
        assert_eq!(config.dialog, DialogKind::default());
    }

    #[test]
    fn args_override_config() {
        let user_config = TorrentAdderConfig {
            host: Some("10.0.0.5".to_string()),
            port: Some(9092),
            ..Default::default()
        };
        let config = Config::from_parts(args(&["-H", "nas.local", "-P", "9093"]), user_config);
        assert_eq!(config.host, "nas.local");
        assert_eq!(config.port, 9093);
    }

    #[test]
    fn api_host_follows_host() {
        let config = Config::from_parts(args(&["-H", "nas.local"]), TorrentAdderConfig::default());
        assert_eq!(config.api_host, "nas.local");

        let config = Config::from_parts(
            args(&["-H", "nas.local", "--api-host", "media.local"]),
            TorrentAdderConfig::default(),
        );
        assert_eq!(config.api_host, "media.local");
    }

    #[test]
    fn credentials_need_both_parts() {
        let config = Config::from_parts(args(&["-u", "admin"]), TorrentAdderConfig::default());
        assert!(config.credentials.is_none());

        let user_config = TorrentAdderConfig {
            password: Some("secret".to_string()),
            ..Default::default()
        };
        let config = Config::from_parts(args(&["-u", "admin"]), user_config);
        assert_eq!(
            config.credentials,
            Some(Credentials {
                username: "admin".to_string(),
                password: "secret".to_string(),
            })
        );
    }

    #[test]
    fn terminal_flag_overrides_config_dialog() {
        let user_config = TorrentAdderConfig {
            dialog: Some(DialogKind::AppleScript),
            ..Default::default()
        };
        let config = Config::from_parts(args(&["-t"]), user_config);
        assert_eq!(config.dialog, DialogKind::Terminal);
    }

    #[test]
    fn booleans_are_combined() {
        let user_config = TorrentAdderConfig {
            verbose: true,
            ..Default::default()
        };
        let config = Config::from_parts(args(&["-p"]), user_config);
        assert!(config.dryrun);
        assert!(config.verbose);
    }

    #[test]
    fn fallback_directories_from_config() {
        let user_config = TorrentAdderConfig {
            movies_dir: Some("/data/Movies".to_string()),
            ..Default::default()
        };
        let config = Config::from_parts(args(&[]), user_config);
        assert_eq!(config.library.movies, "/data/Movies");
        assert_eq!(config.library.tv_base, LibraryPaths::default().tv_base);
    }

    #[test]
    fn blank_source_is_missing() {
        let config = Config::from_parts(args(&["  "]), TorrentAdderConfig::default());
        assert!(config.source.is_none());
    }
}
