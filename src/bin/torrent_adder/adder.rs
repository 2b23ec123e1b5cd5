//! Main add logic for torrent-adder.

use anyhow::Result;
use colored::Colorize;
use torrent_adder::dialog::Dialog;
use torrent_adder::library::{DirectoryListing, LibraryClient, ListingSource};
use torrent_adder::resolver::{Outcome, Resolver};
use torrent_adder::torrent::TorrentSource;
use torrent_adder::transmission::{RPC_PATH, TransmissionClient};
use torrent_adder::{colorize_bool, print_verbose, resolve_existing_path};

use crate::Args;
use crate::config::{Config, DialogKind};
use crate::dialog::{AppleScriptDialog, TerminalDialog};

/// Adds one torrent to Transmission after asking for the download directory.
pub struct TorrentAdder {
    config: Config,
}

impl TorrentAdder {
    pub fn new(args: Args) -> Self {
        Self {
            config: Config::from_args(args),
        }
    }

    /// Run the add workflow with the configured dialog.
    ///
    /// # Errors
    /// Returns an error if the HTTP clients cannot be created.
    pub async fn run(self) -> Result<Outcome> {
        let dialog: Box<dyn Dialog> = match self.config.dialog {
            DialogKind::AppleScript => Box::new(AppleScriptDialog),
            DialogKind::Terminal => Box::new(TerminalDialog),
        };
        self.run_with(dialog.as_ref()).await
    }

    async fn run_with(&self, dialog: &dyn Dialog) -> Result<Outcome> {
        let Some(source) = self.parse_source(dialog) else {
            return Ok(Outcome::Failed);
        };

        if self.config.verbose {
            self.print_config(&source);
        }

        let listing = LibraryClient::new(&self.config.api_host, self.config.api_port)?
            .fetch_or_fallback(&self.config.library)
            .await;

        if self.config.verbose {
            match listing.source {
                ListingSource::Remote => print_verbose!(
                    "Directory listing from {}:{} ({} shows)",
                    self.config.api_host,
                    self.config.api_port,
                    listing.shows.len()
                ),
                ListingSource::Fallback(ref reason) => print_verbose!("Using default directories: {reason}"),
            }
        }

        if self.config.dryrun {
            return Ok(self.dry_run(dialog, &listing, &source));
        }

        let resolver = Resolver::new(dialog, &listing).verbose(self.config.verbose);

        let mut client = TransmissionClient::new(&self.config.host, self.config.port, self.config.credentials.clone())?
            .verbose(self.config.verbose);

        Ok(resolver.run(&mut client, &source).await)
    }

    /// Validate the input and turn it into a torrent source.
    fn parse_source(&self, dialog: &dyn Dialog) -> Option<TorrentSource> {
        let Some(ref input) = self.config.source else {
            dialog.show_error("No torrent file or magnet link provided");
            return None;
        };

        match TorrentSource::parse(input) {
            TorrentSource::FileReference(path) => {
                if let Some(absolute_path) = resolve_existing_path(&path) {
                    Some(TorrentSource::FileReference(absolute_path))
                } else {
                    dialog.show_error(&format!("File not found:\n{}", path.display()));
                    None
                }
            }
            magnet => Some(magnet),
        }
    }

    /// Choose the directory and print the request instead of sending it.
    fn dry_run(&self, dialog: &dyn Dialog, listing: &DirectoryListing, source: &TorrentSource) -> Outcome {
        let resolver = Resolver::new(dialog, listing).verbose(self.config.verbose);
        let torrent_name = resolver.torrent_name(source);
        match resolver.choose_destination(&torrent_name) {
            Ok(Some(destination)) => {
                println!("{}", "Dryrun: torrent not added".yellow().bold());
                println!("  {}  {torrent_name}", "Name:".bold());
                println!("  {}  {source}", "Source:".bold());
                println!("  {}  {}", "Directory:".bold(), destination.path);
                println!(
                    "  {}  http://{}:{}{RPC_PATH}",
                    "Daemon:".bold(),
                    self.config.host,
                    self.config.port
                );
                Outcome::Added
            }
            Ok(None) => Outcome::Cancelled,
            Err(error) => {
                dialog.show_error(&error.to_string());
                Outcome::Failed
            }
        }
    }

    fn print_config(&self, source: &TorrentSource) {
        print_verbose!("Source: {source}");
        print_verbose!("Transmission: {}:{}", self.config.host, self.config.port);
        print_verbose!("Credentials: {}", colorize_bool(self.config.credentials.is_some()));
        print_verbose!("Dialog: {:?}", self.config.dialog);
    }
}

#[cfg(test)]
mod torrent_adder_tests {
    use super::*;

    use std::cell::RefCell;
    use std::fs;

    use httpmock::prelude::*;
    use serde_json::json;
    use tempfile::tempdir;
    use torrent_adder::library::LibraryPaths;

    /// Accepts every suggestion and picks the first list item.
    #[derive(Default)]
    struct AcceptingDialog {
        errors: RefCell<Vec<String>>,
        infos: RefCell<Vec<String>>,
        prompts: RefCell<Vec<String>>,
    }

    impl Dialog for AcceptingDialog {
        fn show_error(&self, message: &str) {
            self.errors.borrow_mut().push(message.to_string());
        }

        fn show_info(&self, message: &str) {
            self.infos.borrow_mut().push(message.to_string());
        }

        fn choose(&self, prompt: &str, _items: &[&str], _default: Option<usize>) -> Option<usize> {
            self.prompts.borrow_mut().push(prompt.to_string());
            Some(0)
        }

        fn confirm(&self, prompt: &str) -> Option<bool> {
            self.prompts.borrow_mut().push(prompt.to_string());
            Some(true)
        }

        fn ask_text(&self, _prompt: &str, _default: &str) -> Option<String> {
            None
        }
    }

    fn config(source: Option<&str>, server: &MockServer) -> Config {
        Config {
            source: source.map(ToString::to_string),
            host: server.host(),
            port: server.port(),
            credentials: None,
            api_host: server.host(),
            api_port: server.port(),
            library: LibraryPaths::default(),
            dialog: DialogKind::Terminal,
            dryrun: false,
            verbose: false,
        }
    }

    async fn mock_listing(server: &MockServer) {
        server
            .mock_async(|when, then| {
                when.method(GET).path("/movies");
                then.status(200).json_body(json!({"path": "/media/Movies"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/downloads");
                then.status(200).json_body(json!({"path": "/media/Downloads"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/tvshows");
                then.status(200).json_body(json!({"base": "/media/TV", "shows": ["Severance"]}));
            })
            .await;
    }

    #[tokio::test]
    async fn missing_source_is_failure() {
        let server = MockServer::start_async().await;
        let adder = TorrentAdder {
            config: config(None, &server),
        };
        let dialog = AcceptingDialog::default();

        let outcome = adder.run_with(&dialog).await.expect("should run");
        assert!(outcome.is_failure());
        assert_eq!(
            dialog.errors.borrow().as_slice(),
            ["No torrent file or magnet link provided"]
        );
    }

    #[tokio::test]
    async fn missing_file_is_failure() {
        let server = MockServer::start_async().await;
        let adder = TorrentAdder {
            config: config(Some("/nonexistent/show.torrent"), &server),
        };
        let dialog = AcceptingDialog::default();

        let outcome = adder.run_with(&dialog).await.expect("should run");
        assert!(outcome.is_failure());
        assert_eq!(
            dialog.errors.borrow().as_slice(),
            ["File not found:\n/nonexistent/show.torrent"]
        );
    }

    #[tokio::test]
    async fn torrent_file_added_to_suggested_show() {
        let dir = tempdir().expect("should create temp dir");
        let path = dir.path().join("download.torrent");
        fs::write(&path, b"d4:infod4:name22:Severance.S02E05.1080pee").expect("should write torrent");

        let server = MockServer::start_async().await;
        mock_listing(&server).await;
        let rpc = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(RPC_PATH)
                    .json_body(json!({
                        "method": "torrent-add",
                        "arguments": {
                            "paused": false,
                            "metainfo": "ZDQ6aW5mb2Q0Om5hbWUyMjpTZXZlcmFuY2UuUzAyRTA1LjEwODBwZWU=",
                            "download-dir": "/media/TV/Severance"
                        }
                    }));
                then.status(200).json_body(json!({
                    "result": "success",
                    "arguments": {"torrent-added": {"name": "Severance.S02E05.1080p"}}
                }));
            })
            .await;

        let adder = TorrentAdder {
            config: config(path.to_str(), &server),
        };
        let dialog = AcceptingDialog::default();

        let outcome = adder.run_with(&dialog).await.expect("should run");
        assert_eq!(outcome, Outcome::Added);
        rpc.assert_async().await;
        assert_eq!(
            dialog.prompts.borrow()[0],
            "Add to TV: Severance?\n\nSeverance.S02E05.1080p"
        );
        assert_eq!(
            dialog.infos.borrow().as_slice(),
            ["✓ Torrent added!\n\nSeverance.S02E05.1080p\n\nDownloading to:\n/media/TV/Severance"]
        );
    }

    #[tokio::test]
    async fn dryrun_does_not_contact_daemon() {
        let server = MockServer::start_async().await;
        mock_listing(&server).await;
        let rpc = server
            .mock_async(|when, then| {
                when.method(POST).path(RPC_PATH);
                then.status(200).json_body(json!({"arguments": {}}));
            })
            .await;

        let mut config = config(Some("magnet:?xt=urn:btih:ABC&dn=Some.Movie.2024"), &server);
        config.dryrun = true;
        let adder = TorrentAdder { config };
        let dialog = AcceptingDialog::default();

        let outcome = adder.run_with(&dialog).await.expect("should run");
        assert_eq!(outcome, Outcome::Added);
        rpc.assert_calls_async(0).await;
        assert!(dialog.errors.borrow().is_empty());
    }

    #[tokio::test]
    async fn listing_failure_uses_fallback_directories() {
        let server = MockServer::start_async().await;
        let rpc = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(RPC_PATH)
                    .json_body(json!({
                        "method": "torrent-add",
                        "arguments": {
                            "paused": false,
                            "filename": "magnet:?xt=urn:btih:ABC&dn=Some.Movie.2024",
                            "download-dir": "/media/lacie/Media/Movies"
                        }
                    }));
                then.status(200).json_body(json!({
                    "result": "success",
                    "arguments": {"torrent-duplicate": {"name": "Some.Movie.2024"}}
                }));
            })
            .await;

        let adder = TorrentAdder {
            config: config(Some("magnet:?xt=urn:btih:ABC&dn=Some.Movie.2024"), &server),
        };
        let dialog = AcceptingDialog::default();

        let outcome = adder.run_with(&dialog).await.expect("should run");
        assert_eq!(outcome, Outcome::Duplicate);
        rpc.assert_async().await;
    }
}
